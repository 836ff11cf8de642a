//! Response envelope for crawl control and search
//!
//! Every operation result is turned into an [`ApiResponse`], which carries
//! either the payload or a typed error with its HTTP-style status code.

use crate::crawler::{IndexPageOutcome, StartOutcome, StopOutcome};
use crate::search::{SearchError, SearchResponse};
use serde::Serialize;
use std::fmt;

/// Category of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Payload of a successful control request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub result: bool,
}

/// Result envelope
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiResponse<T> {
    Ok { data: T },
    Err { kind: ErrorKind, message: String },
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok { data }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Err {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an unexpected failure
    pub fn internal(err: impl fmt::Display) -> Self {
        Self::error(ErrorKind::Internal, err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// HTTP-style status code of the response
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok { .. } => 200,
            Self::Err { kind, .. } => kind.status_code(),
        }
    }
}

impl ApiResponse<Ack> {
    pub fn from_start(outcome: StartOutcome) -> Self {
        if outcome.already_running {
            Self::error(ErrorKind::Conflict, "Indexing is already running")
        } else {
            Self::ok(Ack { result: true })
        }
    }

    pub fn from_stop(outcome: StopOutcome) -> Self {
        if outcome.was_running {
            Self::ok(Ack { result: true })
        } else {
            Self::error(ErrorKind::BadRequest, "Indexing is not running")
        }
    }

    pub fn from_index_page(outcome: IndexPageOutcome) -> Self {
        if outcome.accepted {
            Self::ok(Ack { result: true })
        } else {
            Self::error(
                ErrorKind::BadRequest,
                "This page is outside the sites listed in the configuration file",
            )
        }
    }
}

impl From<Result<SearchResponse, SearchError>> for ApiResponse<SearchResponse> {
    fn from(result: Result<SearchResponse, SearchError>) -> Self {
        match result {
            Ok(response) => Self::ok(response),
            Err(e @ SearchError::EmptyQuery) => Self::error(ErrorKind::BadRequest, e.to_string()),
            Err(e @ SearchError::UnknownSite(_)) => Self::error(ErrorKind::NotFound, e.to_string()),
            Err(e @ SearchError::Storage(_)) => Self::internal(e),
        }
    }
}
