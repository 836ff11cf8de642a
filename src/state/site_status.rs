/// Site status definitions for tracking crawl progress
///
/// A site row is created `Indexing` when a crawl starts and ends either
/// `Indexed` or `Failed`.
use serde::Serialize;
use std::fmt;

/// Error message stored on sites interrupted by a stop request
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// Represents the crawl status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    /// A crawl of the site is in flight
    Indexing,

    /// The crawl tree fully unwound without a stop request
    Indexed,

    /// Stopped by the user, or no page could be fetched
    Failed,
}

impl SiteStatus {
    /// Checks whether a transition is permitted
    ///
    /// Only `Indexing` may move on; terminal statuses are left only by
    /// recreating the site row.
    pub fn can_transition_to(&self, next: SiteStatus) -> bool {
        matches!(
            (self, next),
            (Self::Indexing, Self::Indexed) | (Self::Indexing, Self::Failed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "indexing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "indexing" => Some(Self::Indexing),
            "indexed" => Some(Self::Indexed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(SiteStatus::Indexing.can_transition_to(SiteStatus::Indexed));
        assert!(SiteStatus::Indexing.can_transition_to(SiteStatus::Failed));

        assert!(!SiteStatus::Indexed.can_transition_to(SiteStatus::Failed));
        assert!(!SiteStatus::Failed.can_transition_to(SiteStatus::Indexed));
        assert!(!SiteStatus::Indexing.can_transition_to(SiteStatus::Indexing));
    }

    #[test]
    fn test_roundtrip_db_string() {
        for status in [SiteStatus::Indexing, SiteStatus::Indexed, SiteStatus::Failed] {
            let db_str = status.to_db_string();
            assert_eq!(Some(status), SiteStatus::from_db_string(db_str));
        }
        assert_eq!(SiteStatus::from_db_string("crawling"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SiteStatus::Indexing), "indexing");
        assert_eq!(format!("{}", SiteStatus::Failed), "failed");
    }
}
