//! State module for tracking crawl progress
//!
//! This module provides the per-site status machine driven by the crawl
//! coordinator.
//!
//! # Components
//!
//! - `SiteStatus`: Tracks whether a site is being indexed, indexed, or failed

mod site_status;

// Re-export main types
pub use site_status::{SiteStatus, STOPPED_BY_USER};
