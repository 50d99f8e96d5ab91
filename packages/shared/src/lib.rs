//! Shared utilities for the Tsudoi presence layer.
//!
//! Crate-wide concerns used by both the server and the client binaries:
//! logger bootstrap and timestamp helpers.

pub mod logger;
pub mod time;

pub use logger::setup_logger;
pub use time::{get_jst_timestamp, timestamp_to_jst_rfc3339};
