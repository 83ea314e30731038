//! Shared utilities for the veil trust core.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::format_duration_millis;
