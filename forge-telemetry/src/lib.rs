//! # forge-telemetry
//!
//! Structured logging for lesson-forge using `tracing`.
//!
//! ```rust
//! use forge_telemetry::{init_telemetry, info};
//!
//! init_telemetry("lesson-forge").ok();
//! info!(project = "learning-dsa", "analysis started");
//! ```

pub mod init;
pub mod spans;

pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{init_telemetry, init_with_level};
