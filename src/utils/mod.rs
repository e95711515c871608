//! Utility modules for logging, metrics, and error handling

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{PovertyError, Result};
pub use logging::{setup_cli_logging, TrainingLogger};
pub use metrics::{r_squared, MetricsHistory};
