//! Utility modules for kube-report

pub mod errors;
pub mod logger;
pub mod mount;
pub mod prereqs;
pub mod progress;

#[cfg(all(test, unix))]
pub(crate) mod testing;

// Re-export commonly used items
pub use errors::{ReportError, enhance_error};
pub use logger::{LogLevel, log_debug, log_error, log_info, log_warn};
pub use prereqs::{CommonPrereqs, Prerequisite};
