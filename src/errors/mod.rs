//! Error types and the failure classifier.

pub mod classifier;
pub mod types;

pub use classifier::{ErrorCategory, ErrorClassifier, ErrorCode, ErrorDetail};
pub use types::{AnalysisError, AppError, DriverError, SubmissionError};
