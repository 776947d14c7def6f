//! Error type definitions.
//!
//! A small hierarchy: driver errors cross the browser boundary, analysis and
//! submission errors stay inside the core, and `AppError` is the top-level
//! type the worker reports through. Components return these as values; no
//! error is thrown across a component boundary.

use thiserror::Error;

/// Top-level application error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Browser driver failures (navigation, evaluation, element ops)
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Analyzer failures
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Submission flow failures
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Client record decoding failures
    #[error("Client record error: {0}")]
    ClientRecord(#[from] serde_json::Error),

    /// Caller-driven cancellation
    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cancelled<S: Into<String>>(reason: S) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by a [`crate::driver::BrowserDriver`] implementation.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// Navigation failed or did not settle in time
    #[error("Navigation failed: {url} - {message}")]
    Navigation { url: String, message: String },

    /// An operation exceeded its time budget
    #[error("Timeout after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    /// Selector did not resolve to an element
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Element exists but rejects interaction
    #[error("Element not interactable: {selector} - {message}")]
    NotInteractable { selector: String, message: String },

    /// In-page script evaluation failed
    #[error("Evaluation failed: {message}")]
    Evaluation { message: String },

    /// Page or browser context is gone
    #[error("Page closed: {message}")]
    PageClosed { message: String },
}

impl DriverError {
    pub fn timeout<S: Into<String>>(operation: S, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }
}

/// Analyzer-side failures.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The page exposes no usable form
    #[error("No form found on page: {url}")]
    NoFormFound { url: String },

    /// Snapshot collection returned malformed data
    #[error("Snapshot decode failed: {0}")]
    SnapshotDecode(#[from] serde_json::Error),

    /// No message area could be mapped for a form that requires one
    #[error("No message area mapped")]
    NoMessageArea,
}

/// Submission-flow failures.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// No submit button candidate survived filtering
    #[error("Submit button not found")]
    SubmitButtonNotFound,

    /// The click failed on both the native and the in-page path
    #[error("Submit click failed: {selector} - {message}")]
    ClickFailed { selector: String, message: String },

    /// Filling one field failed
    #[error("Error filling field {field}: {message}")]
    FillFailed { field: String, message: String },

    /// Confirmation page never produced a final submit button
    #[error("Final submit button not found on confirmation page")]
    FinalButtonNotFound,

    /// Caller cancelled mid-flight; resources were released
    #[error("Submission cancelled")]
    Cancelled,

    /// Driver error inside the submission flow
    #[error("Driver error during submission: {0}")]
    Driver(#[from] DriverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_converts_to_app_error() {
        let err: AppError = DriverError::timeout("goto", 15_000).into();
        assert!(matches!(err, AppError::Driver(DriverError::Timeout { .. })));
        assert!(err.to_string().contains("15000ms"));
    }

    #[test]
    fn submission_error_message_carries_field() {
        let err = SubmissionError::FillFailed {
            field: "email".into(),
            message: "detached".into(),
        };
        assert!(err.to_string().contains("email"));
    }
}
