//! Browser driver abstraction.
//!
//! The core never talks to a browser runtime directly; everything goes
//! through this trait. Selectors are plain CSS strings produced by the
//! snapshot scripts, page scripts are the fixed constants from
//! [`crate::dom::scripts`] with JSON arguments, and responses observed
//! during submission are drained through the capture API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dom::BoundingBox;
use crate::errors::DriverError;

/// Page load milestones the engine can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    NetworkIdle,
}

/// Element lifecycle states for `wait_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Attached,
    Visible,
}

/// Target of a `select_option` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectTarget {
    Value(String),
    Label(String),
    Index(usize),
}

/// One response observed while the capture is armed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub url: String,
    pub status: u16,
    pub method: String,
}

impl ResponseRecord {
    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("post")
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Headless-browser operations the core consumes.
///
/// Implementations own one page. All operations are bounded by the timeout
/// they receive (or an implementation-internal default) and must surface
/// budget overruns as [`DriverError::Timeout`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigates and returns the main-document HTTP status.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<u16, DriverError>;

    async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Runs one of the fixed page scripts with JSON arguments.
    async fn evaluate(
        &self,
        script: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// Visible text of the document body.
    async fn body_text(&self) -> Result<String, DriverError>;

    /// Full HTML of the page.
    async fn content(&self) -> Result<String, DriverError>;

    async fn count(&self, selector: &str) -> Result<usize, DriverError>;

    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError>;

    async fn is_enabled(&self, selector: &str) -> Result<bool, DriverError>;

    async fn is_checked(&self, selector: &str) -> Result<bool, DriverError>;

    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>, DriverError>;

    async fn text_content(&self, selector: &str) -> Result<Option<String>, DriverError>;

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    async fn check(&self, selector: &str) -> Result<(), DriverError>;

    async fn uncheck(&self, selector: &str) -> Result<(), DriverError>;

    async fn select_option(
        &self,
        selector: &str,
        target: SelectTarget,
    ) -> Result<(), DriverError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError>;

    async fn wait_for(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Starts recording responses; must be armed before the submit click.
    async fn begin_response_capture(&self);

    /// Drains the responses recorded since the capture was armed.
    async fn collect_responses(&self) -> Vec<ResponseRecord>;

    /// Releases the page and its listeners.
    async fn close(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_record_predicates() {
        let post = ResponseRecord {
            url: "https://example.test/submit".into(),
            status: 200,
            method: "POST".into(),
        };
        assert!(post.is_post());
        assert!(!post.is_redirect());

        let redirect = ResponseRecord {
            url: "https://example.test/thanks".into(),
            status: 302,
            method: "GET".into(),
        };
        assert!(redirect.is_redirect());
    }
}
