//! Fill → submit → monitor state machine.
//!
//! Drives the mapped inputs into the page, turns on nearby consent
//! checkboxes, clicks the submit button (with an in-page click fallback),
//! follows one-step and confirmation-page flows, and watches the response
//! stream plus a MutationObserver inside a hard time budget. The observer
//! and the response capture are armed before the click and torn down on
//! every exit path.

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dom::{scripts, BoundingBox, ButtonCandidate, DomSnapshot};
use crate::driver::{BrowserDriver, ResponseRecord, SelectTarget};
use crate::errors::{DriverError, SubmissionError};
use crate::mapping::{FieldInput, InputValue};
use crate::submission::buttons::{self, ButtonKind};
use crate::submission::consent;

/// Comparable page state captured before and after the click.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub form_count: usize,
    pub visible_inputs: usize,
    pub field_values: Vec<FieldValueState>,
    pub submit_present: bool,
    pub submit_disabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValueState {
    pub selector: String,
    pub value: Option<String>,
    pub present: bool,
}

/// MutationObserver counters sampled after the click.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MutationSummary {
    #[serde(rename = "mutations")]
    pub total_mutations: u64,
    #[serde(rename = "significant")]
    pub significant_changes: u64,
}

/// Everything the judge needs about one submission attempt.
#[derive(Debug, Clone, Default)]
pub struct SubmissionOutcome {
    pub pre: PageState,
    pub post: PageState,
    pub mutations: MutationSummary,
    pub responses: Vec<ResponseRecord>,
    pub used_confirmation_flow: bool,
    pub submit_selector: String,
    pub fill_errors: Vec<String>,
}

pub struct SubmissionEngine<'a> {
    driver: &'a dyn BrowserDriver,
    config: &'a Config,
    cancel: CancellationToken,
}

impl<'a> SubmissionEngine<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, config: &'a Config, cancel: CancellationToken) -> Self {
        Self {
            driver,
            config,
            cancel,
        }
    }

    fn check_cancelled(&self) -> Result<(), SubmissionError> {
        if self.cancel.is_cancelled() {
            Err(SubmissionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs the full fill → submit → monitor flow.
    pub async fn submit(
        &self,
        snapshot: &DomSnapshot,
        inputs: &[FieldInput],
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let mut outcome = SubmissionOutcome::default();

        self.fill_fields(inputs, &mut outcome).await?;

        let button = self.locate_submit_button(snapshot).await?;
        outcome.submit_selector = button.selector.clone();

        self.ensure_consent(snapshot, &button).await;

        let field_selectors: Vec<String> = inputs.iter().map(|i| i.selector.clone()).collect();
        outcome.pre = self
            .capture_page_state(&field_selectors, Some(&button.selector))
            .await
            .unwrap_or_default();

        // Listeners are armed before any click.
        self.driver.begin_response_capture().await;
        let _ = self
            .driver
            .evaluate(scripts::ARM_MUTATION_OBSERVER, serde_json::Value::Null)
            .await;

        let result = self
            .click_and_settle(snapshot, &button, &field_selectors, &mut outcome)
            .await;

        // Teardown runs on every path.
        outcome.responses = self.driver.collect_responses().await;
        let _ = self
            .driver
            .evaluate(scripts::DISARM_MUTATION_OBSERVER, serde_json::Value::Null)
            .await;

        result.map(|()| outcome)
    }

    async fn click_and_settle(
        &self,
        _snapshot: &DomSnapshot,
        button: &ButtonCandidate,
        field_selectors: &[String],
        outcome: &mut SubmissionOutcome,
    ) -> Result<(), SubmissionError> {
        self.check_cancelled()?;

        let kind = buttons::classify_button(&button.text, &self.config.buttons);
        self.click_button(&button.selector).await?;

        if kind == ButtonKind::Confirmation {
            outcome.used_confirmation_flow = true;
            info!(button = %button.text, "confirmation page flow");
            tokio::time::sleep(self.config.timeouts.ajax_settle).await;
            self.check_cancelled()?;

            let final_button = self.locate_final_button().await?;
            debug!(button = %final_button.text, "final submit button located");
            // Consent marks can reappear on the confirmation page.
            consent::ensure_near_button(
                self.driver,
                None,
                final_button.bounding_box,
                &self.config.consent,
            )
            .await
            .unwrap_or(false);
            self.click_button(&final_button.selector).await?;
        }

        outcome.mutations = self.monitor_mutations().await;
        outcome.post = self
            .capture_page_state(field_selectors, Some(&outcome.submit_selector))
            .await
            .unwrap_or_default();
        Ok(())
    }

    async fn fill_fields(
        &self,
        inputs: &[FieldInput],
        outcome: &mut SubmissionOutcome,
    ) -> Result<(), SubmissionError> {
        for input in inputs {
            self.check_cancelled()?;
            if let Err(err) = self.fill_one(input).await {
                // Optional fields are skipped on failure; a required field
                // that cannot be filled dooms the attempt anyway, but the
                // judge and classifier get better evidence from the page
                // than from aborting here.
                warn!(
                    field = %input.key,
                    error = %crate::security::sanitize_diagnostic(&err.to_string()),
                    "field fill failed"
                );
                outcome.fill_errors.push(input.key.clone());
            }
        }
        Ok(())
    }

    async fn fill_one(&self, input: &FieldInput) -> Result<(), DriverError> {
        let selector = input.selector.as_str();
        let _ = self.driver.scroll_into_view(selector).await;
        match &input.value {
            InputValue::Text(value) => self.driver.fill(selector, value).await,
            InputValue::Check(true) => self.driver.check(selector).await,
            InputValue::Check(false) => self.driver.uncheck(selector).await,
            InputValue::SelectIndex(i) => {
                self.driver
                    .select_option(selector, SelectTarget::Index(*i))
                    .await
            }
            InputValue::SelectLabel(label) => {
                self.driver
                    .select_option(selector, SelectTarget::Label(label.clone()))
                    .await
            }
        }
    }

    async fn locate_submit_button(
        &self,
        snapshot: &DomSnapshot,
    ) -> Result<ButtonCandidate, SubmissionError> {
        let raw = self
            .driver
            .evaluate(
                scripts::SCAN_BUTTONS,
                serde_json::json!({ "formSelector": snapshot.form_selector }),
            )
            .await
            .map_err(SubmissionError::Driver)?;
        let candidates: Vec<ButtonCandidate> = serde_json::from_value(raw).unwrap_or_default();

        if let Some(best) = buttons::select_button(&candidates, &self.config.buttons) {
            return Ok(best.clone());
        }

        // Known selector fallbacks when the keyword scan comes up empty.
        for selector in &self.config.buttons.fallback_selectors {
            if self.driver.count(selector).await.unwrap_or(0) > 0
                && self.driver.is_visible(selector).await.unwrap_or(false)
            {
                return Ok(ButtonCandidate {
                    selector: selector.clone(),
                    tag_name: "button".into(),
                    input_type: "submit".into(),
                    text: String::new(),
                    visible: true,
                    enabled: true,
                    bounding_box: self.driver.bounding_box(selector).await.unwrap_or(None),
                });
            }
        }

        Err(SubmissionError::SubmitButtonNotFound)
    }

    async fn locate_final_button(&self) -> Result<ButtonCandidate, SubmissionError> {
        let raw = self
            .driver
            .evaluate(scripts::SCAN_BUTTONS, serde_json::json!({ "formSelector": null }))
            .await
            .map_err(SubmissionError::Driver)?;
        let candidates: Vec<ButtonCandidate> = serde_json::from_value(raw).unwrap_or_default();
        buttons::select_final_button(&candidates, &self.config.buttons)
            .cloned()
            .ok_or(SubmissionError::FinalButtonNotFound)
    }

    async fn ensure_consent(&self, snapshot: &DomSnapshot, button: &ButtonCandidate) {
        let button_box: Option<BoundingBox> = button.bounding_box;
        if let Err(err) = consent::ensure_near_button(
            self.driver,
            snapshot.form_selector.as_deref(),
            button_box,
            &self.config.consent,
        )
        .await
        {
            debug!(error = %err, "consent handling skipped");
        }
    }

    /// Waits for the button to become clickable, clicks, and falls back to
    /// the in-page click when the native action fails.
    async fn click_button(&self, selector: &str) -> Result<(), SubmissionError> {
        self.check_cancelled()?;
        let _ = self
            .driver
            .wait_for(
                selector,
                crate::driver::ElementState::Visible,
                self.config.timeouts.element_wait,
            )
            .await;
        if !self.driver.is_enabled(selector).await.unwrap_or(true) {
            // Give disabled-until-valid buttons a moment to enable.
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        match self.driver.click(selector, self.config.timeouts.click).await {
            Ok(()) => Ok(()),
            Err(primary) => {
                debug!(error = %primary, "native click failed, trying in-page click");
                let args = serde_json::json!({ "selector": selector });
                match self.driver.evaluate(scripts::CLICK_ELEMENT, args).await {
                    Ok(value) if value.as_bool() == Some(true) => Ok(()),
                    _ => Err(SubmissionError::ClickFailed {
                        selector: selector.to_string(),
                        message: primary.to_string(),
                    }),
                }
            }
        }
    }

    /// Polls the mutation counters until the DOM-monitoring budget runs out
    /// or enough change has been observed.
    async fn monitor_mutations(&self) -> MutationSummary {
        let budget = self.config.timeouts.dom_monitoring;
        let started = tokio::time::Instant::now();
        let mut summary = MutationSummary::default();
        while started.elapsed() < budget {
            if self.cancel.is_cancelled() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            if let Ok(raw) = self
                .driver
                .evaluate(scripts::POLL_MUTATIONS, serde_json::Value::Null)
                .await
            {
                if let Ok(polled) = serde_json::from_value::<MutationSummary>(raw) {
                    summary = polled;
                }
            }
            if summary.significant_changes >= 5 || summary.total_mutations >= 20 {
                break;
            }
        }
        summary
    }

    async fn capture_page_state(
        &self,
        field_selectors: &[String],
        submit_selector: Option<&str>,
    ) -> Result<PageState, DriverError> {
        let raw = self
            .driver
            .evaluate(
                scripts::PAGE_STATE,
                serde_json::json!({
                    "fieldSelectors": field_selectors,
                    "submitSelector": submit_selector,
                }),
            )
            .await?;
        serde_json::from_value(raw).map_err(|e| DriverError::Evaluation {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_state_deserializes() {
        let raw = serde_json::json!({
            "url": "https://example.test/form",
            "title": "Contact",
            "formCount": 1,
            "visibleInputs": 4,
            "fieldValues": [
                {"selector": "[id=\"email\"]", "value": "taro@example.com", "present": true}
            ],
            "submitPresent": true,
            "submitDisabled": false
        });
        let state: PageState = serde_json::from_value(raw).unwrap();
        assert_eq!(state.form_count, 1);
        assert!(state.submit_present);
        assert_eq!(state.field_values.len(), 1);
    }

    #[test]
    fn mutation_summary_deserializes_from_poll_shape() {
        let raw = serde_json::json!({"mutations": 12, "significant": 3});
        let summary: MutationSummary = serde_json::from_value(raw).unwrap();
        assert_eq!(summary.total_mutations, 12);
        assert_eq!(summary.significant_changes, 3);
    }
}
