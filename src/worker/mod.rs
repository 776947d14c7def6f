//! Orchestrator-facing entry point.
//!
//! `process_one` owns the whole pipeline for a single target URL: navigate,
//! snapshot, score and map, close mapping gaps, assign values, submit,
//! judge, and classify any failure. Every error becomes a verdict; the only
//! thing that escapes is nothing — panics are caught at the top and mapped
//! to a SYSTEM verdict.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::context::ContextExtractor;
use crate::dom::{scripts, DomSnapshot};
use crate::driver::{BrowserDriver, LoadState};
use crate::errors::classifier::{ErrorClassifier, ErrorEvidence};
use crate::errors::{ErrorCode, SubmissionError};
use crate::mapping::{assign_values, FieldMapper, UnmappedHandler};
use crate::models::{ClientRecord, FieldMapping, Verdict};
use crate::scoring::ElementScorer;
use crate::security::sanitize_diagnostic;
use crate::submission::{SubmissionEngine, SubmissionOutcome, SuccessJudge};

/// One worker drives one page through one submission at a time.
pub struct FormWorker {
    driver: Arc<dyn BrowserDriver>,
    config: Config,
    cancel: CancellationToken,
}

impl FormWorker {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Config) -> Self {
        Self {
            driver,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(
        driver: Arc<dyn BrowserDriver>,
        config: Config,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            config,
            cancel,
        }
    }

    /// Processes one target URL against one client record and returns the
    /// verdict. Never panics and never throws.
    pub async fn process_one(
        &self,
        url: &str,
        client_record: serde_json::Value,
        targeting_id: i64,
    ) -> Verdict {
        let attempt_id = Uuid::new_v4();
        let run = AssertUnwindSafe(self.run(url, client_record, targeting_id, attempt_id));
        match run.catch_unwind().await {
            Ok(verdict) => verdict,
            Err(_) => Verdict::failure(
                targeting_id,
                6,
                "undecided",
                ErrorClassifier::MIN_CONFIDENCE,
                "internal error while processing submission",
                ErrorCode::System,
            ),
        }
    }

    async fn run(
        &self,
        url: &str,
        client_record: serde_json::Value,
        targeting_id: i64,
        attempt_id: Uuid,
    ) -> Verdict {
        let record = match ClientRecord::from_json(client_record, &self.config.client_record) {
            Ok(record) => record,
            Err(err) => {
                return Verdict::failure(
                    targeting_id,
                    6,
                    "undecided",
                    0.9,
                    sanitize_diagnostic(&format!("client record decode failed: {err}")),
                    ErrorCode::Instruction,
                );
            }
        };
        let record_id = if record.targeting.id != 0 {
            record.targeting.id
        } else {
            targeting_id
        };

        // Navigation.
        let status = match self.driver.goto(url, self.config.timeouts.page_load).await {
            Ok(status) => status,
            Err(err) => {
                if self.cancel.is_cancelled() {
                    return self.cancelled_verdict(record_id).await;
                }
                let code = ErrorClassifier::classify(&ErrorEvidence {
                    error_message: &err.to_string(),
                    ..Default::default()
                });
                return Verdict::failure(
                    record_id,
                    6,
                    "undecided",
                    0.8,
                    sanitize_diagnostic(&err.to_string()),
                    code,
                );
            }
        };
        if status >= 400 {
            let content = self.driver.content().await.unwrap_or_default();
            let code = ErrorClassifier::classify(&ErrorEvidence {
                error_message: "",
                page_content: &content,
                http_status: Some(status),
                ..Default::default()
            });
            return Verdict::failure(
                record_id,
                6,
                "undecided",
                0.9,
                format!("page returned HTTP {status}"),
                code,
            )
            .with_details(serde_json::json!({ "httpStatus": status }));
        }
        let _ = self
            .driver
            .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.page_load)
            .await;
        if self.cancel.is_cancelled() {
            return self.cancelled_verdict(record_id).await;
        }

        // Bot-protection probe: a CAPTCHA-gated page is never worth filling.
        let initial_content = self.driver.content().await.unwrap_or_default();
        if ErrorClassifier::is_bot_protected(&initial_content) {
            return Verdict::failure(
                record_id,
                6,
                "undecided",
                0.9,
                "bot protection markup present on page",
                ErrorCode::BotDetected,
            );
        }

        // Snapshot + index construction precedes any scoring.
        let snapshot = match self.collect_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(message) => {
                return Verdict::failure(
                    record_id,
                    6,
                    "undecided",
                    0.7,
                    sanitize_diagnostic(&message),
                    ErrorCode::ContentAnalysisFailed,
                );
            }
        };
        if snapshot.elements.is_empty() {
            return Verdict::failure(
                record_id,
                6,
                "undecided",
                0.85,
                "no form elements found on page",
                ErrorCode::ElementNotFound,
            );
        }

        // Scoring → mapping → auto-handling → values, strictly in order.
        let extractor =
            ContextExtractor::new(&snapshot, self.config.context.to_context_config());
        let scorer = ElementScorer::new();
        let mapper = FieldMapper::new(
            &snapshot,
            &extractor,
            &scorer,
            self.config.analyzer.top_k_full_score,
        );
        let mut mapping = mapper.build_mapping();
        UnmappedHandler::new(&snapshot, &extractor, &self.config, &record.client)
            .handle(&mut mapping);
        info!(fields = mapping.len(), "field mapping complete");

        let inputs = assign_values(&mapping, &record.client, &self.config.values, &snapshot);

        // Submission.
        let engine = SubmissionEngine::new(self.driver.as_ref(), &self.config, self.cancel.clone());
        let outcome = match engine.submit(&snapshot, &inputs).await {
            Ok(outcome) => outcome,
            Err(SubmissionError::Cancelled) => return self.cancelled_verdict(record_id).await,
            Err(SubmissionError::SubmitButtonNotFound) => {
                return Verdict::failure(
                    record_id,
                    6,
                    "undecided",
                    0.85,
                    "no submit button candidate survived filtering",
                    ErrorCode::SubmitButtonNotFound,
                )
                .with_details(self.mapping_details(&mapping, &attempt_id, url));
            }
            Err(err) => {
                let content = self.driver.content().await.unwrap_or_default();
                let code =
                    ErrorClassifier::classify_submission(&err.to_string(), &content, Some("form"));
                return Verdict::failure(
                    record_id,
                    6,
                    "undecided",
                    0.7,
                    sanitize_diagnostic(&err.to_string()),
                    code,
                )
                .with_details(self.mapping_details(&mapping, &attempt_id, url));
            }
        };

        // Judgment.
        let body_text = self.driver.body_text().await.unwrap_or_default();
        let content = self.driver.content().await.unwrap_or_default();
        let judge = SuccessJudge::new(self.config.judge.clone());
        let stage = judge.judge(&outcome, &body_text, &content);

        let details = self.outcome_details(&mapping, &outcome, &attempt_id, url);

        match stage {
            Some(result) if result.success => {
                Verdict::success(
                    record_id,
                    result.stage,
                    result.stage_name,
                    result.confidence,
                    result.message,
                )
                .with_details(details)
            }
            Some(result) => {
                let code = self.failure_code(&outcome, &body_text, &content);
                Verdict::failure(
                    record_id,
                    result.stage,
                    result.stage_name,
                    result.confidence,
                    result.message,
                    code,
                )
                .with_details(details)
            }
            None => {
                // An error-status response decides when the DOM stayed
                // silent.
                if let Some(code) = self.response_status_code(&outcome) {
                    return Verdict::failure(
                        record_id,
                        6,
                        "undecided",
                        0.8,
                        "submit endpoint returned an error status",
                        code,
                    )
                    .with_details(details);
                }
                // Page vocabulary (CAPTCHA, CSRF, duplicates, validation)
                // still decides when the DOM gave no structural signal.
                let combined = format!("{body_text}\n{content}");
                let code =
                    ErrorClassifier::classify_submission("", &combined, Some("form"));
                let code = match code {
                    ErrorCode::BotDetected
                    | ErrorCode::CsrfError
                    | ErrorCode::DuplicateSubmission
                    | ErrorCode::Mapping
                    | ErrorCode::ValidationFormat
                    | ErrorCode::WafChallenge => code,
                    _ => ErrorCode::SuccessDeterminationFailed,
                };
                Verdict::failure(
                    record_id,
                    6,
                    "undecided",
                    ErrorClassifier::MIN_CONFIDENCE,
                    "no clear success or error indicators after submit",
                    code,
                )
                .with_details(details)
            }
        }
    }

    async fn cancelled_verdict(&self, record_id: i64) -> Verdict {
        let _ = self.driver.close().await;
        Verdict::failure(
            record_id,
            6,
            "undecided",
            0.9,
            "submission cancelled by caller",
            ErrorCode::Timeout,
        )
    }

    async fn collect_snapshot(&self) -> Result<DomSnapshot, String> {
        let raw = self
            .driver
            .evaluate(scripts::COLLECT_SNAPSHOT, serde_json::json!({ "formBounds": null }))
            .await
            .map_err(|e| e.to_string())?;
        serde_json::from_value(raw).map_err(|e| format!("snapshot decode failed: {e}"))
    }

    /// Error-status responses observed during submission, worst first.
    fn response_status_code(&self, outcome: &SubmissionOutcome) -> Option<ErrorCode> {
        let mut worst: Option<ErrorCode> = None;
        for response in &outcome.responses {
            let code = match response.status {
                429 => Some(ErrorCode::RateLimit),
                403 => Some(ErrorCode::Access),
                500..=599 => Some(ErrorCode::ServerError),
                422 => Some(ErrorCode::FormValidationError),
                401 => Some(ErrorCode::Unauthorized),
                404 => Some(ErrorCode::NotFound),
                405 => Some(ErrorCode::MethodNotAllowed),
                _ => None,
            };
            if let Some(code) = code {
                if code == ErrorCode::RateLimit {
                    return Some(code);
                }
                worst.get_or_insert(code);
            }
        }
        worst
    }

    fn failure_code(
        &self,
        outcome: &SubmissionOutcome,
        body_text: &str,
        content: &str,
    ) -> ErrorCode {
        if let Some(code) = self.response_status_code(outcome) {
            return code;
        }
        let combined = format!("{body_text}\n{content}");
        let code = ErrorClassifier::classify_submission("", &combined, Some("form"));
        if code == ErrorCode::System {
            ErrorCode::FormValidationError
        } else {
            code
        }
    }

    fn mapping_details(
        &self,
        mapping: &FieldMapping,
        attempt_id: &Uuid,
        url: &str,
    ) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = mapping
            .entries
            .iter()
            .map(|(key, entry)| {
                serde_json::json!({
                    "field": key,
                    "selector": entry.selector,
                    "source": entry.source,
                    "score": entry.score,
                    "required": entry.required,
                })
            })
            .collect();
        serde_json::json!({
            "attemptId": attempt_id.to_string(),
            "url": url,
            "mappedFields": fields,
        })
    }

    fn outcome_details(
        &self,
        mapping: &FieldMapping,
        outcome: &SubmissionOutcome,
        attempt_id: &Uuid,
        url: &str,
    ) -> serde_json::Value {
        let mut details = self.mapping_details(mapping, attempt_id, url);
        if let Some(map) = details.as_object_mut() {
            map.insert(
                "statusCodes".into(),
                serde_json::json!(outcome
                    .responses
                    .iter()
                    .map(|r| r.status)
                    .collect::<Vec<u16>>()),
            );
            map.insert(
                "mutations".into(),
                serde_json::json!({
                    "total": outcome.mutations.total_mutations,
                    "significant": outcome.mutations.significant_changes,
                }),
            );
            map.insert(
                "confirmationFlow".into(),
                serde_json::json!(outcome.used_confirmation_flow),
            );
            if !outcome.fill_errors.is_empty() {
                warn!(count = outcome.fill_errors.len(), "fields failed to fill");
                map.insert("fillErrors".into(), serde_json::json!(outcome.fill_errors));
            }
        }
        details
    }
}
