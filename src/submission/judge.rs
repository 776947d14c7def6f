//! Multi-stage success judgment.
//!
//! Six stages run in order; the first definitive result wins. URL changes
//! are the strongest evidence, then success text, form disappearance, DOM
//! analysis against the pre-submit snapshot, and finally the error/failure
//! text sweeps. When nothing fires the caller reports a determination
//! failure.

use serde::Serialize;
use url::Url;

use crate::config::JudgeConfig;
use crate::submission::engine::SubmissionOutcome;

/// Outcome of one judgment stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub success: bool,
    pub stage: u8,
    pub stage_name: &'static str,
    pub confidence: f64,
    pub message: String,
    pub details: serde_json::Value,
}

const SUCCESS_URL_PATTERNS: &[&str] = &[
    "/thanks",
    "/thank-you",
    "/complete",
    "/completed",
    "/done",
    "/submitted",
    "/success",
    "/confirm",
    "/confirmation",
    "/kanryou",
    "/uketsuke",
    "/arigatou",
];

const FAILURE_URL_PATTERNS: &[&str] = &["/error", "/failed", "/failure", "/invalid"];

const SUCCESS_QUERY_TOKENS: &[&str] = &["success", "completed", "submitted"];
const FAILURE_QUERY_TOKENS: &[&str] = &["error", "failed", "invalid"];

const SUCCESS_TEXTS: &[&str] = &[
    "送信完了",
    "送信されました",
    "ありがとうございます",
    "受付完了",
    "thank",
    "success",
    "submitted",
    "受付いたしました",
    "送信が完了",
    "お問い合わせを受け付け",
];

const BOT_TEXTS: &[&str] = &["recaptcha", "g-recaptcha", "captcha", "私はロボットではありません"];

const ERROR_TEXTS: &[&str] = &[
    "未入力",
    "入力してください",
    "入力されていません",
    "必須項目",
    "選択してください",
    "形式が正しくありません",
    "正しく入力してください",
    "invalid format",
    "required field",
    "please enter",
];

const FAILURE_TEXTS: &[&str] = &[
    "送信できません",
    "送信に失敗",
    "エラーが発生",
    "failed to send",
    "could not be sent",
];

pub struct SuccessJudge {
    config: JudgeConfig,
}

impl SuccessJudge {
    pub fn new(config: JudgeConfig) -> Self {
        Self { config }
    }

    /// Runs the stages in order. `None` means no stage produced a
    /// definitive result.
    pub fn judge(
        &self,
        outcome: &SubmissionOutcome,
        body_text: &str,
        page_content: &str,
    ) -> Option<StageResult> {
        self.stage_url_change(outcome)
            .or_else(|| self.stage_success_text(body_text, page_content))
            .or_else(|| self.stage_form_disappearance(outcome))
            .or_else(|| self.stage_dom_analysis(outcome))
            .or_else(|| self.stage_error_patterns(body_text, page_content))
            .or_else(|| self.stage_failure_patterns(body_text))
    }

    fn stage_url_change(&self, outcome: &SubmissionOutcome) -> Option<StageResult> {
        let pre = &outcome.pre.url;
        let post = &outcome.post.url;
        if post.is_empty() || pre == post {
            return None;
        }
        let post_lower = post.to_lowercase();
        let path = Url::parse(post)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| post_lower.clone());

        if FAILURE_URL_PATTERNS.iter().any(|p| path.contains(p)) {
            return Some(StageResult {
                success: false,
                stage: 1,
                stage_name: "url_change",
                confidence: 0.9,
                message: "post-submit URL names an error page".into(),
                details: serde_json::json!({ "url": post }),
            });
        }
        if SUCCESS_URL_PATTERNS.iter().any(|p| path.contains(p)) {
            return Some(StageResult {
                success: true,
                stage: 1,
                stage_name: "url_change",
                confidence: 0.95,
                message: "post-submit URL names a completion page".into(),
                details: serde_json::json!({ "url": post }),
            });
        }

        let query = Url::parse(post)
            .ok()
            .and_then(|u| u.query().map(|q| q.to_lowercase()))
            .unwrap_or_default();
        if !query.is_empty() {
            if FAILURE_QUERY_TOKENS.iter().any(|t| query.contains(t)) {
                return Some(StageResult {
                    success: false,
                    stage: 1,
                    stage_name: "url_change",
                    confidence: 0.9,
                    message: "post-submit query flags an error".into(),
                    details: serde_json::json!({ "url": post }),
                });
            }
            if SUCCESS_QUERY_TOKENS.iter().any(|t| query.contains(t)) {
                return Some(StageResult {
                    success: true,
                    stage: 1,
                    stage_name: "url_change",
                    confidence: 0.9,
                    message: "post-submit query flags completion".into(),
                    details: serde_json::json!({ "url": post }),
                });
            }
        }
        None
    }

    fn stage_success_text(&self, body_text: &str, page_content: &str) -> Option<StageResult> {
        let body = body_text.to_lowercase();
        let content = page_content.to_lowercase();
        let success_hit = SUCCESS_TEXTS
            .iter()
            .find(|t| body.contains(&t.to_lowercase()))?;

        // CAPTCHA markup or explicit error text cancels a polite thank-you
        // phrase elsewhere on the page.
        if BOT_TEXTS.iter().any(|t| content.contains(t)) {
            return None;
        }
        if ERROR_TEXTS.iter().any(|t| body.contains(&t.to_lowercase())) {
            return None;
        }
        Some(StageResult {
            success: true,
            stage: 2,
            stage_name: "success_text",
            confidence: 0.85,
            message: "completion text present".into(),
            details: serde_json::json!({ "matched": success_hit }),
        })
    }

    fn stage_form_disappearance(&self, outcome: &SubmissionOutcome) -> Option<StageResult> {
        if !outcome.pre.submit_present {
            return None;
        }
        let gone = !outcome.post.submit_present;
        let disabled = outcome.post.submit_disabled;
        let forms_dropped = outcome.post.form_count < outcome.pre.form_count;
        if gone || disabled || forms_dropped {
            return Some(StageResult {
                success: true,
                stage: 3,
                stage_name: "form_disappearance",
                confidence: if gone { 0.85 } else { 0.8 },
                message: "form or submit button no longer available".into(),
                details: serde_json::json!({
                    "submitGone": gone,
                    "submitDisabled": disabled,
                    "formsBefore": outcome.pre.form_count,
                    "formsAfter": outcome.post.form_count,
                }),
            });
        }
        None
    }

    fn stage_dom_analysis(&self, outcome: &SubmissionOutcome) -> Option<StageResult> {
        if outcome.mutations.significant_changes >= self.config.mutation_threshold {
            return Some(StageResult {
                success: true,
                stage: 4,
                stage_name: "dom_analysis",
                confidence: 0.75,
                message: "significant DOM replacement after submit".into(),
                details: serde_json::json!({
                    "significant": outcome.mutations.significant_changes,
                    "total": outcome.mutations.total_mutations,
                }),
            });
        }

        // Half of the previously populated fields going empty reads as a
        // post-submit reset.
        let populated: Vec<_> = outcome
            .pre
            .field_values
            .iter()
            .filter(|f| f.value.as_deref().map(|v| !v.is_empty()).unwrap_or(false))
            .collect();
        if !populated.is_empty() {
            let cleared = populated
                .iter()
                .filter(|pre_field| {
                    outcome
                        .post
                        .field_values
                        .iter()
                        .find(|post_field| post_field.selector == pre_field.selector)
                        .map(|post_field| {
                            !post_field.present
                                || post_field.value.as_deref().unwrap_or("").is_empty()
                        })
                        .unwrap_or(true)
                })
                .count();
            let ratio = cleared as f64 / populated.len() as f64;
            if ratio >= self.config.cleared_field_ratio {
                return Some(StageResult {
                    success: true,
                    stage: 4,
                    stage_name: "dom_analysis",
                    confidence: 0.78,
                    message: "filled fields were cleared after submit".into(),
                    details: serde_json::json!({
                        "cleared": cleared,
                        "populated": populated.len(),
                    }),
                });
            }
        }
        None
    }

    fn stage_error_patterns(&self, body_text: &str, page_content: &str) -> Option<StageResult> {
        let body = body_text.to_lowercase();
        let hit = ERROR_TEXTS.iter().find(|t| body.contains(&t.to_lowercase()));
        let aria_invalid = page_content.contains("aria-invalid=\"true\"");
        match (hit, aria_invalid) {
            (Some(matched), _) => Some(StageResult {
                success: false,
                stage: 5,
                stage_name: "error_patterns",
                confidence: 0.75,
                message: "validation error text present".into(),
                details: serde_json::json!({ "matched": matched }),
            }),
            (None, true) => {
                let has_failure_word = FAILURE_TEXTS
                    .iter()
                    .chain(ERROR_TEXTS.iter())
                    .any(|t| body.contains(&t.to_lowercase()));
                has_failure_word.then(|| StageResult {
                    success: false,
                    stage: 5,
                    stage_name: "error_patterns",
                    confidence: 0.7,
                    message: "invalid field markup present".into(),
                    details: serde_json::json!({ "ariaInvalid": true }),
                })
            }
            _ => None,
        }
    }

    fn stage_failure_patterns(&self, body_text: &str) -> Option<StageResult> {
        let body = body_text.to_lowercase();
        let hit = FAILURE_TEXTS.iter().find(|t| body.contains(&t.to_lowercase()))?;
        Some(StageResult {
            success: false,
            stage: 6,
            stage_name: "failure_patterns",
            confidence: 0.65,
            message: "generic failure text present".into(),
            details: serde_json::json!({ "matched": hit }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::engine::{FieldValueState, MutationSummary, PageState};

    fn outcome(pre_url: &str, post_url: &str) -> SubmissionOutcome {
        SubmissionOutcome {
            pre: PageState {
                url: pre_url.into(),
                submit_present: true,
                form_count: 1,
                ..Default::default()
            },
            post: PageState {
                url: post_url.into(),
                submit_present: true,
                form_count: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn judge() -> SuccessJudge {
        SuccessJudge::new(JudgeConfig::default())
    }

    #[test]
    fn thanks_url_wins_stage_one() {
        let result = judge()
            .judge(
                &outcome("https://example.test/form", "https://example.test/thanks"),
                "",
                "",
            )
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 1);
        assert_eq!(result.stage_name, "url_change");
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn error_url_fails_stage_one() {
        let result = judge()
            .judge(
                &outcome("https://example.test/form", "https://example.test/error"),
                "",
                "",
            )
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.stage, 1);
    }

    #[test]
    fn query_parameter_signals() {
        let result = judge()
            .judge(
                &outcome(
                    "https://example.test/form",
                    "https://example.test/form?state=completed",
                ),
                "",
                "",
            )
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 1);
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn success_text_stage_two() {
        let result = judge()
            .judge(
                &outcome("https://example.test/form", "https://example.test/form"),
                "お問い合わせありがとうございます。",
                "<html></html>",
            )
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 2);
        assert_eq!(result.stage_name, "success_text");
        assert!((result.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn captcha_cancels_success_text() {
        let o = outcome("https://example.test/form", "https://example.test/form");
        let result = judge().judge(
            &o,
            "ありがとうございます",
            "<div class=\"g-recaptcha\"></div>",
        );
        // Stage 2 refuses; no other stage fires on this evidence.
        assert!(result.is_none());
    }

    #[test]
    fn form_disappearance_stage_three() {
        let mut o = outcome("https://example.test/form", "https://example.test/form");
        o.post.submit_present = false;
        let result = judge().judge(&o, "", "").unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 3);
    }

    #[test]
    fn mutation_threshold_stage_four() {
        let mut o = outcome("https://example.test/form", "https://example.test/form");
        o.mutations = MutationSummary {
            total_mutations: 40,
            significant_changes: 6,
        };
        let result = judge().judge(&o, "", "").unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 4);
    }

    #[test]
    fn cleared_fields_stage_four() {
        let mut o = outcome("https://example.test/form", "https://example.test/form");
        o.pre.field_values = vec![
            FieldValueState {
                selector: "[id=\"a\"]".into(),
                value: Some("x".into()),
                present: true,
            },
            FieldValueState {
                selector: "[id=\"b\"]".into(),
                value: Some("y".into()),
                present: true,
            },
        ];
        o.post.field_values = vec![
            FieldValueState {
                selector: "[id=\"a\"]".into(),
                value: Some("".into()),
                present: true,
            },
            FieldValueState {
                selector: "[id=\"b\"]".into(),
                value: Some("".into()),
                present: true,
            },
        ];
        let result = judge().judge(&o, "", "").unwrap();
        assert!(result.success);
        assert_eq!(result.stage, 4);
    }

    #[test]
    fn validation_error_stage_five() {
        let o = outcome("https://example.test/form", "https://example.test/form");
        let result = judge()
            .judge(&o, "メールアドレスを入力してください", "<html></html>")
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.stage, 5);
        assert_eq!(result.stage_name, "error_patterns");
    }

    #[test]
    fn generic_failure_stage_six() {
        let o = outcome("https://example.test/form", "https://example.test/form");
        let result = judge().judge(&o, "エラーが発生しました", "").unwrap();
        assert!(!result.success);
        assert_eq!(result.stage, 6);
    }

    #[test]
    fn no_evidence_is_undecided() {
        let o = outcome("https://example.test/form", "https://example.test/form");
        assert!(judge().judge(&o, "quiet page", "").is_none());
    }
}
