//! Submit/confirm button selection.
//!
//! Candidates come from the fixed scan script; this side filters out
//! cancel/back/reset/search buttons, ranks the rest by keyword tier and
//! classifies the winner as a one-step submit or a confirmation-page hop.

use crate::config::ButtonsConfig;
use crate::dom::ButtonCandidate;

/// What clicking the selected button is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    /// Sends the form directly.
    Submit,
    /// Moves to a confirmation page that carries the real submit.
    Confirmation,
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// True for buttons that must never be clicked (cancel, back, reset,
/// search, login).
pub fn is_excluded_button(text: &str, config: &ButtonsConfig) -> bool {
    !text.trim().is_empty() && contains_any(text, &config.exclude)
}

/// Rank a candidate: lower is better, `None` means unusable.
fn rank(candidate: &ButtonCandidate, config: &ButtonsConfig, final_page: bool) -> Option<u8> {
    if !candidate.visible {
        return None;
    }
    if is_excluded_button(&candidate.text, config) {
        return None;
    }
    let text = &candidate.text;
    if final_page {
        if contains_any(text, &config.final_submit) {
            return Some(0);
        }
        if contains_any(text, &config.primary) {
            return Some(1);
        }
        if candidate.input_type.eq_ignore_ascii_case("submit") {
            return Some(2);
        }
        return None;
    }
    if contains_any(text, &config.primary) {
        return Some(0);
    }
    if contains_any(text, &config.secondary) {
        return Some(1);
    }
    if contains_any(text, &config.confirmation) {
        return Some(2);
    }
    if candidate.input_type.eq_ignore_ascii_case("submit") {
        return Some(3);
    }
    None
}

/// Best button for the initial page.
pub fn select_button<'a>(
    candidates: &'a [ButtonCandidate],
    config: &ButtonsConfig,
) -> Option<&'a ButtonCandidate> {
    candidates
        .iter()
        .filter_map(|c| rank(c, config, false).map(|r| (r, c)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, c)| c)
}

/// Final submit button on a confirmation page, matched against the wider
/// final-keyword tier.
pub fn select_final_button<'a>(
    candidates: &'a [ButtonCandidate],
    config: &ButtonsConfig,
) -> Option<&'a ButtonCandidate> {
    candidates
        .iter()
        .filter_map(|c| rank(c, config, true).map(|r| (r, c)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, c)| c)
}

/// Classifies the aggregated button text. Confirmation keywords only win
/// when no primary submit keyword is present ("確認して送信" is a submit).
pub fn classify_button(text: &str, config: &ButtonsConfig) -> ButtonKind {
    if contains_any(text, &config.primary) {
        return ButtonKind::Submit;
    }
    if contains_any(text, &config.confirmation) {
        return ButtonKind::Confirmation;
    }
    ButtonKind::Submit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, ty: &str) -> ButtonCandidate {
        ButtonCandidate {
            selector: format!("button:has-text(\"{text}\")"),
            tag_name: "button".into(),
            input_type: ty.into(),
            text: text.into(),
            visible: true,
            enabled: true,
            bounding_box: None,
        }
    }

    #[test]
    fn primary_keyword_beats_type_submit() {
        let config = ButtonsConfig::default();
        let candidates = vec![candidate("詳細", "submit"), candidate("送信", "button")];
        let best = select_button(&candidates, &config).unwrap();
        assert_eq!(best.text, "送信");
    }

    #[test]
    fn cancel_and_search_buttons_excluded() {
        let config = ButtonsConfig::default();
        let candidates = vec![
            candidate("キャンセル", "button"),
            candidate("検索", "submit"),
            candidate("戻る", "button"),
        ];
        assert!(select_button(&candidates, &config).is_none());
    }

    #[test]
    fn invisible_candidates_skipped() {
        let config = ButtonsConfig::default();
        let mut hidden = candidate("送信", "submit");
        hidden.visible = false;
        assert!(select_button(&[hidden], &config).is_none());
    }

    #[test]
    fn classification() {
        let config = ButtonsConfig::default();
        assert_eq!(classify_button("送信", &config), ButtonKind::Submit);
        assert_eq!(classify_button("確認画面へ", &config), ButtonKind::Confirmation);
        assert_eq!(classify_button("入力内容を確認", &config), ButtonKind::Confirmation);
        // 確認して送信 sends directly.
        assert_eq!(classify_button("確認して送信", &config), ButtonKind::Submit);
    }

    #[test]
    fn final_page_prefers_final_tier() {
        let config = ButtonsConfig::default();
        let candidates = vec![candidate("戻る", "button"), candidate("この内容で送信", "submit")];
        let best = select_final_button(&candidates, &config).unwrap();
        assert_eq!(best.text, "この内容で送信");
    }
}
