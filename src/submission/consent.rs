//! Privacy consent checkbox handling around the submit button.
//!
//! Before any click the engine walks the checkbox candidates near the
//! button, scores them by consent vocabulary and proximity, and turns the
//! winners on. Checking retries through native check → label click →
//! in-page click. Outside the selected form only consent-looking boxes are
//! ever touched.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::ConsentConfig;
use crate::dom::{scripts, BoundingBox, ConsentCandidate};
use crate::driver::BrowserDriver;
use crate::errors::DriverError;

/// One scored candidate.
#[derive(Debug, Clone)]
pub struct ScoredConsent {
    pub candidate: ConsentCandidate,
    pub score: f64,
    pub distance: f64,
}

/// Consent vocabulary score with proximity weighting. Zero means "not a
/// consent box".
pub fn score_candidate(
    text: &str,
    distance: f64,
    config: &ConsentConfig,
) -> f64 {
    let lower = text.to_lowercase();
    if config.negative_keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
        return 0.0;
    }
    let mut score = 0.0;
    if config.must_keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
        score += 2.5;
    }
    let ctx_hits = config
        .context_keywords
        .iter()
        .filter(|k| lower.contains(&k.to_lowercase()))
        .count();
    score += (ctx_hits as f64 * 1.2).min(3.0);
    if ["privacy", "policy", "個人情報", "プライバシ"].iter().any(|k| lower.contains(k)) {
        score += 0.5;
    }
    if distance < config.proximity_px {
        let prox = (1.0 - distance / config.proximity_px.max(1.0)).max(0.0);
        score += prox * 2.0;
    }
    score
}

/// Vertical-first distance between the button and a candidate.
pub fn distance_to(button: Option<&BoundingBox>, candidate: Option<&BoundingBox>) -> f64 {
    match (button, candidate) {
        (Some(b), Some(c)) => {
            let dy = (b.y - c.y).abs();
            let dx = (b.x - c.x).abs();
            dy + (dx * 0.2).min(50.0)
        }
        _ => 99_999.0,
    }
}

/// Ensures the consent checkboxes near `button_box` are checked. Returns
/// true when at least one box was turned on (or would have been, in
/// log-only mode).
pub async fn ensure_near_button(
    driver: &dyn BrowserDriver,
    form_selector: Option<&str>,
    button_box: Option<BoundingBox>,
    config: &ConsentConfig,
) -> Result<bool, DriverError> {
    if !config.enabled {
        debug!("privacy consent handling disabled");
        return Ok(false);
    }

    let scope = if config.ensure_within_same_form {
        form_selector
    } else {
        None
    };
    let raw = driver
        .evaluate(
            scripts::SCAN_CONSENT,
            serde_json::json!({ "formSelector": scope }),
        )
        .await?;
    let candidates: Vec<ConsentCandidate> = serde_json::from_value(raw).unwrap_or_default();

    let mut scored: Vec<ScoredConsent> = candidates
        .into_iter()
        .take(config.max_scan_candidates)
        .filter_map(|candidate| {
            // Outside the selected form only consent-looking boxes qualify;
            // inside, proximity can carry a weak label.
            let distance = distance_to(button_box.as_ref(), candidate.bounding_box.as_ref());
            let score = score_candidate(&candidate.text, distance, config);
            if score <= 0.0 {
                return None;
            }
            if !candidate.in_form
                && !config
                    .must_keywords
                    .iter()
                    .any(|k| candidate.text.to_lowercase().contains(&k.to_lowercase()))
            {
                return None;
            }
            Some(ScoredConsent {
                candidate,
                score,
                distance,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut checked_any = false;
    let mut checked_count = 0usize;
    for item in scored {
        if item.score < config.min_score {
            continue;
        }
        if let (Some(button), Some(bbox)) = (button_box.as_ref(), item.candidate.bounding_box.as_ref())
        {
            // Boxes far below the button are some other section's consent.
            if bbox.y > button.y + config.vertical_offset_px {
                continue;
            }
        }
        if item.candidate.checked {
            continue;
        }
        if config.log_only_mode {
            info!(score = item.score, "consent checkbox candidate (log-only)");
            checked_any = true;
            checked_count += 1;
        } else if check_with_retry(driver, &item.candidate, config.max_attempts).await {
            info!(
                score = item.score,
                distance = item.distance,
                "privacy consent checkbox turned on"
            );
            checked_any = true;
            checked_count += 1;
        }
        if checked_count >= config.max_to_check {
            break;
        }
    }
    Ok(checked_any)
}

/// Native check → label click → in-page click, up to `max_attempts` rounds.
async fn check_with_retry(
    driver: &dyn BrowserDriver,
    candidate: &ConsentCandidate,
    max_attempts: usize,
) -> bool {
    for _ in 0..max_attempts.max(1) {
        if driver.check(&candidate.selector).await.is_ok()
            && driver.is_checked(&candidate.selector).await.unwrap_or(false)
        {
            return true;
        }
        if let Some(label) = &candidate.label_selector {
            if driver.click(label, Duration::from_secs(1)).await.is_ok()
                && driver.is_checked(&candidate.selector).await.unwrap_or(false)
            {
                return true;
            }
        }
        let args = serde_json::json!({ "selector": candidate.selector });
        if driver.evaluate(scripts::CLICK_ELEMENT, args).await.is_ok()
            && driver.is_checked(&candidate.selector).await.unwrap_or(false)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_text_scores_high() {
        let config = ConsentConfig::default();
        let score = score_candidate("個人情報の取り扱いに同意する", 50.0, &config);
        assert!(score >= config.min_score);
    }

    #[test]
    fn newsletter_box_scores_zero() {
        let config = ConsentConfig::default();
        assert_eq!(score_candidate("メルマガを購読する", 10.0, &config), 0.0);
    }

    #[test]
    fn proximity_raises_score() {
        let config = ConsentConfig::default();
        let near = score_candidate("利用規約に同意", 10.0, &config);
        let far = score_candidate("利用規約に同意", 590.0, &config);
        assert!(near > far);
    }

    #[test]
    fn distance_is_vertical_first() {
        let button = BoundingBox { x: 0.0, y: 500.0, width: 100.0, height: 40.0 };
        let same_row = BoundingBox { x: 400.0, y: 500.0, width: 20.0, height: 20.0 };
        let above = BoundingBox { x: 0.0, y: 460.0, width: 20.0, height: 20.0 };
        let d_row = distance_to(Some(&button), Some(&same_row));
        let d_above = distance_to(Some(&button), Some(&above));
        assert!(d_row <= 50.0);
        assert!((d_above - 40.0).abs() < 1.0);
    }
}
