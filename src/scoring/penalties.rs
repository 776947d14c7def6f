//! Penalties for elements that are hidden, disabled or look like honeypots.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::ElementDescriptor;

/// Base penalty for invisible / trap elements.
pub const VISIBILITY_PENALTY: i32 = -200;

static OPACITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)opacity\s*:\s*([0-9]*\.?[0-9]+)").unwrap());

fn opacity_is_zero(style: &str) -> bool {
    OPACITY_RE
        .captures(style)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v == 0.0)
        .unwrap_or(false)
}

/// Computes the (negative) penalty sum and the reasons that applied.
pub fn calculate_penalties(el: &ElementDescriptor) -> (i32, Vec<&'static str>) {
    let mut penalty = 0;
    let mut reasons = Vec::new();

    if !el.visible {
        penalty += VISIBILITY_PENALTY;
        reasons.push("element_not_visible");
    }
    if !el.enabled {
        penalty += VISIBILITY_PENALTY / 2;
        reasons.push("element_not_enabled");
    }

    let style_nospace = el.style.replace(' ', "").to_lowercase();
    if style_nospace.contains("display:none")
        || style_nospace.contains("visibility:hidden")
        || style_nospace.contains("pointer-events:none")
        || opacity_is_zero(&el.style)
    {
        penalty += VISIBILITY_PENALTY;
        if style_nospace.contains("pointer-events:none") {
            reasons.push("pointer_events_none");
        }
        if opacity_is_zero(&el.style) {
            reasons.push("opacity_zero");
        }
        if style_nospace.contains("display:none") || style_nospace.contains("visibility:hidden") {
            reasons.push("style_hidden");
        }
    }

    if el.input_type.eq_ignore_ascii_case("hidden") {
        penalty += VISIBILITY_PENALTY;
        reasons.push("hidden_input_type");
    }

    if el.aria_hidden.eq_ignore_ascii_case("true") {
        penalty += VISIBILITY_PENALTY;
        reasons.push("aria_hidden_true");
    }

    if el.tabindex.trim() == "-1" {
        penalty += VISIBILITY_PENALTY / 2;
        reasons.push("tabindex_negative");
    }

    // position:absolute traps: 1px sized, clipped, or parked off-screen.
    if style_nospace.contains("position:absolute")
        && (style_nospace.contains("height:1px")
            || style_nospace.contains("width:1px")
            || style_nospace.contains("overflow:hidden")
            || style_nospace.contains("left:-9999px")
            || style_nospace.contains("top:-9999px"))
    {
        penalty += VISIBILITY_PENALTY;
        reasons.push("honeypot_style_detected");
    }

    (penalty, reasons)
}
