//! Attribute- and context-based element exclusion.
//!
//! A candidate element is dropped for a field when any of the field's
//! exclude tokens matches its attributes or its strong label contexts.
//! Matching is deliberately tiered: exact class tokens, `[-_]` framed
//! tokens, word boundaries, and substring inclusion only for long tokens or
//! the security-critical vocabulary, so that short generic words like
//! `name` never cause over-exclusion.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::FieldPattern;
use crate::context::TextContext;
use crate::dom::ElementDescriptor;
use crate::text::{contains_token_with_boundary, has_cjk};

/// Tokens that always justify substring exclusion on class names, however
/// short. These mark authentication, verification and trap fields that must
/// never be filled.
pub static CRITICAL_CLASS_EXCLUDE_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "auth",
        "login",
        "signin",
        "otp",
        "mfa",
        "totp",
        "password",
        "verify",
        "verification",
        "token",
        "captcha",
        "confirm",
        "confirmation",
        "confirm_email",
        "email_confirmation",
        "csrf",
        "session",
        "honeypot",
        "trap",
        "botfield",
        "no-print",
        "noprint",
        "hidden",
    ])
});

fn word_boundary_match(haystack: &str, token: &str) -> bool {
    let escaped = regex::escape(token);
    let word = Regex::new(&format!(r"\b{escaped}\b")).map(|re| re.is_match(haystack));
    let framed = Regex::new(&format!(r"[_-]{escaped}[_-]")).map(|re| re.is_match(haystack));
    word.unwrap_or(false)
        || framed.unwrap_or(false)
        || haystack.starts_with(&format!("{token}_"))
        || haystack.starts_with(&format!("{token}-"))
        || haystack.ends_with(&format!("_{token}"))
        || haystack.ends_with(&format!("-{token}"))
}

/// Attribute-only exclusion check.
pub fn is_excluded_element(el: &ElementDescriptor, pattern: &FieldPattern) -> bool {
    if pattern.exclude.is_empty() {
        return false;
    }

    let attrs: [(&str, String); 4] = [
        ("name", el.name.to_lowercase()),
        ("id", el.id.to_lowercase()),
        ("class", el.class_name.to_lowercase()),
        ("placeholder", el.placeholder.to_lowercase()),
    ];

    for (attr, value) in &attrs {
        if value.is_empty() {
            continue;
        }

        if *attr == "class" {
            let class_tokens: Vec<&str> = value.split_whitespace().collect();
            if class_tokens.is_empty() {
                continue;
            }
            for exclude in pattern.exclude {
                let lower = exclude.to_lowercase();
                // Exact class token.
                if class_tokens.iter().any(|t| *t == lower) {
                    return true;
                }
                // Framed / bounded token, only for critical or long words.
                let critical = CRITICAL_CLASS_EXCLUDE_TOKENS.contains(lower.as_str());
                if critical || lower.chars().count() >= 5 {
                    if class_tokens.iter().any(|t| word_boundary_match(t, &lower)) {
                        return true;
                    }
                }
                // Long-word substring.
                if lower.chars().count() >= 5 && class_tokens.iter().any(|t| t.contains(&lower)) {
                    return true;
                }
            }
            continue;
        }

        for exclude in pattern.exclude {
            let lower = exclude.to_lowercase();
            if lower.chars().count() <= 2 || has_cjk(&lower) {
                if contains_token_with_boundary(value, &lower) {
                    return true;
                }
                continue;
            }
            if word_boundary_match(value, &lower) {
                return true;
            }
            if lower.chars().count() >= 5 && value.contains(&lower) {
                return true;
            }
        }
    }

    false
}

/// Attribute exclusion plus strong-context exclusion. Only label-like
/// sources are consulted so that random nearby text cannot veto a mapping.
pub fn is_excluded_element_with_context(
    el: &ElementDescriptor,
    pattern: &FieldPattern,
    contexts: &[TextContext],
) -> bool {
    if pattern.exclude.is_empty() {
        return false;
    }
    if is_excluded_element(el, pattern) {
        return true;
    }

    for ctx in contexts {
        if !ctx.source.is_label_source() {
            continue;
        }
        let text = ctx.text.to_lowercase();
        if text.is_empty() {
            continue;
        }
        for exclude in pattern.exclude {
            let lower = exclude.to_lowercase();
            if lower.chars().count() <= 2 || has_cjk(&lower) {
                if contains_token_with_boundary(&text, &lower) {
                    return true;
                }
            } else if word_boundary_match(&text, &lower)
                || (lower.chars().count() >= 5 && text.contains(&lower))
            {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, FieldId};
    use crate::context::{ContextSource, Position};

    fn element(name: &str, id: &str, class: &str, placeholder: &str) -> ElementDescriptor {
        ElementDescriptor {
            tag_name: "input".into(),
            input_type: "text".into(),
            name: name.into(),
            id: id.into(),
            class_name: class.into(),
            placeholder: placeholder.into(),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    fn pattern(field: FieldId) -> &'static FieldPattern {
        Catalog::global().get(field).unwrap()
    }

    #[test]
    fn captcha_class_excluded_for_email() {
        let el = element("code", "", "captcha-input", "");
        assert!(is_excluded_element(&el, pattern(FieldId::Email)));
    }

    #[test]
    fn short_generic_class_token_does_not_substring_match() {
        // "name" appears inside "username-wrap" but short generic tokens only
        // match as exact class tokens.
        let el = element("", "", "username-wrap", "");
        assert!(!is_excluded_element(&el, pattern(FieldId::Subject)));
    }

    #[test]
    fn critical_token_matches_inside_framed_class() {
        let el = element("", "", "form-confirm_email-field", "");
        assert!(is_excluded_element(&el, pattern(FieldId::CompanyName)));
    }

    #[test]
    fn cjk_exclude_uses_boundary() {
        let el = element("", "", "", "電話番号を入力");
        assert!(is_excluded_element(&el, pattern(FieldId::Email)));
    }

    #[test]
    fn long_token_substring_matches_name() {
        let el = element("user_password_field", "", "", "");
        assert!(is_excluded_element(&el, pattern(FieldId::Email)));
    }

    #[test]
    fn context_exclusion_only_from_label_sources() {
        let el = element("field1", "", "", "");
        let strong = vec![TextContext {
            text: "FAXファックス番号".into(),
            source: ContextSource::DtLabel,
            confidence: 1.0,
            position: Position::Associated,
            distance: None,
        }];
        assert!(is_excluded_element_with_context(
            &el,
            pattern(FieldId::UnifiedPhone),
            &strong
        ));

        let weak = vec![TextContext {
            text: "FAXファックス番号".into(),
            source: ContextSource::Position(Position::Below),
            confidence: 0.5,
            position: Position::Below,
            distance: Some(40.0),
        }];
        assert!(!is_excluded_element_with_context(
            &el,
            pattern(FieldId::UnifiedPhone),
            &weak
        ));
    }
}
