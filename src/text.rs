//! Shared string utilities for scoring and context matching.
//!
//! Attribute and label comparison is always done over NFKC-normalized,
//! casefolded text so that full-width/half-width and case variants collapse
//! to one form. Token matching is boundary-aware for both ASCII and CJK
//! punctuation, because Japanese form labels rarely use spaces.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Soft cap for the normalization cache. The cache is cleared wholesale when
/// it grows past this, which keeps the hot path allocation-free without an
/// eviction list.
pub const NORM_CACHE_MAX_SIZE: usize = 4096;

static CJK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{3040}-\u{30ff}\u{3400}-\u{9fff}\u{ff66}-\u{ff9f}]").unwrap());

/// ASCII + full-width punctuation treated as word boundaries.
const BOUNDARY_CHARS: &str = r"_\-\./\\\s\u{3000}（）［］｛｝「」『』【】。、・：；！？”“’‘？／＼＜＞《》〈〉—－ー〜･，．｡";

/// Lightweight check for Japanese (CJK) content.
pub fn has_cjk(s: &str) -> bool {
    !s.is_empty() && CJK_RE.is_match(s)
}

/// NFKC compatibility decomposition plus casefold, cached.
///
/// The cache lives inside the scorer instance so its lifetime never outlives
/// a page; callers that only need one-off normalization can use
/// [`normalize_uncached`].
#[derive(Debug, Default)]
pub struct Normalizer {
    cache: HashMap<String, String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    pub fn normalize(&mut self, s: &str) -> String {
        if let Some(v) = self.cache.get(s) {
            return v.clone();
        }
        let v = normalize_uncached(s);
        if self.cache.len() > NORM_CACHE_MAX_SIZE {
            self.cache.clear();
        }
        self.cache.insert(s.to_string(), v.clone());
        v
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// NFKC + lowercase without caching.
pub fn normalize_uncached(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

/// Boundary-aware containment check usable for mixed Japanese/ASCII tokens.
///
/// A token matches when it is framed by the start/end of the text or by any
/// boundary character. Tokens containing CJK fall back to plain containment
/// because Japanese does not delimit words with spaces; the single character
/// 名 is too ambiguous for that fallback, while 姓 is allowed so that 姓名
/// composites still match.
pub fn contains_token_with_boundary(text: &str, token: &str) -> bool {
    if text.is_empty() || token.is_empty() {
        return false;
    }

    let pattern = format!(
        "(?i)(^|[{b}]){t}($|[{b}])",
        b = BOUNDARY_CHARS,
        t = regex::escape(token)
    );
    if let Ok(re) = Regex::new(&pattern) {
        if re.is_match(text) {
            return true;
        }
    }

    if has_cjk(token) {
        if token == "名" {
            return false;
        }
        if token == "姓" {
            return text.contains('姓');
        }
        return text.contains(token);
    }

    false
}
