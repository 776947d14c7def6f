//! Failure classification.
//!
//! Maps raw error messages, page text and HTTP status codes to a closed set
//! of error codes with category, retryability and cooldown hints. HTTP
//! status takes priority over text patterns; WAF signatures refine 403s;
//! page-text vocabularies recognize required-field, format, CAPTCHA, CSRF
//! and duplicate-submission failures.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use strum::{Display, EnumString};

/// Closed set of failure codes reported in verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    External,
    Timeout,
    DnsError,
    TlsError,
    ConnectionReset,
    PageClosed,
    ElementNotInteractable,
    BlockedByClient,
    RateLimit,
    ServerError,
    Access,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    WafChallenge,
    BotDetected,
    CsrfError,
    DuplicateSubmission,
    Mapping,
    ValidationFormat,
    FormValidationError,
    SubmitButtonNotFound,
    SubmitButtonSelectorMissing,
    SubmitButtonError,
    ContentAnalysisFailed,
    SuccessDeterminationFailed,
    ElementNotFound,
    ElementExternal,
    InputTypeMismatch,
    InputExternal,
    Instruction,
    System,
    NoMessageArea,
    ProhibitionDetected,
}

/// Coarse category attached alongside the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Http,
    Network,
    Browser,
    Waf,
    Security,
    Validation,
    Business,
    FormStructure,
    General,
}

/// Category, retryability and cooldown bundle for one code.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub retryable: bool,
    pub cooldown_seconds: u32,
    pub confidence: f64,
}

impl ErrorCode {
    pub fn category(self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            RateLimit | ServerError | Access | Unauthorized | NotFound | MethodNotAllowed => {
                ErrorCategory::Http
            }
            DnsError | TlsError | ConnectionReset | BlockedByClient | Timeout => {
                ErrorCategory::Network
            }
            PageClosed => ErrorCategory::Browser,
            WafChallenge | BotDetected => ErrorCategory::Waf,
            CsrfError => ErrorCategory::Security,
            Mapping | ValidationFormat | FormValidationError => ErrorCategory::Validation,
            DuplicateSubmission | ProhibitionDetected => ErrorCategory::Business,
            NoMessageArea => ErrorCategory::FormStructure,
            _ => ErrorCategory::General,
        }
    }

    pub fn is_retryable(self) -> bool {
        use ErrorCode::*;
        matches!(
            self,
            Timeout
                | DnsError
                | TlsError
                | ConnectionReset
                | BlockedByClient
                | RateLimit
                | ServerError
                | Access
                | ElementExternal
                | InputExternal
                | System
        )
    }

    pub fn cooldown_seconds(self) -> u32 {
        use ErrorCode::*;
        match self {
            RateLimit | WafChallenge => 300,
            ServerError | Access => 60,
            _ => 0,
        }
    }

    /// Full detail bundle with a neutral confidence; the classifier refines
    /// confidence from the actual evidence.
    pub fn detail(self) -> ErrorDetail {
        ErrorDetail {
            code: self,
            category: self.category(),
            retryable: self.is_retryable(),
            cooldown_seconds: self.cooldown_seconds(),
            confidence: ErrorClassifier::MIN_CONFIDENCE,
        }
    }
}

macro_rules! regexes {
    ($($pat:expr),+ $(,)?) => {
        vec![$(Regex::new($pat).unwrap()),+]
    };
}

static NETWORK_TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)timeout|timed\s*out|navigation\s*timeout|Timeout\s*\d+ms\s*exceeded").unwrap()
});
static DNS_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ERR_NAME_NOT_RESOLVED|ENOTFOUND|DNS\s*lookup\s*failed").unwrap()
});
static TLS_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSSL\b|\bTLS\b|CERT|certificate\s*verify\s*failed").unwrap()
});
static CONN_RESET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ECONNRESET|Connection\s*reset|net::ERR_CONNECTION_RESET").unwrap()
});
static PAGE_CLOSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Target\s*closed|Execution\s*context\s*was\s*destroyed|frame\s*was\s*detached")
        .unwrap()
});
static NOT_INTERACTABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)not\s*visible|zero\s*size|not\s*interactable|is\s*disabled").unwrap()
});
static BLOCKED_BY_CLIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ERR_BLOCKED_BY_CLIENT").unwrap());
static RATE_LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rate\s*limit|too\s*many\s*requests|\b429\b").unwrap());
static HTTP_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b403\b|forbidden|アクセス拒否|権限がありません").unwrap());

/// WAF vendor signatures consulted for 403s and page content.
static WAF_SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)cloudflare|just\s*a\s*moment|checking\s*your\s*browser|ddos\s*protection",
        r"(?i)akamai|Reference\s*#\d+\.\w+\.\w+",
        r"(?i)incapsula|imperva",
        r"(?i)perimeterx|px-",
        r"(?i)are\s*you\s*a\s*human|human\s*verification|verify\s*you\s*are\s*human",
    ]
});

static BOT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:recaptcha|cloudflare|bot)\b").unwrap());

static REQUIRED_TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"未入力",
        r"入力\s*してください",
        r"入力されていません",
        r"必須\s*項目",
        r"必須です",
        r"選択\s*してください",
        r"チェック\s*してください",
        r"空白|空欄",
        r"(?i)\bfield\s+is\s+required\b",
        r"(?i)\brequired\s+field\b",
        r"(?i)\bplease\s+(enter|select|fill)\b",
        r"(?i)\b(cannot\s+be\s+blank|must\s+not\s+be\s+empty)\b",
    ]
});

static FORMAT_TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"形式が正しくありません",
        r"正しく入力してください",
        r"(?i)invalid\s+format",
        r"(?i)invalid\s+(email|phone|url)",
        r"メール.*(形式|正しく|無効)",
        r"(?i)phone.*(invalid|format)",
    ]
});

static CAPTCHA_TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)captcha",
        r"(?i)recaptcha",
        r"私はロボットではありません",
        r"(?i)\brc-anchor(?:-[a-z0-9_-]+)?\b",
        r"(?i)\bg-recaptcha\b",
        r"(?i)grecaptcha",
        r"(?i)recaptcha/api2/anchor",
        r"(?i)recaptcha/api\.js",
        r"(?i)g-recaptcha-response",
    ]
});

/// CSRF/token vocabulary only counts when an error word is nearby; the word
/// `token` alone is far too common.
static CSRF_NEAR_ERROR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)(csrf|xsrf|forgery|authenticity)[^\n<]{0,80}(invalid|mismatch|expired|missing|required|failed|error)",
        r"(csrf|ワンタイム(?:キー|トークン)|トークン)[^\n<]{0,80}(無効|不一致|期限|切れ|エラー)",
    ]
});

static DUPLICATE_TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![r"重複", r"既に(送信|登録)", r"(?i)duplicate", r"(?i)already\s+submitted"]
});

static SUBMIT_BUTTON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)submit\s*button[\s\w]*not\s*found",
        r"(?i)no\s*submit\s*button",
        r"(?i)submit[\s\w]*selector[\s\w]*not[\s\w]*provided",
    ]
});

static ELEMENT_NOT_FOUND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)element[\s\w]*not[\s\w]*found",
        r"(?i)selector[\s\w]*not[\s\w]*found",
        r"(?i)element[\s\w]*timeout",
        r"(?i)locator[\s\w]*not[\s\w]*found",
    ]
});

static INPUT_MISMATCH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    regexes![
        r"(?i)cannot\s*type[\s\w]*into\s*input",
        r"(?i)input[\s\w]*type[\s\w]*mismatch",
        r"(?i)cannot[\s\w]*fill[\s\w]*field",
        r"(?i)error[\s\w]*filling[\s\w]*field",
    ]
});

/// Evidence bundle handed to the classifier.
#[derive(Debug, Clone, Default)]
pub struct ErrorEvidence<'a> {
    pub error_message: &'a str,
    pub page_content: &'a str,
    pub http_status: Option<u16>,
    pub is_bot_detected: bool,
    pub is_timeout: bool,
}

/// Stateless classifier over the pattern tables.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Hard floor for the confidence heuristic.
    pub const MIN_CONFIDENCE: f64 = 0.2;

    /// Classifies raw evidence into an error code. HTTP status wins, then
    /// message patterns, then page content.
    pub fn classify(evidence: &ErrorEvidence) -> ErrorCode {
        let msg = evidence.error_message.to_lowercase();
        let content = evidence.page_content.to_lowercase();

        if evidence.is_bot_detected || BOT_PATTERN.is_match(&msg) {
            return ErrorCode::BotDetected;
        }
        if evidence.is_timeout || NETWORK_TIMEOUT.is_match(&msg) {
            return ErrorCode::Timeout;
        }

        if let Some(status) = evidence.http_status {
            if let Some(code) = Self::classify_http_status(status, &content) {
                return code;
            }
        }

        if let Some(code) = Self::classify_network(&msg, &content) {
            return code;
        }

        if let Some(code) = Self::classify_page_content(&content) {
            return code;
        }

        Self::classify_fallback(&msg)
    }

    /// Classifies a form-submission failure: page validation text first,
    /// then network/WAF, then message fallbacks.
    pub fn classify_submission(
        error_message: &str,
        page_content: &str,
        submit_selector: Option<&str>,
    ) -> ErrorCode {
        let msg = error_message.to_lowercase();
        let content = page_content.to_lowercase();

        if SUBMIT_BUTTON_PATTERNS.iter().any(|p| p.is_match(&msg)) {
            return ErrorCode::SubmitButtonNotFound;
        }

        for p in REQUIRED_TEXT_PATTERNS.iter() {
            if p.is_match(&content) || p.is_match(&msg) {
                return ErrorCode::Mapping;
            }
        }
        for p in FORMAT_TEXT_PATTERNS.iter() {
            if p.is_match(&content) || p.is_match(&msg) {
                return ErrorCode::ValidationFormat;
            }
        }

        if let Some(code) = Self::classify_network(&msg, &content) {
            return code;
        }
        if let Some(code) = Self::classify_page_content(&content) {
            return code;
        }

        match submit_selector {
            None | Some("") => {
                if msg.contains("not found") || msg.contains("no submit button") {
                    ErrorCode::SubmitButtonNotFound
                } else {
                    ErrorCode::SubmitButtonSelectorMissing
                }
            }
            Some(_) => Self::classify(&ErrorEvidence {
                error_message,
                page_content,
                ..Default::default()
            }),
        }
    }

    /// True when the page carries CAPTCHA/reCAPTCHA markup or text. Checked
    /// right after navigation; such pages are never worth filling.
    pub fn is_bot_protected(page_content: &str) -> bool {
        let content = page_content.to_lowercase();
        CAPTCHA_TEXT_PATTERNS.iter().any(|p| p.is_match(&content))
    }

    /// Classifies a field-input failure.
    pub fn classify_input(error_message: &str) -> ErrorCode {
        let msg = error_message.to_lowercase();
        if INPUT_MISMATCH_PATTERNS.iter().any(|p| p.is_match(&msg)) {
            return ErrorCode::InputTypeMismatch;
        }
        if ELEMENT_NOT_FOUND_PATTERNS.iter().any(|p| p.is_match(&msg)) || msg.contains("not found")
        {
            return ErrorCode::ElementNotFound;
        }
        Self::classify_fallback(&msg)
    }

    /// Full detail bundle with the heuristic confidence.
    pub fn classify_detail(
        error_message: &str,
        page_content: &str,
        http_status: Option<u16>,
    ) -> ErrorDetail {
        let code = if http_status.is_some() {
            Self::classify(&ErrorEvidence {
                error_message,
                page_content,
                http_status,
                ..Default::default()
            })
        } else {
            Self::classify_submission(error_message, page_content, Some("form"))
        };
        let mut detail = code.detail();
        detail.confidence = Self::confidence(code, error_message, page_content);
        detail
    }

    fn classify_http_status(status: u16, content: &str) -> Option<ErrorCode> {
        match status {
            429 => Some(ErrorCode::RateLimit),
            403 => {
                if WAF_SIGNATURES.iter().any(|p| p.is_match(content)) {
                    Some(ErrorCode::WafChallenge)
                } else {
                    Some(ErrorCode::Access)
                }
            }
            500 | 502 | 503 | 504 => Some(ErrorCode::ServerError),
            422 => Some(ErrorCode::FormValidationError),
            404 => Some(ErrorCode::NotFound),
            401 => Some(ErrorCode::Unauthorized),
            405 => Some(ErrorCode::MethodNotAllowed),
            _ => None,
        }
    }

    fn classify_network(msg: &str, content: &str) -> Option<ErrorCode> {
        if DNS_ERROR.is_match(msg) {
            return Some(ErrorCode::DnsError);
        }
        if TLS_ERROR.is_match(msg) {
            return Some(ErrorCode::TlsError);
        }
        if CONN_RESET.is_match(msg) {
            return Some(ErrorCode::ConnectionReset);
        }
        if PAGE_CLOSED.is_match(msg) {
            return Some(ErrorCode::PageClosed);
        }
        if NOT_INTERACTABLE.is_match(msg) {
            return Some(ErrorCode::ElementNotInteractable);
        }
        if BLOCKED_BY_CLIENT.is_match(msg) {
            return Some(ErrorCode::BlockedByClient);
        }
        if RATE_LIMIT.is_match(msg) {
            return Some(ErrorCode::RateLimit);
        }
        if HTTP_FORBIDDEN.is_match(msg) {
            if WAF_SIGNATURES.iter().any(|p| p.is_match(content)) {
                return Some(ErrorCode::WafChallenge);
            }
            return Some(ErrorCode::Access);
        }
        if WAF_SIGNATURES.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::WafChallenge);
        }
        None
    }

    fn classify_page_content(content: &str) -> Option<ErrorCode> {
        if content.is_empty() {
            return None;
        }
        if REQUIRED_TEXT_PATTERNS.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::Mapping);
        }
        if FORMAT_TEXT_PATTERNS.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::ValidationFormat);
        }
        if CAPTCHA_TEXT_PATTERNS.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::BotDetected);
        }
        if CSRF_NEAR_ERROR_PATTERNS.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::CsrfError);
        }
        if DUPLICATE_TEXT_PATTERNS.iter().any(|p| p.is_match(content)) {
            return Some(ErrorCode::DuplicateSubmission);
        }
        if content.contains("aria-invalid=\"true\"") {
            return Some(ErrorCode::FormValidationError);
        }
        None
    }

    fn classify_fallback(msg: &str) -> ErrorCode {
        if ELEMENT_NOT_FOUND_PATTERNS.iter().any(|p| p.is_match(msg)) {
            return ErrorCode::ElementExternal;
        }
        if msg.contains("element") || msg.contains("selector") || msg.contains("locator") {
            return ErrorCode::ElementExternal;
        }
        if msg.contains("input") {
            return ErrorCode::InputExternal;
        }
        if msg.contains("access") {
            return ErrorCode::Access;
        }
        if msg.contains("parse") || msg.contains("decode") || msg.contains("invalid") {
            if msg.contains("instruction") || msg.contains("json") {
                return ErrorCode::Instruction;
            }
            return ErrorCode::System;
        }
        ErrorCode::System
    }

    /// Confidence heuristic in [MIN_CONFIDENCE, 1.0]; strong explicit
    /// evidence earns most of the score.
    fn confidence(code: ErrorCode, error_message: &str, page_content: &str) -> f64 {
        let msg = error_message.to_lowercase();
        let content = page_content.to_lowercase();
        let mut score: f64 = 0.0;

        let strong = match code {
            ErrorCode::DnsError => DNS_ERROR.is_match(&msg),
            ErrorCode::TlsError => TLS_ERROR.is_match(&msg),
            ErrorCode::ConnectionReset => CONN_RESET.is_match(&msg),
            ErrorCode::RateLimit => RATE_LIMIT.is_match(&msg),
            ErrorCode::WafChallenge => WAF_SIGNATURES.iter().any(|p| p.is_match(&content)),
            ErrorCode::CsrfError => CSRF_NEAR_ERROR_PATTERNS
                .iter()
                .any(|p| p.is_match(&msg) || p.is_match(&content)),
            ErrorCode::BotDetected => CAPTCHA_TEXT_PATTERNS
                .iter()
                .any(|p| p.is_match(&msg) || p.is_match(&content)),
            ErrorCode::Mapping | ErrorCode::ValidationFormat => REQUIRED_TEXT_PATTERNS
                .iter()
                .chain(FORMAT_TEXT_PATTERNS.iter())
                .any(|p| p.is_match(&msg) || p.is_match(&content)),
            _ => false,
        };
        if strong {
            score += 0.6;
        }
        if ["http", "status", "error", "forbidden", "unauthorized"]
            .iter()
            .any(|w| msg.contains(w))
        {
            score += 0.1;
        }
        if CAPTCHA_TEXT_PATTERNS.iter().any(|p| p.is_match(&content)) {
            score += 0.1;
        }
        if matches!(code, ErrorCode::System | ErrorCode::ContentAnalysisFailed) {
            score -= 0.2;
        }
        if msg.is_empty() && content.is_empty() {
            score -= 0.2;
        }
        score.clamp(Self::MIN_CONFIDENCE, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_takes_priority() {
        let ev = ErrorEvidence {
            error_message: "request failed",
            http_status: Some(429),
            ..Default::default()
        };
        assert_eq!(ErrorClassifier::classify(&ev), ErrorCode::RateLimit);

        let ev = ErrorEvidence {
            error_message: "",
            http_status: Some(422),
            ..Default::default()
        };
        assert_eq!(ErrorClassifier::classify(&ev), ErrorCode::FormValidationError);
    }

    #[test]
    fn forbidden_with_waf_signature_is_waf_challenge() {
        let ev = ErrorEvidence {
            error_message: "",
            page_content: "Checking your browser before accessing - cloudflare",
            http_status: Some(403),
            ..Default::default()
        };
        assert_eq!(ErrorClassifier::classify(&ev), ErrorCode::WafChallenge);

        let ev = ErrorEvidence {
            error_message: "",
            page_content: "forbidden",
            http_status: Some(403),
            ..Default::default()
        };
        assert_eq!(ErrorClassifier::classify(&ev), ErrorCode::Access);
    }

    #[test]
    fn recaptcha_dom_tokens_mean_bot_detected() {
        let code = ErrorClassifier::classify_submission(
            "",
            "<div class=\"g-recaptcha\" data-sitekey=\"x\"></div>",
            Some("#submit"),
        );
        assert_eq!(code, ErrorCode::BotDetected);
    }

    #[test]
    fn required_text_is_mapping() {
        let code = ErrorClassifier::classify_submission(
            "",
            "メールアドレスを入力してください",
            Some("#submit"),
        );
        assert_eq!(code, ErrorCode::Mapping);
        assert_eq!(code.category(), ErrorCategory::Validation);
        assert!(!code.is_retryable());
    }

    #[test]
    fn csrf_needs_error_word_nearby() {
        let hit = ErrorClassifier::classify_submission("", "CSRFトークンが無効です", Some("#s"));
        assert_eq!(hit, ErrorCode::CsrfError);
        // A bare token field in the page must not classify as CSRF.
        let miss = ErrorClassifier::classify_submission("", "token field present", Some("#s"));
        assert_ne!(miss, ErrorCode::CsrfError);
    }

    #[test]
    fn duplicate_submission_detected() {
        let code = ErrorClassifier::classify_submission("", "既に送信されています", Some("#s"));
        assert_eq!(code, ErrorCode::DuplicateSubmission);
        assert_eq!(code.category(), ErrorCategory::Business);
    }

    #[test]
    fn retryability_and_cooldowns() {
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::RateLimit.is_retryable());
        assert!(!ErrorCode::WafChallenge.is_retryable());
        assert!(!ErrorCode::BotDetected.is_retryable());
        assert_eq!(ErrorCode::RateLimit.cooldown_seconds(), 300);
        assert_eq!(ErrorCode::WafChallenge.cooldown_seconds(), 300);
        assert_eq!(ErrorCode::ServerError.cooldown_seconds(), 60);
        assert_eq!(ErrorCode::Mapping.cooldown_seconds(), 0);
    }

    #[test]
    fn confidence_has_floor() {
        let detail = ErrorClassifier::classify_detail("", "", None);
        assert!(detail.confidence >= ErrorClassifier::MIN_CONFIDENCE);
        let strong = ErrorClassifier::classify_detail("net::ERR_NAME_NOT_RESOLVED", "", None);
        assert!(strong.confidence > detail.confidence);
    }

    #[test]
    fn code_serializes_screaming_snake() {
        assert_eq!(ErrorCode::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(
            serde_json::to_value(ErrorCode::BotDetected).unwrap(),
            serde_json::json!("BOT_DETECTED")
        );
        assert_eq!(
            serde_json::to_value(ErrorCategory::Waf).unwrap(),
            serde_json::json!("WAF")
        );
    }
}
