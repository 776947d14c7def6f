//! Request-scoped data model: the client record being submitted, the field
//! mapping produced by the analyzer and the verdict returned to the
//! orchestrator.

use std::collections::BTreeMap;

use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use serde::{Deserialize, Serialize};

use crate::errors::classifier::{ErrorCategory, ErrorCode};

/// Contact/company fields of one client. All fields optional; the value
/// assigner decides what a missing field means per logical field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientFields {
    pub company_name: Option<String>,
    pub company_name_kana: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub gender: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name_kana: Option<String>,
    pub first_name_kana: Option<String>,
    pub last_name_hiragana: Option<String>,
    pub first_name_hiragana: Option<String>,
    pub email_1: Option<String>,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub phone_3: Option<String>,
    pub postal_code_1: Option<String>,
    pub postal_code_2: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub address_3: Option<String>,
    pub address_4: Option<String>,
    pub address_5: Option<String>,
    pub website_url: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Targeting {
    pub id: i64,
}

/// Client record as consumed from the orchestrator. Both the nested
/// `{client, targeting}` shape and a flattened object are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRecord {
    pub client: ClientFields,
    pub targeting: Targeting,
}

impl ClientRecord {
    /// Parses a record from JSON, accepting nested or flattened shapes, and
    /// decodes escape sequences inside the configured target fields.
    pub fn from_json(
        value: serde_json::Value,
        decode: &EscapeDecodeConfig,
    ) -> Result<Self, serde_json::Error> {
        let mut record: ClientRecord = if value.get("client").is_some() {
            serde_json::from_value(value)?
        } else {
            let fields: ClientFields = serde_json::from_value(value.clone())?;
            let targeting = value
                .get("targeting")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            ClientRecord {
                client: fields,
                targeting,
            }
        };
        record.decode_escapes(decode);
        Ok(record)
    }

    /// Decodes raw bytes into a record, trying UTF-8 first and then the
    /// common Japanese encodings.
    pub fn from_bytes(
        bytes: &[u8],
        decode: &EscapeDecodeConfig,
    ) -> Result<Self, serde_json::Error> {
        let text = decode_with_fallbacks(bytes);
        let value: serde_json::Value = serde_json::from_str(&text)?;
        Self::from_json(value, decode)
    }

    fn decode_escapes(&mut self, config: &EscapeDecodeConfig) {
        for field in &config.target_fields {
            let slot = match field.as_str() {
                "message" => &mut self.client.message,
                "subject" => &mut self.client.subject,
                _ => continue,
            };
            if let Some(text) = slot.take() {
                *slot = Some(decode_string_escapes(&text, config.max_depth));
            }
        }
    }
}

/// Which fields get escape decoding and how many nesting levels to unwrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeDecodeConfig {
    pub target_fields: Vec<String>,
    pub max_depth: usize,
}

impl Default for EscapeDecodeConfig {
    fn default() -> Self {
        Self {
            target_fields: vec!["message".into(), "subject".into()],
            max_depth: 1,
        }
    }
}

/// Unescapes `\n`, `\t`, `\r`, `\\`, `\"`, `\'` up to `depth` times.
pub fn decode_string_escapes(text: &str, depth: usize) -> String {
    let mut current = text.to_string();
    for _ in 0..depth.max(1) {
        let next = current
            .replace("\\\\", "\u{0}")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\r", "\r")
            .replace("\\\"", "\"")
            .replace("\\'", "'")
            .replace('\u{0}', "\\");
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// UTF-8 first, then the Japanese legacy encodings in order
/// (Shift_JIS, EUC-JP, ISO-2022-JP, CP932), finally Latin-1 which never
/// fails. The shift_jis decoder here is the WHATWG table, i.e. the
/// Windows-31J/CP932 superset with the NEC/IBM extension rows, so the one
/// attempt serves both the shift_jis and cp932 steps of the chain.
pub fn decode_with_fallbacks(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    for encoding in [
        // shift_jis + cp932: one table covers both.
        encoding_rs::SHIFT_JIS,
        encoding_rs::EUC_JP,
        encoding_rs::ISO_2022_JP,
    ] {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
    }
    // True ISO-8859-1: every byte maps to the code point of the same value,
    // including 0x80-0x9F, which Windows-1252 would remap to punctuation.
    bytes.iter().map(|&b| b as char).collect()
}

/// Action the engine should take instead of a plain text fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "arg")]
pub enum AutoAction {
    Check,
    Uncheck,
    SelectIndex(usize),
    SelectByAlgorithm,
    Fill,
    CopyFrom(String),
}

/// How an entry ended up in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Scored,
    Promoted,
    AutoHandled,
}

/// One mapped element. `element` is the snapshot index and doubles as the
/// element identity for duplicate prevention.
#[derive(Debug, Clone, Serialize)]
pub struct FieldMappingEntry {
    pub element: usize,
    pub selector: String,
    pub score: i32,
    pub tag_name: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub required: bool,
    pub visible: bool,
    pub enabled: bool,
    pub default_value: Option<serde_json::Value>,
    pub auto_action: Option<AutoAction>,
    pub selected_index: Option<usize>,
    pub source: MappingSource,
}

/// Mapping from logical field key (or `auto_*` key) to its element.
/// Invariant: no two entries share an element identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldMapping {
    pub entries: BTreeMap<String, FieldMappingEntry>,
}

impl FieldMapping {
    pub fn contains_element(&self, element: usize) -> bool {
        self.entries.values().any(|e| e.element == element)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: FieldMappingEntry) -> bool {
        if self.contains_element(entry.element) {
            return false;
        }
        self.entries.insert(key.into(), entry);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldMappingEntry> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldMappingEntry> {
        self.entries.get(key)
    }

    pub fn mapped_elements(&self) -> std::collections::HashSet<usize> {
        self.entries.values().map(|e| e.element).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final outcome of one submission attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub record_id: i64,
    pub success: bool,
    pub stage: u8,
    pub stage_name: String,
    pub confidence: f64,
    pub message: String,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u32>,
    pub details: serde_json::Value,
}

impl Verdict {
    pub fn success(record_id: i64, stage: u8, stage_name: &str, confidence: f64, message: impl Into<String>) -> Self {
        Self {
            record_id,
            success: true,
            stage,
            stage_name: stage_name.to_string(),
            confidence,
            message: message.into(),
            submitted_at: now_jst(),
            error_code: None,
            error_category: None,
            retryable: None,
            cooldown_seconds: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn failure(
        record_id: i64,
        stage: u8,
        stage_name: &str,
        confidence: f64,
        message: impl Into<String>,
        code: ErrorCode,
    ) -> Self {
        let detail = code.detail();
        Self {
            record_id,
            success: false,
            stage,
            stage_name: stage_name.to_string(),
            confidence,
            message: message.into(),
            submitted_at: now_jst(),
            error_code: Some(code),
            error_category: Some(detail.category),
            retryable: Some(detail.retryable),
            cooldown_seconds: if detail.cooldown_seconds > 0 {
                Some(detail.cooldown_seconds)
            } else {
                None
            },
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Submission timestamp with the +09:00 offset.
pub fn now_jst() -> String {
    Utc::now().with_timezone(&Tokyo).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_and_flat_records_parse_equally() {
        let decode = EscapeDecodeConfig::default();
        let nested = serde_json::json!({
            "client": {"last_name": "山田", "email_1": "taro@example.com"},
            "targeting": {"id": 42}
        });
        let flat = serde_json::json!({
            "last_name": "山田", "email_1": "taro@example.com", "targeting": {"id": 42}
        });
        let a = ClientRecord::from_json(nested, &decode).unwrap();
        let b = ClientRecord::from_json(flat, &decode).unwrap();
        assert_eq!(a.client.last_name.as_deref(), Some("山田"));
        assert_eq!(b.client.last_name.as_deref(), Some("山田"));
        assert_eq!(a.targeting.id, 42);
        assert_eq!(b.targeting.id, 42);
    }

    #[test]
    fn message_escapes_decoded() {
        let decode = EscapeDecodeConfig::default();
        let record = ClientRecord::from_json(
            serde_json::json!({"client": {"message": "一行目\\n二行目\\tタブ"}, "targeting": {"id": 1}}),
            &decode,
        )
        .unwrap();
        assert_eq!(record.client.message.as_deref(), Some("一行目\n二行目\tタブ"));
    }

    #[test]
    fn escape_decoding_respects_depth() {
        assert_eq!(decode_string_escapes("a\\\\nb", 1), "a\\nb");
        assert_eq!(decode_string_escapes("a\\\\nb", 2), "a\nb");
        assert_eq!(decode_string_escapes("plain", 3), "plain");
    }

    #[test]
    fn shift_jis_fallback() {
        // 「テスト」 in Shift_JIS.
        let bytes = [0x83u8, 0x65, 0x83, 0x58, 0x83, 0x67];
        let text = decode_with_fallbacks(&bytes);
        assert_eq!(text, "テスト");
    }

    #[test]
    fn cp932_extensions_decode_via_shift_jis_step() {
        // ① lives in the NEC extension row: CP932/Windows-31J, not plain
        // JIS X 0208. The shift_jis attempt must accept it.
        let bytes = [0x87u8, 0x40];
        let text = decode_with_fallbacks(&bytes);
        assert_eq!(text, "①");
    }

    #[test]
    fn latin1_fallback_preserves_c1_range() {
        // Invalid in UTF-8 and all the Japanese encodings, so this reaches
        // the final fallback. 0x93 is U+0093 in Latin-1; Windows-1252 would
        // turn it into a curly quote.
        let bytes = [0x93u8, 0x20];
        let text = decode_with_fallbacks(&bytes);
        assert_eq!(text, "\u{93} ");
    }

    #[test]
    fn latin1_fallback_never_fails() {
        let bytes = [0x22u8, 0xE9, 0x22];
        let text = decode_with_fallbacks(&bytes);
        assert_eq!(text, "\"é\"");
    }

    #[test]
    fn mapping_rejects_duplicate_element() {
        let mut mapping = FieldMapping::default();
        let entry = |element: usize| FieldMappingEntry {
            element,
            selector: "[id=\"x\"]".into(),
            score: 100,
            tag_name: "input".into(),
            input_type: "text".into(),
            name: "x".into(),
            id: "x".into(),
            required: false,
            visible: true,
            enabled: true,
            default_value: None,
            auto_action: None,
            selected_index: None,
            source: MappingSource::Scored,
        };
        assert!(mapping.insert("email", entry(0)));
        assert!(!mapping.insert("unified_full_name", entry(0)));
        assert!(mapping.insert("unified_full_name", entry(1)));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn verdict_serializes_with_jst_offset() {
        let v = Verdict::success(7, 1, "url_change", 0.9, "ok");
        assert!(v.submitted_at.contains("+09:00"));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["record_id"], 7);
        assert!(json.get("error_code").is_none());
    }
}
