//! Nearby-text context extraction.
//!
//! For every form element this module produces a ranked list of
//! [`TextContext`] items gathered from associated labels, dl/dt/dd and
//! table/th/td layouts, ul/li headings, parents, siblings and a
//! position-based sweep of nearby text nodes. The heavy DOM traversal was
//! already done by the snapshot script; this side owns prioritization,
//! noise filtering, confidence scoring and the strong-label short-circuit
//! that skips the position sweep entirely.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::dom::{DomSnapshot, ElementDescriptor};

/// Relative placement of a context with respect to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Associated,
    Parent,
    Ancestor,
    TableHeader,
    Before,
    After,
    Above,
    Below,
    Left,
    Right,
    Nearby,
}

/// Where a context text came from. Determines its trust level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    LabelFor,
    LabelParent,
    AriaLabelledby,
    DtLabel,
    DtLabelIndex,
    ThLabel,
    ThLabelIndex,
    UlLiLabel,
    ParentElement,
    FieldsetLegend,
    PrevSibling(String),
    NextSibling(String),
    Position(Position),
}

impl ContextSource {
    /// Sources whose text reflects the designer's explicit labeling intent.
    /// These unlock the high context score band in the scorer and are the
    /// only ones consulted by required-marker detection.
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            Self::LabelFor
                | Self::AriaLabelledby
                | Self::DtLabel
                | Self::DtLabelIndex
                | Self::ThLabel
                | Self::ThLabelIndex
                | Self::UlLiLabel
        )
    }

    /// Strong sources plus the parent `<label>`; the set consulted by
    /// context-aware exclusion.
    pub fn is_label_source(&self) -> bool {
        self.is_strong() || matches!(self, Self::LabelParent)
    }

    /// Layout-derived sources that must not outvote explicit labels.
    pub fn is_position_like(&self) -> bool {
        matches!(self, Self::Position(_) | Self::ParentElement)
    }

    pub fn label(&self) -> String {
        match self {
            Self::LabelFor => "label_for".into(),
            Self::LabelParent => "label_parent".into(),
            Self::AriaLabelledby => "aria_labelledby".into(),
            Self::DtLabel => "dt_label".into(),
            Self::DtLabelIndex => "dt_label_index".into(),
            Self::ThLabel => "th_label".into(),
            Self::ThLabelIndex => "th_label_index".into(),
            Self::UlLiLabel => "ul_li_label".into(),
            Self::ParentElement => "parent_element".into(),
            Self::FieldsetLegend => "fieldset_legend".into(),
            Self::PrevSibling(tag) => format!("prev_sibling_{tag}"),
            Self::NextSibling(tag) => format!("next_sibling_{tag}"),
            Self::Position(p) => format!("position_{}", format!("{p:?}").to_lowercase()),
        }
    }
}

/// One piece of text evidence near an element.
#[derive(Debug, Clone, Serialize)]
pub struct TextContext {
    pub text: String,
    pub source: ContextSource,
    pub confidence: f64,
    pub position: Position,
    pub distance: Option<f64>,
}

/// Tunables for extraction. Defaults mirror production behavior.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub search_radius: f64,
    pub max_text_length: usize,
    pub min_text_length: usize,
    pub confidence_threshold: f64,
    pub enable_shortcircuit: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            search_radius: 150.0,
            max_text_length: 200,
            min_text_length: 2,
            confidence_threshold: 0.3,
            enable_shortcircuit: true,
        }
    }
}

fn position_weight(p: Position) -> f64 {
    match p {
        Position::Above => 0.9,
        Position::Left => 0.8,
        Position::Right => 0.7,
        Position::Below => 0.6,
        Position::Parent => 0.85,
        _ => 0.5,
    }
}

/// Field vocabulary used for confidence bonuses, the short-circuit check and
/// `detect_field_type_from_context`. Keys are display labels, not catalog
/// keys; the FAX entry exists purely to recognize and demote FAX rows.
pub static FIELD_VOCABULARY: LazyLock<Vec<(&'static str, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ("company_name", vec!["会社", "会社名", "企業名", "法人名", "団体名", "組織名", "会社・団体名", "company", "corp", "corporation", "firm", "organization", "kaisha", "kaisya"]),
        ("department", vec!["部署", "部署名", "部門", "課", "係", "所属部署", "所属", "department", "dept", "division", "section", "team", "busho", "busyo"]),
        ("last_name", vec!["姓", "苗字", "名字", "せい", "みょうじ", "ファミリーネーム", "お名前（姓）", "lastname", "last_name", "family_name", "surname", "姓名の姓"]),
        ("first_name", vec!["名", "めい", "ファーストネーム", "下の名前", "お名前（名）", "firstname", "first_name", "given_name", "forename", "姓名の名"]),
        ("last_name_kana", vec!["セイ", "カナ姓", "フリガナ（姓）", "姓（カタカナ）", "姓（カナ）", "kana", "katakana", "lastname_kana", "family_kana"]),
        ("first_name_kana", vec!["メイ", "カナ名", "フリガナ（名）", "名（カタカナ）", "名（カナ）", "firstname_kana", "given_kana"]),
        ("last_name_hiragana", vec!["ひらがな姓", "ふりがな（姓）", "姓（ひらがな）", "hiragana", "lastname_hiragana"]),
        ("first_name_hiragana", vec!["ひらがな名", "ふりがな（名）", "名（ひらがな）", "firstname_hiragana"]),
        ("email", vec!["メール", "メールアドレス", "メルアド", "mail", "email", "e-mail", "お客様のメールアドレス", "ご連絡先メール"]),
        ("unified_phone", vec!["電話", "電話番号", "でんわ", "tel", "phone", "telephone", "お客様の電話番号", "ご連絡先電話番号", "連絡先"]),
        ("unified_postal", vec!["郵便番号", "郵便", "ゆうびん", "zip", "postal", "〒"]),
        ("address", vec!["住所", "所在地", "じゅうしょ", "address", "ご住所", "お客様の住所"]),
        ("position", vec!["役職", "職位", "肩書き", "position", "post"]),
        ("subject", vec!["件名", "題名", "タイトル", "subject", "お問い合わせ件名"]),
        ("message_body", vec!["本文", "お問い合わせ内容", "メッセージ", "ご質問", "お問い合わせ本文", "message", "content", "inquiry", "details", "詳細", "備考", "note"]),
        ("gender", vec!["性別", "せいべつ", "gender", "sex"]),
        ("age", vec!["年齢", "ねんれい", "age", "歳"]),
        ("industry", vec!["業種", "ぎょうしゅ", "industry", "事業内容"]),
        ("employees", vec!["従業員数", "社員数", "人数", "employees", "staff"]),
        ("capital", vec!["資本金", "しほんきん", "capital"]),
        ("fax", vec!["fax", "ファックス", "ファクス", "ふぁっくす"]),
        ("website_url", vec!["url", "ホームページ", "website", "サイト", "webサイト", "hp"]),
        ("terms", vec!["利用規約", "規約", "同意", "terms", "agreement"]),
    ]
});

pub const REQUIRED_INDICATORS: &[&str] = &[
    "必須", "※必須", "必要", "required", "*", "＊", "（必須）", "(必須)", "を入力してください",
    "入力必須", "は必ずご入力ください",
];

pub const OPTIONAL_INDICATORS: &[&str] = &[
    "任意", "（任意）", "(任意)", "optional", "お好みで", "必要に応じて", "お分かりの場合",
    "分かる場合", "お持ちの場合", "あれば", "可能な範囲",
];

const INPUT_GUIDES: &[&str] = &[
    "を入力してください", "をご記入ください", "を記入してください", "をお書きください",
    "を選択してください", "を入力", "を記入",
];

const POLITE_FORMS: &[&str] = &["ご記入", "ご入力", "お書き", "お選び", "お客様の", "ご自身の", "ご連絡先"];

const FORMAT_HINTS: &[&str] = &[
    "半角英数", "全角ひらがな", "全角カタカナ", "ハイフンあり", "ハイフンなし", "例：", "形式：",
    "※", "（例）", "(例)", "例）",
];

static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^[\s\*\-\=\|]+$",
        r"^\d+$",
        r"^[a-zA-Z]$",
        r"^[あ-ん]$",
        r"^[ア-ン]$",
        r"cookie",
        r"javascript",
        r"(?i)^css$",
        r"debug",
        r"loading",
        r"click",
        r"submit",
        r"^送信$",
        r"^確認$",
        r"^戻る$",
        r"^リセット$",
        r"^クリア$",
        r"^検索$",
        r"プライバシー",
        r"利用規約",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WS_CLEANER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Header labels keep their required markers (the required detector reads
/// them); only whitespace is normalized.
fn normalize_header_text(text: &str) -> String {
    WS_CLEANER.replace_all(text.trim(), " ").to_string()
}

/// Page-scoped context extractor with a per-element cache.
pub struct ContextExtractor<'a> {
    snapshot: &'a DomSnapshot,
    config: ContextConfig,
    cache: RefCell<HashMap<usize, Vec<TextContext>>>,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(snapshot: &'a DomSnapshot, config: ContextConfig) -> Self {
        Self {
            snapshot,
            config,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Ranked contexts for the element at `index`, cached per element.
    pub fn contexts_for(&self, index: usize) -> Vec<TextContext> {
        if let Some(cached) = self.cache.borrow().get(&index) {
            return cached.clone();
        }
        let contexts = self
            .snapshot
            .elements
            .get(index)
            .map(|el| self.extract(el))
            .unwrap_or_default();
        self.cache.borrow_mut().insert(index, contexts.clone());
        contexts
    }

    fn extract(&self, el: &ElementDescriptor) -> Vec<TextContext> {
        let mut contexts = Vec::new();

        // 1. Associated labels.
        if !el.id.is_empty() {
            if let Some(text) = self.snapshot.label_for.get(&el.id) {
                if self.is_valid_text(text) {
                    contexts.push(TextContext {
                        text: text.trim().to_string(),
                        source: ContextSource::LabelFor,
                        confidence: 1.0,
                        position: Position::Associated,
                        distance: Some(0.0),
                    });
                }
            }
        }
        if let Some(text) = &el.label_parent_text {
            if self.is_valid_text(text) {
                contexts.push(TextContext {
                    text: text.trim().to_string(),
                    source: ContextSource::LabelParent,
                    confidence: 0.95,
                    position: Position::Parent,
                    distance: Some(0.0),
                });
            }
        }
        if !el.aria_labelled_texts.is_empty() {
            let joined = el.aria_labelled_texts.join(" ");
            if self.is_valid_text(&joined) {
                contexts.push(TextContext {
                    text: joined,
                    source: ContextSource::AriaLabelledby,
                    confidence: 0.9,
                    position: Position::Associated,
                    distance: Some(0.0),
                });
            }
        }

        // 2. UL/LI headings.
        if let Some(text) = &el.li_label_text {
            if self.is_valid_text(text) {
                contexts.push(TextContext {
                    text: text.trim().to_string(),
                    source: ContextSource::UlLiLabel,
                    confidence: 0.95,
                    position: Position::Associated,
                    distance: Some(0.0),
                });
            }
        }

        // 3. Parent remainder and fieldset legend.
        if let Some(text) = &el.parent_own_text {
            if text.len() > self.config.min_text_length && self.is_valid_text(text) {
                contexts.push(TextContext {
                    text: text.trim().to_string(),
                    source: ContextSource::ParentElement,
                    confidence: 0.7,
                    position: Position::Parent,
                    distance: Some(0.0),
                });
            }
        }
        if let Some(text) = &el.legend_text {
            if self.is_valid_text(text) {
                contexts.push(TextContext {
                    text: text.trim().to_string(),
                    source: ContextSource::FieldsetLegend,
                    confidence: 0.6,
                    position: Position::Ancestor,
                    distance: Some(0.0),
                });
            }
        }

        // 4. DT label: bbox index first, DOM-walk fallback second.
        let mut dt_found = false;
        if let (Some(bbox), false) = (el.bounding_box, self.snapshot.dtdd_index.is_empty()) {
            let (cx, cy) = bbox.center();
            for rec in &self.snapshot.dtdd_index {
                if rec.bbox().contains_point(cx, cy) {
                    let cleaned = normalize_header_text(&rec.text);
                    if !cleaned.is_empty() && self.is_valid_text(&cleaned) {
                        contexts.push(TextContext {
                            text: cleaned,
                            source: ContextSource::DtLabelIndex,
                            confidence: 0.95,
                            position: Position::Associated,
                            distance: Some(0.0),
                        });
                        dt_found = true;
                    }
                    break;
                }
            }
        }
        if !dt_found {
            if let Some(text) = &el.dt_text {
                let cleaned = normalize_header_text(text);
                if !cleaned.is_empty() && self.is_valid_text(&cleaned) {
                    contexts.push(TextContext {
                        text: cleaned,
                        source: ContextSource::DtLabel,
                        confidence: 1.0,
                        position: Position::Associated,
                        distance: Some(0.0),
                    });
                }
            }
        }

        // 5. TH label, same index-then-walk order.
        let mut th_found = false;
        if let (Some(bbox), false) = (el.bounding_box, self.snapshot.thtd_index.is_empty()) {
            let (cx, cy) = bbox.center();
            for rec in &self.snapshot.thtd_index {
                if rec.bbox().contains_point(cx, cy) {
                    let cleaned = normalize_header_text(&rec.text);
                    if !cleaned.is_empty() && self.is_valid_text(&cleaned) {
                        contexts.push(TextContext {
                            text: cleaned,
                            source: ContextSource::ThLabelIndex,
                            confidence: 0.9,
                            position: Position::TableHeader,
                            distance: Some(0.0),
                        });
                        th_found = true;
                    }
                    break;
                }
            }
        }
        if !th_found {
            if let Some(text) = &el.th_text {
                let cleaned = normalize_header_text(text);
                if !cleaned.is_empty() && self.is_valid_text(&cleaned) {
                    contexts.push(TextContext {
                        text: cleaned,
                        source: ContextSource::ThLabel,
                        confidence: 1.0,
                        position: Position::TableHeader,
                        distance: Some(0.0),
                    });
                }
            }
        }

        // 6. Siblings, confidence decaying with distance.
        for sib in &el.prev_siblings {
            if self.is_valid_text(&sib.text) {
                let confidence = (0.8 - sib.position as f64 * 0.1).max(0.3);
                contexts.push(TextContext {
                    text: sib.text.clone(),
                    source: ContextSource::PrevSibling(sib.tag.clone()),
                    confidence,
                    position: Position::Before,
                    distance: Some(sib.position as f64 * 50.0),
                });
            }
        }
        for sib in &el.next_siblings {
            if self.is_valid_text(&sib.text) {
                let confidence = (0.6 - sib.position as f64 * 0.1).max(0.2);
                contexts.push(TextContext {
                    text: sib.text.clone(),
                    source: ContextSource::NextSibling(sib.tag.clone()),
                    confidence,
                    position: Position::After,
                    distance: Some(sib.position as f64 * 50.0),
                });
            }
        }

        // 7. Position-based sweep, skipped when strong labels already name a
        // known field.
        let skip_position = self.config.enable_shortcircuit && should_skip_position_search(&contexts);
        if !skip_position {
            if let Some(bbox) = el.bounding_box {
                contexts.extend(self.extract_by_position(&bbox));
            }
        }

        self.filter_and_score(contexts)
    }

    fn extract_by_position(&self, element: &crate::dom::BoundingBox) -> Vec<TextContext> {
        let radius = self.config.search_radius;
        let search = crate::dom::BoundingBox {
            x: element.x - radius,
            y: element.y - radius,
            width: element.width + radius * 2.0,
            height: element.height + radius * 2.0,
        };
        let (cx, cy) = element.center();
        let mut out = Vec::new();
        for node in &self.snapshot.text_nodes {
            let bbox = node.bbox();
            if let Some(form) = &self.snapshot.form_bounds {
                if !bbox.intersects(form) {
                    continue;
                }
            }
            if !bbox.intersects(&search) {
                continue;
            }
            let (tx, ty) = bbox.center();
            let distance = ((cx - tx).powi(2) + (cy - ty).powi(2)).sqrt();
            let position = if ty < cy - 20.0 {
                Position::Above
            } else if ty > cy + 20.0 {
                Position::Below
            } else if tx < cx - 20.0 {
                Position::Left
            } else if tx > cx + 20.0 {
                Position::Right
            } else {
                Position::Nearby
            };
            let confidence = position_weight(position) * (1.0 - distance / radius).max(0.1);
            if confidence >= self.config.confidence_threshold {
                out.push(TextContext {
                    text: node.text.clone(),
                    source: ContextSource::Position(position),
                    confidence,
                    position,
                    distance: Some(distance),
                });
            }
            if out.len() >= 10 {
                break;
            }
        }
        out
    }

    fn filter_and_score(&self, contexts: Vec<TextContext>) -> Vec<TextContext> {
        let mut filtered: Vec<TextContext> = contexts
            .into_iter()
            .filter(|c| !is_noise_text(&c.text))
            .map(|mut c| {
                c.confidence = (c.confidence + field_match_bonus(&c.text)).min(1.0);
                c
            })
            .filter(|c| c.confidence >= self.config.confidence_threshold)
            .collect();
        filtered.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut seen: HashSet<String> = HashSet::new();
        filtered.retain(|c| seen.insert(c.text.trim().to_lowercase()));
        filtered.truncate(5);
        filtered
    }

    fn is_valid_text(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        let len = trimmed.chars().count();
        if len < self.config.min_text_length || len > self.config.max_text_length {
            return false;
        }
        !is_noise_text(trimmed)
    }
}

fn is_noise_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOISE_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Confidence bonus when the text names a known field, a required/optional
/// indicator, an input guide or a polite form. Field-name overlap is worth up
/// to 0.3; FAX vocabulary only 0.1 so FAX rows stay demoted.
fn field_match_bonus(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut bonus: f64 = 0.0;
    for (field, patterns) in FIELD_VOCABULARY.iter() {
        if patterns.iter().any(|p| lower.contains(&p.to_lowercase())) {
            bonus = bonus.max(if *field == "fax" { 0.1 } else { 0.3 });
            break;
        }
    }
    if REQUIRED_INDICATORS.iter().any(|i| text.contains(i)) {
        bonus += 0.2;
    }
    if INPUT_GUIDES.iter().any(|g| text.contains(g)) {
        bonus += 0.15;
    }
    if POLITE_FORMS.iter().any(|p| text.contains(p)) {
        bonus += 0.1;
    }
    bonus.min(1.0)
}

/// Skip the position sweep when a strong label source with confidence >= 0.7
/// already overlaps the field vocabulary.
fn should_skip_position_search(contexts: &[TextContext]) -> bool {
    for ctx in contexts {
        if !ctx.source.is_strong() || ctx.confidence < 0.7 {
            continue;
        }
        let lower = ctx.text.to_lowercase();
        for (_, patterns) in FIELD_VOCABULARY.iter() {
            if patterns.iter().any(|p| lower.contains(&p.to_lowercase())) {
                return true;
            }
        }
    }
    false
}

/// True when any context carries a required marker and none carries an
/// optional marker.
pub fn detect_required_indicator(contexts: &[TextContext]) -> bool {
    let combined: String = contexts.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    if OPTIONAL_INDICATORS.iter().any(|i| combined.contains(i)) {
        return false;
    }
    REQUIRED_INDICATORS.iter().any(|i| combined.contains(i))
}

pub fn detect_optional_indicator(contexts: &[TextContext]) -> bool {
    let combined: String = contexts.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    OPTIONAL_INDICATORS.iter().any(|i| combined.contains(i))
}

/// Best-guess field label from the combined context vocabulary; empty string
/// when nothing matches. Longer patterns and multiple hits weigh more.
pub fn detect_field_type_from_context(contexts: &[TextContext]) -> String {
    let combined = contexts
        .iter()
        .map(|c| c.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let mut best = "";
    let mut best_score = 0.0f64;
    for (field, patterns) in FIELD_VOCABULARY.iter() {
        let mut score = 0.0;
        let mut hits = 0;
        for p in patterns {
            if combined.contains(&p.to_lowercase()) {
                hits += 1;
                score += p.chars().count() as f64 / 10.0;
            }
        }
        if hits > 1 {
            score *= 1.2;
        }
        if score > best_score {
            best_score = score;
            best = field;
        }
    }
    best.to_string()
}

/// Format hints (half-width, katakana-only, example markers, ...) present in
/// the combined context.
pub fn get_format_hints(contexts: &[TextContext]) -> Vec<String> {
    let combined: String = contexts.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    FORMAT_HINTS
        .iter()
        .filter(|h| combined.contains(**h))
        .map(|h| h.to_string())
        .collect()
}

/// FAX rows must never receive the phone number unless explicitly enabled.
pub fn is_fax_field_context(contexts: &[TextContext]) -> bool {
    let combined = contexts
        .iter()
        .map(|c| c.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    FIELD_VOCABULARY
        .iter()
        .find(|(f, _)| *f == "fax")
        .map(|(_, patterns)| patterns.iter().any(|p| combined.contains(&p.to_lowercase())))
        .unwrap_or(false)
}

/// Highest-confidence context text, empty when none.
pub fn best_context_text(contexts: &[TextContext]) -> String {
    contexts.first().map(|c| c.text.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, HeaderRecord, SiblingText, TextNodeRecord};

    fn snapshot_with(el: ElementDescriptor) -> DomSnapshot {
        DomSnapshot {
            elements: vec![el],
            ..Default::default()
        }
    }

    #[test]
    fn label_for_wins() {
        let mut snapshot = snapshot_with(ElementDescriptor {
            id: "email".into(),
            ..Default::default()
        });
        snapshot
            .label_for
            .insert("email".into(), "メールアドレス".into());
        let extractor = ContextExtractor::new(&snapshot, ContextConfig::default());
        let contexts = extractor.contexts_for(0);
        assert_eq!(contexts[0].source, ContextSource::LabelFor);
        assert_eq!(contexts[0].text, "メールアドレス");
        assert!(contexts[0].confidence >= 1.0);
    }

    #[test]
    fn dt_index_containment() {
        let snapshot = DomSnapshot {
            elements: vec![ElementDescriptor {
                bounding_box: Some(BoundingBox {
                    x: 120.0,
                    y: 20.0,
                    width: 100.0,
                    height: 20.0,
                }),
                ..Default::default()
            }],
            dtdd_index: vec![HeaderRecord {
                x: 100.0,
                y: 10.0,
                width: 400.0,
                height: 40.0,
                text: "お名前 ※必須".into(),
            }],
            ..Default::default()
        };
        let extractor = ContextExtractor::new(&snapshot, ContextConfig::default());
        let contexts = extractor.contexts_for(0);
        let dt = contexts
            .iter()
            .find(|c| c.source == ContextSource::DtLabelIndex)
            .unwrap();
        // Required markers stay in place for the required detector.
        assert_eq!(dt.text, "お名前 ※必須");
        assert!(detect_required_indicator(&contexts));
    }

    #[test]
    fn contexts_capped_at_five_and_deduped() {
        let el = ElementDescriptor {
            prev_siblings: vec![
                SiblingText { text: "会社名".into(), tag: "p".into(), position: 0 },
                SiblingText { text: "会社名".into(), tag: "span".into(), position: 1 },
                SiblingText { text: "ご住所".into(), tag: "p".into(), position: 2 },
            ],
            next_siblings: vec![SiblingText { text: "電話番号".into(), tag: "p".into(), position: 0 }],
            parent_own_text: Some("お問い合わせ内容".into()),
            legend_text: Some("ご連絡先".into()),
            li_label_text: Some("メールアドレス".into()),
            ..Default::default()
        };
        let snapshot = snapshot_with(el);
        let extractor = ContextExtractor::new(&snapshot, ContextConfig::default());
        let contexts = extractor.contexts_for(0);
        assert!(contexts.len() <= 5);
        let mut seen = HashSet::new();
        for c in &contexts {
            assert!(seen.insert(c.text.clone()));
        }
        // Sorted by confidence descending.
        for pair in contexts.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn strong_label_short_circuits_position_sweep() {
        let mut snapshot = snapshot_with(ElementDescriptor {
            id: "company".into(),
            bounding_box: Some(BoundingBox { x: 100.0, y: 100.0, width: 100.0, height: 20.0 }),
            ..Default::default()
        });
        snapshot.label_for.insert("company".into(), "会社名".into());
        snapshot.text_nodes = vec![TextNodeRecord {
            text: "これは近くの無関係テキスト".into(),
            tag: "p".into(),
            x: 100.0,
            y: 60.0,
            width: 100.0,
            height: 20.0,
        }];
        let extractor = ContextExtractor::new(&snapshot, ContextConfig::default());
        let contexts = extractor.contexts_for(0);
        assert!(contexts
            .iter()
            .all(|c| !matches!(c.source, ContextSource::Position(_))));
    }

    #[test]
    fn noise_texts_dropped() {
        assert!(is_noise_text("***"));
        assert!(is_noise_text("123"));
        assert!(is_noise_text("送信"));
        assert!(is_noise_text("cookie settings"));
        assert!(!is_noise_text("メールアドレス"));
    }

    #[test]
    fn required_and_optional_indicators() {
        let req = vec![TextContext {
            text: "お名前 ※必須".into(),
            source: ContextSource::DtLabel,
            confidence: 1.0,
            position: Position::Associated,
            distance: None,
        }];
        assert!(detect_required_indicator(&req));
        let opt = vec![TextContext {
            text: "FAX番号（任意）".into(),
            source: ContextSource::DtLabel,
            confidence: 1.0,
            position: Position::Associated,
            distance: None,
        }];
        assert!(!detect_required_indicator(&opt));
        assert!(detect_optional_indicator(&opt));
        assert!(is_fax_field_context(&opt));
    }

    #[test]
    fn field_type_detection_prefers_longer_overlap() {
        let ctx = vec![TextContext {
            text: "メールアドレスをご記入ください".into(),
            source: ContextSource::ThLabel,
            confidence: 1.0,
            position: Position::TableHeader,
            distance: None,
        }];
        assert_eq!(detect_field_type_from_context(&ctx), "email");
    }
}
