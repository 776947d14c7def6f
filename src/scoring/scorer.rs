//! Weighted element scorer.
//!
//! Produces a scalar score plus a per-signal breakdown for every
//! (element, logical field) pair. The pattern weights of the catalog never
//! enter the score; they only order which field gets to pick first. Display
//! text (labels, table headers) is trusted over HTML metadata, which is why
//! a strong context can reach 200 points while a type match caps at 100 and
//! metadata is softened once good context exists.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::catalog::{FieldGroup, FieldId, FieldPattern};
use crate::context::{ContextSource, TextContext};
use crate::dom::ElementDescriptor;
use crate::scoring::exclusion::{is_excluded_element, is_excluded_element_with_context};
use crate::scoring::penalties::{calculate_penalties, VISIBILITY_PENALTY};
use crate::text::{contains_token_with_boundary, Normalizer};

/// Sentinel total for excluded elements. Consumers must branch on
/// [`ScoreDetails::excluded`], not on this number.
pub const EXCLUDED_SCORE: i32 = -999;

const TYPE_WEIGHT: i32 = 100;
const NAME_WEIGHT: i32 = 60;
const ID_WEIGHT: i32 = 60;
const TAG_WEIGHT: i32 = 50;
const PLACEHOLDER_WEIGHT: i32 = 40;
const CLASS_WEIGHT: i32 = 30;
const MORPHOLOGY_WEIGHT: i32 = 25;
/// Weak-context ceiling (half of the dt-context base of 80).
const WEAK_CONTEXT_CAP: i32 = 40;

/// Ambiguous short tokens that require a word boundary wherever they appear.
const AMBIGUOUS_TOKENS: &[&str] = &["firm", "corp", "org"];

/// Position-derived context ceilings for fields that layout text alone must
/// not win.
fn position_based_limit(field: FieldId) -> Option<i32> {
    match field {
        FieldId::UnifiedPostal => Some(40),
        _ => None,
    }
}

const KANA_TOKENS: &[&str] = &[
    "kana", "katakana", "hiragana", "furigana", "ruby", "ルビ", "るび", "ｶﾅ", "ｶﾀｶﾅ", "ﾌﾘｶﾞﾅ",
    "カナ", "カタカナ", "フリガナ", "ふりがな", "ひらがな", "読み", "よみ",
];
const HIRAGANA_TOKENS: &[&str] = &["hiragana", "ひらがな"];
const KATAKANA_TOKENS: &[&str] = &[
    "katakana", "ruby", "カタカナ", "ｶﾀｶﾅ", "カナ", "ｶﾅ", "ルビ", "るび", "フリガナ", "ふりがな",
];
const SEI_HINTS: &[&str] = &["セイ", "せい", "姓", "sei", "lastname"];
const MEI_HINTS: &[&str] = &["メイ", "めい", "名", "mei", "firstname"];

static NON_PERSONAL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "会社名|法人名|団体名|組織名|部署名|学校名|店舗名|病院名|施設名|建物名|マンション名|ビル名|邸名|棟名|館名|校名|園名|商品名|品名|製品名|サービス名|プロジェクト名|件名|題名|書名|名称",
    )
    .unwrap()
});

static EMAIL_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

fn is_kana_like_text(t: &str) -> bool {
    let lower = t.to_lowercase();
    !lower.is_empty() && KANA_TOKENS.iter().any(|tok| lower.contains(&tok.to_lowercase()))
}

fn is_hiragana_like_text(t: &str) -> bool {
    let lower = t.to_lowercase();
    !lower.is_empty() && HIRAGANA_TOKENS.iter().any(|tok| lower.contains(&tok.to_lowercase()))
}

fn is_katakana_like_text(t: &str) -> bool {
    let lower = t.to_lowercase();
    !lower.is_empty() && KATAKANA_TOKENS.iter().any(|tok| lower.contains(&tok.to_lowercase()))
}

/// Score details for one (element, field) pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreDetails {
    pub total_score: i32,
    pub breakdown: BTreeMap<String, i32>,
    pub matched_patterns: Vec<String>,
    pub penalties: Vec<String>,
    pub excluded: bool,
    pub exclusion_reason: Option<String>,
}

impl ScoreDetails {
    fn excluded_with(reason: &str) -> Self {
        Self {
            total_score: EXCLUDED_SCORE,
            excluded: true,
            exclusion_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    fn signal(&self, key: &str) -> i32 {
        self.breakdown.get(key).copied().unwrap_or(0)
    }
}

/// Fields allowed to bypass the lone-generic-text demotion when their class
/// match is at full score.
fn class_bypass_whitelisted(field: FieldId) -> bool {
    matches!(
        field,
        FieldId::UnifiedFullName
            | FieldId::LastName
            | FieldId::FirstName
            | FieldId::UnifiedFullNameKana
            | FieldId::LastNameKana
            | FieldId::FirstNameKana
            | FieldId::CompanyName
            | FieldId::Email
            | FieldId::UnifiedPhone
            | FieldId::MessageBody
    )
}

/// Vocabulary for the lightweight morphology bonus on placeholders and
/// context text.
fn morphology_keywords(field: FieldId) -> &'static [&'static str] {
    match field {
        FieldId::CompanyName => &["会社", "企業", "法人", "団体", "組織", "社名", "会社名", "所属", "ご所属", "所属先", "ご所属先"],
        FieldId::Email => &["メール", "メールアドレス", "mail", "email", "e-mail", "アドレス"],
        FieldId::LastName => &["姓", "苗字", "名字", "せい", "みょうじ"],
        FieldId::FirstName => &["名", "名前", "めい"],
        FieldId::UnifiedFullName => &["氏名", "お名前", "姓名", "フルネーム", "担当者", "担当者名", "ご担当者名"],
        FieldId::LastNameHiragana => &["ひらがな", "せい", "姓"],
        FieldId::FirstNameHiragana => &["ひらがな", "めい", "名"],
        FieldId::UnifiedPhone => &["電話", "電話番号", "tel", "phone", "連絡先"],
        FieldId::Address => &["住所", "所在地", "じゅうしょ", "都道府県", "市区町村"],
        FieldId::Subject => &["件名", "タイトル", "表題", "用件"],
        FieldId::MessageBody => &["お問い合わせ", "問い合わせ", "本文", "メッセージ", "内容", "ご相談", "ご要望", "ご質問"],
        FieldId::Position => &["役職", "職位", "job title", "job", "position", "role"],
        _ => &[],
    }
}

/// Keywords that definitively identify a field kind in display text.
fn definitive_keywords(field: FieldId) -> &'static [&'static str] {
    match field {
        FieldId::Email => &["mail", "メール", "email", "e-mail", "アドレス"],
        FieldId::UnifiedPhone => &["tel", "電話", "phone", "telephone", "tel."],
        FieldId::CompanyName => &[
            "会社", "企業", "法人", "団体", "組織", "社名", "法人名", "団体名", "組織名", "部署名",
            "学校名", "店舗名", "病院名", "施設名", "affiliation",
        ],
        FieldId::LastName => &["姓", "苗字", "せい", "みょうじ", "名字", "姓名"],
        FieldId::FirstName => &["名前", "お名前", "ファーストネーム", "下の名前", "given name", "first name"],
        FieldId::MessageBody => &[
            "内容", "本文", "メッセージ", "問い合わせ", "お問合せ", "ご要望", "ご質問", "備考",
            "ご相談", "ご意見", "note",
        ],
        FieldId::Subject => &["件名", "タイトル", "表題", "用件"],
        FieldId::Address => &["住所", "所在地", "じゅうしょ", "address"],
        FieldId::UnifiedPostal => &["郵便番号", "〒", "ゆうびん", "zip"],
        FieldId::Position => &["役職", "職位", "job title", "position", "role", "job"],
        _ => &[],
    }
}

/// All fields that own definitive keywords; conflict checking walks this set.
const DEFINITIVE_FIELDS: &[FieldId] = &[
    FieldId::Email,
    FieldId::UnifiedPhone,
    FieldId::CompanyName,
    FieldId::LastName,
    FieldId::FirstName,
    FieldId::MessageBody,
    FieldId::Subject,
    FieldId::Address,
    FieldId::UnifiedPostal,
    FieldId::Position,
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "来場", "人数", "大人", "子供", "年齢", "予約", "希望", "建築", "エリア", "時間",
];

/// Weighted scorer. One instance per page; the normalization cache is scoped
/// to it.
pub struct ElementScorer {
    normalizer: RefCell<Normalizer>,
}

impl Default for ElementScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementScorer {
    pub fn new() -> Self {
        Self {
            normalizer: RefCell::new(Normalizer::new()),
        }
    }

    fn normalize(&self, s: &str) -> String {
        self.normalizer.borrow_mut().normalize(s)
    }

    /// Full score for an (element, field) pair, context included.
    pub fn score(
        &self,
        el: &ElementDescriptor,
        pattern: &FieldPattern,
        contexts: &[TextContext],
    ) -> ScoreDetails {
        let field = pattern.field;
        let name_l = el.name.to_lowercase();
        let id_l = el.id.to_lowercase();
        let class_l = el.class_name.to_lowercase();
        let placeholder_l = el.placeholder.to_lowercase();

        // Kana/kanji guards run before any scoring.
        let has_kana_in_element = is_kana_like_text(&name_l)
            || is_kana_like_text(&id_l)
            || is_kana_like_text(&class_l)
            || is_kana_like_text(&placeholder_l);
        let hira_in_element = is_hiragana_like_text(&name_l)
            || is_hiragana_like_text(&id_l)
            || is_hiragana_like_text(&class_l)
            || is_hiragana_like_text(&placeholder_l);
        let kata_in_element = is_katakana_like_text(&name_l)
            || is_katakana_like_text(&id_l)
            || is_katakana_like_text(&class_l)
            || is_katakana_like_text(&placeholder_l);

        if has_kana_in_element && !field.is_reading() {
            return ScoreDetails::excluded_with("kana_like_element_for_non_kana_field");
        }
        if field.is_kana() && hira_in_element && !kata_in_element {
            return ScoreDetails::excluded_with("hiragana_like_element_for_kana_field");
        }
        if field.is_hiragana() && kata_in_element {
            return ScoreDetails::excluded_with("katakana_like_element_for_hiragana_field");
        }

        // Split/unified guards: sei/mei hints must not cross sides, and the
        // unified kana field must not claim split inputs.
        let blob = format!("{} {} {} {}", el.name, el.id, el.class_name, el.placeholder);
        let has_sei_hint = SEI_HINTS.iter().any(|t| blob.contains(t));
        let has_mei_hint = MEI_HINTS.iter().any(|t| blob.contains(t));
        if field.is_family_side() && field.is_reading() && has_mei_hint && !has_sei_hint {
            return ScoreDetails::excluded_with("mei_hint_for_last_name_field");
        }
        if field.is_given_side() && field.is_reading() && has_sei_hint && !has_mei_hint {
            return ScoreDetails::excluded_with("sei_hint_for_first_name_field");
        }
        if field == FieldId::UnifiedFullNameKana && (has_sei_hint || has_mei_hint) {
            return ScoreDetails::excluded_with("unified_kana_on_split_field");
        }

        if is_excluded_element(el, pattern) {
            return ScoreDetails::excluded_with("exclude_patterns_match");
        }

        let mut details = ScoreDetails::default();
        let mut total = 0i32;

        let (type_score, type_matches) = self.type_score(&el.input_type, pattern);
        total += type_score;
        details.breakdown.insert("type".into(), type_score);
        details.matched_patterns.extend(type_matches);

        let (tag_score, tag_matches) = self.tag_score(&el.tag_name, pattern);
        total += tag_score;
        details.breakdown.insert("tag".into(), tag_score);
        details.matched_patterns.extend(tag_matches);

        let (name_score, name_matches) = self.attr_score(&el.name, pattern.names, "name", NAME_WEIGHT);
        total += name_score;
        details.breakdown.insert("name".into(), name_score);
        details.matched_patterns.extend(name_matches);

        let (id_score, id_matches) = self.attr_score(&el.id, pattern.ids, "id", ID_WEIGHT);
        total += id_score;
        details.breakdown.insert("id".into(), id_score);
        details.matched_patterns.extend(id_matches);

        let (placeholder_score, placeholder_matches) = self.placeholder_score(&el.placeholder, pattern);
        total += placeholder_score;
        details
            .breakdown
            .insert("placeholder".into(), placeholder_score);
        details.matched_patterns.extend(placeholder_matches);

        let (class_score, class_matches) = self.class_score(&el.class_name, pattern);
        total += class_score;
        details.breakdown.insert("class".into(), class_score);
        details.matched_patterns.extend(class_matches);

        let (context_score, context_matches) = self.context_score(pattern, contexts);

        // Display text outranks metadata: soften type/name/id once a usable
        // context exists.
        if context_score >= 40 {
            for (key, score) in [("type", type_score), ("name", name_score), ("id", id_score)] {
                if score > 0 {
                    let adjusted = (score as f64 * 0.7) as i32;
                    let adjustment = adjusted - score;
                    total += adjustment;
                    details
                        .breakdown
                        .insert(format!("{key}_adjustment"), adjustment);
                }
            }
        }

        total += context_score;
        details.breakdown.insert("context".into(), context_score);
        details.matched_patterns.extend(context_matches);

        if is_excluded_element_with_context(el, pattern, contexts) {
            return ScoreDetails::excluded_with("context_exclude_patterns_match");
        }

        details.breakdown.insert("bonus".into(), 0);

        if field == FieldId::MessageBody && el.tag_name.eq_ignore_ascii_case("textarea") {
            total += 20;
            details.breakdown.insert("textarea_bonus".into(), 20);
        }

        let (penalty, penalty_reasons) = calculate_penalties(el);
        total += penalty;
        details.breakdown.insert("penalty".into(), penalty);
        details
            .penalties
            .extend(penalty_reasons.iter().map(|r| r.to_string()));

        // A bare type=text with no corroborating signal is demoted unless the
        // field is a whitelisted core field carried by a full class match.
        if el.input_type.eq_ignore_ascii_case("text")
            && name_score == 0
            && id_score == 0
            && placeholder_score == 0
            && context_score == 0
            && !(class_score >= CLASS_WEIGHT && class_bypass_whitelisted(field))
        {
            total -= 40;
            details.penalties.push("generic_text_without_signals".into());
            details.breakdown.insert("penalty_generic_text".into(), -40);
        }

        details
            .breakdown
            .insert("field_weight".into(), pattern.weight as i32);
        details.total_score = total.max(0);
        details
    }

    /// Context-free quick score used for candidate preselection.
    pub fn quick_score(&self, el: &ElementDescriptor, pattern: &FieldPattern) -> i32 {
        if is_excluded_element(el, pattern) {
            return EXCLUDED_SCORE;
        }
        let mut total = 0i32;
        total += self.type_score(&el.input_type, pattern).0;
        total += self.tag_score(&el.tag_name, pattern).0;
        total += self.attr_score(&el.name, pattern.names, "name", NAME_WEIGHT).0;
        total += self.attr_score(&el.id, pattern.ids, "id", ID_WEIGHT).0;
        total += self.placeholder_score(&el.placeholder, pattern).0;
        total += self.class_score(&el.class_name, pattern).0;
        if !el.visible {
            total += VISIBILITY_PENALTY;
        }
        if !el.enabled {
            total += VISIBILITY_PENALTY / 2;
        }
        if el.input_type.eq_ignore_ascii_case("hidden") {
            total += VISIBILITY_PENALTY;
        }
        total.max(EXCLUDED_SCORE)
    }

    fn type_score(&self, element_type: &str, pattern: &FieldPattern) -> (i32, Vec<String>) {
        if element_type.is_empty() {
            return (0, vec![]);
        }
        for pt in pattern.types {
            if pt.eq_ignore_ascii_case(element_type) {
                let matches = vec![format!("type:{pt}")];
                // Generic text earns a fraction; a lone type=text match means
                // almost nothing.
                if element_type.eq_ignore_ascii_case("text") {
                    return ((TYPE_WEIGHT as f64 * 0.2) as i32, matches);
                }
                return (TYPE_WEIGHT, matches);
            }
        }
        (0, vec![])
    }

    fn tag_score(&self, tag_name: &str, pattern: &FieldPattern) -> (i32, Vec<String>) {
        if tag_name.is_empty() {
            return (0, vec![]);
        }
        for pt in pattern.tags {
            if pt.eq_ignore_ascii_case(tag_name) {
                return (TAG_WEIGHT, vec![format!("tag:{pt}")]);
            }
        }
        (0, vec![])
    }

    /// Lexical attribute score. The pattern must be contained in the
    /// attribute, never the reverse; short or ambiguous tokens require a
    /// word boundary.
    fn attr_score(
        &self,
        value: &str,
        patterns: &[&str],
        label: &str,
        weight: i32,
    ) -> (i32, Vec<String>) {
        if value.is_empty() {
            return (0, vec![]);
        }
        let value_norm = self.normalize(value);
        for p in patterns {
            let p_norm = self.normalize(p);
            let needs_boundary =
                p_norm.chars().count() <= 4 || AMBIGUOUS_TOKENS.contains(&p_norm.as_str());
            let hit = if needs_boundary {
                contains_token_with_boundary(&value_norm, &p_norm)
            } else {
                value_norm.contains(&p_norm)
            };
            if hit {
                return (weight, vec![format!("{label}:{p}")]);
            }
        }
        (0, vec![])
    }

    fn class_score(&self, class_name: &str, pattern: &FieldPattern) -> (i32, Vec<String>) {
        if class_name.is_empty() {
            return (0, vec![]);
        }
        let class_norm = self.normalize(class_name);
        for p in pattern.classes {
            let p_l = p.to_lowercase();
            let escaped = regex::escape(&p_l);
            if Regex::new(&format!(r"\b{escaped}\b"))
                .map(|re| re.is_match(&class_norm))
                .unwrap_or(false)
            {
                return (CLASS_WEIGHT, vec![format!("class:{p}")]);
            }
        }
        (0, vec![])
    }

    fn placeholder_score(&self, placeholder: &str, pattern: &FieldPattern) -> (i32, Vec<String>) {
        if placeholder.is_empty() {
            return (0, vec![]);
        }
        let field = pattern.field;
        let placeholder_norm = self.normalize(placeholder);
        let mut matches = Vec::new();
        let mut total = 0i32;
        let mut matched_pattern = String::new();

        // Company-name candidates only earn placeholder points when the text
        // actually hints at an organization; otherwise a bare 名 placeholder
        // would leak company points onto personal-name inputs.
        let mut candidate_patterns: &[&str] = pattern.placeholders;
        if field == FieldId::CompanyName {
            const JP_HINTS: &[&str] = &[
                "会社", "企業", "法人", "団体", "組織", "社名", "御社", "貴社", "会社・団体", "店舗",
                "病院", "施設", "学校", "大学", "園", "館", "事業者", "屋号",
            ];
            static EN_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
                Regex::new(r"\b(company|companies|corp|corporation|corporate|organization|organisation|business|enterprise|firm|employer)\b").unwrap()
            });
            let has_hint = JP_HINTS.iter().any(|h| placeholder_norm.contains(h))
                || EN_HINT_RE.is_match(&placeholder_norm);
            if !has_hint {
                candidate_patterns = &[];
            }
        }

        // Kana placeholders never feed the plain kanji-name fields.
        if field.is_plain_personal_name() && is_kana_like_text(&placeholder_norm) {
            return (0, vec![]);
        }

        for p in candidate_patterns {
            let p_l = p.to_lowercase();
            let needs_boundary =
                p_l.chars().count() <= 2 || AMBIGUOUS_TOKENS.contains(&p_l.as_str());
            let hit = if needs_boundary {
                contains_token_with_boundary(&placeholder_norm, &p_l)
            } else {
                placeholder_norm.contains(&p_l)
            };
            if hit {
                matches.push(format!("placeholder:{p}"));
                total += PLACEHOLDER_WEIGHT;
                matched_pattern = p_l;
                break;
            }
        }

        // Japanese-explicit placeholders correct reversed first/last guesses
        // coming from English attribute names.
        if !matched_pattern.is_empty() {
            let boost = match field {
                FieldId::LastName => ["姓", "last name", "family name", "苗字", "ファミリーネーム"]
                    .iter()
                    .any(|k| matched_pattern.contains(*k))
                    .then_some(50),
                FieldId::FirstName => {
                    ["名", "first name", "given name", "ファーストネーム", "下の名前"]
                        .iter()
                        .any(|k| matched_pattern.contains(*k))
                        .then_some(50)
                }
                FieldId::LastNameKana => ["セイ", "lastname kana", "kana last", "姓（カタカナ）"]
                    .iter()
                    .any(|k| matched_pattern.contains(&k.to_lowercase()))
                    .then_some(40),
                FieldId::FirstNameKana => ["メイ", "firstname kana", "kana first", "名（カタカナ）"]
                    .iter()
                    .any(|k| matched_pattern.contains(&k.to_lowercase()))
                    .then_some(40),
                FieldId::LastNameHiragana => ["せい", "ひらがな", "ふりがな"]
                    .iter()
                    .any(|k| matched_pattern.contains(*k))
                    .then_some(40),
                FieldId::FirstNameHiragana => ["めい", "ひらがな", "ふりがな"]
                    .iter()
                    .any(|k| matched_pattern.contains(*k))
                    .then_some(40),
                _ => None,
            };
            if let Some(boost) = boost {
                total += boost;
                matches.push(format!("placeholder_boost:+{boost}"));
            }
        }

        // Reverse-word suppression: a 姓 candidate whose placeholder says 名
        // is almost certainly the other half of the pair.
        let conflict = match field {
            FieldId::LastName if contains_token_with_boundary(&placeholder_norm, "名") => 80,
            FieldId::FirstName if contains_token_with_boundary(&placeholder_norm, "姓") => 80,
            FieldId::LastNameKana if contains_token_with_boundary(&placeholder_norm, "メイ") => 70,
            FieldId::FirstNameKana if contains_token_with_boundary(&placeholder_norm, "セイ") => 70,
            FieldId::LastNameHiragana if contains_token_with_boundary(&placeholder_norm, "めい") => 60,
            FieldId::FirstNameHiragana if contains_token_with_boundary(&placeholder_norm, "せい") => 60,
            _ => 0,
        };
        if conflict > 0 {
            total -= conflict;
            matches.push(format!("placeholder_conflict:-{conflict}"));
        }

        // Structural recognition: an email-shaped example or a Japanese
        // address shape is high-confidence evidence on its own.
        let already_matched = matches.iter().any(|m| m.starts_with("placeholder:"));
        if field == FieldId::Email && !already_matched && EMAIL_LIKE_RE.is_match(placeholder.trim())
        {
            matches.push("placeholder:email_like".into());
            total += PLACEHOLDER_WEIGHT;
        }
        if field == FieldId::Address && !already_matched {
            const NEGATIVE: &[&str] = &["建物名", "建物", "マンション", "アパート", "部屋番号", "号室", "階"];
            const TOKENS: &[&str] = &["都道府県", "住所", "丁目", "番地", "号", "県", "市", "区", "町", "村"];
            if !NEGATIVE.iter().any(|t| placeholder_norm.contains(t))
                && TOKENS.iter().any(|t| placeholder.contains(t))
            {
                matches.push("placeholder:address_like".into());
                total += PLACEHOLDER_WEIGHT;
            }
        }

        // Morphology bonus, blocked for kanji-name fields facing kana text.
        let morphology_allowed =
            !(field.is_plain_personal_name() && is_kana_like_text(&placeholder_norm));
        if morphology_allowed {
            let morph = self.morphology_score(placeholder, field);
            if morph > 0 {
                total += morph;
                matches.push(format!("japanese_morphology:{}", field.key()));
            }
        }

        (total, matches)
    }

    fn morphology_score(&self, text: &str, field: FieldId) -> i32 {
        if text.is_empty() {
            return 0;
        }
        let lower = text.to_lowercase();
        if field.is_plain_personal_name() && is_kana_like_text(&lower) {
            return 0;
        }
        for keyword in morphology_keywords(field) {
            if text.contains(keyword) || lower.contains(&keyword.to_lowercase()) {
                return MORPHOLOGY_WEIGHT;
            }
        }
        0
    }

    /// Context score with source multipliers, semantic consistency and the
    /// strong-context override band.
    fn context_score(&self, pattern: &FieldPattern, contexts: &[TextContext]) -> (i32, Vec<String>) {
        if contexts.is_empty() {
            return (0, vec![]);
        }
        let field = pattern.field;
        let mut matches = Vec::new();
        let mut max_score = 0i32;
        let mut best_source: Option<&ContextSource> = None;
        let mut min_penalty = 0i32;

        for ctx in contexts {
            let raw = self.match_context_with_patterns(&ctx.text, pattern);
            if raw < 0 {
                min_penalty = min_penalty.min(raw);
                continue;
            }
            if raw == 0 {
                continue;
            }
            let boosted = match &ctx.source {
                ContextSource::DtLabel | ContextSource::DtLabelIndex => (raw as f64 * 3.0) as i32,
                ContextSource::ThLabel | ContextSource::ThLabelIndex => (raw as f64 * 2.0) as i32,
                ContextSource::LabelFor
                | ContextSource::AriaLabelledby
                | ContextSource::UlLiLabel => (raw as f64 * 2.5) as i32,
                ContextSource::LabelParent => (raw as f64 * 1.8) as i32,
                _ => raw,
            };
            if boosted > max_score {
                max_score = boosted;
                best_source = Some(&ctx.source);
                let head: String = ctx.text.chars().take(20).collect();
                matches = vec![format!("context:{}:{}", ctx.source.label(), head)];
            }
        }

        let has_strong = contexts.iter().any(|c| c.source.is_strong());

        // A strong label naming a reading (furigana/kana) is incompatible
        // with the kanji-name fields, full stop.
        if has_strong && field.is_plain_personal_name() {
            let strong_text: String = contexts
                .iter()
                .filter(|c| c.source.is_strong())
                .map(|c| c.text.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            if is_kana_like_text(&strong_text) {
                return (-80, vec![]);
            }
        }

        let mut final_score = if has_strong {
            if max_score >= 60 {
                (max_score + 50).min(200)
            } else {
                max_score
            }
        } else if max_score >= 40 {
            (max_score + 20).min(120)
        } else {
            max_score.min(WEAK_CONTEXT_CAP)
        };

        // Layout-only evidence must not promote postal-like fields.
        if let (Some(limit), Some(source)) = (position_based_limit(field), best_source) {
            if source.is_position_like() {
                final_score = final_score.min(limit);
            }
        }

        if min_penalty < 0 {
            final_score = (final_score + min_penalty).max(-100);
            if min_penalty <= -80
                && matches!(
                    field,
                    FieldId::LastName
                        | FieldId::FirstName
                        | FieldId::LastNameKana
                        | FieldId::FirstNameKana
                        | FieldId::LastNameHiragana
                        | FieldId::FirstNameHiragana
                )
            {
                final_score = 0;
            }
        }

        (final_score, matches)
    }

    fn match_context_with_patterns(&self, context_text: &str, pattern: &FieldPattern) -> i32 {
        if context_text.is_empty() {
            return 0;
        }
        let context_lower = context_text.to_lowercase();
        let mut max_score = 0i32;

        let semantic = self.validate_semantic_consistency(context_text, pattern.field);
        if semantic < 0 {
            return semantic;
        }
        max_score = max_score.max(semantic);

        // Strict anchors with word boundaries.
        for anchor in pattern.strict {
            let anchor_l = anchor.to_lowercase();
            if anchor_l.chars().count() > 1 && contains_token_with_boundary(&context_lower, &anchor_l)
            {
                max_score = max_score.max(80);
            }
        }

        // Name/placeholder pattern overlap, both directions, longer patterns
        // trusted more.
        for p in pattern.names.iter().chain(pattern.placeholders.iter()) {
            let p_l = p.to_lowercase();
            if context_lower.contains(&p_l) || p_l.contains(&context_lower) {
                max_score = max_score.max(if p.chars().count() > 3 { 60 } else { 40 });
            }
        }

        // Lightweight semantic vocabulary.
        for keyword in morphology_keywords(pattern.field) {
            if context_lower.contains(&keyword.to_lowercase()) {
                max_score = max_score.max(50);
            }
        }

        max_score
    }

    /// Semantic consistency of one context text against the field kind.
    /// Positive = definitive label hit (90); negative = conflicting field
    /// vocabulary.
    fn validate_semantic_consistency(&self, context_text: &str, field: FieldId) -> i32 {
        let context_lower = context_text.to_lowercase();

        if field == FieldId::UnifiedPhone
            && ["fax", "ファックス", "ファクス"].iter().any(|k| context_lower.contains(k))
        {
            return -80;
        }
        if field.is_phone() {
            const NAME_CTX: &[&str] = &["氏名", "お名前", "名前", "フリガナ", "ふりがな", "カナ", "ひらがな", "セイ", "メイ"];
            if NAME_CTX.iter().any(|t| context_lower.contains(&t.to_lowercase())) {
                return -80;
            }
        }
        if field.is_plain_personal_name() {
            if is_kana_like_text(&context_lower) {
                return -80;
            }
            if ["メール", "mail", "email", "e-mail", "アドレス"]
                .iter()
                .any(|k| context_lower.contains(k))
            {
                return -80;
            }
        }
        if field == FieldId::Email
            && ["電話", "お電話", "tel", "phone", "telephone"]
                .iter()
                .any(|k| context_lower.contains(k))
        {
            return -60;
        }
        if field == FieldId::CompanyName {
            if context_lower.contains("管理会社") {
                return -70;
            }
            if ["竣工", "年月日"].iter().any(|k| context_lower.contains(k)) {
                return -50;
            }
        }
        if field == FieldId::UnifiedPostal
            && ["従業員番号", "社員番号", "employee id", "employee number"]
                .iter()
                .any(|k| context_lower.contains(k))
        {
            return -90;
        }
        if field.is_personal_name_like() && NON_PERSONAL_NAME_RE.is_match(context_text) {
            return -80;
        }
        if matches!(field, FieldId::LastName | FieldId::FirstName)
            && ["ふりがな", "フリガナ", "ｶﾅ", "かな", "カナ", "kana", "ひらがな", "平仮名"]
                .iter()
                .any(|k| context_lower.contains(&k.to_lowercase()))
        {
            return -90;
        }
        if field == FieldId::CompanyName {
            const PERSONAL_CTX: &[&str] = &[
                "お名前", "氏名", "姓名", "full name", "first name", "given name", "last name",
                "family name",
            ];
            if PERSONAL_CTX.iter().any(|t| context_lower.contains(&t.to_lowercase())) {
                return -75;
            }
        }

        let keywords = definitive_keywords(field);
        if keywords.iter().any(|k| context_lower.contains(&k.to_lowercase())) {
            return 90;
        }

        self.check_semantic_conflicts(&context_lower, field)
    }

    fn check_semantic_conflicts(&self, context_lower: &str, field: FieldId) -> i32 {
        let group = field.group();
        if matches!(group, FieldGroup::Other) {
            return 0;
        }

        // If the field's own definitive vocabulary is present, composite
        // words like 会社名 must not be re-read as conflicts.
        if definitive_keywords(field)
            .iter()
            .any(|k| context_lower.contains(&k.to_lowercase()))
        {
            return 0;
        }

        for other in DEFINITIVE_FIELDS {
            if other.group() == group {
                continue;
            }
            for keyword in definitive_keywords(*other) {
                if context_lower.contains(&keyword.to_lowercase()) {
                    // Guard the 名/名前 inside 会社名-style composites.
                    if field == FieldId::CompanyName && (*keyword == "名" || *keyword == "名前") {
                        const COMPANY_TOKENS: &[&str] = &[
                            "会社名", "法人名", "団体名", "組織名", "部署名", "学校名", "店舗名",
                            "病院名", "施設名", "社名",
                        ];
                        if COMPANY_TOKENS.iter().any(|t| context_lower.contains(t)) {
                            continue;
                        }
                    }
                    return -50;
                }
            }
        }

        if matches!(
            group,
            FieldGroup::Phone | FieldGroup::Name | FieldGroup::Email | FieldGroup::Postal
        ) && BUSINESS_KEYWORDS.iter().any(|k| context_lower.contains(k))
        {
            return -75;
        }

        0
    }

    /// Tie-break between two score details: total first, then the type
    /// signal.
    pub fn compare(a: &ScoreDetails, b: &ScoreDetails) -> std::cmp::Ordering {
        a.total_score
            .cmp(&b.total_score)
            .then(a.signal("type").cmp(&b.signal("type")))
            .then(a.signal("bonus").cmp(&b.signal("bonus")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::context::Position;

    fn pattern(field: FieldId) -> &'static FieldPattern {
        Catalog::global().get(field).unwrap()
    }

    fn input(name: &str, ty: &str, placeholder: &str) -> ElementDescriptor {
        ElementDescriptor {
            tag_name: "input".into(),
            input_type: ty.into(),
            name: name.into(),
            placeholder: placeholder.into(),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    fn strong_ctx(text: &str) -> Vec<TextContext> {
        vec![TextContext {
            text: text.into(),
            source: ContextSource::DtLabel,
            confidence: 1.0,
            position: Position::Associated,
            distance: None,
        }]
    }

    #[test]
    fn email_type_scores_high() {
        let scorer = ElementScorer::new();
        let el = input("email", "email", "");
        let details = scorer.score(&el, pattern(FieldId::Email), &[]);
        assert!(details.signal("type") == TYPE_WEIGHT);
        assert!(details.total_score >= 200);
        assert!(!details.excluded);
    }

    #[test]
    fn kana_element_excluded_for_plain_name() {
        let scorer = ElementScorer::new();
        let el = input("name_kana", "text", "");
        let details = scorer.score(&el, pattern(FieldId::LastName), &[]);
        assert!(details.excluded);
        assert_eq!(details.total_score, EXCLUDED_SCORE);
        assert_eq!(
            details.exclusion_reason.as_deref(),
            Some("kana_like_element_for_non_kana_field")
        );
    }

    #[test]
    fn hiragana_element_excluded_for_katakana_field() {
        let scorer = ElementScorer::new();
        let el = input("sei_hiragana", "text", "ひらがなで入力");
        let details = scorer.score(&el, pattern(FieldId::LastNameKana), &[]);
        assert!(details.excluded);
    }

    #[test]
    fn unified_kana_never_claims_split_inputs() {
        let scorer = ElementScorer::new();
        let el = input("sei_kana", "text", "セイ");
        let details = scorer.score(&el, pattern(FieldId::UnifiedFullNameKana), &[]);
        assert!(details.excluded);
        assert_eq!(
            details.exclusion_reason.as_deref(),
            Some("unified_kana_on_split_field")
        );
    }

    #[test]
    fn strong_context_reaches_override_band() {
        let scorer = ElementScorer::new();
        let el = input("field1", "text", "");
        let details = scorer.score(&el, pattern(FieldId::Email), &strong_ctx("メールアドレス"));
        assert!(details.signal("context") >= 200, "{:?}", details.breakdown);
    }

    #[test]
    fn metadata_softened_when_context_present() {
        let scorer = ElementScorer::new();
        let el = input("email", "email", "");
        let details = scorer.score(&el, pattern(FieldId::Email), &strong_ctx("メールアドレス"));
        assert!(details.breakdown.contains_key("type_adjustment"));
        assert!(details.signal("type_adjustment") < 0);
    }

    #[test]
    fn kana_context_negative_for_plain_name() {
        let scorer = ElementScorer::new();
        let el = input("name01", "text", "");
        let details = scorer.score(&el, pattern(FieldId::LastName), &strong_ctx("ふりがな"));
        assert!(details.signal("context") <= 0, "{:?}", details.breakdown);
    }

    #[test]
    fn company_composite_negative_for_name_fields() {
        let scorer = ElementScorer::new();
        let details = scorer.score(
            &input("field2", "text", ""),
            pattern(FieldId::LastName),
            &strong_ctx("会社名"),
        );
        // Composite 〇〇名 context must not boost the personal-name field.
        assert!(details.signal("context") <= 0);
    }

    #[test]
    fn fax_context_negative_for_phone() {
        let scorer = ElementScorer::new();
        let el = input("number1", "text", "");
        let details = scorer.score(&el, pattern(FieldId::UnifiedPhone), &strong_ctx("FAX番号"));
        assert!(details.signal("context") <= 0);
    }

    #[test]
    fn textarea_bonus_applies_to_message_body() {
        let scorer = ElementScorer::new();
        let textarea = ElementDescriptor {
            tag_name: "textarea".into(),
            visible: true,
            enabled: true,
            ..Default::default()
        };
        let details = scorer.score(&textarea, pattern(FieldId::MessageBody), &[]);
        assert_eq!(details.signal("textarea_bonus"), 20);
    }

    #[test]
    fn textarea_beats_equal_text_input_for_message_body() {
        let scorer = ElementScorer::new();
        let ctx = strong_ctx("お問い合わせ内容");
        let textarea = ElementDescriptor {
            tag_name: "textarea".into(),
            visible: true,
            enabled: true,
            ..Default::default()
        };
        let text_input = input("", "", "");
        let a = scorer.score(&textarea, pattern(FieldId::MessageBody), &ctx);
        let b = scorer.score(&text_input, pattern(FieldId::MessageBody), &ctx);
        assert!(a.total_score > b.total_score);
    }

    #[test]
    fn generic_text_without_signals_demoted() {
        let scorer = ElementScorer::new();
        let el = input("", "text", "");
        let details = scorer.score(&el, pattern(FieldId::Subject), &[]);
        assert_eq!(details.signal("penalty_generic_text"), -40);
    }

    #[test]
    fn class_bypass_skips_generic_text_penalty() {
        let scorer = ElementScorer::new();
        let mut el = input("", "text", "");
        el.class_name = "email".into();
        let details = scorer.score(&el, pattern(FieldId::Email), &[]);
        assert_eq!(details.signal("penalty_generic_text"), 0);
    }

    #[test]
    fn weights_never_added_to_score() {
        let scorer = ElementScorer::new();
        let el = input("email", "email", "");
        let details = scorer.score(&el, pattern(FieldId::Email), &[]);
        let sum: i32 = details
            .breakdown
            .iter()
            .filter(|(k, _)| k.as_str() != "field_weight")
            .map(|(_, v)| *v)
            .sum();
        assert_eq!(details.total_score, sum.max(0));
    }

    #[test]
    fn postal_position_context_capped() {
        let scorer = ElementScorer::new();
        let el = input("code", "text", "");
        let ctx = vec![TextContext {
            text: "郵便番号".into(),
            source: ContextSource::Position(Position::Above),
            confidence: 0.8,
            position: Position::Above,
            distance: Some(30.0),
        }];
        let details = scorer.score(&el, pattern(FieldId::UnifiedPostal), &ctx);
        assert!(details.signal("context") <= 40);
    }

    #[test]
    fn quick_score_excludes_like_full_score() {
        let scorer = ElementScorer::new();
        let el = input("user_password_field", "text", "");
        assert_eq!(scorer.quick_score(&el, pattern(FieldId::Email)), EXCLUDED_SCORE);
    }
}
