//! Logical field catalog.
//!
//! Central authoritative definition of the ~26 logical form fields the
//! analyzer can map: lexical patterns per attribute, tag/type constraints,
//! exclusion patterns, kana indicators and a relative weight. Weights drive
//! iteration order only (highest first) and are never summed into element
//! scores.
//!
//! The catalog is static data; the scorer is a function over it. Keep it free
//! of any dependency on the scoring modules to avoid circular references.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use tracing::warn;

/// Canonical identifier for a logical form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    UnifiedFullName,
    CompanyName,
    LastName,
    FirstName,
    Email,
    MessageBody,
    Subject,
    UnifiedFullNameKana,
    LastNameKana,
    UnifiedPhone,
    Prefecture,
    Address,
    FirstNameKana,
    CompanyNameKana,
    Phone1,
    Phone2,
    Phone3,
    Postal1,
    Postal2,
    UnifiedPostal,
    Position,
    LastNameHiragana,
    FirstNameHiragana,
    Gender,
    Department,
    WebsiteUrl,
}

impl FieldId {
    /// Canonical key used in mappings and verdict JSON.
    pub fn key(self) -> &'static str {
        match self {
            Self::UnifiedFullName => "unified_full_name",
            Self::CompanyName => "company_name",
            Self::LastName => "last_name",
            Self::FirstName => "first_name",
            Self::Email => "email",
            Self::MessageBody => "message_body",
            Self::Subject => "subject",
            Self::UnifiedFullNameKana => "unified_full_name_kana",
            Self::LastNameKana => "last_name_kana",
            Self::UnifiedPhone => "unified_phone",
            Self::Prefecture => "prefecture",
            Self::Address => "address",
            Self::FirstNameKana => "first_name_kana",
            Self::CompanyNameKana => "company_name_kana",
            Self::Phone1 => "phone_1",
            Self::Phone2 => "phone_2",
            Self::Phone3 => "phone_3",
            Self::Postal1 => "postal_1",
            Self::Postal2 => "postal_2",
            Self::UnifiedPostal => "unified_postal",
            Self::Position => "position",
            Self::LastNameHiragana => "last_name_hiragana",
            Self::FirstNameHiragana => "first_name_hiragana",
            Self::Gender => "gender",
            Self::Department => "department",
            Self::WebsiteUrl => "website_url",
        }
    }

    /// Katakana reading fields.
    pub fn is_kana(self) -> bool {
        matches!(
            self,
            Self::UnifiedFullNameKana
                | Self::LastNameKana
                | Self::FirstNameKana
                | Self::CompanyNameKana
        )
    }

    /// Hiragana reading fields.
    pub fn is_hiragana(self) -> bool {
        matches!(self, Self::LastNameHiragana | Self::FirstNameHiragana)
    }

    /// Any phonetic-reading field (katakana or hiragana).
    pub fn is_reading(self) -> bool {
        self.is_kana() || self.is_hiragana()
    }

    /// Kanji personal-name fields that must never claim a reading input.
    pub fn is_plain_personal_name(self) -> bool {
        matches!(self, Self::LastName | Self::FirstName | Self::UnifiedFullName)
    }

    /// Personal-name-like fields, readings included. These conflict with
    /// 〇〇名 composites (会社名, 部署名, 件名, ...).
    pub fn is_personal_name_like(self) -> bool {
        self.is_plain_personal_name()
            || matches!(
                self,
                Self::UnifiedFullNameKana
                    | Self::LastNameKana
                    | Self::FirstNameKana
                    | Self::LastNameHiragana
                    | Self::FirstNameHiragana
            )
    }

    /// Family-name side of a split pair (kanji or reading).
    pub fn is_family_side(self) -> bool {
        matches!(self, Self::LastName | Self::LastNameKana | Self::LastNameHiragana)
    }

    /// Given-name side of a split pair (kanji or reading).
    pub fn is_given_side(self) -> bool {
        matches!(self, Self::FirstName | Self::FirstNameKana | Self::FirstNameHiragana)
    }

    pub fn is_phone(self) -> bool {
        matches!(self, Self::UnifiedPhone | Self::Phone1 | Self::Phone2 | Self::Phone3)
    }

    pub fn is_postal(self) -> bool {
        matches!(self, Self::UnifiedPostal | Self::Postal1 | Self::Postal2)
    }
}

/// Broad compatibility group used by the semantic conflict check: keywords of
/// one group appearing in the strong context of a field from another group
/// are a negative signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldGroup {
    Phone,
    Postal,
    Address,
    Name,
    Email,
    Company,
    Message,
    PersonalInfo,
    Other,
}

impl FieldId {
    pub fn group(self) -> FieldGroup {
        match self {
            Self::UnifiedPhone | Self::Phone1 | Self::Phone2 | Self::Phone3 => FieldGroup::Phone,
            Self::UnifiedPostal | Self::Postal1 | Self::Postal2 => FieldGroup::Postal,
            Self::Address | Self::Prefecture => FieldGroup::Address,
            Self::LastName
            | Self::FirstName
            | Self::LastNameKana
            | Self::FirstNameKana
            | Self::LastNameHiragana
            | Self::FirstNameHiragana
            | Self::UnifiedFullName
            | Self::UnifiedFullNameKana => FieldGroup::Name,
            Self::Email => FieldGroup::Email,
            Self::CompanyName | Self::CompanyNameKana => FieldGroup::Company,
            Self::MessageBody | Self::Subject => FieldGroup::Message,
            Self::Position | Self::Gender => FieldGroup::PersonalInfo,
            Self::Department | Self::WebsiteUrl => FieldGroup::Other,
        }
    }
}

/// Static descriptor for one logical field.
#[derive(Debug)]
pub struct FieldPattern {
    pub field: FieldId,
    /// Relative priority, 7..=26. Order-of-iteration only.
    pub weight: u8,
    pub names: &'static [&'static str],
    pub ids: &'static [&'static str],
    pub classes: &'static [&'static str],
    pub placeholders: &'static [&'static str],
    /// Allowed `type` attribute values; empty means no constraint.
    pub types: &'static [&'static str],
    /// Allowed tag names (`input`, `textarea`, `select`).
    pub tags: &'static [&'static str],
    /// High-confidence anchors for strict context matching.
    pub strict: &'static [&'static str],
    /// Substrings marking the field itself as a kana/furigana input.
    pub kana_indicator: &'static [&'static str],
    /// Tokens that force exclusion of a candidate element.
    pub exclude: &'static [&'static str],
}

impl FieldPattern {
    pub fn is_high_priority(&self) -> bool {
        self.weight >= 15
    }
}

/// Convenience macro to define a FieldPattern.
macro_rules! fp {
    (
        field: $field:expr,
        weight: $weight:expr,
        names: [$($n:expr),* $(,)?],
        ids: [$($i:expr),* $(,)?],
        classes: [$($c:expr),* $(,)?],
        placeholders: [$($p:expr),* $(,)?],
        types: [$($t:expr),* $(,)?],
        tags: [$($g:expr),* $(,)?],
        strict: [$($s:expr),* $(,)?],
        kana: [$($k:expr),* $(,)?],
        exclude: [$($x:expr),* $(,)?]
    ) => {
        FieldPattern {
            field: $field,
            weight: $weight,
            names: &[$($n),*],
            ids: &[$($i),*],
            classes: &[$($c),*],
            placeholders: &[$($p),*],
            types: &[$($t),*],
            tags: &[$($g),*],
            strict: &[$($s),*],
            kana_indicator: &[$($k),*],
            exclude: &[$($x),*],
        }
    };
}

static FIELD_PATTERNS: &[FieldPattern] = &[
    fp! {
        field: FieldId::UnifiedFullName,
        weight: 26,
        names: ["fullname", "full_name", "name", "氏名", "お名前", "ご氏名", "姓名", "your-name",
                "your_name", "namae", "personal_name", "user_name", "member_name", "ご担当者名",
                "担当者名", "担当者"],
        ids: ["fullname", "full-name", "full_name", "name", "氏名", "your-name", "your_name",
              "namae", "personal_name", "user_name", "member_name"],
        classes: ["fullname", "full-name", "name", "your-name", "personal", "user", "member",
                  "contact", "personal_name"],
        placeholders: ["お名前", "氏名", "Name", "Personal Name", "Full Name", "姓名", "フルネーム",
                       "名前を入力してください", "お名前を入力してください", "ご担当者名", "担当者名"],
        types: ["text"],
        tags: ["input"],
        strict: ["fullname", "full_name", "氏名", "お名前", "name", "your-name", "your_name",
                 "姓名", "ご担当者名", "担当者名"],
        kana: [],
        exclude: ["company", "会社", "社名", "corp", "corporation", "firm", "organization",
                  "business", "LOGIN_ID", "PASSWORD", "OTP", "TOTP", "MFAOTP", "captcha",
                  "login_id", "password", "signin", "auth", "verification", "mfa", "phone", "tel",
                  "電話", "zip", "postal", "郵便", "address", "住所", "email", "mail", "メール",
                  "subject", "件名", "message", "本文", "last", "first", "lastname", "firstname",
                  "姓", "kana", "カナ", "フリガナ", "ふりがな", "法人名", "団体名", "組織名",
                  "部署名", "学校名", "店舗名", "病院名", "施設名", "会社名・団体名", "団体・組織名"]
    },
    fp! {
        field: FieldId::CompanyName,
        weight: 25,
        names: ["company", "corp", "corporation", "会社", "会社名", "団体", "団体名", "company_name",
                "firm", "organization", "org", "enterprise", "kaisha", "kaisya", "business",
                "corporate", "company-name", "corporate_name", "business_name", "companyname",
                "organization_name", "org_name", "corp_name", "corporation_name",
                "customer-company-name", "customer_company_name", "your-company", "your_company",
                "affiliation", "affiliations", "affiliation_name", "affiliation-name", "shozoku",
                "shozokusaki", "shozoku_saki"],
        ids: ["company", "corp", "company-name", "company_name", "firm", "org", "business",
              "corporate", "corporate_name", "business_name", "companyname", "organization_name",
              "org_name", "corp_name", "corporation_name"],
        classes: ["company", "corp", "company-name", "firm", "organization", "business",
                  "corporate", "company_name", "companyname", "org_name"],
        placeholders: ["会社名", "Company Name", "会社名を入力してください", "Company", "企業名",
                       "組織名", "法人名", "会社・団体名", "Corporate Name", "Business Name",
                       "Organization", "社名", "御社名", "貴社名", "所属", "ご所属", "所属先",
                       "ご所属先", "Affiliation", "会社名または氏名", "会社名・氏名",
                       "会社名またはお名前", "企業名または氏名"],
        types: ["text"],
        tags: ["input"],
        strict: ["会社", "会社名", "団体名", "company", "corporation", "firm", "enterprise",
                 "business"],
        kana: [],
        exclude: ["your-subject", "your_subject", "subject", "件名", "タイトル", "your-furigana",
                  "your_furigana", "furigana", "LOGIN_ID", "PASSWORD", "OTP", "TOTP", "MFAOTP",
                  "captcha", "login_id", "password", "signin", "auth", "verification", "mfa",
                  "kana", "カナ", "katakana", "hiragana", "フリガナ", "ふりがな", "furi", "yomi",
                  "読み", "sei", "mei", "姓", "lastname", "firstname", "family_name", "given_name",
                  "氏名", "お名前", "your-name", "your_name", "fullname", "full_name", "confirm",
                  "mailcheck", "mail_check", "mail-check", "email_check", "email-check",
                  "confirm_mail", "confirm-email", "mail_confirm", "email_confirm",
                  "mailaddressconfirm", "mail_address_confirm", "email_address_confirm",
                  "管理会社", "kanri", "syunkou", "竣工", "年月日"]
    },
    fp! {
        field: FieldId::LastName,
        weight: 24,
        names: ["lastname", "last_name", "last-name", "family_name", "family-name", "姓", "苗字",
                "sei", "myoji", "surname", "user_name", "member_name", "client_name",
                "contact_name", "person_name", "last-name-kanji", "last_name_kanji",
                "family-name-kanji", "family_name_kanji", "lname", "l_name"],
        ids: ["lastname", "family-name", "last_name", "last-name", "sei", "surname",
              "personal_name", "user_name", "member_name", "last-name-kanji", "last_name_kanji",
              "family-name-kanji", "family_name_kanji"],
        classes: ["lastname", "last-name", "last_name", "input-last-name", "family-name",
                  "surname", "sei", "personal", "user", "member", "contact"],
        placeholders: ["姓", "Last Name", "苗字", "Family Name", "お名前（姓）", "ファミリーネーム",
                       "姓名の姓", "Personal Name", "山田"],
        types: [],
        tags: ["input"],
        strict: ["姓", "苗字", "lastname", "family_name", "surname"],
        kana: [],
        exclude: ["company", "会社", "社名", "corp", "corporation", "firm", "organization",
                  "business", "LOGIN_ID", "PASSWORD", "OTP", "TOTP", "MFAOTP", "captcha",
                  "login_id", "password", "signin", "auth", "verification", "mfa", "phone", "tel",
                  "電話", "zip", "postal", "郵便", "address", "住所", "email", "mail", "メール",
                  "subject", "件名", "message", "本文", "unified_name_field", "法人名", "団体名",
                  "組織名", "部署名", "学校名", "店舗名", "病院名", "施設名", "会社名・団体名",
                  "団体・組織名"]
    },
    fp! {
        field: FieldId::FirstName,
        weight: 23,
        names: ["firstname", "first_name", "first-name", "given_name", "given-name", "名", "mei",
                "forename", "user_name", "member_name", "client_name", "contact_name",
                "person_name", "first-name-kanji", "first_name_kanji", "given-name-kanji",
                "given_name_kanji", "fname", "f_name"],
        ids: ["firstname", "first-name", "first_name", "given_name", "given-name", "mei",
              "personal_name", "user_name", "member_name", "first-name-kanji", "first_name_kanji",
              "given-name-kanji", "given_name_kanji"],
        classes: ["firstname", "first-name", "input-first-name", "given", "mei", "personal",
                  "user", "member", "contact"],
        placeholders: ["名", "First Name", "Given Name", "お名前（名）", "ファーストネーム",
                       "姓名の名", "Personal Name", "太郎"],
        types: [],
        tags: ["input"],
        strict: ["名", "firstname", "first_name", "given_name"],
        kana: [],
        exclude: ["company", "会社", "社名", "corp", "corporation", "firm", "organization",
                  "business", "LOGIN_ID", "PASSWORD", "OTP", "TOTP", "MFAOTP", "captcha",
                  "login_id", "password", "signin", "auth", "verification", "mfa", "phone", "tel",
                  "電話", "zip", "postal", "郵便", "address", "住所", "email", "mail", "メール",
                  "subject", "件名", "message", "本文", "unified_name_field", "法人名", "団体名",
                  "組織名", "部署名", "学校名", "店舗名", "病院名", "施設名", "会社名・団体名",
                  "団体・組織名"]
    },
    fp! {
        field: FieldId::Email,
        weight: 22,
        names: ["email", "mail", "e-mail", "メール", "メールアドレス", "e_mail", "email_address",
                "mail_address", "contact_email", "email_1", "email_2", "your-email", "your_email",
                "emailaddress", "mailaddress", "mailaddr", "emailaddress1", "emailaddress2", "mcon",
                "tkem"],
        ids: ["email", "mail", "e-mail", "email-address", "mail-address", "contact-email",
              "email_1", "email_2", "tkem", "emailaddress", "mailaddress"],
        classes: ["email", "mail", "e-mail", "email-input", "wpcf7-email", "fldemail"],
        placeholders: ["メール", "Email", "メールアドレス", "email@example.com",
                       "連絡先メールアドレス", "your@email.com", "E-mail"],
        types: ["email", "mail", "text"],
        tags: ["input"],
        strict: ["メールアドレス", "メール", "Email", "E-mail", "email", "mail"],
        kana: [],
        exclude: ["LOGIN_ID", "PASSWORD", "OTP", "TOTP", "MFAOTP", "captcha", "login_id",
                  "password", "signin", "auth", "verification", "mfa", "tkph", "phone", "tel",
                  "電話", "check", "confirm", "確認", "q", "search", "検索", "サイト内検索",
                  "site-search", "keyword", "キーワード", "連絡方法", "other_contact",
                  "連絡時間", "時間帯", "contact_time", "time_of_connection"]
    },
    fp! {
        field: FieldId::MessageBody,
        weight: 20,
        names: ["message", "inquiry_body", "inquiry_content", "本文", "メッセージ", "comment",
                "inquiry_message", "contact_message", "message_body", "ご質問・ご要望", "ご質問",
                "ご要望", "question", "request", "お問い合わせ内容", "inquiry", "content",
                "details", "詳細", "備考", "remarks", "remark", "note", "notes", "ご意見",
                "ご感想", "ご相談内容", "ご連絡内容", "お問い合わせの内容", "お問合せ",
                "お問合わせ", "お問合せ内容", "お問合わせ内容", "お問い合わせ", "otoiawase",
                "body"],
        ids: ["message", "inquiry-body", "contact-message", "comment", "inquiry_content",
              "question", "request", "inquiry", "content", "details", "body"],
        classes: ["message", "inquiry", "comment", "inquiry-content", "contact-message",
                  "question", "request", "content", "details"],
        placeholders: ["本文", "Message", "お問い合わせ内容", "メッセージ", "詳細内容",
                       "ご質問・ご相談内容", "お問い合わせの詳細", "お問い合わせ本文",
                       "ご質問・ご要望", "ご質問", "ご要望", "Content", "Details", "備考",
                       "お問い合わせ内容をご記入ください", "ご相談内容", "ご意見・ご要望",
                       "お問い合わせの内容", "お問合せ内容", "お問合わせ内容"],
        types: ["text"],
        tags: ["textarea", "input"],
        strict: ["本文", "メッセージ", "inquiry", "message", "comment", "ご質問・ご要望",
                 "ご質問", "ご要望", "お問合せ", "お問合わせ", "お問い合わせ", "ご相談内容"],
        kana: [],
        exclude: ["LOGIN_ID", "login_id", "login", "signin", "sign_in", "auth", "authentication",
                  "PASSWORD", "password", "pass", "pswd", "OTP", "TOTP", "MFAOTP", "mfa", "otp",
                  "totp", "captcha", "image_auth", "image-auth", "spam-block", "verify",
                  "verification", "q", "search", "検索", "site-search", "keyword"]
    },
    fp! {
        field: FieldId::Subject,
        weight: 19,
        names: ["subject", "inquiry_subject", "件名", "タイトル", "表題", "topic", "heading",
                "inquiry_title", "contact_subject", "subject_line", "your-subject", "your_subject",
                "mail_subject", "email_subject", "inquiry_topic", "contact_topic"],
        ids: ["subject", "topic", "heading", "inquiry-title", "contact-subject", "inquiry_subject",
              "mail_subject", "email_subject", "inquiry_topic"],
        classes: ["subject", "topic", "heading", "inquiry-title", "contact-subject",
                  "subject-line", "mail-subject", "email-subject"],
        placeholders: ["件名", "Subject", "タイトル", "お問い合わせ件名", "Topic", "表題",
                       "Subject Line", "問い合わせ件名", "Mail Subject"],
        types: [],
        tags: ["input"],
        strict: ["件名", "subject", "inquiry_subject", "contact_subject", "タイトル", "topic"],
        kana: [],
        exclude: ["your-name", "your_name", "name", "お名前", "氏名", "fullname", "company",
                  "会社", "corp", "corporation", "zip", "postal", "郵便", "address", "住所",
                  "email", "mail", "メール", "市町村", "都道府県", "prefecture", "city", "town",
                  "kana", "カナ", "フリガナ", "katakana", "hiragana", "番地", "建物", "street",
                  "building", "tkph", "tkna", "tkad", "phone", "tel", "電話", "telephone",
                  "mobile", "連絡先", "job title", "job_title", "job-title", "position", "role",
                  "yakushoku", "役職", "職位", "post"]
    },
    fp! {
        field: FieldId::UnifiedFullNameKana,
        weight: 18,
        names: ["your-name-kana", "name_kana", "fullname_kana", "full_name_kana", "furigana",
                "kana", "katakana", "フリガナ", "カナ", "カタカナ"],
        ids: ["your-name-kana", "name_kana", "fullname_kana", "furigana", "kana", "katakana"],
        classes: ["kana", "katakana", "furigana"],
        placeholders: ["フリガナ", "ふりがな", "カタカナ", "セイ メイ", "セイ　メイ"],
        types: ["text"],
        tags: ["input"],
        strict: ["フリガナ", "カタカナ", "kana", "furigana"],
        kana: ["kana", "カナ", "カタカナ", "furigana", "ruby", "ルビ", "るび"],
        exclude: ["company", "会社", "企業", "法人", "団体", "organization", "zip", "postal",
                  "郵便", "住所", "address", "tel", "phone", "電話", "email", "mail", "メール",
                  "captcha", "認証", "image_auth", "spam-block", "last", "first", "lastname",
                  "firstname", "last_name", "first_name", "last-name", "first-name", "sei", "mei"]
    },
    fp! {
        field: FieldId::LastNameKana,
        weight: 18,
        names: ["last_name_kana", "lastname_kana", "last-name-kana", "kana_last", "katakana_sei",
                "セイ", "カナ姓", "sei_kana", "family_kana", "lastname_katakana", "lastkananame",
                "furigana"],
        ids: ["lastname_kana", "last_name_kana", "last-name-kana", "kana-last", "katakana-sei",
              "sei", "lastname_katakana", "lastkananame", "furigana"],
        classes: ["kana", "katakana", "sei", "kana-lastname", "lastname_kana",
                  "lastname-katakana", "furigana"],
        placeholders: ["セイ", "ヤマダ", "カタカナ", "Kana Last", "姓（カタカナ）",
                       "フリガナ（姓）", "セイ（全角カタカナ）", "Lastname Kana"],
        types: ["text"],
        tags: ["input"],
        strict: ["セイ", "姓カナ", "sei_kana", "lastname_kana", "katakana_sei", "kana"],
        kana: ["kana", "カナ", "katakana", "furigana", "ruby"],
        exclude: ["company", "会社", "corp", "corporation", "firm", "organization", "business",
                  "phone", "tel", "電話", "zip", "postal", "郵便", "address", "住所", "email",
                  "mail", "メール", "subject", "件名", "message", "本文", "漢字", "氏名",
                  "市町村", "都道府県", "prefecture", "city", "unified_name_field", "LOGIN_ID",
                  "login_id", "login", "signin", "sign_in", "auth", "authentication", "PASSWORD",
                  "password", "pass", "pswd", "OTP", "TOTP", "MFAOTP", "mfa", "otp", "totp",
                  "captcha", "image_auth", "image-auth", "spam-block", "verify", "verification"]
    },
    fp! {
        field: FieldId::UnifiedPhone,
        weight: 15,
        names: ["tel", "phone", "電話", "電話番号", "telephone", "mobile", "phone_number",
                "tel_number", "contact", "連絡先", "携帯", "phone_no", "tel_no",
                "連絡先電話番号", "連絡先電話", "contact_phone", "contact_tel"],
        ids: ["tel", "phone", "電話", "telephone", "mobile", "phone-number", "tel-number",
              "contact", "phone_no", "tel_no"],
        classes: ["tel", "phone", "telephone", "mobile", "contact"],
        placeholders: ["電話番号", "Phone", "Tel", "Telephone", "連絡先", "携帯番号",
                       "03-1234-5678", "090-1234-5678", "固定電話", "携帯電話", "連絡先電話番号",
                       "連絡先電話", "Contact Phone"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["tel", "phone", "電話", "電話番号", "telephone", "連絡先電話番号"],
        kana: [],
        exclude: ["fax", "ファックス", "ファクス", "FAX", "your-name", "your_name", "name",
                  "お名前", "氏名", "captcha", "CAPTCHA", "送信確認", "verification", "verify",
                  "security", "confirm", "validation", "code", "fullname", "personal_name", "姓",
                  "名", "lastname", "firstname", "subject", "件名", "タイトル", "topic", "title",
                  "mail_subject", "email_subject", "inquiry_subject", "contact_subject", "mail",
                  "email", "メール", "mailcheck", "mail_check", "mail-check", "email_check",
                  "email-check", "confirm_mail", "confirm_email", "確認用メール",
                  "メールアドレス確認", "postal", "zip", "郵便", "郵便番号", "postcode",
                  "zipcode", "住所", "address", "addr", "市区町村", "都道府県", "丁目", "番地",
                  "building", "年齢", "age", "来場", "人数", "大人", "子供", "adult", "child",
                  "visitor", "建築", "エリア", "希望", "時間", "日時", "予約", "area", "time",
                  "date", "reservation", "本文", "message", "content"]
    },
    fp! {
        field: FieldId::Prefecture,
        weight: 14,
        names: ["pref", "prefecture", "todouhuken", "todofuken", "都道府県", "region"],
        ids: ["pref", "prefecture", "region", "p-region"],
        classes: ["pref", "prefecture", "p-region", "region"],
        placeholders: ["都道府県", "Prefecture"],
        types: ["text"],
        tags: ["select", "input"],
        strict: ["都道府県", "prefecture", "pref"],
        kana: [],
        exclude: ["name", "お名前", "氏名", "fullname", "kana", "カナ", "フリガナ", "ふりがな",
                  "email", "mail", "メール", "phone", "tel", "電話", "zip", "postal", "郵便",
                  "件名", "subject", "message", "本文", "address", "addr", "street", "building",
                  "apartment", "room", "号室", "address1", "address_1", "address2", "address_2",
                  "address3", "address_3", "address4", "address_4", "address5", "address_5",
                  "city", "ward", "区", "市", "町", "村", "丁目", "番地"]
    },
    fp! {
        field: FieldId::Address,
        weight: 13,
        names: ["address", "住所", "所在地", "address_1", "address_2", "address_3", "address_4",
                "address_5", "都道府県", "市区町村", "番地", "建物", "street", "prefecture",
                "city", "building", "street_address", "区", "市区", "ビル", "部屋番号", "room",
                "apt", "apartment", "マンション", "town", "addr", "pref", "city_name",
                "town_name", "building_name"],
        ids: ["address", "address_1", "address_2", "address_3", "address_4", "address_5",
              "prefecture", "city", "street", "building", "pref", "addr", "room", "apt",
              "apartment", "building_name"],
        classes: ["address", "prefecture", "city", "street", "building", "addr", "pref"],
        placeholders: ["住所", "Address", "都道府県", "市区町村", "番地・建物名", "東京都新宿区",
                       "1-1-1", "Street Address", "区・町名", "番地", "建物名・部屋番号",
                       "ビル・マンション名", "部屋番号"],
        types: ["text"],
        tags: ["input", "select"],
        strict: ["住所", "所在地", "address"],
        kana: [],
        exclude: ["your-name", "your_name", "name", "お名前", "氏名", "fullname", "first_name",
                  "last_name", "姓", "名", "company", "会社", "corp", "corporation", "phone",
                  "tel", "電話", "email", "mail", "メール", "subject", "件名", "message", "本文",
                  "kana", "カナ", "フリガナ", "katakana", "hiragana", "ふりがな", "zip", "postal",
                  "郵便番号"]
    },
    fp! {
        field: FieldId::FirstNameKana,
        weight: 12,
        names: ["first_name_kana", "firstname_kana", "first-name-kana", "kana_first",
                "katakana_mei", "メイ", "カナ名", "mei_kana", "given_kana", "firstname_katakana",
                "kana", "furigana"],
        ids: ["firstname_kana", "first_name_kana", "first-name-kana", "kana-first",
              "katakana-mei", "mei", "firstname_katakana", "furigana"],
        classes: ["kana", "katakana", "mei", "kana-firstname", "firstname_kana",
                  "firstname-katakana", "furigana"],
        placeholders: ["メイ", "タロウ", "カタカナ", "Kana First", "名（カタカナ）",
                       "フリガナ（名）", "メイ（全角カタカナ）", "Firstname Kana"],
        types: ["text"],
        tags: ["input"],
        strict: ["メイ", "名カナ", "mei_kana", "firstname_kana", "katakana_mei", "kana"],
        kana: ["kana", "カナ", "katakana", "furigana", "ruby"],
        exclude: ["company", "会社", "corp", "corporation", "firm", "organization", "business",
                  "phone", "tel", "電話", "zip", "postal", "郵便", "address", "住所", "email",
                  "mail", "メール", "subject", "件名", "message", "本文", "漢字", "氏名",
                  "市町村", "都道府県", "prefecture", "city", "town", "unified_name_field",
                  "LOGIN_ID", "login_id", "login", "signin", "sign_in", "auth", "authentication",
                  "PASSWORD", "password", "pass", "pswd", "OTP", "TOTP", "MFAOTP", "mfa", "otp",
                  "totp", "captcha", "image_auth", "image-auth", "spam-block", "verify",
                  "verification"]
    },
    fp! {
        field: FieldId::CompanyNameKana,
        weight: 12,
        names: ["company_kana", "corp_kana", "company_name_kana", "corporation_kana", "会社名カナ",
                "会社カナ", "kaisha_kana", "kaisya_kana", "firm_kana", "company_ruby", "corp_ruby",
                "organization_ruby", "org_ruby", "company_furigana", "corporation_furigana",
                "org_furigana"],
        ids: ["company_kana", "corp_kana", "company-name-kana", "corporation-kana",
              "company_name_kana", "company_ruby", "corp_ruby", "organization_ruby", "org_ruby",
              "company_furigana"],
        classes: ["company-kana", "corp-kana", "kana", "ruby", "furigana", "company_name_kana"],
        placeholders: ["会社名カナ", "カブシキガイシャ", "Company Kana", "コーポレーション",
                       "法人名（カタカナ）", "会社名（カタカナ）", "組織名カナ",
                       "会社名または氏名(ふりがな)", "会社名または氏名（ふりがな）"],
        types: [],
        tags: ["input"],
        strict: ["会社名カナ", "会社カナ", "company_kana", "company_name_kana"],
        kana: ["kana", "カナ", "katakana", "furigana", "ruby", "ルビ", "るび"],
        exclude: ["zip", "postal", "郵便", "郵便番号", "postcode", "zipcode", "address", "住所",
                  "addr", "phone", "tel", "電話", "fax", "ファックス", "your-name", "your_name",
                  "name", "お名前", "fullname", "personal_name", "email", "mail", "メール",
                  "団体", "団体名", "会社名・団体名"]
    },
    fp! {
        field: FieldId::Phone1,
        weight: 12,
        names: ["phone_1", "phone1", "tel1", "tel_1", "電話1", "市外局番", "area_code",
                "phone_area", "tel_area", "area"],
        ids: ["phone_1", "phone1", "tel1", "tel-1", "area-code", "phone-area"],
        classes: ["tel", "phone", "tel1", "area", "area-code", "phone_1"],
        placeholders: ["03", "市外局番", "Area", "Phone1", "電話番号（市外局番）", "0X", "局番1"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["phone_1", "tel_1", "tel1", "市外局番"],
        kana: [],
        exclude: ["fax", "ファックス", "ファクス", "FAX", "お名前", "氏名", "name", "fullname",
                  "your_name", "personal_name", "姓", "名", "lastname", "firstname", "kana",
                  "カナ", "フリガナ", "ふりがな", "katakana", "hiragana", "yomi", "読み", "郵便",
                  "郵便番号", "postal", "zip", "postcode", "zipcode", "住所", "address", "addr",
                  "市区町村", "都道府県", "丁目", "番地", "building", "年齢", "age", "来場",
                  "人数", "大人", "子供", "adult", "child", "visitor", "建築", "エリア", "希望",
                  "時間", "日時", "予約", "area", "time", "date", "reservation", "email", "mail",
                  "メール", "件名", "subject", "本文", "message", "content", "captcha", "CAPTCHA",
                  "送信確認", "確認", "verification", "verify", "security", "confirm",
                  "validation", "code"]
    },
    fp! {
        field: FieldId::Phone2,
        weight: 12,
        names: ["phone_2", "phone2", "tel2", "tel_2", "電話2", "局番", "exchange",
                "phone_exchange", "tel_exchange", "local"],
        ids: ["phone_2", "phone2", "tel2", "tel-2", "exchange", "phone-exchange"],
        classes: ["tel", "phone", "tel2", "exchange", "local", "phone_2"],
        placeholders: ["1234", "局番", "Exchange", "Phone2", "電話番号（市内局番）", "局番2"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["phone_2", "tel_2", "tel2"],
        kana: [],
        exclude: ["fax", "ファックス", "ファクス", "FAX", "お名前", "氏名", "name", "fullname",
                  "your_name", "personal_name", "姓", "名", "lastname", "firstname", "kana",
                  "カナ", "フリガナ", "ふりがな", "katakana", "hiragana", "yomi", "読み", "郵便",
                  "郵便番号", "postal", "zip", "postcode", "zipcode", "住所", "address", "addr",
                  "市区町村", "都道府県", "丁目", "番地", "building", "年齢", "age", "来場",
                  "人数", "大人", "子供", "adult", "child", "visitor", "建築", "エリア", "希望",
                  "時間", "日時", "予約", "area", "time", "date", "reservation", "email", "mail",
                  "メール", "件名", "subject", "本文", "message", "content", "captcha", "CAPTCHA",
                  "送信確認", "確認", "verification", "verify", "security", "confirm",
                  "validation", "code"]
    },
    fp! {
        field: FieldId::Phone3,
        weight: 12,
        names: ["phone_3", "phone3", "tel3", "tel_3", "電話3", "tel_subscriber", "phone_number",
                "tel_number", "subscriber"],
        ids: ["phone_3", "phone3", "tel3", "tel-3", "phone-number", "tel-number"],
        classes: ["tel", "phone", "tel3", "subscriber", "phone_3"],
        placeholders: ["5678", "Phone3", "電話番号（番号）", "番号3", "下4桁"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["phone_3", "tel_3", "tel3", "subscriber"],
        kana: [],
        exclude: ["fax", "ファックス", "ファクス", "FAX", "お名前", "氏名", "name", "fullname",
                  "your_name", "personal_name", "姓", "名", "lastname", "firstname", "kana",
                  "カナ", "フリガナ", "ふりがな", "katakana", "hiragana", "yomi", "読み", "郵便",
                  "郵便番号", "postal", "zip", "postcode", "zipcode", "住所", "address", "addr",
                  "市区町村", "都道府県", "丁目", "番地", "building", "年齢", "age", "来場",
                  "人数", "大人", "子供", "adult", "child", "visitor", "建築", "エリア", "希望",
                  "時間", "日時", "予約", "area", "time", "date", "reservation", "email", "mail",
                  "メール", "件名", "subject", "本文", "message", "content", "captcha", "CAPTCHA",
                  "送信確認", "確認", "verification", "verify", "security", "confirm",
                  "validation", "code"]
    },
    fp! {
        field: FieldId::Postal1,
        weight: 12,
        names: ["postal_code_1", "zip1", "postal1", "post1", "郵便1", "郵便番号1", "zipcode1",
                "postcode1", "zip_code1", "zip_left", "postal_left", "post_left", "zipcode_left",
                "postcode_left"],
        ids: ["postal_code_1", "zip1", "postal1", "post-1", "zipcode1", "postcode1", "zip_left",
              "postal_left", "post_left", "zipcode_left", "postcode_left"],
        classes: ["zip", "postal", "zip1", "postcode", "zipcode", "postal_code_1", "zip_left"],
        placeholders: ["123", "郵便番号", "Zip1", "Post1", "〒前3桁", "郵便番号（前3桁）"],
        types: ["text"],
        tags: ["input"],
        strict: ["postal_code_1", "zip1", "郵便番号1"],
        kana: [],
        exclude: ["address", "住所", "addr", "street", "building", "番地", "市区町村", "都道府県",
                  "prefecture", "city", "town", "fax", "ファックス", "your-fax", "your_fax",
                  "phone", "tel", "電話", "company", "会社", "kana", "カナ", "フリガナ",
                  "ふりがな", "katakana", "hiragana", "yomi", "読み", "your-name", "your_name",
                  "name", "お名前", "store", "支店", "部署", "department", "your-store",
                  "your_store", "shop", "来場", "人数", "大人", "子供", "年齢", "age", "visitor",
                  "adult", "child", "建築", "エリア", "希望", "時間", "日時", "予約", "area",
                  "time", "date", "reservation", "件名", "subject", "本文", "message", "content",
                  "email", "mail", "メール", "captcha", "CAPTCHA", "送信確認", "確認",
                  "verification", "verify", "security", "confirm", "validation", "code"]
    },
    fp! {
        field: FieldId::Postal2,
        weight: 12,
        names: ["postal_code_2", "zip2", "postal2", "post2", "郵便2", "郵便番号2", "zipcode2",
                "postcode2", "zip_code2", "zip_right", "postal_right", "post_right",
                "zipcode_right", "postcode_right"],
        ids: ["postal_code_2", "zip2", "postal2", "post-2", "zipcode2", "postcode2", "zip_right",
              "postal_right", "post_right", "zipcode_right", "postcode_right"],
        classes: ["zip", "postal", "zip2", "postcode", "zipcode", "postal_code_2", "zip_right"],
        placeholders: ["4567", "郵便番号", "Zip2", "Post2", "〒後4桁", "郵便番号（後4桁）"],
        types: ["text"],
        tags: ["input"],
        strict: ["postal_code_2", "zip2", "郵便番号2"],
        kana: [],
        exclude: ["address", "住所", "addr", "street", "building", "番地", "市区町村", "都道府県",
                  "prefecture", "city", "town", "fax", "ファックス", "your-fax", "your_fax",
                  "phone", "tel", "電話", "company", "会社", "kana", "カナ", "フリガナ",
                  "ふりがな", "katakana", "hiragana", "yomi", "読み", "your-name", "your_name",
                  "name", "お名前", "store", "支店", "部署", "department", "your-store",
                  "your_store", "shop", "captcha", "CAPTCHA", "送信確認", "確認", "verification",
                  "verify", "security", "confirm", "validation", "code"]
    },
    // Single-input postal code. Upstream pattern data carries this entry twice
    // (weights 12 and 8); the catalog collapses duplicates at load keeping the
    // larger weight, see Catalog::global().
    fp! {
        field: FieldId::UnifiedPostal,
        weight: 12,
        names: ["zip", "postal", "postcode", "zipcode", "郵便番号", "郵便", "postal_code",
                "post_code", "zip_code", "〒"],
        ids: ["zip", "postal", "postcode", "zipcode", "郵便番号", "postal_code", "post_code",
              "zip_code"],
        classes: ["zip", "postal", "postcode", "zipcode"],
        placeholders: ["郵便番号", "0000000", "123-4567", "〒", "Postal Code", "Zip Code",
                       "Post Code", "1234567"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["郵便番号", "zip", "postal", "postcode", "zipcode"],
        kana: [],
        exclude: ["address", "住所", "addr", "street", "building", "市区町村", "都道府県",
                  "prefecture", "phone", "tel", "電話", "fax", "ファックス", "your-name",
                  "your_name", "name", "お名前", "fullname", "email", "mail", "メール", "company",
                  "会社", "captcha", "image_auth", "image-auth", "spam-block", "token", "otp",
                  "totp", "mfa", "verification", "verify", "confirm", "確認", "code"]
    },
    fp! {
        field: FieldId::UnifiedPostal,
        weight: 8,
        names: ["zip", "postal", "postcode", "zipcode", "郵便番号", "postal_code", "post_code"],
        ids: ["zip", "postal", "postcode", "zipcode", "postal_code", "post_code"],
        classes: ["zip", "postal", "postcode", "zipcode"],
        placeholders: ["郵便番号", "〒", "Zip", "Post"],
        types: ["tel", "text"],
        tags: ["input"],
        strict: ["郵便番号", "zip", "postal", "postcode", "zipcode"],
        kana: [],
        exclude: ["address", "住所", "addr", "street", "building", "市区町村", "都道府県",
                  "prefecture", "phone", "tel", "電話", "fax", "メール", "email", "mail",
                  "your-name", "your_name", "name", "お名前", "氏名", "fullname", "captcha",
                  "verification", "confirm", "確認", "code"]
    },
    fp! {
        field: FieldId::Position,
        weight: 11,
        names: ["position", "job_position", "role", "役職", "職位", "yakushoku", "job_title",
                "post"],
        ids: ["position", "job_position", "role", "yakushoku", "job_title"],
        classes: ["position", "job-position", "role", "yakushoku"],
        placeholders: ["役職", "Position", "職位", "お役職", "Job Title", "部長・課長等", "役職名"],
        types: [],
        tags: ["input", "select"],
        strict: ["役職", "職位", "position", "job_title", "yakushoku"],
        kana: [],
        exclude: ["your-name", "your_name", "name", "お名前", "fullname", "personal_name", "姓",
                  "名", "lastname", "firstname", "company", "会社", "email", "mail", "メール",
                  "zip", "postal", "郵便", "address", "住所", "tel", "phone", "電話", "fax",
                  "ファックス", "お問い合わせ", "お問合せ", "ジャンル", "種別", "カテゴリー",
                  "カテゴリ", "category"]
    },
    fp! {
        field: FieldId::LastNameHiragana,
        weight: 10,
        names: ["last_name_hiragana", "lastname_hiragana", "hiragana_last", "hiragana_sei",
                "ひらがな姓", "sei_hiragana", "姓ふりがな"],
        ids: ["lastname_hiragana", "last_name_hiragana", "hiragana-last", "hiragana-sei"],
        classes: ["hiragana", "sei", "hiragana-lastname", "lastname_hiragana"],
        placeholders: ["せい", "やまだ", "ひらがな", "ふりがな", "姓ふりがな", "姓（ひらがな）",
                       "ふりがな（姓）", "せい（ひらがな）"],
        types: [],
        tags: ["input"],
        strict: ["せい", "姓ふりがな", "sei_hiragana", "lastname_hiragana"],
        kana: ["hiragana", "ひらがな", "ふりがな", "furigana"],
        exclude: ["zip", "postal", "郵便", "郵便番号", "postcode", "zipcode", "address", "住所",
                  "addr", "phone", "tel", "電話", "fax", "ファックス", "your-fax", "your_fax",
                  "company", "会社", "email", "mail", "メール", "katakana", "カタカナ", "kana"]
    },
    fp! {
        field: FieldId::FirstNameHiragana,
        weight: 10,
        names: ["first_name_hiragana", "firstname_hiragana", "hiragana_first", "hiragana_mei",
                "ひらがな名", "mei_hiragana", "名ふりがな"],
        ids: ["firstname_hiragana", "first_name_hiragana", "hiragana-first", "hiragana-mei"],
        classes: ["hiragana", "mei", "hiragana-firstname", "firstname_hiragana"],
        placeholders: ["めい", "たろう", "ひらがな", "ふりがな", "名ふりがな", "名（ひらがな）",
                       "ふりがな（名）", "めい（ひらがな）"],
        types: [],
        tags: ["input"],
        strict: ["めい", "名ふりがな", "mei_hiragana", "firstname_hiragana"],
        kana: ["hiragana", "ひらがな", "ふりがな", "furigana"],
        exclude: ["company", "会社", "corp", "corporation", "firm", "organization", "business",
                  "zip", "postal", "郵便", "address", "住所", "email", "mail", "メール", "phone",
                  "tel", "電話", "fax", "ファックス", "unified_name_field", "来場", "人数",
                  "大人", "子供", "年齢", "age", "visitor", "adult", "child", "建築", "エリア",
                  "希望", "時間", "日時", "予約", "area", "time", "date", "reservation", "件名",
                  "subject", "本文", "message", "content", "katakana", "カタカナ", "kana"]
    },
    fp! {
        field: FieldId::Gender,
        weight: 9,
        names: ["gender", "sex", "性別", "seibetsu", "male_female"],
        ids: ["gender", "sex", "seibetsu", "male_female"],
        classes: ["gender", "sex", "seibetsu"],
        placeholders: ["性別", "Gender", "男性・女性", "選択してください", "Sex", "男女"],
        types: ["radio"],
        tags: ["select", "input"],
        strict: ["性別", "gender", "seibetsu"],
        kana: [],
        exclude: ["name", "your-name", "your_name", "お名前", "氏名", "fullname", "personal_name",
                  "姓", "名", "lastname", "firstname", "company", "会社", "email", "mail",
                  "メール", "tel", "phone", "電話", "address", "住所", "postal", "郵便", "zip",
                  "年齢", "age", "歳", "希望連絡時間帯", "連絡時間", "時間帯", "contact_time",
                  "time_of_connection"]
    },
    fp! {
        field: FieldId::Department,
        weight: 8,
        names: ["department", "dept", "division", "部署", "部署名", "busho", "busyo", "section",
                "team", "group"],
        ids: ["department", "dept", "busho", "division", "section"],
        classes: ["department", "dept", "division", "section"],
        placeholders: ["部署名", "Department", "部署", "Division", "所属部署", "部門", "課", "係"],
        types: [],
        tags: ["input"],
        strict: ["部署", "部署名", "department"],
        kana: [],
        exclude: []
    },
    fp! {
        field: FieldId::WebsiteUrl,
        weight: 7,
        names: ["url", "website", "homepage", "企業URL", "サイト", "web", "site", "company_url",
                "website_url", "homepage_url"],
        ids: ["url", "website", "homepage", "company-url", "site", "web", "website_url"],
        classes: ["url", "website", "homepage", "site"],
        placeholders: ["https://", "URL", "企業URL", "Website", "ホームページ", "会社サイト",
                       "webサイト"],
        types: ["url"],
        tags: ["input"],
        strict: ["url", "website", "homepage"],
        kana: [],
        exclude: []
    },
];

/// Process-wide catalog of logical fields, weight-ordered.
pub struct Catalog {
    ordered: Vec<&'static FieldPattern>,
    by_field: HashMap<FieldId, &'static FieldPattern>,
}

impl Catalog {
    /// Global catalog instance. Duplicate entries for the same field are
    /// collapsed keeping the larger weight; a warning is emitted because a
    /// duplicate always indicates drifted pattern data.
    pub fn global() -> &'static Catalog {
        static CATALOG: LazyLock<Catalog> = LazyLock::new(Catalog::build);
        &CATALOG
    }

    fn build() -> Catalog {
        let mut by_field: HashMap<FieldId, &'static FieldPattern> = HashMap::new();
        for fp in FIELD_PATTERNS {
            match by_field.get(&fp.field) {
                Some(existing) => {
                    warn!(
                        field = fp.field.key(),
                        kept = existing.weight.max(fp.weight),
                        dropped = existing.weight.min(fp.weight),
                        "duplicate catalog entry collapsed, keeping larger weight"
                    );
                    if fp.weight > existing.weight {
                        by_field.insert(fp.field, fp);
                    }
                }
                None => {
                    by_field.insert(fp.field, fp);
                }
            }
        }
        let mut ordered: Vec<&'static FieldPattern> = by_field.values().copied().collect();
        // Stable order: weight desc, then canonical key for determinism.
        ordered.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.field.key().cmp(b.field.key())));
        Catalog { ordered, by_field }
    }

    /// All patterns, highest weight first.
    pub fn ordered(&self) -> &[&'static FieldPattern] {
        &self.ordered
    }

    pub fn get(&self, field: FieldId) -> Option<&'static FieldPattern> {
        self.by_field.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Tokens used by the unified-field handlers to recognize variants.
pub fn unified_field_patterns() -> &'static HashMap<&'static str, Vec<&'static str>> {
    static PATTERNS: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
        HashMap::from([
            (
                "fullname",
                vec!["fullname", "full_name", "氏名", "name", "お名前", "ご氏名", "namae", "your-name", "your_name"],
            ),
            ("kana_unified", vec!["kana", "katakana", "カナ", "カタカナ", "フリガナ"]),
            ("hiragana_unified", vec!["furigana", "hiragana", "ひらがな", "ふりがな"]),
            ("phone_unified", vec!["phone", "tel", "電話番号", "電話", "telephone"]),
            ("address_unified", vec!["address", "住所", "addr", "所在地", "full_address"]),
            ("zipcode_unified", vec!["zipcode", "postal_code", "郵便番号", "zip", "postcode"]),
        ])
    });
    &PATTERNS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_fields_once() {
        let catalog = Catalog::global();
        assert_eq!(catalog.len(), 26);
        let mut seen = std::collections::HashSet::new();
        for fp in catalog.ordered() {
            assert!(seen.insert(fp.field), "duplicate field {:?}", fp.field);
        }
    }

    #[test]
    fn duplicate_postal_entry_keeps_larger_weight() {
        let catalog = Catalog::global();
        assert_eq!(catalog.get(FieldId::UnifiedPostal).unwrap().weight, 12);
    }

    #[test]
    fn iteration_is_weight_descending() {
        let catalog = Catalog::global();
        let weights: Vec<u8> = catalog.ordered().iter().map(|p| p.weight).collect();
        let mut sorted = weights.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(weights, sorted);
        assert_eq!(catalog.ordered()[0].field, FieldId::UnifiedFullName);
    }

    #[test]
    fn high_priority_threshold() {
        let catalog = Catalog::global();
        assert!(catalog.get(FieldId::Email).unwrap().is_high_priority());
        assert!(catalog.get(FieldId::UnifiedPhone).unwrap().is_high_priority());
        assert!(!catalog.get(FieldId::Prefecture).unwrap().is_high_priority());
        assert!(!catalog.get(FieldId::WebsiteUrl).unwrap().is_high_priority());
    }

    #[test]
    fn kana_predicates() {
        assert!(FieldId::LastNameKana.is_kana());
        assert!(FieldId::FirstNameHiragana.is_hiragana());
        assert!(!FieldId::LastName.is_reading());
        assert!(FieldId::UnifiedFullName.is_plain_personal_name());
        assert!(FieldId::LastNameKana.is_personal_name_like());
        assert!(!FieldId::CompanyName.is_personal_name_like());
    }
}
