//! Default values for configuration fields.

use std::time::Duration;

pub fn default_page_load_timeout() -> Duration {
    Duration::from_secs(15)
}

pub fn default_element_wait_timeout() -> Duration {
    Duration::from_secs(15)
}

pub fn default_click_timeout() -> Duration {
    Duration::from_secs(5)
}

pub fn default_preprocessing_timeout() -> Duration {
    Duration::from_secs(30)
}

pub fn default_dynamic_message_timeout() -> Duration {
    Duration::from_secs(15)
}

pub fn default_dom_monitoring_timeout() -> Duration {
    Duration::from_secs(10)
}

pub fn default_js_execution_timeout() -> Duration {
    Duration::from_secs(8)
}

pub fn default_ajax_settle() -> Duration {
    Duration::from_secs(2)
}

pub fn default_top_k_full_score() -> usize {
    5
}

pub fn default_true() -> bool {
    true
}

pub fn default_search_radius() -> f64 {
    150.0
}

pub fn default_max_text_length() -> usize {
    200
}

pub fn default_min_text_length() -> usize {
    2
}

pub fn default_confidence_threshold() -> f64 {
    0.3
}

pub fn default_consent_proximity_px() -> f64 {
    600.0
}

pub fn default_consent_max_scan() -> usize {
    20
}

pub fn default_consent_max_to_check() -> usize {
    2
}

pub fn default_consent_min_score() -> f64 {
    2.0
}

pub fn default_consent_vertical_offset() -> f64 {
    30.0
}

pub fn default_consent_max_attempts() -> usize {
    3
}

pub fn default_consent_must_keywords() -> Vec<String> {
    ["同意", "consent", "agree"].map(String::from).to_vec()
}

pub fn default_consent_context_keywords() -> Vec<String> {
    ["個人情報", "プライバシ", "privacy", "policy", "個人データ", "terms", "規約", "取扱"]
        .map(String::from)
        .to_vec()
}

pub fn default_consent_negative_keywords() -> Vec<String> {
    ["メルマガ", "newsletter", "配信", "案内", "広告", "キャンペーン"]
        .map(String::from)
        .to_vec()
}

pub fn default_primary_button_keywords() -> Vec<String> {
    ["送信", "送る", "submit", "send"].map(String::from).to_vec()
}

pub fn default_secondary_button_keywords() -> Vec<String> {
    ["完了", "complete", "確定", "confirm", "実行", "execute", "登録", "register"]
        .map(String::from)
        .to_vec()
}

pub fn default_confirmation_button_keywords() -> Vec<String> {
    [
        "確認", "次", "review", "confirm", "進む", "next", "続行", "continue", "確認画面",
        "確認する", "内容確認", "入力内容を確認", "確認画面へ", "確認ページ", "チェック", "check",
    ]
    .map(String::from)
    .to_vec()
}

pub fn default_final_button_keywords() -> Vec<String> {
    [
        "送信する", "この内容で送信", "確認して送信", "応募", "応募する", "申込", "申し込み",
        "申込み", "エントリー", "エントリーする", "お問い合わせ送信", "登録する", "確定する",
        "決定する", "注文する", "送信", "submit", "send", "完了", "決定", "確定",
    ]
    .map(String::from)
    .to_vec()
}

pub fn default_exclude_button_keywords() -> Vec<String> {
    [
        "キャンセル", "cancel", "戻る", "back", "リセット", "reset", "クリア", "clear", "検索",
        "search", "ログイン", "login",
    ]
    .map(String::from)
    .to_vec()
}

pub fn default_fallback_selectors() -> Vec<String> {
    ["#submit", ".submit", "[name*=\"submit\"]", "[class*=\"submit\"]"]
        .map(String::from)
        .to_vec()
}

pub fn default_choice_priority_primary() -> Vec<String> {
    ["営業", "提案", "メール", "法人"].map(String::from).to_vec()
}

pub fn default_choice_priority_secondary() -> Vec<String> {
    ["その他"].map(String::from).to_vec()
}

pub fn default_choice_priority_tertiary() -> Vec<String> {
    ["問い合わせ", "問合"].map(String::from).to_vec()
}

pub fn default_select_exclude_keywords() -> Vec<String> {
    [
        "選択", "選択してください", "ご選択", "お選び", "お選びください", "選んで",
        "選んでください", "choose", "please choose", "select", "please select", "未選択", "---",
        "—", "–",
    ]
    .map(String::from)
    .to_vec()
}

pub fn default_name_separator() -> String {
    " ".into()
}

pub fn default_phone_separator() -> String {
    "".into()
}

pub fn default_postal_separator() -> String {
    "".into()
}

pub fn default_mutation_threshold() -> u64 {
    5
}

pub fn default_cleared_ratio() -> f64 {
    0.5
}
