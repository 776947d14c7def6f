//! Concrete input values for mapped elements.
//!
//! Resolves every mapping entry against the client record, honoring the
//! entry's `auto_action` first. Combined values (full name, unified kana,
//! joined phone/postal, composed address) are built here so the engine only
//! ever sees ready-to-send values.

use serde::Serialize;

use crate::config::ValuesConfig;
use crate::dom::DomSnapshot;
use crate::models::{AutoAction, ClientFields, FieldMapping};

/// What to do with one element during the fill phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InputValue {
    Text(String),
    Check(bool),
    SelectIndex(usize),
    /// Select the option whose label contains the given text.
    SelectLabel(String),
}

/// One fill instruction.
#[derive(Debug, Clone, Serialize)]
pub struct FieldInput {
    pub key: String,
    pub element: usize,
    pub selector: String,
    pub tag_name: String,
    pub input_type: String,
    pub required: bool,
    pub value: InputValue,
}

/// Resolves all mapping entries into fill instructions. Entries whose value
/// resolves to an empty string are skipped.
pub fn assign_values(
    mapping: &FieldMapping,
    client: &ClientFields,
    config: &ValuesConfig,
    snapshot: &DomSnapshot,
) -> Vec<FieldInput> {
    let mut inputs = Vec::new();

    for (key, entry) in &mapping.entries {
        let value = match &entry.auto_action {
            Some(AutoAction::Check) => Some(InputValue::Check(true)),
            Some(AutoAction::Uncheck) => Some(InputValue::Check(false)),
            Some(AutoAction::SelectIndex(i)) => Some(InputValue::SelectIndex(*i)),
            Some(AutoAction::SelectByAlgorithm) => {
                prefecture_target(client).map(InputValue::SelectLabel)
            }
            Some(AutoAction::CopyFrom(source)) => {
                field_value(source, client, config, snapshot, entry.element)
                    .map(InputValue::Text)
            }
            Some(AutoAction::Fill) | None => entry
                .default_value
                .as_ref()
                .and_then(|v| v.as_str().map(str::to_string))
                .or_else(|| field_value(key, client, config, snapshot, entry.element))
                .map(InputValue::Text),
        };

        let Some(value) = value else { continue };
        if let InputValue::Text(text) = &value {
            if text.is_empty() {
                continue;
            }
        }
        inputs.push(FieldInput {
            key: key.clone(),
            element: entry.element,
            selector: entry.selector.clone(),
            tag_name: entry.tag_name.clone(),
            input_type: entry.input_type.clone(),
            required: entry.required,
            value,
        });
    }

    inputs
}

/// Client value for one mapping key. `auto_phone_part_N` and the catalog
/// keys share this resolver through `CopyFrom`.
fn field_value(
    key: &str,
    client: &ClientFields,
    config: &ValuesConfig,
    snapshot: &DomSnapshot,
    element: usize,
) -> Option<String> {
    let get = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    match key {
        "company_name" => get(&client.company_name),
        "company_name_kana" => get(&client.company_name_kana),
        "department" => get(&client.department),
        "position" => get(&client.position),
        "gender" => get(&client.gender),
        "last_name" => get(&client.last_name),
        "first_name" => get(&client.first_name),
        "last_name_kana" => get(&client.last_name_kana),
        "first_name_kana" => get(&client.first_name_kana),
        "last_name_hiragana" => get(&client.last_name_hiragana),
        "first_name_hiragana" => get(&client.first_name_hiragana),
        "email" | "email_confirmation" => get(&client.email_1),
        "website_url" => get(&client.website_url),
        "subject" => get(&client.subject),
        "message_body" => get(&client.message),
        "unified_full_name" => {
            join_nonempty(&[&client.last_name, &client.first_name], &config.name_separator)
        }
        "unified_full_name_kana" => {
            // Katakana by default; hiragana when the element itself asks for
            // hiragana.
            if element_prefers_hiragana(snapshot, element) {
                join_nonempty(
                    &[&client.last_name_hiragana, &client.first_name_hiragana],
                    &config.name_separator,
                )
                .or_else(|| {
                    join_nonempty(
                        &[&client.last_name_kana, &client.first_name_kana],
                        &config.name_separator,
                    )
                })
            } else {
                join_nonempty(
                    &[&client.last_name_kana, &client.first_name_kana],
                    &config.name_separator,
                )
            }
        }
        "unified_phone" | "auto_fax" => join_nonempty(
            &[&client.phone_1, &client.phone_2, &client.phone_3],
            &config.phone_separator,
        ),
        "phone_1" | "auto_phone_part_1" => get(&client.phone_1),
        "phone_2" | "auto_phone_part_2" => get(&client.phone_2),
        "phone_3" | "auto_phone_part_3" => get(&client.phone_3),
        "unified_postal" => join_nonempty(
            &[&client.postal_code_1, &client.postal_code_2],
            &config.postal_separator,
        ),
        "postal_1" => get(&client.postal_code_1),
        "postal_2" => get(&client.postal_code_2),
        "address" => join_nonempty(
            &[
                &client.address_1,
                &client.address_2,
                &client.address_3,
                &client.address_4,
                &client.address_5,
            ],
            "",
        ),
        "prefecture" => prefecture_target(client),
        _ => None,
    }
}

fn join_nonempty(parts: &[&Option<String>], separator: &str) -> Option<String> {
    let filled: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|s| !s.is_empty())
        .collect();
    if filled.is_empty() {
        None
    } else {
        Some(filled.join(separator))
    }
}

fn element_prefers_hiragana(snapshot: &DomSnapshot, element: usize) -> bool {
    let Some(el) = snapshot.elements.get(element) else {
        return false;
    };
    let blob = format!("{} {}", el.attr_blob(), el.placeholder);
    ["hiragana", "ひらがな"].iter().any(|t| blob.contains(t))
}

/// Prefecture name taken from the head of address_1, else the Tokyo/Osaka
/// fallback.
pub fn prefecture_target(client: &ClientFields) -> Option<String> {
    if let Some(address) = client.address_1.as_deref() {
        let head: Vec<char> = address.chars().take(5).collect();
        for (i, c) in head.iter().enumerate() {
            if matches!(c, '都' | '道' | '府' | '県') {
                return Some(head[..=i].iter().collect());
            }
        }
        if !address.trim().is_empty() {
            return Some(address.trim().to_string());
        }
    }
    Some("東京都".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldMappingEntry, MappingSource};

    fn client() -> ClientFields {
        ClientFields {
            company_name: Some("株式会社テスト".into()),
            last_name: Some("山田".into()),
            first_name: Some("太郎".into()),
            last_name_kana: Some("ヤマダ".into()),
            first_name_kana: Some("タロウ".into()),
            last_name_hiragana: Some("やまだ".into()),
            first_name_hiragana: Some("たろう".into()),
            email_1: Some("taro@example.com".into()),
            phone_1: Some("03".into()),
            phone_2: Some("1234".into()),
            phone_3: Some("5678".into()),
            postal_code_1: Some("123".into()),
            postal_code_2: Some("4567".into()),
            address_1: Some("東京都新宿区".into()),
            address_2: Some("西新宿1-1-1".into()),
            message: Some("テスト送信".into()),
            ..Default::default()
        }
    }

    fn entry(key: &str, element: usize, action: Option<AutoAction>) -> (String, FieldMappingEntry) {
        (
            key.to_string(),
            FieldMappingEntry {
                element,
                selector: format!("[data-test=\"{key}\"]"),
                score: 100,
                tag_name: "input".into(),
                input_type: "text".into(),
                name: key.into(),
                id: String::new(),
                required: false,
                visible: true,
                enabled: true,
                default_value: None,
                auto_action: action,
                selected_index: None,
                source: MappingSource::Scored,
            },
        )
    }

    fn snapshot_of(names: &[&str]) -> DomSnapshot {
        DomSnapshot {
            elements: names
                .iter()
                .map(|n| crate::dom::ElementDescriptor {
                    tag_name: "input".into(),
                    input_type: "text".into(),
                    name: (*n).into(),
                    visible: true,
                    enabled: true,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn value_of(inputs: &[FieldInput], key: &str) -> InputValue {
        inputs.iter().find(|i| i.key == key).unwrap().value.clone()
    }

    #[test]
    fn combined_values() {
        let mut mapping = FieldMapping::default();
        for (i, key) in ["unified_full_name", "unified_phone", "unified_postal", "address"]
            .iter()
            .enumerate()
        {
            let (k, e) = entry(key, i, None);
            mapping.entries.insert(k, e);
        }
        let snapshot = snapshot_of(&["a", "b", "c", "d"]);
        let inputs = assign_values(&mapping, &client(), &ValuesConfig::default(), &snapshot);
        assert_eq!(
            value_of(&inputs, "unified_full_name"),
            InputValue::Text("山田 太郎".into())
        );
        assert_eq!(
            value_of(&inputs, "unified_phone"),
            InputValue::Text("0312345678".into())
        );
        assert_eq!(
            value_of(&inputs, "unified_postal"),
            InputValue::Text("1234567".into())
        );
        assert_eq!(
            value_of(&inputs, "address"),
            InputValue::Text("東京都新宿区西新宿1-1-1".into())
        );
    }

    #[test]
    fn unified_kana_prefers_element_script() {
        let mut mapping = FieldMapping::default();
        let (k, e) = entry("unified_full_name_kana", 0, None);
        mapping.entries.insert(k, e);

        let katakana_snapshot = snapshot_of(&["name_kana"]);
        let inputs =
            assign_values(&mapping, &client(), &ValuesConfig::default(), &katakana_snapshot);
        assert_eq!(
            value_of(&inputs, "unified_full_name_kana"),
            InputValue::Text("ヤマダ タロウ".into())
        );

        let hiragana_snapshot = snapshot_of(&["name_hiragana"]);
        let inputs =
            assign_values(&mapping, &client(), &ValuesConfig::default(), &hiragana_snapshot);
        assert_eq!(
            value_of(&inputs, "unified_full_name_kana"),
            InputValue::Text("やまだ たろう".into())
        );
    }

    #[test]
    fn copy_from_resolves_source_field() {
        let mut mapping = FieldMapping::default();
        let (k, e) = entry(
            "email_confirmation",
            0,
            Some(AutoAction::CopyFrom("email".into())),
        );
        mapping.entries.insert(k, e);
        let snapshot = snapshot_of(&["email2"]);
        let inputs = assign_values(&mapping, &client(), &ValuesConfig::default(), &snapshot);
        assert_eq!(
            value_of(&inputs, "email_confirmation"),
            InputValue::Text("taro@example.com".into())
        );
    }

    #[test]
    fn default_value_wins_for_fill() {
        let mut mapping = FieldMapping::default();
        let (k, mut e) = entry("auto_required_text_1", 0, Some(AutoAction::Fill));
        e.default_value = Some(serde_json::Value::String("\u{3000}".into()));
        mapping.entries.insert(k, e);
        let snapshot = snapshot_of(&["x"]);
        let inputs = assign_values(&mapping, &client(), &ValuesConfig::default(), &snapshot);
        assert_eq!(
            value_of(&inputs, "auto_required_text_1"),
            InputValue::Text("\u{3000}".into())
        );
    }

    #[test]
    fn empty_fields_skipped() {
        let mut mapping = FieldMapping::default();
        let (k, e) = entry("subject", 0, None);
        mapping.entries.insert(k, e);
        let snapshot = snapshot_of(&["subject"]);
        let inputs = assign_values(
            &mapping,
            &ClientFields::default(),
            &ValuesConfig::default(),
            &snapshot,
        );
        assert!(inputs.is_empty());
    }

    #[test]
    fn prefecture_extracted_from_address() {
        assert_eq!(prefecture_target(&client()).as_deref(), Some("東京都"));
        let hokkaido = ClientFields {
            address_1: Some("北海道札幌市".into()),
            ..Default::default()
        };
        assert_eq!(prefecture_target(&hokkaido).as_deref(), Some("北海道"));
        assert_eq!(
            prefecture_target(&ClientFields::default()).as_deref(),
            Some("東京都")
        );
    }
}
