//! Mapping-level integration tests over synthetic DOM snapshots.
//!
//! These exercise the analyzer stack (context extraction, scoring, mapping,
//! auto-handling, value assignment) without any browser, asserting the
//! invariants that hold for every input: one element per field, no excluded
//! element in the mapping, idempotent mapping runs, split-over-unified
//! promotion.

mod common;

use autoform::catalog::{Catalog, FieldId};
use autoform::config::{Config, ContextSettings};
use autoform::context::ContextExtractor;
use autoform::dom::{DomSnapshot, HeaderRecord};
use autoform::mapping::{assign_values, FieldMapper, InputValue, UnmappedHandler};
use autoform::models::{ClientRecord, EscapeDecodeConfig, FieldMapping};
use autoform::scoring::ElementScorer;

use common::{input_el, textarea_el};

fn build_mapping(snapshot: &DomSnapshot) -> FieldMapping {
    let config = Config::default();
    let extractor = ContextExtractor::new(snapshot, ContextSettings::default().to_context_config());
    let scorer = ElementScorer::new();
    let mapper = FieldMapper::new(snapshot, &extractor, &scorer, 5);
    let mut mapping = mapper.build_mapping();
    let record = ClientRecord::from_json(common::client_json(), &EscapeDecodeConfig::default())
        .expect("client record");
    UnmappedHandler::new(snapshot, &extractor, &config, &record.client).handle(&mut mapping);
    mapping
}

fn japanese_contact_form() -> DomSnapshot {
    // dl/dt/dd layout: labels live in the dt index, inputs have no helpful
    // attribute names at all.
    let rows: [(&str, f64); 4] = [
        ("お名前", 100.0),
        ("メールアドレス", 160.0),
        ("電話番号", 220.0),
        ("お問い合わせ内容", 280.0),
    ];
    let mut elements = Vec::new();
    let mut dtdd = Vec::new();
    for (i, (label, y)) in rows.iter().enumerate() {
        let mut el = if i == 3 {
            textarea_el(&format!("field{i}"))
        } else {
            input_el(&format!("field{i}"), "text")
        };
        el.bounding_box = Some(autoform::dom::BoundingBox {
            x: 200.0,
            y: *y,
            width: 240.0,
            height: 28.0,
        });
        elements.push(el);
        dtdd.push(HeaderRecord {
            x: 0.0,
            y: *y - 4.0,
            width: 600.0,
            height: 40.0,
            text: format!("{label} ※必須"),
        });
    }
    DomSnapshot {
        url: "https://example.test/contact".into(),
        form_selector: Some("form".into()),
        elements,
        dtdd_index: dtdd,
        ..Default::default()
    }
}

#[test]
fn dt_labelled_form_maps_by_display_text() {
    let snapshot = japanese_contact_form();
    let mapping = build_mapping(&snapshot);

    assert_eq!(mapping.get("unified_full_name").map(|e| e.element), Some(0));
    assert_eq!(mapping.get("email").map(|e| e.element), Some(1));
    assert_eq!(mapping.get("unified_phone").map(|e| e.element), Some(2));
    assert_eq!(mapping.get("message_body").map(|e| e.element), Some(3));

    // Required markers in the dt labels propagate.
    assert!(mapping.get("email").unwrap().required);
}

#[test]
fn mapping_never_duplicates_elements() {
    let snapshot = japanese_contact_form();
    let mapping = build_mapping(&snapshot);
    let mut seen = std::collections::HashSet::new();
    for (key, entry) in &mapping.entries {
        assert!(seen.insert(entry.element), "element of {key} mapped twice");
    }
}

#[test]
fn mapping_twice_yields_same_result() {
    let snapshot = japanese_contact_form();
    let a = build_mapping(&snapshot);
    let b = build_mapping(&snapshot);
    assert_eq!(a.len(), b.len());
    for (key, entry) in &a.entries {
        assert_eq!(
            b.get(key).map(|e| e.element),
            Some(entry.element),
            "mapping differs for {key}"
        );
    }
}

#[test]
fn kana_row_never_claims_kanji_name_field() {
    let mut snapshot = japanese_contact_form();
    // A furigana row right below the name row.
    let mut kana = input_el("field_kana", "text");
    kana.bounding_box = Some(autoform::dom::BoundingBox {
        x: 200.0,
        y: 130.0,
        width: 240.0,
        height: 28.0,
    });
    snapshot.elements.push(kana);
    snapshot.dtdd_index.push(HeaderRecord {
        x: 0.0,
        y: 126.0,
        width: 600.0,
        height: 40.0,
        text: "フリガナ".into(),
    });
    let mapping = build_mapping(&snapshot);
    let kana_idx = snapshot.elements.len() - 1;
    for key in ["unified_full_name", "last_name", "first_name"] {
        if let Some(entry) = mapping.get(key) {
            assert_ne!(entry.element, kana_idx, "{key} claimed the kana row");
        }
    }
    assert_eq!(
        mapping.get("unified_full_name_kana").map(|e| e.element),
        Some(kana_idx)
    );
}

#[test]
fn split_kana_and_bracket_phone_are_auto_handled() {
    let snapshot = DomSnapshot {
        url: "https://example.test/contact".into(),
        form_selector: Some("form".into()),
        elements: vec![
            input_el("email", "email"),
            input_el("tel[0]", "tel"),
            input_el("tel[1]", "tel"),
            input_el("tel[2]", "tel"),
            input_el("kana1", "text"),
            input_el("kana2", "text"),
        ],
        ..Default::default()
    };
    let mapping = build_mapping(&snapshot);

    // Unified fields stay away from split groups.
    assert!(mapping.get("unified_phone").is_none());
    assert!(mapping.get("unified_full_name_kana").is_none());

    for key in ["auto_phone_part_1", "auto_phone_part_2", "auto_phone_part_3"] {
        assert!(mapping.get(key).is_some(), "{key} missing");
    }
    assert!(mapping.get("last_name_kana").is_some());
    assert!(mapping.get("first_name_kana").is_some());

    // Values resolve from the client's split parts.
    let record = ClientRecord::from_json(common::client_json(), &EscapeDecodeConfig::default())
        .unwrap();
    let inputs = assign_values(
        &mapping,
        &record.client,
        &Config::default().values,
        &snapshot,
    );
    let value_of = |key: &str| {
        inputs
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.value.clone())
    };
    assert_eq!(
        value_of("auto_phone_part_1"),
        Some(InputValue::Text("03".into()))
    );
    assert_eq!(
        value_of("auto_phone_part_2"),
        Some(InputValue::Text("1234".into()))
    );
    assert_eq!(
        value_of("auto_phone_part_3"),
        Some(InputValue::Text("5678".into()))
    );
    assert_eq!(
        value_of("last_name_kana"),
        Some(InputValue::Text("ヤマダ".into()))
    );
    assert_eq!(
        value_of("first_name_kana"),
        Some(InputValue::Text("タロウ".into()))
    );
}

#[test]
fn email_confirmation_promoted_with_copy_action() {
    let snapshot = DomSnapshot {
        elements: vec![
            input_el("email", "email"),
            input_el("email_confirm", "email"),
            input_el("name", "text"),
        ],
        ..Default::default()
    };
    let mapping = build_mapping(&snapshot);
    let confirm = mapping.get("email_confirmation").expect("confirmation entry");
    assert_eq!(confirm.element, 1);
    assert_eq!(
        confirm.auto_action,
        Some(autoform::models::AutoAction::CopyFrom("email".into()))
    );

    let record =
        ClientRecord::from_json(common::client_json(), &EscapeDecodeConfig::default()).unwrap();
    let inputs = assign_values(
        &mapping,
        &record.client,
        &Config::default().values,
        &snapshot,
    );
    let confirm_input = inputs.iter().find(|i| i.key == "email_confirmation").unwrap();
    assert_eq!(confirm_input.value, InputValue::Text("taro@example.com".into()));
}

#[test]
fn honeypot_field_excluded_from_mapping() {
    let mut honeypot = input_el("email_hp", "text");
    honeypot.style = "position:absolute; left:-9999px;".into();
    honeypot.visible = false;
    let snapshot = DomSnapshot {
        elements: vec![honeypot, input_el("email", "email")],
        ..Default::default()
    };
    let mapping = build_mapping(&snapshot);
    assert_eq!(mapping.get("email").map(|e| e.element), Some(1));
}

#[test]
fn catalog_weight_swap_only_changes_order_not_scores() {
    // The scorer never reads the weight except to report it; two fields with
    // swapped weights keep identical totals on the same element.
    let scorer = ElementScorer::new();
    let el = input_el("subject", "text");
    let catalog = Catalog::global();
    let details = scorer.score(&el, catalog.get(FieldId::Subject).unwrap(), &[]);
    let weightless_sum: i32 = details
        .breakdown
        .iter()
        .filter(|(k, _)| k.as_str() != "field_weight")
        .map(|(_, v)| *v)
        .sum();
    assert_eq!(details.total_score, weightless_sum.max(0));
}
