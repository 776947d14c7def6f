//! Auto-handling of elements the scored mapping left behind.
//!
//! Runs after the mapper: checks consent/required checkboxes, picks radio
//! and select options, wires email confirmation inputs, detects split
//! phone/name/kana groups, rescues required text inputs and promotes
//! prefecture/department fields. Every failure here is absorbed per
//! element; a residual element that cannot be handled is simply skipped.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::FieldId;
use crate::config::Config;
use crate::context::{best_context_text, detect_required_indicator, is_fax_field_context, ContextExtractor};
use crate::dom::{ClassifiedElements, DomSnapshot, ElementDescriptor};
use crate::models::{AutoAction, ClientFields, FieldMapping, FieldMappingEntry, MappingSource};

const PREFECTURE_FALLBACKS: &[&str] = &["東京都", "大阪府"];

pub struct UnmappedHandler<'a> {
    snapshot: &'a DomSnapshot,
    extractor: &'a ContextExtractor<'a>,
    config: &'a Config,
    client: &'a ClientFields,
}

impl<'a> UnmappedHandler<'a> {
    pub fn new(
        snapshot: &'a DomSnapshot,
        extractor: &'a ContextExtractor<'a>,
        config: &'a Config,
        client: &'a ClientFields,
    ) -> Self {
        Self {
            snapshot,
            extractor,
            config,
            client,
        }
    }

    /// Closes the gaps in `mapping` in place.
    pub fn handle(&self, mapping: &mut FieldMapping) {
        if !self.config.analyzer.enable_auto_handling {
            return;
        }
        let classified = self.snapshot.classify();

        self.demote_unified_for_indexed_pairs(&classified, mapping);

        self.handle_checkboxes(&classified, mapping);
        self.handle_radios(&classified, mapping);
        self.handle_selects(&classified, mapping);

        self.promote_prefecture(&classified, mapping);
        self.promote_department(&classified, mapping);

        self.handle_split_kana(&classified, mapping);
        self.handle_split_names(&classified, mapping);
        self.handle_split_phone(&classified, mapping);
        self.handle_email_confirmation(&classified, mapping);
        self.handle_unified_fullname_rescue(&classified, mapping);

        if self.config.analyzer.enable_optional_fax_fill {
            self.handle_optional_fax(&classified, mapping);
        }

        self.handle_required_texts(&classified, mapping);
    }

    fn element(&self, idx: usize) -> &ElementDescriptor {
        &self.snapshot.elements[idx]
    }

    fn is_required(&self, idx: usize) -> bool {
        let el = self.element(idx);
        if el.is_required_by_attr()
            || el.ancestor_required_confirmed
            || el.near_required_mark
            || el.name_required_marker
            || super::mapper::required_via_header_class(el)
        {
            return true;
        }
        detect_required_indicator(&self.extractor.contexts_for(idx))
    }

    fn option_text(&self, idx: usize) -> String {
        let el = self.element(idx);
        let best = best_context_text(&self.extractor.contexts_for(idx));
        if !best.is_empty() {
            return best;
        }
        if !el.value.is_empty() {
            return el.value.clone();
        }
        if !el.name.is_empty() {
            return el.name.clone();
        }
        el.id.clone()
    }

    fn auto_entry(&self, idx: usize, action: AutoAction) -> FieldMappingEntry {
        let el = self.element(idx);
        FieldMappingEntry {
            element: idx,
            selector: el.selector.clone(),
            score: 0,
            tag_name: el.tag_name.clone(),
            input_type: el.input_type.clone(),
            name: el.name.clone(),
            id: el.id.clone(),
            required: true,
            visible: el.visible,
            enabled: el.enabled,
            default_value: None,
            auto_action: Some(action),
            selected_index: None,
            source: MappingSource::AutoHandled,
        }
    }

    /// Drops a unified name/kana mapping that actually sits on one half of
    /// an indexed pair (name1/name2, kana1/kana2, name[]).
    fn demote_unified_for_indexed_pairs(
        &self,
        classified: &ClassifiedElements,
        mapping: &mut FieldMapping,
    ) {
        for (unified_key, tokens) in [
            (FieldId::UnifiedFullName.key(), ["name1", "name_1", "name2", "name_2"]),
            (FieldId::UnifiedFullNameKana.key(), ["kana1", "kana_1", "kana2", "kana_2"]),
        ] {
            let Some(entry) = mapping.get(unified_key) else {
                continue;
            };
            let mapped_name = self.element(entry.element).name.to_lowercase();
            if !tokens.contains(&mapped_name.as_str()) && !mapped_name.ends_with("[]") {
                continue;
            }
            let pair_present = classified
                .text_inputs
                .iter()
                .filter(|idx| {
                    let n = self.element(**idx).name.to_lowercase();
                    tokens.contains(&n.as_str()) || n.ends_with("[]")
                })
                .count()
                >= 2;
            if pair_present {
                mapping.remove(unified_key);
                debug!(field = unified_key, "unified mapping demoted for indexed pair");
            }
        }
    }

    fn handle_checkboxes(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let mapped = mapping.mapped_elements();
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for idx in &classified.checkboxes {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let key = if !el.name.is_empty() {
                el.name.clone()
            } else if !el.id.is_empty() {
                el.id.clone()
            } else {
                format!("cb_{idx}")
            };
            groups.entry(key).or_default().push(*idx);
        }

        for (group_key, items) in groups {
            let group_required = items.iter().any(|idx| self.is_required(*idx))
                || items.iter().any(|idx| {
                    const CONSENT_TOKENS: &[&str] = &[
                        "acceptance", "consent", "同意", "policy", "privacy", "個人情報", "personal",
                    ];
                    let blob = self.element(*idx).attr_blob();
                    CONSENT_TOKENS.iter().any(|t| blob.contains(t))
                });

            let texts: Vec<String> = items.iter().map(|idx| self.option_text(*idx)).collect();

            let is_contact_method_group = !group_required && {
                const TOKENS: &[&str] = &[
                    "連絡方法", "ご希望連絡", "希望連絡", "連絡手段", "contact method",
                    "preferred contact",
                ];
                let key_l = group_key.to_lowercase();
                key_l.contains("連絡")
                    || key_l.contains("contact")
                    || texts
                        .iter()
                        .any(|t| TOKENS.iter().any(|tok| t.to_lowercase().contains(&tok.to_lowercase())))
            };

            let is_privacy_group = !group_required && {
                const PRIVACY: &[&str] = &[
                    "プライバシー", "個人情報", "privacy", "利用規約", "terms", "個人情報保護",
                ];
                const AGREE: &[&str] = &["同意", "承諾", "agree", "確認の上", "に同意"];
                items.iter().any(|idx| {
                    let blob = self
                        .extractor
                        .contexts_for(*idx)
                        .iter()
                        .map(|c| c.text.clone())
                        .collect::<Vec<_>>()
                        .join(" ")
                        .to_lowercase();
                    PRIVACY.iter().any(|p| blob.contains(&p.to_lowercase()))
                        && (AGREE.iter().any(|a| blob.contains(&a.to_lowercase())) || items.len() == 1)
                })
            };

            if !group_required && !is_privacy_group && !is_contact_method_group {
                continue;
            }

            let idx_in_group = if is_privacy_group {
                texts
                    .iter()
                    .position(|t| {
                        let tl = t.to_lowercase();
                        ["同意", "agree", "承諾"].iter().any(|k| tl.contains(k))
                    })
                    .unwrap_or(0)
            } else if is_contact_method_group {
                choose_contact_method_index(&texts)
            } else {
                choose_priority_index(
                    &texts,
                    &self.config.choices.priority_primary,
                    &self.config.choices.priority_secondary,
                    Some(&self.config.choices.priority_tertiary),
                    None,
                    None,
                )
            };

            let chosen = items[idx_in_group];
            let entry = self.auto_entry(chosen, AutoAction::Check);
            mapping.insert(format!("auto_checkbox_{group_key}"), entry);
        }
    }

    fn handle_radios(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let mapped = mapping.mapped_elements();
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for idx in &classified.radios {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let key = if el.name.is_empty() {
                format!("radio_{idx}")
            } else {
                el.name.clone()
            };
            groups.entry(key).or_default().push(*idx);
        }

        for (group_key, items) in groups {
            if items.len() < 2 {
                continue;
            }
            let texts: Vec<String> = items.iter().map(|idx| self.option_text(*idx)).collect();

            // Gender groups follow the client record.
            let is_gender = texts.iter().any(|t| ["男", "男性", "male"].iter().any(|k| t.contains(k)))
                && texts.iter().any(|t| ["女", "女性", "female"].iter().any(|k| t.contains(k)));
            let mut chosen: Option<usize> = None;
            if is_gender {
                if let Some(gender) = normalize_gender(self.client.gender.as_deref().unwrap_or("")) {
                    let targets: &[&str] = match gender {
                        Gender::Male => &["男", "男性", "male"],
                        Gender::Female => &["女", "女性", "female"],
                        Gender::Other => &["その他", "other"],
                    };
                    chosen = texts
                        .iter()
                        .position(|t| targets.iter().any(|k| t.to_lowercase().contains(&k.to_lowercase())));
                }
            }

            // 法人/個人 choice: corporate clients pick 法人.
            if chosen.is_none()
                && texts.iter().any(|t| t.contains("法人"))
                && texts.iter().any(|t| t.contains("個人"))
                && self.client.company_name.as_deref().map(|c| !c.is_empty()).unwrap_or(false)
            {
                chosen = texts.iter().position(|t| t.contains("法人"));
            }

            if chosen.is_none() {
                if !self.is_required(items[0]) && !is_gender {
                    continue;
                }
                // Avoid その他 when any other option exists.
                chosen = texts
                    .iter()
                    .position(|t| !t.contains("その他") && !t.trim().is_empty());
                if chosen.is_none() {
                    chosen = Some(choose_priority_index(
                        &texts,
                        &self.config.choices.priority_primary,
                        &self.config.choices.priority_secondary,
                        Some(&self.config.choices.priority_tertiary),
                        None,
                        None,
                    ));
                }
            }

            if let Some(pos) = chosen {
                let entry = self.auto_entry(items[pos], AutoAction::Check);
                mapping.insert(format!("auto_radio_{group_key}"), entry);
            }
        }
    }

    fn handle_selects(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let mapped = mapping.mapped_elements();
        let exclude_tokens: Vec<String> = self
            .config
            .choices
            .select_exclude_keywords
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        for (n, idx) in classified.selects.iter().enumerate() {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible || el.options.len() < 2 {
                continue;
            }
            let texts: Vec<String> = el.options.iter().map(|o| o.text.clone()).collect();
            let values: Vec<String> = el.options.iter().map(|o| o.value.clone()).collect();

            let is_dummy = |i: usize| -> bool {
                let t = texts.get(i).map(|s| s.trim().to_lowercase()).unwrap_or_default();
                let v = values.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
                v.is_empty()
                    || exclude_tokens.iter().any(|tok| t.contains(tok))
                    || ["select", "choose", "---", "none"].iter().any(|tok| v.to_lowercase().contains(tok))
            };

            let mut required = self.is_required(*idx);

            // Inquiry-type selects get picked even when optional; leaving a
            // category default silently changes the submission meaning.
            let attr_blob = el.attr_blob();
            let best_ctx = best_context_text(&self.extractor.contexts_for(*idx)).to_lowercase();
            let is_inquiry = ["purpose", "inquiry", "category", "subject", "topic"]
                .iter()
                .any(|t| attr_blob.contains(t))
                || ["お問い合わせ内容", "ご用件", "お問い合わせ種別", "種別", "お問い合わせ"]
                    .iter()
                    .any(|t| best_ctx.contains(t));
            if is_inquiry {
                required = true;
            }

            // A dummy default makes the select implicitly required.
            let pre_idx = el.selected_index;
            if !required {
                let dummy_default = pre_idx < 0 || is_dummy(pre_idx as usize);
                if dummy_default {
                    required = true;
                }
            }
            if !required {
                continue;
            }

            let is_pref_select = texts.iter().any(|t| t.contains("東京都"))
                && texts.iter().any(|t| t.contains("大阪府"));
            let is_gender_select = texts
                .iter()
                .any(|t| ["男", "男性", "male"].iter().any(|k| t.contains(k)))
                && texts
                    .iter()
                    .any(|t| ["女", "女性", "female"].iter().any(|k| t.contains(k)));

            let mut choice: Option<usize> = None;

            // Keep a meaningful default when one is preselected.
            if pre_idx >= 0 && (pre_idx as usize) < values.len() && !is_dummy(pre_idx as usize) {
                choice = Some(pre_idx as usize);
            }

            if is_gender_select {
                if let Some(gender) = normalize_gender(self.client.gender.as_deref().unwrap_or("")) {
                    let targets: &[&str] = match gender {
                        Gender::Male => &["男", "男性", "male"],
                        Gender::Female => &["女", "女性", "female"],
                        Gender::Other => &["その他", "other"],
                    };
                    let cand = texts.iter().position(|t| {
                        targets.iter().any(|k| t.to_lowercase().contains(&k.to_lowercase()))
                    });
                    if cand.is_some() {
                        choice = cand;
                    }
                }
            } else if is_pref_select {
                let target = self.client.address_1.as_deref().unwrap_or("").trim();
                let mut cand = None;
                if !target.is_empty() {
                    // Last match wins for substring hits.
                    cand = texts.iter().rposition(|t| t.contains(target));
                }
                if cand.is_none() {
                    for fallback in PREFECTURE_FALLBACKS {
                        cand = texts.iter().rposition(|t| t.contains(fallback));
                        if cand.is_some() {
                            break;
                        }
                    }
                }
                if cand.is_some() {
                    choice = cand;
                }
            } else if is_inquiry {
                let other = texts.iter().position(|t| {
                    let tl = t.to_lowercase();
                    tl.contains("その他") || tl.contains("other")
                });
                choice = other.or_else(|| {
                    texts.iter().enumerate().position(|(i, t)| {
                        !is_dummy(i) && (t.contains("問い合わせ") || t.contains("問合"))
                    })
                });
            }

            let idx_choice = choice.unwrap_or_else(|| {
                choose_priority_index(
                    &texts,
                    &self.config.choices.priority_primary,
                    &self.config.choices.priority_secondary,
                    Some(&self.config.choices.priority_tertiary),
                    Some(&exclude_tokens),
                    Some(&values),
                )
            });

            let mut entry = self.auto_entry(*idx, AutoAction::SelectIndex(idx_choice));
            entry.selected_index = Some(idx_choice);
            entry.default_value = values
                .get(idx_choice)
                .filter(|v| !v.is_empty())
                .or_else(|| texts.get(idx_choice))
                .map(|v| serde_json::Value::String(v.clone()));
            mapping.insert(format!("auto_select_{}", n + 1), entry);
        }
    }

    /// Select whose options cover many prefectures, or an input flagged
    /// pref/prefecture, becomes the prefecture field.
    fn promote_prefecture(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        if mapping.get(FieldId::Prefecture.key()).is_some() {
            return;
        }
        let mapped = mapping.mapped_elements();
        for idx in classified.selects.iter().chain(classified.text_inputs.iter()) {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let attr_hit = ["pref", "prefecture"].iter().any(|t| el.attr_blob().contains(t));
            let option_hit = el.tag_name == "select"
                && el.options.iter().any(|o| o.text.contains("東京都"))
                && el.options.iter().any(|o| o.text.contains("大阪府"));
            if attr_hit || option_hit {
                let action = if el.tag_name == "select" {
                    AutoAction::SelectByAlgorithm
                } else {
                    AutoAction::Fill
                };
                let mut entry = self.auto_entry(*idx, action);
                entry.source = MappingSource::Promoted;
                entry.required = self.is_required(*idx);
                mapping.insert(FieldId::Prefecture.key(), entry);
                return;
            }
        }
    }

    fn promote_department(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        if mapping.get(FieldId::Department.key()).is_some() {
            return;
        }
        if self.client.department.as_deref().unwrap_or("").is_empty() {
            return;
        }
        let mapped = mapping.mapped_elements();
        for idx in &classified.text_inputs {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let attr_hit = ["department", "busho", "busyo"].iter().any(|t| el.attr_blob().contains(t))
                || el.attr_blob().contains("部署");
            let ctx_hit = {
                let best = best_context_text(&self.extractor.contexts_for(*idx));
                best.contains("部署") || best.to_lowercase().contains("department")
            };
            if attr_hit || ctx_hit {
                let mut entry = self.auto_entry(*idx, AutoAction::Fill);
                entry.source = MappingSource::Promoted;
                entry.required = self.is_required(*idx);
                mapping.insert(FieldId::Department.key(), entry);
                return;
            }
        }
    }

    /// kana1/kana2-style pairs become the split kana fields in document
    /// order.
    fn handle_split_kana(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let has_split = mapping.get(FieldId::LastNameKana.key()).is_some()
            && mapping.get(FieldId::FirstNameKana.key()).is_some();
        if has_split || mapping.get(FieldId::UnifiedFullNameKana.key()).is_some() {
            return;
        }
        let mapped = mapping.mapped_elements();

        let mut kana_like: Vec<usize> = Vec::new();
        for idx in &classified.text_inputs {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let blob = el.attr_blob();
            let ctx = best_context_text(&self.extractor.contexts_for(*idx));
            let is_kana = ["kana", "furigana", "katakana"].iter().any(|t| blob.contains(t))
                || ["カナ", "フリガナ", "ふりがな"].iter().any(|t| ctx.contains(t));
            if is_kana {
                kana_like.push(*idx);
            }
        }
        if kana_like.len() < 2 {
            return;
        }

        // Prefer explicit sei/mei hints, fall back to document order for
        // indexed pairs (kana1/kana2, kana[]).
        let sei = kana_like.iter().copied().find(|idx| {
            let blob = self.element(*idx).attr_blob();
            let ctx = best_context_text(&self.extractor.contexts_for(*idx));
            ["sei", "姓", "セイ", "1"].iter().any(|t| blob.contains(t) || ctx.contains(t))
        });
        let mei = kana_like.iter().copied().find(|idx| {
            if Some(*idx) == sei {
                return false;
            }
            let blob = self.element(*idx).attr_blob();
            let ctx = best_context_text(&self.extractor.contexts_for(*idx));
            ["mei", "名", "メイ", "2"].iter().any(|t| blob.contains(t) || ctx.contains(t))
        });

        let (last, first) = match (sei, mei) {
            (Some(a), Some(b)) => (a, b),
            _ => (kana_like[0], kana_like[1]),
        };
        let mut last_entry = self.auto_entry(last, AutoAction::Fill);
        last_entry.required = self.is_required(last);
        let mut first_entry = self.auto_entry(first, AutoAction::Fill);
        first_entry.required = self.is_required(first);
        mapping.insert(FieldId::LastNameKana.key(), last_entry);
        mapping.insert(FieldId::FirstNameKana.key(), first_entry);
    }

    /// name[0]/name[1], name1/name2 and family_name/given_name forms.
    fn handle_split_names(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let has_split = mapping.get(FieldId::LastName.key()).is_some()
            && mapping.get(FieldId::FirstName.key()).is_some();
        if has_split {
            return;
        }
        let mapped = mapping.mapped_elements();

        let mut last: Option<usize> = None;
        let mut first: Option<usize> = None;
        let mut array_form: Vec<usize> = Vec::new();

        for idx in &classified.text_inputs {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let name = el.name.to_lowercase();
            if name == "name[]" || name.starts_with("name[") {
                array_form.push(*idx);
                continue;
            }
            if ["name1", "name_1", "family_name", "last-name", "sei"].contains(&name.as_str()) {
                last.get_or_insert(*idx);
            }
            if ["name2", "name_2", "given_name", "first-name", "mei"].contains(&name.as_str()) {
                first.get_or_insert(*idx);
            }
        }

        if last.is_none() && first.is_none() && array_form.len() >= 2 {
            last = Some(array_form[0]);
            first = Some(array_form[1]);
        }

        if let (Some(l), Some(f)) = (last, first) {
            if mapping.get(FieldId::LastName.key()).is_none() {
                let mut entry = self.auto_entry(l, AutoAction::Fill);
                entry.required = self.is_required(l);
                mapping.insert(FieldId::LastName.key(), entry);
            }
            if mapping.get(FieldId::FirstName.key()).is_none() {
                let mut entry = self.auto_entry(f, AutoAction::Fill);
                entry.required = self.is_required(f);
                mapping.insert(FieldId::FirstName.key(), entry);
            }
            // A unified mapping sitting on either half gets displaced.
            let unified_on_half = mapping
                .get(FieldId::UnifiedFullName.key())
                .map(|u| u.element == l || u.element == f)
                .unwrap_or(false);
            if unified_on_half {
                mapping.remove(FieldId::UnifiedFullName.key());
            }
        }
    }

    /// tel1/tel2/tel3, tel[0..2] and [first|center|last] split phones.
    fn handle_split_phone(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let already = [FieldId::Phone1, FieldId::Phone2, FieldId::Phone3]
            .iter()
            .filter(|f| mapping.get(f.key()).is_some())
            .count();
        if already == 3 {
            return;
        }
        let mapped = mapping.mapped_elements();

        // Parts the scorer already placed count toward the trio.
        let mut parts: [Option<usize>; 3] = [
            mapping.get(FieldId::Phone1.key()).map(|e| e.element),
            mapping.get(FieldId::Phone2.key()).map(|e| e.element),
            mapping.get(FieldId::Phone3.key()).map(|e| e.element),
        ];
        let unified_element = mapping.get(FieldId::UnifiedPhone.key()).map(|e| e.element);

        for idx in classified.tel_inputs.iter().chain(classified.text_inputs.iter()) {
            // The unified phone's own element may be part 1 of a split trio.
            if mapped.contains(idx) && Some(*idx) != unified_element {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let blob = el.attr_blob();
            if !["tel", "phone", "電話"].iter().any(|t| blob.contains(t)) {
                continue;
            }
            if let Some(part) = infer_phone_part_index(&el.name, &el.id, &el.class_name) {
                if parts[part].is_none() {
                    parts[part] = Some(*idx);
                }
            }
        }

        let found = parts.iter().filter(|p| p.is_some()).count();
        if found < 3 {
            return;
        }

        // Split trio confirmed: the unified mapping pointing at one of the
        // parts is dropped before the parts are registered.
        let unified_on_part = mapping
            .get(FieldId::UnifiedPhone.key())
            .map(|u| parts.iter().flatten().any(|p| *p == u.element))
            .unwrap_or(false);
        if unified_on_part {
            mapping.remove(FieldId::UnifiedPhone.key());
        }

        let group_required = parts.iter().flatten().any(|idx| self.is_required(*idx));
        for (i, part) in parts.iter().enumerate() {
            let key = format!("auto_phone_part_{}", i + 1);
            let field_key = [FieldId::Phone1, FieldId::Phone2, FieldId::Phone3][i].key();
            if mapping.get(field_key).is_some() {
                continue;
            }
            if let Some(idx) = part {
                let mut entry = self.auto_entry(*idx, AutoAction::CopyFrom(field_key.to_string()));
                entry.required = group_required;
                mapping.insert(key, entry);
            }
        }
    }

    fn handle_email_confirmation(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let Some(primary) = mapping.get(FieldId::Email.key()) else {
            return;
        };
        let primary_name = primary.name.to_lowercase();
        let primary_id = primary.id.to_lowercase();
        let mapped = mapping.mapped_elements();

        const ATTR_PATTERNS: &[&str] = &[
            "email_confirm", "mail_confirm", "email_confirmation", "confirm_email", "confirm_mail",
            "mail2", "mail_2", "email2", "email_2", "confirm-mail", "email-confirm", "from2",
            "email_check", "mail_check", "re_email", "re_mail",
        ];
        const CTX_TOKENS: &[&str] = &["確認", "確認用", "再入力", "再度", "もう一度"];
        const BLACKLIST: &[&str] = &["captcha", "image_auth", "spam-block", "token", "otp", "verification"];

        for idx in classified.email_inputs.iter().chain(classified.text_inputs.iter()) {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let blob = el.attr_blob();
            if BLACKLIST.iter().any(|b| blob.contains(b)) {
                continue;
            }
            let mut hit = ATTR_PATTERNS.iter().any(|p| blob.contains(p));
            if !hit && !el.placeholder.is_empty() {
                hit = CTX_TOKENS.iter().any(|t| el.placeholder.contains(t));
            }
            if !hit {
                let nm = el.name.to_lowercase();
                let ide = el.id.to_lowercase();
                if !primary_name.is_empty() {
                    hit = nm == format!("_{primary_name}")
                        || nm == format!("{primary_name}2")
                        || nm == format!("{primary_name}_confirm");
                }
                if !hit && !primary_id.is_empty() {
                    hit = ide == format!("_{primary_id}")
                        || ide == format!("{primary_id}2")
                        || ide == format!("{primary_id}_confirm");
                }
            }
            if !hit {
                let best = best_context_text(&self.extractor.contexts_for(*idx));
                hit = CTX_TOKENS.iter().any(|t| best.contains(t));
            }
            if hit {
                let entry = self.auto_entry(*idx, AutoAction::CopyFrom(FieldId::Email.key().into()));
                mapping.insert("email_confirmation", entry);
                return;
            }
        }
    }

    /// Rescue pass for forms whose single name input slipped past scoring.
    fn handle_unified_fullname_rescue(
        &self,
        classified: &ClassifiedElements,
        mapping: &mut FieldMapping,
    ) {
        if mapping.get(FieldId::UnifiedFullName.key()).is_some()
            || mapping.get(FieldId::LastName.key()).is_some()
        {
            return;
        }
        let mapped = mapping.mapped_elements();
        for idx in &classified.text_inputs {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let blob = el.attr_blob();
            let ctx = best_context_text(&self.extractor.contexts_for(*idx));
            let unified_tokens = crate::catalog::unified_field_patterns();
            let hit = unified_tokens
                .get("fullname")
                .map(|tokens| tokens.iter().any(|t| blob.contains(t) || ctx.contains(t)))
                .unwrap_or(false);
            let kana_like = ["kana", "furigana", "カナ", "フリガナ", "ふりがな"]
                .iter()
                .any(|t| blob.contains(t) || ctx.contains(t));
            if hit && !kana_like {
                let mut entry = self.auto_entry(*idx, AutoAction::Fill);
                entry.source = MappingSource::Promoted;
                entry.required = self.is_required(*idx);
                mapping.insert(FieldId::UnifiedFullName.key(), entry);
                return;
            }
        }
    }

    /// Non-required FAX inputs receive the phone number when explicitly
    /// enabled.
    fn handle_optional_fax(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let mapped = mapping.mapped_elements();
        for idx in classified.text_inputs.iter().chain(classified.tel_inputs.iter()) {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible {
                continue;
            }
            let blob = el.attr_blob();
            let is_fax = ["fax", "ファックス", "ファクス"].iter().any(|t| blob.contains(t))
                || is_fax_field_context(&self.extractor.contexts_for(*idx));
            if is_fax && !self.is_required(*idx) {
                let entry = self.auto_entry(*idx, AutoAction::CopyFrom(FieldId::UnifiedPhone.key().into()));
                mapping.insert("auto_fax", entry);
                return;
            }
        }
    }

    /// Visible required text inputs that still have no mapping are filled
    /// with a full-width space so required validation passes. Never applied
    /// to email/confirmation/auth inputs.
    fn handle_required_texts(&self, classified: &ClassifiedElements, mapping: &mut FieldMapping) {
        let mapped = mapping.mapped_elements();
        const SKIP_TOKENS: &[&str] = &[
            "mail", "email", "confirm", "captcha", "token", "otp", "auth", "verification",
        ];
        let mut n = 0;
        for idx in classified.text_inputs.iter().chain(classified.textareas.iter()) {
            if mapped.contains(idx) {
                continue;
            }
            let el = self.element(*idx);
            if !el.visible || !el.enabled {
                continue;
            }
            let blob = el.attr_blob();
            if SKIP_TOKENS.iter().any(|t| blob.contains(t)) {
                continue;
            }
            if !self.is_required(*idx) {
                continue;
            }
            n += 1;
            let mut entry = self.auto_entry(*idx, AutoAction::Fill);
            entry.default_value = Some(serde_json::Value::String("\u{3000}".into()));
            mapping.insert(format!("auto_required_text_{n}"), entry);
        }
    }
}

/// Gender vocabulary shared by radio and select handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

pub fn normalize_gender(value: &str) -> Option<Gender> {
    if value.is_empty() {
        return None;
    }
    let v = value.trim().to_lowercase();
    if ["男性", "だんせい", "男", "male", "man"].iter().any(|t| v.contains(t)) {
        return Some(Gender::Male);
    }
    if ["女性", "じょせい", "女", "female", "woman"].iter().any(|t| v.contains(t)) {
        return Some(Gender::Female);
    }
    if ["その他", "未回答", "無回答", "回答しない", "other", "prefer not"]
        .iter()
        .any(|t| v.contains(t))
    {
        return Some(Gender::Other);
    }
    None
}

/// Three-tier keyword priority with a last-match-wins rule per tier and a
/// final fallback to the last non-excluded option.
pub fn choose_priority_index(
    texts: &[String],
    pri1: &[String],
    pri2: &[String],
    pri3: Option<&[String]>,
    exclude_text_tokens: Option<&[String]>,
    values: Option<&[String]>,
) -> usize {
    let is_excluded = |i: usize| -> bool {
        if let Some(values) = values {
            let v = values.get(i).map(|s| s.trim()).unwrap_or("");
            if v.is_empty() {
                return true;
            }
            let vl = v.to_lowercase();
            if ["select", "choose", "---", "none"].iter().any(|tok| vl.contains(tok)) {
                return true;
            }
        }
        if let Some(tokens) = exclude_text_tokens {
            let tl = texts.get(i).map(|s| s.to_lowercase()).unwrap_or_default();
            if tokens.iter().any(|tok| tl.contains(tok)) {
                return true;
            }
        }
        false
    };

    let last_match = |keys: &[String]| -> Option<usize> {
        let lower: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();
        texts
            .iter()
            .enumerate()
            .filter(|(i, t)| {
                let tl = t.to_lowercase();
                lower.iter().any(|k| tl.contains(k)) && !is_excluded(*i)
            })
            .map(|(i, _)| i)
            .next_back()
    };

    if let Some(i) = last_match(pri1) {
        return i;
    }
    if let Some(i) = last_match(pri2) {
        return i;
    }
    if let Some(pri3) = pri3 {
        if let Some(i) = last_match(pri3) {
            return i;
        }
    }
    for i in (0..texts.len()).rev() {
        if !is_excluded(i) {
            return i;
        }
    }
    texts.len().saturating_sub(1)
}

/// Contact-method preference: Email > Any > Phone > Fax.
pub fn choose_contact_method_index(texts: &[String]) -> usize {
    const EMAIL: &[&str] = &["email", "e-mail", "mail", "メール", "eメール", "電子メール"];
    const ANY: &[&str] = &["any", "either", "no preference", "どちらでも", "問いません", "どれでも"];
    const PHONE: &[&str] = &["phone", "tel", "telephone", "call", "携帯", "モバイル", "電話"];
    const FAX: &[&str] = &["fax", "ファックス", "ファクス"];

    for keys in [EMAIL, ANY, PHONE, FAX] {
        if let Some(i) = texts.iter().position(|t| {
            let tl = t.to_lowercase();
            keys.iter().any(|k| tl.contains(&k.to_lowercase()))
        }) {
            return i;
        }
    }
    0
}

/// Part index (0..=2) from trailing digits, bracket indexes or named
/// positions.
pub fn infer_phone_part_index(name: &str, id: &str, class: &str) -> Option<usize> {
    let blob = format!("{name} {id} {class}").to_lowercase();
    for (token, idx) in [("[first]", 0), ("[center]", 1), ("[middle]", 1), ("[last]", 2)] {
        if blob.contains(token) {
            return Some(idx);
        }
    }
    for source in [name, id] {
        let lower = source.to_lowercase();
        for (pat, idx) in [("[0]", 0), ("[1]", 1), ("[2]", 2)] {
            if lower.ends_with(pat) {
                return Some(idx);
            }
        }
        let digits: String = lower.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
        if digits.len() == 1 {
            match digits.as_str() {
                "1" => return Some(0),
                "2" => return Some(1),
                "3" => return Some(2),
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextSettings;

    fn input(name: &str, ty: &str) -> ElementDescriptor {
        ElementDescriptor {
            tag_name: "input".into(),
            input_type: ty.into(),
            name: name.into(),
            selector: format!("input[name=\"{name}\"]"),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    fn handle(snapshot: &DomSnapshot, client: &ClientFields, mapping: &mut FieldMapping) {
        let config = Config::default();
        let extractor =
            ContextExtractor::new(snapshot, ContextSettings::default().to_context_config());
        UnmappedHandler::new(snapshot, &extractor, &config, client).handle(mapping);
    }

    #[test]
    fn phone_part_inference() {
        assert_eq!(infer_phone_part_index("tel1", "", ""), Some(0));
        assert_eq!(infer_phone_part_index("tel_2", "", ""), Some(1));
        assert_eq!(infer_phone_part_index("phone3", "", ""), Some(2));
        assert_eq!(infer_phone_part_index("tel[0]", "", ""), Some(0));
        assert_eq!(infer_phone_part_index("tel[2]", "", ""), Some(2));
        assert_eq!(infer_phone_part_index("tel[first]", "", ""), Some(0));
        assert_eq!(infer_phone_part_index("tel[last]", "", ""), Some(2));
        assert_eq!(infer_phone_part_index("telephone", "", ""), None);
    }

    #[test]
    fn split_phone_brackets_auto_handled() {
        let snapshot = DomSnapshot {
            elements: vec![input("tel[0]", "tel"), input("tel[1]", "tel"), input("tel[2]", "tel")],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        for key in ["auto_phone_part_1", "auto_phone_part_2", "auto_phone_part_3"] {
            let entry = mapping.get(key).unwrap();
            assert_eq!(entry.source, MappingSource::AutoHandled);
        }
        assert!(mapping.get("unified_phone").is_none());
    }

    #[test]
    fn split_phone_demotes_unified() {
        let snapshot = DomSnapshot {
            elements: vec![input("tel[0]", "tel"), input("tel[1]", "tel"), input("tel[2]", "tel")],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        mapping.insert(
            FieldId::UnifiedPhone.key(),
            FieldMappingEntry {
                element: 0,
                selector: "input[name=\"tel[0]\"]".into(),
                score: 150,
                tag_name: "input".into(),
                input_type: "tel".into(),
                name: "tel[0]".into(),
                id: String::new(),
                required: false,
                visible: true,
                enabled: true,
                default_value: None,
                auto_action: None,
                selected_index: None,
                source: MappingSource::Scored,
            },
        );
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        assert!(mapping.get("unified_phone").is_none());
        assert!(mapping.get("auto_phone_part_1").is_some());
    }

    #[test]
    fn indexed_kana_pair_auto_handled() {
        let snapshot = DomSnapshot {
            elements: vec![input("kana1", "text"), input("kana2", "text")],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        let last = mapping.get("last_name_kana").unwrap();
        let first = mapping.get("first_name_kana").unwrap();
        assert_eq!(last.element, 0);
        assert_eq!(first.element, 1);
        assert_eq!(last.source, MappingSource::AutoHandled);
    }

    #[test]
    fn privacy_checkbox_checked() {
        let mut cb = input("agreement", "checkbox");
        cb.label_parent_text = Some("個人情報の取り扱いに同意する".into());
        let snapshot = DomSnapshot {
            elements: vec![cb],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        let entry = mapping.get("auto_checkbox_agreement").unwrap();
        assert_eq!(entry.auto_action, Some(AutoAction::Check));
    }

    #[test]
    fn email_confirmation_copies_from_email() {
        let snapshot = DomSnapshot {
            elements: vec![input("email", "email"), input("email2", "email")],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        mapping.insert(
            FieldId::Email.key(),
            FieldMappingEntry {
                element: 0,
                selector: "input[name=\"email\"]".into(),
                score: 210,
                tag_name: "input".into(),
                input_type: "email".into(),
                name: "email".into(),
                id: String::new(),
                required: true,
                visible: true,
                enabled: true,
                default_value: None,
                auto_action: None,
                selected_index: None,
                source: MappingSource::Scored,
            },
        );
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        let confirm = mapping.get("email_confirmation").unwrap();
        assert_eq!(confirm.element, 1);
        assert_eq!(confirm.auto_action, Some(AutoAction::CopyFrom("email".into())));
    }

    #[test]
    fn dummy_default_select_is_implicitly_required() {
        let mut select = ElementDescriptor {
            tag_name: "select".into(),
            name: "inquiry_type".into(),
            selector: "select[name=\"inquiry_type\"]".into(),
            visible: true,
            enabled: true,
            selected_index: 0,
            ..Default::default()
        };
        select.options = vec![
            crate::dom::SelectOptionRecord { text: "選択してください".into(), value: "".into() },
            crate::dom::SelectOptionRecord { text: "製品について".into(), value: "product".into() },
            crate::dom::SelectOptionRecord { text: "その他".into(), value: "other".into() },
        ];
        let snapshot = DomSnapshot {
            elements: vec![select],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        let entry = mapping.get("auto_select_1").unwrap();
        // Inquiry-type select prefers その他.
        assert_eq!(entry.auto_action, Some(AutoAction::SelectIndex(2)));
    }

    #[test]
    fn prefecture_select_follows_client_address() {
        let mut select = ElementDescriptor {
            tag_name: "select".into(),
            name: "pref".into(),
            selector: "select[name=\"pref\"]".into(),
            visible: true,
            enabled: true,
            selected_index: 0,
            ..Default::default()
        };
        select.options = vec![
            crate::dom::SelectOptionRecord { text: "選択してください".into(), value: "".into() },
            crate::dom::SelectOptionRecord { text: "東京都".into(), value: "13".into() },
            crate::dom::SelectOptionRecord { text: "大阪府".into(), value: "27".into() },
            crate::dom::SelectOptionRecord { text: "福岡県".into(), value: "40".into() },
        ];
        let snapshot = DomSnapshot {
            elements: vec![select],
            ..Default::default()
        };
        let client = ClientFields {
            address_1: Some("福岡県".into()),
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &client, &mut mapping);
        let entry = mapping.get("auto_select_1").unwrap();
        assert_eq!(entry.auto_action, Some(AutoAction::SelectIndex(3)));
    }

    #[test]
    fn required_text_rescued_with_fullwidth_space() {
        let mut el = input("remarks_field", "text");
        el.required_attr = true;
        let snapshot = DomSnapshot {
            elements: vec![el, input("email_confirm_x", "text")],
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &ClientFields::default(), &mut mapping);
        let entry = mapping.get("auto_required_text_1").unwrap();
        assert_eq!(entry.element, 0);
        assert_eq!(
            entry.default_value,
            Some(serde_json::Value::String("\u{3000}".into()))
        );
        // Confirmation-looking inputs are never rescued.
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn gender_radio_follows_client() {
        let mut male = input("gender", "radio");
        male.value = "男性".into();
        let mut female = input("gender", "radio");
        female.value = "女性".into();
        let snapshot = DomSnapshot {
            elements: vec![male, female],
            ..Default::default()
        };
        let client = ClientFields {
            gender: Some("女性".into()),
            ..Default::default()
        };
        let mut mapping = FieldMapping::default();
        handle(&snapshot, &client, &mut mapping);
        let entry = mapping.get("auto_radio_gender").unwrap();
        assert_eq!(entry.element, 1);
    }
}
