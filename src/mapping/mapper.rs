//! Best-element selection per logical field.
//!
//! Fields are visited in descending catalog weight. For each field the
//! candidate bucket is narrowed with the cheap context-free score, the top
//! few graduate to the full score, and the best non-taken element wins.
//! One element never serves two fields; split mappings displace their
//! unified counterparts afterwards.

use tracing::debug;

use crate::catalog::{Catalog, FieldId};
use crate::context::ContextExtractor;
use crate::dom::DomSnapshot;
use crate::models::{FieldMapping, FieldMappingEntry, MappingSource};
use crate::scoring::{ElementScorer, ScoreDetails};

/// Minimum full score an element needs to claim a field.
const MIN_ACCEPT_SCORE: i32 = 70;

/// Indexed split parts must match lexically; a semantic type match alone
/// cannot tell part 1 from part 3.
fn is_split_part(field: FieldId) -> bool {
    matches!(
        field,
        FieldId::Phone1 | FieldId::Phone2 | FieldId::Phone3 | FieldId::Postal1 | FieldId::Postal2
    )
}

pub struct FieldMapper<'a> {
    snapshot: &'a DomSnapshot,
    extractor: &'a ContextExtractor<'a>,
    scorer: &'a ElementScorer,
    top_k: usize,
}

impl<'a> FieldMapper<'a> {
    pub fn new(
        snapshot: &'a DomSnapshot,
        extractor: &'a ContextExtractor<'a>,
        scorer: &'a ElementScorer,
        top_k: usize,
    ) -> Self {
        Self {
            snapshot,
            extractor,
            scorer,
            top_k: top_k.max(1),
        }
    }

    /// Builds the scored mapping and applies the unified/split promotion
    /// rules.
    pub fn build_mapping(&self) -> FieldMapping {
        let catalog = Catalog::global();
        let mut mapping = FieldMapping::default();

        for pattern in catalog.ordered() {
            let candidates = self.snapshot.candidates_for(pattern.tags, pattern.types);
            if candidates.is_empty() {
                continue;
            }

            // Cheap preselection, then full scores on the survivors.
            let mut quick: Vec<(usize, i32)> = candidates
                .iter()
                .filter(|idx| !mapping.contains_element(**idx))
                .map(|idx| (*idx, self.scorer.quick_score(&self.snapshot.elements[*idx], pattern)))
                .filter(|(_, score)| *score > 0)
                .collect();
            quick.sort_by(|a, b| b.1.cmp(&a.1));
            quick.truncate(self.top_k);

            let mut best: Option<(usize, ScoreDetails)> = None;
            for (idx, _) in quick {
                let contexts = self.extractor.contexts_for(idx);
                let details = self.scorer.score(&self.snapshot.elements[idx], pattern, &contexts);
                if details.excluded {
                    continue;
                }
                if !self.acceptable(pattern.field, &details) {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some((_, current)) => {
                        ElementScorer::compare(&details, current) == std::cmp::Ordering::Greater
                    }
                };
                if better {
                    best = Some((idx, details));
                }
            }

            if let Some((idx, details)) = best {
                let el = &self.snapshot.elements[idx];
                let contexts = self.extractor.contexts_for(idx);
                let required = el.is_required_by_attr()
                    || el.ancestor_required_confirmed
                    || el.near_required_mark
                    || el.name_required_marker
                    || required_via_header_class(el)
                    || crate::context::detect_required_indicator(&contexts);
                let entry = FieldMappingEntry {
                    element: idx,
                    selector: el.selector.clone(),
                    score: details.total_score,
                    tag_name: el.tag_name.clone(),
                    input_type: el.input_type.clone(),
                    name: el.name.clone(),
                    id: el.id.clone(),
                    required,
                    visible: el.visible,
                    enabled: el.enabled,
                    default_value: None,
                    auto_action: None,
                    selected_index: None,
                    source: MappingSource::Scored,
                };
                if mapping.insert(pattern.field.key(), entry) {
                    debug!(
                        field = pattern.field.key(),
                        element = idx,
                        score = details.total_score,
                        "field mapped"
                    );
                }
            }
        }

        self.apply_promotions(&mut mapping);
        mapping
    }

    fn acceptable(&self, field: FieldId, details: &ScoreDetails) -> bool {
        if details.total_score < MIN_ACCEPT_SCORE {
            return false;
        }
        let lexical: i32 = ["name", "id", "placeholder", "class", "context"]
            .iter()
            .map(|k| details.breakdown.get(*k).copied().unwrap_or(0).max(0))
            .sum();
        if lexical > 0 {
            return true;
        }
        let type_score = details.breakdown.get("type").copied().unwrap_or(0);
        type_score >= 100 && !is_split_part(field)
    }

    /// Split mappings displace their unified counterparts.
    fn apply_promotions(&self, mapping: &mut FieldMapping) {
        let pairs: [(&str, &str, &str); 2] = [
            (
                FieldId::LastName.key(),
                FieldId::FirstName.key(),
                FieldId::UnifiedFullName.key(),
            ),
            (
                FieldId::LastNameKana.key(),
                FieldId::FirstNameKana.key(),
                FieldId::UnifiedFullNameKana.key(),
            ),
        ];
        for (last, first, unified) in pairs {
            let last_el = mapping.get(last).map(|e| (e.element, e.visible));
            let first_el = mapping.get(first).map(|e| (e.element, e.visible));
            if let (Some((le, lv)), Some((fe, fv))) = (last_el, first_el) {
                if le != fe && lv && fv {
                    let displaced = mapping
                        .get(unified)
                        .map(|e| e.element == le || e.element == fe)
                        .unwrap_or(false);
                    if displaced {
                        mapping.remove(unified);
                        debug!(field = unified, "unified mapping displaced by split pair");
                    }
                }
            }
        }

        let parts: Vec<usize> = [FieldId::Phone1, FieldId::Phone2, FieldId::Phone3]
            .iter()
            .filter_map(|f| mapping.get(f.key()).map(|e| e.element))
            .collect();
        if parts.len() == 3 {
            let displaced = mapping
                .get(FieldId::UnifiedPhone.key())
                .map(|e| parts.contains(&e.element))
                .unwrap_or(false);
            if displaced {
                mapping.remove(FieldId::UnifiedPhone.key());
            }
        }
    }
}

/// dt/th header cells flagged with a required-style class mark the row as
/// mandatory even without text markers.
pub(crate) fn required_via_header_class(el: &crate::dom::ElementDescriptor) -> bool {
    const TOKENS: &[&str] = &["need", "required", "必須", "must", "mandatory"];
    TOKENS.iter().any(|t| el.dt_class.contains(t)) || TOKENS.iter().any(|t| el.th_class.contains(t))
}
