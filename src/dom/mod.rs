//! Typed DOM snapshot consumed by the analyzer.
//!
//! The browser side runs one fixed batch script per page (see
//! [`scripts::COLLECT_SNAPSHOT`]) and returns a JSON document that
//! deserializes into [`DomSnapshot`]: every candidate form element with its
//! attributes, visibility and structural context primitives, plus the
//! page-scoped dt/dd and th/td header indexes and the text nodes used by the
//! position-based context search. All downstream analysis is pure Rust over
//! this snapshot; element identity is the index into [`DomSnapshot::elements`].

pub mod scripts;

use serde::{Deserialize, Serialize};

/// Viewport-relative bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let ih = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let iv = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        ih > 0.0 && iv > 0.0
    }
}

/// Text of one non-input sibling element, closest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingText {
    pub text: String,
    pub tag: String,
    /// 0 = adjacent sibling.
    pub position: usize,
}

/// One `<option>` of a select element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOptionRecord {
    pub text: String,
    pub value: String,
}

/// Everything the analyzer needs to know about one form element, extracted
/// once per page. Structural context primitives (label texts, sibling texts,
/// required marks) are captured page-side because they need DOM traversal;
/// prioritizing and scoring them happens in Rust.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    pub tag_name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub class_name: String,
    pub placeholder: String,
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    pub required_attr: bool,
    pub aria_required: String,
    pub style: String,
    pub aria_hidden: String,
    pub tabindex: String,
    pub aria_labelledby: String,
    pub checked: bool,
    pub selected_index: i64,
    pub options: Vec<SelectOptionRecord>,
    pub bounding_box: Option<BoundingBox>,
    /// Stable CSS selector preferring id, then name+type, built page-side.
    pub selector: String,

    // Structural context primitives.
    pub label_parent_text: Option<String>,
    pub aria_labelled_texts: Vec<String>,
    pub aria_described_texts: Vec<String>,
    pub li_label_text: Option<String>,
    pub parent_own_text: Option<String>,
    pub legend_text: Option<String>,
    pub prev_siblings: Vec<SiblingText>,
    pub next_siblings: Vec<SiblingText>,
    /// Direct DOM-walk fallbacks when the bbox indexes miss.
    pub dt_text: Option<String>,
    pub th_text: Option<String>,
    pub dt_class: String,
    pub th_class: String,
    pub left_cell_text: Option<String>,
    /// Required-marker hints gathered page-side.
    pub ancestor_required_hint: bool,
    pub ancestor_required_confirmed: bool,
    pub near_required_mark: bool,
    pub name_required_marker: bool,
}

impl ElementDescriptor {
    /// Lowercased blob of name/id/class/placeholder for token probing.
    pub fn attr_blob(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name, self.id, self.class_name, self.placeholder
        )
        .to_lowercase()
    }

    pub fn is_required_by_attr(&self) -> bool {
        self.required_attr || self.aria_required.eq_ignore_ascii_case("true")
    }
}

/// dt/dd or th/td header record: the bounding box of the value cell and the
/// text of its header cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderRecord {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
}

impl HeaderRecord {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Visible text node with its parent bounding box, for the position search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNodeRecord {
    pub text: String,
    pub tag: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TextNodeRecord {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Page snapshot: the selected form (when one was found), its elements and
/// the page-scoped label indexes. Discarded on navigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomSnapshot {
    pub url: String,
    pub form_selector: Option<String>,
    pub form_bounds: Option<BoundingBox>,
    pub elements: Vec<ElementDescriptor>,
    /// label[for] index: element id -> label text.
    pub label_for: std::collections::HashMap<String, String>,
    pub dtdd_index: Vec<HeaderRecord>,
    pub thtd_index: Vec<HeaderRecord>,
    pub text_nodes: Vec<TextNodeRecord>,
}

/// Element indexes grouped by interaction kind, the unit the mapper and the
/// unmapped handler iterate over.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedElements {
    pub text_inputs: Vec<usize>,
    pub email_inputs: Vec<usize>,
    pub tel_inputs: Vec<usize>,
    pub textareas: Vec<usize>,
    pub selects: Vec<usize>,
    pub checkboxes: Vec<usize>,
    pub radios: Vec<usize>,
}

impl DomSnapshot {
    pub fn classify(&self) -> ClassifiedElements {
        let mut out = ClassifiedElements::default();
        for (i, el) in self.elements.iter().enumerate() {
            match el.tag_name.as_str() {
                "textarea" => out.textareas.push(i),
                "select" => out.selects.push(i),
                "input" => match el.input_type.to_lowercase().as_str() {
                    "email" | "mail" => out.email_inputs.push(i),
                    "tel" => out.tel_inputs.push(i),
                    "checkbox" => out.checkboxes.push(i),
                    "radio" => out.radios.push(i),
                    "hidden" | "submit" | "button" | "image" | "file" | "reset" => {}
                    _ => out.text_inputs.push(i),
                },
                _ => {}
            }
        }
        out
    }

    /// Candidate buckets relevant for a pattern's tag/type constraints.
    pub fn candidates_for(&self, tags: &[&str], types: &[&str]) -> Vec<usize> {
        let classified = self.classify();
        let mut out = Vec::new();
        for tag in tags {
            match *tag {
                "textarea" => out.extend(&classified.textareas),
                "select" => out.extend(&classified.selects),
                "input" => {
                    if types.is_empty() {
                        out.extend(&classified.text_inputs);
                        out.extend(&classified.email_inputs);
                        out.extend(&classified.tel_inputs);
                        out.extend(&classified.radios);
                        out.extend(&classified.checkboxes);
                    } else {
                        for ty in types {
                            match *ty {
                                "email" | "mail" => out.extend(&classified.email_inputs),
                                "tel" => {
                                    out.extend(&classified.tel_inputs);
                                    out.extend(&classified.text_inputs);
                                }
                                "radio" => out.extend(&classified.radios),
                                "checkbox" => out.extend(&classified.checkboxes),
                                "text" => {
                                    out.extend(&classified.text_inputs);
                                    out.extend(&classified.email_inputs);
                                }
                                _ => out.extend(&classified.text_inputs),
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Candidate submit/confirm button returned by the button scan script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonCandidate {
    pub selector: String,
    pub tag_name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    /// Aggregated text: own text, value attribute, aria-label, descendants.
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub bounding_box: Option<BoundingBox>,
}

/// Consent checkbox candidate returned by the consent scan script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsentCandidate {
    pub selector: String,
    pub label_selector: Option<String>,
    pub text: String,
    pub checked: bool,
    pub visible: bool,
    pub bounding_box: Option<BoundingBox>,
    pub in_form: bool,
}
