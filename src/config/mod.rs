//! Configuration loading.
//!
//! A single `Config` tree loaded once at startup from an optional TOML file
//! plus `AUTOFORM_`-prefixed environment overrides. Every field has a
//! default; invalid values fall back to the defaults with a warning instead
//! of failing the process.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub mod defaults;
pub mod duration_serde;

use crate::models::EscapeDecodeConfig;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub context: ContextSettings,
    pub consent: ConsentConfig,
    pub buttons: ButtonsConfig,
    pub timeouts: TimeoutsConfig,
    pub choices: ChoicesConfig,
    pub values: ValuesConfig,
    pub judge: JudgeConfig,
    pub client_record: EscapeDecodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Candidates that graduate from quick score to the full score pass.
    #[serde(default = "default_top_k_full_score")]
    pub top_k_full_score: usize,
    #[serde(default = "default_true")]
    pub enable_auto_handling: bool,
    /// Copy the phone number into non-required FAX inputs.
    #[serde(default)]
    pub enable_optional_fax_fill: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_k_full_score: default_top_k_full_score(),
            enable_auto_handling: true,
            enable_optional_fax_fill: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    #[serde(default = "default_search_radius")]
    pub search_radius: f64,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_true")]
    pub enable_shortcircuit: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            max_text_length: default_max_text_length(),
            min_text_length: default_min_text_length(),
            confidence_threshold: default_confidence_threshold(),
            enable_shortcircuit: true,
        }
    }
}

impl ContextSettings {
    pub fn to_context_config(&self) -> crate::context::ContextConfig {
        crate::context::ContextConfig {
            search_radius: self.search_radius,
            max_text_length: self.max_text_length,
            min_text_length: self.min_text_length,
            confidence_threshold: self.confidence_threshold,
            enable_shortcircuit: self.enable_shortcircuit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub log_only_mode: bool,
    #[serde(default = "default_consent_proximity_px")]
    pub proximity_px: f64,
    #[serde(default = "default_consent_max_scan")]
    pub max_scan_candidates: usize,
    #[serde(default = "default_consent_max_to_check")]
    pub max_to_check: usize,
    #[serde(default = "default_consent_min_score")]
    pub min_score: f64,
    #[serde(default = "default_true")]
    pub ensure_within_same_form: bool,
    #[serde(default = "default_consent_vertical_offset")]
    pub vertical_offset_px: f64,
    #[serde(default = "default_consent_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_consent_must_keywords")]
    pub must_keywords: Vec<String>,
    #[serde(default = "default_consent_context_keywords")]
    pub context_keywords: Vec<String>,
    #[serde(default = "default_consent_negative_keywords")]
    pub negative_keywords: Vec<String>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_only_mode: false,
            proximity_px: default_consent_proximity_px(),
            max_scan_candidates: default_consent_max_scan(),
            max_to_check: default_consent_max_to_check(),
            min_score: default_consent_min_score(),
            ensure_within_same_form: true,
            vertical_offset_px: default_consent_vertical_offset(),
            max_attempts: default_consent_max_attempts(),
            must_keywords: default_consent_must_keywords(),
            context_keywords: default_consent_context_keywords(),
            negative_keywords: default_consent_negative_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    #[serde(default = "default_primary_button_keywords")]
    pub primary: Vec<String>,
    #[serde(default = "default_secondary_button_keywords")]
    pub secondary: Vec<String>,
    #[serde(default = "default_confirmation_button_keywords")]
    pub confirmation: Vec<String>,
    #[serde(default = "default_final_button_keywords")]
    pub final_submit: Vec<String>,
    #[serde(default = "default_exclude_button_keywords")]
    pub exclude: Vec<String>,
    #[serde(default = "default_fallback_selectors")]
    pub fallback_selectors: Vec<String>,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_button_keywords(),
            secondary: default_secondary_button_keywords(),
            confirmation: default_confirmation_button_keywords(),
            final_submit: default_final_button_keywords(),
            exclude: default_exclude_button_keywords(),
            fallback_selectors: default_fallback_selectors(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    #[serde(with = "duration_serde::duration", default = "default_page_load_timeout")]
    pub page_load: Duration,
    #[serde(with = "duration_serde::duration", default = "default_element_wait_timeout")]
    pub element_wait: Duration,
    #[serde(with = "duration_serde::duration", default = "default_click_timeout")]
    pub click: Duration,
    #[serde(with = "duration_serde::duration", default = "default_preprocessing_timeout")]
    pub preprocessing: Duration,
    #[serde(with = "duration_serde::duration", default = "default_dynamic_message_timeout")]
    pub dynamic_message_wait: Duration,
    #[serde(with = "duration_serde::duration", default = "default_dom_monitoring_timeout")]
    pub dom_monitoring: Duration,
    #[serde(with = "duration_serde::duration", default = "default_js_execution_timeout")]
    pub js_execution: Duration,
    #[serde(with = "duration_serde::duration", default = "default_ajax_settle")]
    pub ajax_settle: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            page_load: default_page_load_timeout(),
            element_wait: default_element_wait_timeout(),
            click: default_click_timeout(),
            preprocessing: default_preprocessing_timeout(),
            dynamic_message_wait: default_dynamic_message_timeout(),
            dom_monitoring: default_dom_monitoring_timeout(),
            js_execution: default_js_execution_timeout(),
            ajax_settle: default_ajax_settle(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoicesConfig {
    #[serde(default = "default_choice_priority_primary")]
    pub priority_primary: Vec<String>,
    #[serde(default = "default_choice_priority_secondary")]
    pub priority_secondary: Vec<String>,
    #[serde(default = "default_choice_priority_tertiary")]
    pub priority_tertiary: Vec<String>,
    #[serde(default = "default_select_exclude_keywords")]
    pub select_exclude_keywords: Vec<String>,
}

impl Default for ChoicesConfig {
    fn default() -> Self {
        Self {
            priority_primary: default_choice_priority_primary(),
            priority_secondary: default_choice_priority_secondary(),
            priority_tertiary: default_choice_priority_tertiary(),
            select_exclude_keywords: default_select_exclude_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuesConfig {
    #[serde(default = "default_name_separator")]
    pub name_separator: String,
    #[serde(default = "default_phone_separator")]
    pub phone_separator: String,
    #[serde(default = "default_postal_separator")]
    pub postal_separator: String,
}

impl Default for ValuesConfig {
    fn default() -> Self {
        Self {
            name_separator: default_name_separator(),
            phone_separator: default_phone_separator(),
            postal_separator: default_postal_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    #[serde(default = "default_mutation_threshold")]
    pub mutation_threshold: u64,
    #[serde(default = "default_cleared_ratio")]
    pub cleared_field_ratio: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            mutation_threshold: default_mutation_threshold(),
            cleared_field_ratio: default_cleared_ratio(),
        }
    }
}

impl Config {
    /// Loads config from an optional TOML file and `AUTOFORM_` env vars,
    /// then validates. Invalid values revert to their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("AUTOFORM_").split("__"));
        let mut config: Config = figment.extract()?;
        config.validate();
        Ok(config)
    }

    fn validate(&mut self) {
        if self.context.search_radius <= 0.0 {
            warn!(
                value = self.context.search_radius,
                "invalid context search radius, using default"
            );
            self.context.search_radius = default_search_radius();
        }
        if !(0.0..=1.0).contains(&self.context.confidence_threshold) {
            warn!(
                value = self.context.confidence_threshold,
                "confidence threshold out of range, using default"
            );
            self.context.confidence_threshold = default_confidence_threshold();
        }
        if !(0.0..=1.0).contains(&self.judge.cleared_field_ratio) {
            warn!(
                value = self.judge.cleared_field_ratio,
                "cleared field ratio out of range, using default"
            );
            self.judge.cleared_field_ratio = default_cleared_ratio();
        }
        if self.analyzer.top_k_full_score == 0 {
            warn!("top_k_full_score must be positive, using default");
            self.analyzer.top_k_full_score = default_top_k_full_score();
        }
        if self.consent.max_attempts == 0 {
            self.consent.max_attempts = default_consent_max_attempts();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = Config::default();
        assert_eq!(config.timeouts.page_load, Duration::from_secs(15));
        assert_eq!(config.timeouts.dom_monitoring, Duration::from_secs(10));
        assert_eq!(config.analyzer.top_k_full_score, 5);
        assert!(config.consent.enabled);
        assert!(config.buttons.primary.iter().any(|k| k == "送信"));
        assert!(config.buttons.exclude.iter().any(|k| k == "キャンセル"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let mut config = Config::default();
        config.context.confidence_threshold = 7.0;
        config.analyzer.top_k_full_score = 0;
        config.validate();
        assert_eq!(config.context.confidence_threshold, 0.3);
        assert_eq!(config.analyzer.top_k_full_score, 5);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.values.name_separator, " ");
        assert_eq!(config.judge.mutation_threshold, 5);
    }
}
