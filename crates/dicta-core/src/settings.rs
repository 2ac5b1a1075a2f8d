//! Global tuning loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub history: HistorySettings,
    pub gc: GcSettings,
    pub suggestions: SuggestionSettings,
    pub names: NameSettings,
    pub facilitator: FacilitatorSettings,
    pub personalization: PersonalizationSettings,
    pub spellcheck: SpellCheckSettings,
}

/// Forgetting-curve parameters for dictionaries with historical info.
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    pub boost_per_use: i32,
    pub valid_word_bonus: i32,
    pub max_probability: i32,
    pub half_life_hours: f64,
    pub discard_probability: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcSettings {
    pub max_unigrams: usize,
    pub max_ngrams: usize,
    pub updates_before_gc: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionSettings {
    pub max_results: usize,
    pub read_timeout_ms: u64,
    pub ngram_weight: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameSettings {
    pub apps_frequency: i32,
    pub apps_bigram_frequency: i32,
    pub contacts_frequency: i32,
    pub contacts_bigram_frequency: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilitatorSettings {
    pub capitalized_form_max_probability: i32,
    pub personal_dict_promotion_frequency: i32,
    pub personal_dict_frequency: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizationSettings {
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellCheckSettings {
    pub max_sessions: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_non_negative {
        ($section:ident . $field:ident) => {
            if s.$section.$field < 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_probability {
        ($section:ident . $field:ident) => {
            if !(0..=crate::probability::MAX_PROBABILITY).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: format!("must be within 0..={}", crate::probability::MAX_PROBABILITY),
                });
            }
        };
    }

    check_non_negative!(history.boost_per_use);
    check_non_negative!(history.valid_word_bonus);
    check_probability!(history.max_probability);
    check_probability!(history.discard_probability);
    if s.history.half_life_hours <= 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "history.half_life_hours".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    check_positive_usize!(gc.max_unigrams);
    check_positive_usize!(gc.max_ngrams);
    check_positive_usize!(gc.updates_before_gc);

    check_positive_usize!(suggestions.max_results);
    if s.suggestions.ngram_weight < 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "suggestions.ngram_weight".to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    check_probability!(names.apps_frequency);
    check_probability!(names.apps_bigram_frequency);
    check_probability!(names.contacts_frequency);
    check_probability!(names.contacts_bigram_frequency);

    check_probability!(facilitator.capitalized_form_max_probability);
    check_probability!(facilitator.personal_dict_promotion_frequency);
    check_probability!(facilitator.personal_dict_frequency);

    check_positive_usize!(personalization.cache_capacity);
    check_positive_usize!(spellcheck.max_sessions);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.history.boost_per_use, 40);
        assert_eq!(s.history.max_probability, 255);
        assert!((s.history.half_life_hours - 168.0).abs() < f64::EPSILON);
        assert_eq!(s.names.apps_frequency, 100);
        assert_eq!(s.names.apps_bigram_frequency, 200);
        assert_eq!(s.names.contacts_frequency, 40);
        assert_eq!(s.names.contacts_bigram_frequency, 90);
        assert_eq!(s.facilitator.capitalized_form_max_probability, 140);
        assert_eq!(s.suggestions.max_results, 18);
        assert_eq!(s.spellcheck.max_sessions, 2);
    }

    #[test]
    fn error_zero_half_life() {
        let toml = DEFAULT_SETTINGS_TOML.replace("half_life_hours = 168.0", "half_life_hours = 0.0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("history.half_life_hours"));
    }

    #[test]
    fn error_probability_out_of_range() {
        let toml = DEFAULT_SETTINGS_TOML.replace("apps_frequency = 100", "apps_frequency = 300");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("names.apps_frequency"));
    }

    #[test]
    fn error_zero_sessions() {
        let toml = DEFAULT_SETTINGS_TOML.replace("max_sessions = 2", "max_sessions = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("spellcheck.max_sessions"));
    }

    #[test]
    fn error_missing_section() {
        let err = parse_settings_toml("[history]\nboost_per_use = 1\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
