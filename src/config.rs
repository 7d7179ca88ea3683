use std::path::Path;

use serde::Deserialize;

use crate::error::DecoderError;
use crate::types::SearchParams;

/// Lexicon representation the decoder searches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexiconKind {
    #[default]
    Trie,
    Linear,
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub phonemes_path: String,
    pub dictionary_path: String,
    pub confusion_path: String,
    pub language_model_path: String,
    pub lexicon: LexiconKind,
    pub search: SearchParams,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            phonemes_path: String::new(),
            dictionary_path: String::new(),
            confusion_path: String::new(),
            language_model_path: String::new(),
            lexicon: LexiconKind::default(),
            search: SearchParams::default(),
        }
    }
}

/// Optional JSON file with decoding settings; missing fields keep defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_pruning_coeff")]
    pub pruning_coeff: f64,
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default)]
    pub lexicon: LexiconKind,
}

fn default_pruning_coeff() -> f64 {
    SearchParams::DEFAULT_PRUNING_COEFF
}
fn default_lambda() -> f64 {
    SearchParams::DEFAULT_LAMBDA
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            pruning_coeff: default_pruning_coeff(),
            lambda: default_lambda(),
            lexicon: LexiconKind::default(),
        }
    }
}

impl SearchSettings {
    pub fn load(path: &Path) -> Result<Self, DecoderError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DecoderError::io("read search settings", e))?;
        serde_json::from_str(&data).map_err(|e| DecoderError::json("parse search settings", e))
    }

    pub fn params(&self) -> SearchParams {
        SearchParams {
            pruning_coeff: self.pruning_coeff,
            lambda: self.lambda,
        }
    }
}

/// Interpolation weight and pruning threshold for language model training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub lambda: f32,
    pub eps: f32,
}

impl TrainingConfig {
    pub const DEFAULT_LAMBDA: f32 = 0.7;
    pub const DEFAULT_EPS: f32 = 0.0;

    pub fn validate(&self) -> Result<(), DecoderError> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(DecoderError::invalid_argument(format!(
                "lambda must be within [0, 1], got {}",
                self.lambda
            )));
        }
        if !(0.0..1.0).contains(&self.eps) {
            return Err(DecoderError::invalid_argument(format!(
                "eps must be within [0, 1), got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lambda: Self::DEFAULT_LAMBDA,
            eps: Self::DEFAULT_EPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizer_config_default() {
        let config = RecognizerConfig::default();
        assert!(config.phonemes_path.is_empty());
        assert!(config.dictionary_path.is_empty());
        assert_eq!(config.lexicon, LexiconKind::Trie);
        assert_eq!(config.search.pruning_coeff, SearchParams::DEFAULT_PRUNING_COEFF);
        assert_eq!(config.search.lambda, SearchParams::DEFAULT_LAMBDA);
    }

    #[test]
    fn search_settings_fill_missing_fields() {
        let settings: SearchSettings = serde_json::from_str(r#"{ "lambda": 2.5 }"#).unwrap();
        assert_eq!(settings.lambda, 2.5);
        assert_eq!(settings.pruning_coeff, SearchParams::DEFAULT_PRUNING_COEFF);
        assert_eq!(settings.lexicon, LexiconKind::Trie);

        let settings: SearchSettings =
            serde_json::from_str(r#"{ "pruning_coeff": 3.0, "lexicon": "linear" }"#).unwrap();
        assert_eq!(settings.lexicon, LexiconKind::Linear);
        assert_eq!(settings.params().pruning_coeff, 3.0);
    }

    #[test]
    fn search_settings_load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SearchSettings::load(&path),
            Err(DecoderError::Json { .. })
        ));
    }

    #[test]
    fn training_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(TrainingConfig { lambda: 1.2, eps: 0.0 }.validate().is_err());
        assert!(TrainingConfig { lambda: 0.5, eps: 1.0 }.validate().is_err());
    }
}
