// src/core/config.rs
use crate::core::{Result, ShapError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Artifact kinds that `explain` can render besides the probability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotFeature {
    /// One global importance plot per class.
    Summary,
    /// One per-sample contribution plot per class and test sample.
    Waterfall,
}

/// Configuration of one explanation pass.
///
/// ```json
/// {
///     "background_samples_to_gen": 75,
///     "shap_nsamples": 200,
///     "features": ["summary", "waterfall"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapGenConfig {
    /// Number of latent vectors drawn as the reference distribution.
    pub background_samples_to_gen: usize,
    /// Coalition budget per explained sample. Zero is rejected by the explainer.
    pub shap_nsamples: usize,
    #[serde(default)]
    pub features: BTreeSet<PlotFeature>,
    /// Seed for coalition sampling; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_summary_max_display")]
    pub summary_max_display: usize,
    #[serde(default = "default_waterfall_max_display")]
    pub waterfall_max_display: usize,
    /// Waterfall canvas in pixels (width, height).
    #[serde(default = "default_waterfall_size")]
    pub waterfall_size: (u32, u32),
}

fn default_summary_max_display() -> usize {
    20
}

fn default_waterfall_max_display() -> usize {
    10
}

// 18x10 inches at 100 dpi
fn default_waterfall_size() -> (u32, u32) {
    (1800, 1000)
}

impl ShapGenConfig {
    pub fn new(background_samples_to_gen: usize, shap_nsamples: usize) -> Self {
        ShapGenConfig {
            background_samples_to_gen,
            shap_nsamples,
            features: BTreeSet::new(),
            seed: None,
            summary_max_display: default_summary_max_display(),
            waterfall_max_display: default_waterfall_max_display(),
            waterfall_size: default_waterfall_size(),
        }
    }

    pub fn with_features<I: IntoIterator<Item = PlotFeature>>(mut self, features: I) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn wants(&self, feature: PlotFeature) -> bool {
        self.features.contains(&feature)
    }

    /// Parses and validates a JSON configuration object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ShapGenConfig = serde_json::from_str(json)
            .map_err(|e| ShapError::Configuration(format!("shap_gen config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.background_samples_to_gen == 0 {
            return Err(ShapError::Configuration(
                "background_samples_to_gen must be a positive integer".to_string(),
            ));
        }
        if self.summary_max_display == 0 || self.waterfall_max_display == 0 {
            return Err(ShapError::Configuration(
                "max_display values must be positive".to_string(),
            ));
        }
        if self.waterfall_size.0 < 200 || self.waterfall_size.1 < 100 {
            return Err(ShapError::Configuration(format!(
                "waterfall_size {:?} is too small to render",
                self.waterfall_size
            )));
        }
        Ok(())
    }
}

/// Configuration of the batch materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    pub batch_size: usize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Fixed seed gives the same order on every pass.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_shuffle() -> bool {
    true
}

impl BatchConfig {
    pub fn new(batch_size: usize) -> Self {
        BatchConfig {
            batch_size,
            shuffle: true,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ShapError::Configuration(
                "batch_size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_defaults() {
        let config = ShapGenConfig::from_json_str(
            r#"{"background_samples_to_gen": 75, "shap_nsamples": 200, "features": ["summary", "waterfall"]}"#,
        )
        .unwrap();
        assert_eq!(config.background_samples_to_gen, 75);
        assert!(config.wants(PlotFeature::Summary));
        assert!(config.wants(PlotFeature::Waterfall));
        assert_eq!(config.waterfall_size, (1800, 1000));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn features_default_to_empty() {
        let config =
            ShapGenConfig::from_json_str(r#"{"background_samples_to_gen": 5, "shap_nsamples": 10}"#)
                .unwrap();
        assert!(config.features.is_empty());
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let err = ShapGenConfig::from_json_str(
            r#"{"background_samples_to_gen": 5, "shap_nsamples": 10, "model": "rf"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ShapError::Configuration(_)));
    }

    #[test]
    fn unknown_feature_is_configuration_error() {
        let err = ShapGenConfig::from_json_str(
            r#"{"background_samples_to_gen": 5, "shap_nsamples": 10, "features": ["beeswarm"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ShapError::Configuration(_)));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = ShapGenConfig::from_json_str(r#"{"shap_nsamples": 10}"#).unwrap_err();
        assert!(matches!(err, ShapError::Configuration(_)));
    }

    #[test]
    fn zero_background_is_rejected() {
        let err = ShapGenConfig::new(0, 10).validate().unwrap_err();
        assert!(matches!(err, ShapError::Configuration(_)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(BatchConfig::new(0).validate().is_err());
        assert!(BatchConfig::new(1).validate().is_ok());
    }
}
