//! Pipeline-wide tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a site run.
///
/// The confidence threshold and stop-the-line ratio have no stated
/// derivation; they are kept configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum extraction confidence for `verified_inci`.
    ///
    /// Default: 0.80.
    pub min_confidence: f64,

    /// Minimum cleaned ingredient count.
    ///
    /// Default: 5.
    pub min_ingredients: usize,

    /// Failure rate above which a site run halts.
    ///
    /// Default: 0.50.
    pub stop_the_line_ratio: f64,

    /// Products that must be extracted before the ratio is evaluated.
    ///
    /// Default: 5.
    pub stop_the_line_min_sample: u32,

    /// Ceiling on model-assisted calls per site run.
    ///
    /// Default: 50.
    pub max_model_calls: u32,

    /// Page text characters handed to the model.
    ///
    /// Default: 15000.
    pub model_text_limit: usize,

    /// Deadline for a single page fetch.
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,

    /// Deadline for a single model call.
    #[serde(with = "duration_secs")]
    pub model_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.80,
            min_ingredients: 5,
            stop_the_line_ratio: 0.50,
            stop_the_line_min_sample: 5,
            max_model_calls: 50,
            model_text_limit: 15_000,
            fetch_timeout: Duration::from_secs(30),
            model_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model call ceiling.
    pub fn with_max_model_calls(mut self, max: u32) -> Self {
        self.max_model_calls = max;
        self
    }

    /// Set the verified confidence threshold.
    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    /// Set stop-the-line ratio and minimum sample.
    pub fn with_stop_the_line(mut self, ratio: f64, min_sample: u32) -> Self {
        self.stop_the_line_ratio = ratio;
        self.stop_the_line_min_sample = min_sample;
        self
    }

    /// Set fetch and model deadlines.
    pub fn with_timeouts(mut self, fetch: Duration, model: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.model_timeout = model;
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_confidence, 0.80);
        assert_eq!(config.stop_the_line_ratio, 0.50);
        assert_eq!(config.max_model_calls, 50);
    }

    #[test]
    fn test_deserialize_durations() {
        let json = r#"{"min_confidence":0.7,"min_ingredients":5,"stop_the_line_ratio":0.6,
            "stop_the_line_min_sample":3,"max_model_calls":0,"model_text_limit":100,
            "fetch_timeout":2.5,"model_timeout":10}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_model_calls, 0);
    }
}
