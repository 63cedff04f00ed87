use crate::errors::{EngineError, Result};
use crate::hybrid_evaluation::EvaluatorConfig;
use crate::tactical_search::{DEFAULT_SEARCH_DEPTH, MAX_SEARCH_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest transposition/evaluation cache size accepted, in megabytes
pub const MAX_HASH_MB: usize = 1024;

/// Engine-wide settings: identity, search defaults and the evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine_name: String,
    pub author: String,
    /// Depth used by `go` when no depth is given
    pub default_depth: u32,
    /// A clock budget is the mover's remaining time divided by this
    pub clock_divisor: u64,
    /// How long `stop` and `quit` wait for the search thread
    pub stop_timeout_ms: u64,
    pub hash_mb: usize,
    pub debug: bool,
    pub evaluator: EvaluatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_name: "Maestro Chess Engine".to_string(),
            author: "Chess Engine Team".to_string(),
            default_depth: DEFAULT_SEARCH_DEPTH,
            clock_divisor: 30,
            stop_timeout_ms: 1000,
            hash_mb: 64,
            debug: false,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::info!(path = %path.as_ref().display(), "loaded engine config");
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SEARCH_DEPTH).contains(&self.default_depth) {
            return Err(EngineError::ConfigurationError(format!(
                "default_depth must be in 1..={MAX_SEARCH_DEPTH}, got {}",
                self.default_depth
            )));
        }
        if self.clock_divisor == 0 {
            return Err(EngineError::ConfigurationError(
                "clock_divisor must be positive".to_string(),
            ));
        }
        if !(1..=MAX_HASH_MB).contains(&self.hash_mb) {
            return Err(EngineError::ConfigurationError(format!(
                "hash_mb must be in 1..={MAX_HASH_MB}, got {}",
                self.hash_mb
            )));
        }
        self.evaluator.blend.validate()?;
        self.evaluator.network.validate()?;
        Ok(())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid_evaluation::BlendWeights;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_depth, 6);
        assert_eq!(config.stop_timeout(), Duration::from_secs(1));
        assert_eq!(config.evaluator.blend.nnue_percent(), 80);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "default_depth": 4, "hash_mb": 16 }"#).unwrap();
        assert_eq!(config.default_depth, 4);
        assert_eq!(config.hash_mb, 16);
        assert_eq!(config.engine_name, "Maestro Chess Engine");
        assert_eq!(config.clock_divisor, 30);
    }

    #[test]
    fn test_validation_errors() {
        let bad_depth = EngineConfig {
            default_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            bad_depth.validate(),
            Err(EngineError::ConfigurationError(_))
        ));

        let bad_hash = EngineConfig {
            hash_mb: 4096,
            ..Default::default()
        };
        assert!(bad_hash.validate().is_err());

        let mut bad_blend = EngineConfig::default();
        bad_blend.evaluator.blend = BlendWeights {
            nnue_weight: f32::NAN,
            traditional_weight: 0.5,
        };
        assert!(bad_blend.validate().is_err());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig {
            default_depth: 3,
            debug: true,
            ..Default::default()
        };
        config.to_json_file(&path).unwrap();
        assert_eq!(EngineConfig::from_json_file(&path).unwrap(), config);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(EngineError::SerializationError(_))
        ));
    }
}
