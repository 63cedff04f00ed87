use crate::board::{Board, Color};
use crate::errors::{EngineError, Result};
use crate::nnue::{AccumulatorNetwork, NetworkConfig};
use crate::traditional_evaluation::{EvaluationBreakdown, TraditionalEvaluator};
use crate::utils::cache::{CacheStats, EvaluationCache};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mixing ratio between the network and the traditional estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub nnue_weight: f32,
    pub traditional_weight: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            nnue_weight: 0.8,
            traditional_weight: 0.2,
        }
    }
}

impl BlendWeights {
    /// Weights from the network share in percent; the rest goes to the
    /// traditional estimate.
    pub fn from_percent(nnue_percent: u32) -> Self {
        let nnue_weight = nnue_percent.min(100) as f32 / 100.0;
        Self {
            nnue_weight,
            traditional_weight: 1.0 - nnue_weight,
        }
    }

    /// Network share rounded to a whole percent
    pub fn nnue_percent(&self) -> u32 {
        (self.nnue_weight * 100.0).round().clamp(0.0, 100.0) as u32
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |w: f32| w.is_finite() && w >= 0.0;
        if !ok(self.nnue_weight) || !ok(self.traditional_weight) {
            return Err(EngineError::ConfigurationError(format!(
                "blend weights must be non-negative, got {} / {}",
                self.nnue_weight, self.traditional_weight
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn blend(&self, nnue: f32, traditional: f32) -> f32 {
        self.nnue_weight * nnue + self.traditional_weight * traditional
    }
}

/// Evaluator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub blend: BlendWeights,
    pub cache_capacity: usize, // Entries, not bytes
    pub network: NetworkConfig,
    pub weights_path: Option<PathBuf>, // Load network weights instead of seeding
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            blend: BlendWeights::default(),
            cache_capacity: 100_000,
            network: NetworkConfig::default(),
            weights_path: None,
        }
    }
}

/// All three estimates for one position, side-to-move perspective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationScores {
    pub accumulator: f32,
    pub traditional: f32,
    pub blended: f32,
}

/// Blended position evaluator with a result cache
pub struct PositionEvaluator {
    network: AccumulatorNetwork,
    traditional: TraditionalEvaluator,
    blend: BlendWeights,
    cache: EvaluationCache,
}

impl PositionEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        config.blend.validate()?;
        let network = match &config.weights_path {
            Some(path) => AccumulatorNetwork::load(path)?,
            None => AccumulatorNetwork::new(config.network.clone())?,
        };
        tracing::debug!(
            parameters = network.parameter_count(),
            cache_capacity = config.cache_capacity,
            nnue_weight = config.blend.nnue_weight,
            "position evaluator ready"
        );
        Ok(Self {
            network,
            traditional: TraditionalEvaluator::default(),
            blend: config.blend,
            cache: EvaluationCache::new(config.cache_capacity),
        })
    }

    /// Blended score in pawn units, positive when `side_to_move` is better.
    /// Results are cached by (board, side to move).
    pub fn evaluate(&mut self, board: &Board, side_to_move: Color) -> f32 {
        let key = (*board, side_to_move);
        if let Some(score) = self.cache.get(&key) {
            return score;
        }
        let score = self.evaluate_breakdown(board, side_to_move).blended;
        self.cache.insert(key, score);
        score
    }

    /// Uncached evaluation returning every estimate
    pub fn evaluate_breakdown(&self, board: &Board, side_to_move: Color) -> EvaluationScores {
        let accumulator = self.network.evaluate(board, side_to_move);
        let traditional = self.traditional.evaluate(board, side_to_move);
        EvaluationScores {
            accumulator,
            traditional,
            blended: self.blend.blend(accumulator, traditional),
        }
    }

    /// Per-term traditional scores (centipawns, white's perspective)
    pub fn traditional_breakdown(&self, board: &Board) -> EvaluationBreakdown {
        self.traditional.evaluate_detailed(board)
    }

    pub fn blend_weights(&self) -> BlendWeights {
        self.blend
    }

    /// Change the blend. Cached scores are dropped when the weights differ.
    pub fn set_blend_weights(&mut self, blend: BlendWeights) -> Result<()> {
        blend.validate()?;
        if blend != self.blend {
            self.blend = blend;
            self.cache.clear();
            tracing::debug!(
                nnue_weight = blend.nnue_weight,
                traditional_weight = blend.traditional_weight,
                "blend weights changed, cache cleared"
            );
        }
        Ok(())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn resize_cache(&mut self, capacity: usize) {
        self.cache.resize(capacity);
    }

    pub fn network(&self) -> &AccumulatorNetwork {
        &self.network
    }

    /// Swap in a network loaded from disk
    pub fn load_network<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.network = AccumulatorNetwork::load(path)?;
        self.cache.clear();
        Ok(())
    }

    pub fn save_network<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.network.save(path)
    }
}
