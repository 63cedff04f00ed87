use crate::board::{Board, Color};
use crate::errors::{EngineError, Result};
use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Number of input features: 64 squares x 12 piece codes
pub const FEATURE_COUNT: usize = 64 * 12;

/// Accumulator network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_size: usize,    // Accumulator width per perspective
    pub accumulator_clip: f32, // Accumulators clipped to [-clip, clip]
    pub output_clip_min: f32,  // Raw output lower bound
    pub output_clip_max: f32,  // Raw output upper bound
    pub output_scale: f32,     // Raw output units per pawn
    pub seed: u64,             // Seed for weight initialisation
    pub init_std: f32,         // Std deviation of initial weights
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_size: 256,
            accumulator_clip: 127.0,
            output_clip_min: -32768.0,
            output_clip_max: 32767.0,
            output_scale: 100.0,
            seed: 0x5EED_CAFE,
            init_std: 0.1,
        }
    }
}

impl NetworkConfig {
    /// Small network for tests and quick benchmarks
    pub fn compact() -> Self {
        Self {
            hidden_size: 32,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(EngineError::ConfigurationError(
                "network hidden_size must be positive".to_string(),
            ));
        }
        if !(self.accumulator_clip.is_finite() && self.accumulator_clip > 0.0) {
            return Err(EngineError::ConfigurationError(
                "network accumulator_clip must be positive".to_string(),
            ));
        }
        if self.output_clip_min.is_nan()
            || self.output_clip_max.is_nan()
            || self.output_clip_min >= self.output_clip_max
        {
            return Err(EngineError::ConfigurationError(
                "network output clip range is empty".to_string(),
            ));
        }
        if !(self.output_scale.is_finite() && self.output_scale > 0.0) {
            return Err(EngineError::ConfigurationError(
                "network output_scale must be positive".to_string(),
            ));
        }
        if !(self.init_std.is_finite() && self.init_std > 0.0) {
            return Err(EngineError::ConfigurationError(
                "network init_std must be a positive finite number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accumulator-style evaluation network.
///
/// Each side has its own feature-weight table. A perspective sees its own
/// pieces as they stand and the opponent's pieces mirrored top to bottom
/// with colors swapped. The two clipped accumulators are projected to a
/// single score by the output layer. Accumulators are recomputed from the
/// board on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulatorNetwork {
    config: NetworkConfig,
    white_weights: Array2<f32>,  // [FEATURE_COUNT, hidden]
    black_weights: Array2<f32>,  // [FEATURE_COUNT, hidden]
    feature_bias: Array1<f32>,   // [hidden]
    output_weights: Array1<f32>, // [2 * hidden], white half first
    output_bias: f32,
}

impl AccumulatorNetwork {
    /// Create a network with seeded random weights.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;

        let normal = Normal::new(0.0f32, config.init_std)
            .map_err(|e| EngineError::ConfigurationError(format!("weight distribution: {e}")))?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let hidden = config.hidden_size;

        let white_weights = Array2::random_using((FEATURE_COUNT, hidden), normal, &mut rng);
        let black_weights = Array2::random_using((FEATURE_COUNT, hidden), normal, &mut rng);
        let output_weights = Array1::random_using(2 * hidden, normal, &mut rng);

        Ok(Self {
            config,
            white_weights,
            black_weights,
            feature_bias: Array1::zeros(hidden),
            output_weights,
            output_bias: 0.0,
        })
    }

    pub fn with_default_config() -> Result<Self> {
        Self::new(NetworkConfig::default())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Feature index of a piece code on a square, `None` for empty or
    /// unknown codes.
    pub fn feature_index(code: char, square_index: usize) -> Option<usize> {
        let piece = match code {
            'P' => 0,
            'N' => 1,
            'B' => 2,
            'R' => 3,
            'Q' => 4,
            'K' => 5,
            'p' => 6,
            'n' => 7,
            'b' => 8,
            'r' => 9,
            'q' => 10,
            'k' => 11,
            _ => return None,
        };
        Some(square_index * 12 + piece)
    }

    /// Active feature indices for the white and black perspectives.
    pub fn active_features(board: &Board) -> (Vec<usize>, Vec<usize>) {
        let mut white = Vec::with_capacity(32);
        let mut black = Vec::with_capacity(32);

        for (square, color, kind) in board.pieces() {
            let own = kind.to_char(color);
            let swapped = kind.to_char(!color);
            let mirrored = square.mirrored().index();
            let (own_list, other_list) = match color {
                Color::White => (&mut white, &mut black),
                Color::Black => (&mut black, &mut white),
            };
            if let Some(index) = Self::feature_index(own, square.index()) {
                own_list.push(index);
            }
            if let Some(index) = Self::feature_index(swapped, mirrored) {
                other_list.push(index);
            }
        }

        (white, black)
    }

    /// Compute both clipped accumulators from scratch.
    pub fn refresh(&self, board: &Board) -> (Array1<f32>, Array1<f32>) {
        let (white_features, black_features) = Self::active_features(board);
        let clip = self.config.accumulator_clip;

        let mut white = self.feature_bias.clone();
        for index in white_features {
            white += &self.white_weights.row(index);
        }
        let mut black = self.feature_bias.clone();
        for index in black_features {
            black += &self.black_weights.row(index);
        }

        white.mapv_inplace(|v| v.clamp(-clip, clip));
        black.mapv_inplace(|v| v.clamp(-clip, clip));
        (white, black)
    }

    /// Score in pawn units, positive when `side_to_move` is better off.
    pub fn evaluate(&self, board: &Board, side_to_move: Color) -> f32 {
        let (white, black) = self.refresh(board);
        let hidden = self.config.hidden_size;

        let raw = white.dot(&self.output_weights.slice(s![..hidden]))
            + black.dot(&self.output_weights.slice(s![hidden..]))
            + self.output_bias;
        let score = raw.clamp(self.config.output_clip_min, self.config.output_clip_max)
            / self.config.output_scale;

        match side_to_move {
            Color::White => score,
            Color::Black => -score,
        }
    }

    /// Total number of learned parameters.
    pub fn parameter_count(&self) -> usize {
        self.white_weights.len()
            + self.black_weights.len()
            + self.feature_bias.len()
            + self.output_weights.len()
            + 1
    }

    /// Write the network (config and weights) as a bincode file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(writer, self)?;
        tracing::info!(path = %path.as_ref().display(), "saved network weights");
        Ok(())
    }

    /// Read a network written by `save`, checking that the stored tables
    /// match the stored config.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let network: AccumulatorNetwork = bincode::deserialize_from(reader)?;
        network.config.validate()?;
        network.check_shapes()?;
        tracing::info!(
            path = %path.as_ref().display(),
            hidden = network.config.hidden_size,
            "loaded network weights"
        );
        Ok(network)
    }

    fn check_shapes(&self) -> Result<()> {
        let hidden = self.config.hidden_size;
        let expected = (FEATURE_COUNT, hidden);
        if self.white_weights.dim() != expected
            || self.black_weights.dim() != expected
            || self.feature_bias.len() != hidden
            || self.output_weights.len() != 2 * hidden
        {
            return Err(EngineError::SerializationError(format!(
                "weight tables do not match hidden size {hidden}"
            )));
        }
        Ok(())
    }
}
