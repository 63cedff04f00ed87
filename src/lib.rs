//! # Maestro Chess Engine
//!
//! Core of a UCI chess engine: bit-parallel move generation, a blended
//! position evaluator and the protocol session that drives them.
//!
//! ## Features
//!
//! - **Bitboard move generation**: pseudo-legal moves from precomputed knight,
//!   king and ray tables with nearest-blocker sliding attacks
//! - **Blended evaluation**: an accumulator network mixed with a traditional
//!   material/positional evaluator (80/20 by default), cached in a bounded LRU
//! - **Tactical search**: iterative-deepening alpha-beta with cooperative
//!   cancellation
//! - **UCI session**: `uci`, `isready`, `setoption`, `position`, `go`, `stop`,
//!   `ponderhit`, `quit`, with all output routed through one channel
//!
//! ## Quick Start
//!
//! ```rust
//! use maestro_chess_engine::{Board, BitboardMoveGenerator, Color};
//!
//! let generator = BitboardMoveGenerator::new();
//! let moves = generator.pseudo_legal_moves(&Board::initial(), Color::White);
//! assert_eq!(moves.len(), 20);
//! ```
//!
//! Driving a session by hand:
//!
//! ```rust
//! use maestro_chess_engine::{BasicRules, EngineConfig, UciSession};
//!
//! let (mut session, output) =
//!     UciSession::with_channel(EngineConfig::default(), BasicRules::new()).unwrap();
//! session.handle_line("isready");
//! assert_eq!(output.recv().unwrap(), "readyok");
//! ```
//!
//! Game rules (castling, en passant, check and game status) live behind the
//! [`RulesEngine`] trait; [`BasicRules`] is a complete implementation built on
//! the bitboard generator.

pub mod attack_tables;
pub mod bitboard;
pub mod board;
pub mod config;
pub mod errors;
pub mod hybrid_evaluation;
pub mod move_generator;
pub mod nnue;
pub mod notation;
pub mod position;
pub mod rules;
pub mod tactical_search;
pub mod traditional_evaluation;
pub mod uci;
pub mod utils;

pub use attack_tables::{tables, AttackTables, Direction, SlidingPiece};
pub use bitboard::{BitIter, Bitboard, BitboardSet};
pub use board::{Board, Color, Move, MoveKind, PieceKind, Square, BOARD_SIZE, EMPTY};
pub use config::EngineConfig;
pub use errors::{EngineError, Result};
pub use hybrid_evaluation::{BlendWeights, EvaluationScores, EvaluatorConfig, PositionEvaluator};
pub use move_generator::BitboardMoveGenerator;
pub use nnue::{AccumulatorNetwork, NetworkConfig, FEATURE_COUNT};
pub use notation::{format_move, parse_move};
pub use position::{CastlingRights, Position, STARTPOS_FEN};
pub use rules::{BasicRules, GameStatus, RulesEngine};
pub use tactical_search::{
    SearchInfo, SearchLimits, TacticalResult, TacticalSearch, DEFAULT_SEARCH_DEPTH, MATE_SCORE,
    MAX_SEARCH_DEPTH,
};
pub use traditional_evaluation::{
    EvaluationBreakdown, EvaluationComponent, KingSafetyEvaluator, MaterialEvaluator,
    PawnStructureEvaluator, PieceValues, PositionalEvaluator, TraditionalEvaluator,
};
pub use uci::{GoParams, PositionSetup, SessionPhase, UciOption, UciSession};
pub use utils::cache::{CacheStats, EvaluationCache, StatsLruCache};
