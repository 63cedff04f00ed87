//! Contract for the game-rules collaborator and a reference implementation.
//!
//! The engine core never decides full legality itself. The protocol session
//! and the search talk to a `RulesEngine`, which owns the current position and
//! answers legality, check and game-over questions.

use crate::board::{Board, Color, Move, PieceKind, Square};
use crate::hybrid_evaluation::{EvaluatorConfig, PositionEvaluator};
use crate::move_generator::BitboardMoveGenerator;
use crate::nnue::NetworkConfig;
use crate::position::{en_passant_target_valid, Position};
use crate::tactical_search::{SearchLimits, TacticalSearch};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Game state from the point of view of the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    pub fn is_game_over(&self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Stalemate)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => write!(f, "ongoing"),
            GameStatus::Check => write!(f, "check"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameStatus::Stalemate => write!(f, "stalemate"),
        }
    }
}

/// Operations the engine needs from the game-rules collaborator
pub trait RulesEngine: Send {
    /// Board a new game starts from
    fn initial_board(&self) -> Board {
        Board::initial()
    }

    /// Current board
    fn board_state(&self) -> Board;

    /// Side to move
    fn current_turn(&self) -> Color;

    /// Full current position
    fn position(&self) -> Position;

    /// Back to the starting position
    fn reset(&mut self);

    /// Replace the current position
    fn set_position(&mut self, position: Position);

    /// Validate and play a move for the side to move. Returns false, leaving
    /// the position untouched, when the move is not legal.
    fn make_move(&mut self, mv: Move) -> bool;

    /// Play a move already known to be legal (taken from `legal_moves`)
    fn apply_legal_move(&mut self, mv: Move) {
        self.make_move(mv);
    }

    /// Whether the side to move has a legal move between the two squares
    fn is_valid_move(&self, from: Square, to: Square) -> bool;

    /// Whether `color`'s king is attacked after moving `from` to `to`
    fn would_still_be_in_check(&self, from: Square, to: Square, color: Color) -> bool;

    /// Every legal move for the side to move
    fn legal_moves(&self) -> Vec<Move>;

    fn game_status(&self) -> GameStatus;

    /// Pick a move with a fixed-depth search
    fn best_move(&self, depth: u32) -> Option<Move>
    where
        Self: Sized + Clone,
    {
        let config = EvaluatorConfig {
            network: NetworkConfig::compact(),
            cache_capacity: 16_384,
            ..Default::default()
        };
        let mut evaluator = PositionEvaluator::new(config).ok()?;
        let stop = Arc::new(AtomicBool::new(false));
        let mut search = TacticalSearch::new(SearchLimits::depth(depth), stop, &mut evaluator);
        search.run(self, |_| {}).best_move
    }
}

/// Reference collaborator: full chess rules on top of the bitboard generator
#[derive(Debug, Clone)]
pub struct BasicRules {
    position: Position,
    generator: BitboardMoveGenerator,
}

impl Default for BasicRules {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicRules {
    pub fn new() -> Self {
        Self::from_position(Position::startpos())
    }

    pub fn from_position(position: Position) -> Self {
        Self {
            position,
            generator: BitboardMoveGenerator::new(),
        }
    }

    /// Whether `color`'s king is currently attacked
    pub fn is_in_check(&self, color: Color) -> bool {
        king_attacked(&self.generator, &self.position.board, color)
    }

    /// Count leaf nodes of the legal move tree
    pub fn perft(&self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .into_iter()
            .map(|mv| {
                let mut child = self.clone();
                child.apply_legal_move(mv);
                child.perft(depth - 1)
            })
            .sum()
    }

    fn castling_moves(&self, moves: &mut Vec<Move>) {
        let color = self.position.side_to_move;
        let board = &self.position.board;
        let row = color.back_row();
        let king_home = Square::new(row, 4);
        if board.piece_at(king_home) != Some((color, PieceKind::King)) {
            return;
        }
        let rook = Some((color, PieceKind::Rook));
        let enemy = !color;
        let set = self.generator.to_bitboards(board);
        let attacked = |col: u8| {
            self.generator
                .is_attacked_in(board, &set, Square::new(row, col), enemy)
        };

        if self.position.castling.kingside(color)
            && board.piece_at(Square::new(row, 7)) == rook
            && board.is_empty(Square::new(row, 5))
            && board.is_empty(Square::new(row, 6))
            && !attacked(4)
            && !attacked(5)
            && !attacked(6)
        {
            moves.push(Move::quiet(king_home, Square::new(row, 6)));
        }

        if self.position.castling.queenside(color)
            && board.piece_at(Square::new(row, 0)) == rook
            && board.is_empty(Square::new(row, 1))
            && board.is_empty(Square::new(row, 2))
            && board.is_empty(Square::new(row, 3))
            && !attacked(4)
            && !attacked(3)
            && !attacked(2)
        {
            moves.push(Move::quiet(king_home, Square::new(row, 2)));
        }
    }

    fn en_passant_moves(&self, moves: &mut Vec<Move>) {
        let Some(target) = self.position.en_passant else {
            return;
        };
        let color = self.position.side_to_move;
        if !en_passant_target_valid(&self.position.board, color, target) {
            return;
        }
        let pawn = Some((color, PieceKind::Pawn));
        let back = -color.pawn_direction();
        for dc in [-1, 1] {
            if let Some(from) = target.offset(back, dc) {
                if self.position.board.piece_at(from) == pawn {
                    moves.push(Move::capture(from, target));
                }
            }
        }
    }

    fn pseudo_legal_with_specials(&self) -> Vec<Move> {
        let color = self.position.side_to_move;
        let mut moves = self
            .generator
            .pseudo_legal_moves(&self.position.board, color);
        self.en_passant_moves(&mut moves);
        self.castling_moves(&mut moves);
        moves
    }
}

fn king_attacked(generator: &BitboardMoveGenerator, board: &Board, color: Color) -> bool {
    match board.find_king(color) {
        Some(king) => generator.is_square_attacked(board, king, !color),
        None => false,
    }
}

/// Move the pieces and update every other field of the position. The move
/// is assumed to be legal.
fn apply_move(position: &mut Position, mv: Move) {
    let board = &mut position.board;
    let Some((color, kind)) = board.piece_at(mv.from) else {
        return;
    };
    let captured = board.piece_at(mv.to);

    board.clear(mv.from);
    let mut placed = kind;

    match kind {
        PieceKind::Pawn => {
            if mv.from.col != mv.to.col && captured.is_none() {
                // En passant: the captured pawn sits beside the origin.
                board.clear(Square::new(mv.from.row, mv.to.col));
            }
            if mv.to.row == color.promotion_row() {
                placed = mv.promotion.unwrap_or(PieceKind::Queen);
            }
        }
        PieceKind::King if mv.from.col.abs_diff(mv.to.col) == 2 => {
            let (rook_from, rook_to) = if mv.to.col > mv.from.col { (7, 5) } else { (0, 3) };
            let row = mv.from.row;
            board.clear(Square::new(row, rook_from));
            board.put(Square::new(row, rook_to), color, PieceKind::Rook);
        }
        _ => {}
    }
    board.put(mv.to, color, placed);

    if kind == PieceKind::King {
        position.castling.revoke(color);
    }
    position.castling.revoke_corner(mv.from);
    position.castling.revoke_corner(mv.to);

    position.en_passant = if kind == PieceKind::Pawn && mv.from.row.abs_diff(mv.to.row) == 2 {
        Some(Square::new((mv.from.row + mv.to.row) / 2, mv.from.col))
    } else {
        None
    };

    if kind == PieceKind::Pawn || captured.is_some() {
        position.halfmove_clock = 0;
    } else {
        position.halfmove_clock += 1;
    }
    if color == Color::Black {
        position.fullmove_number += 1;
    }
    position.side_to_move = !color;
}

const PROMOTION_PIECES: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

impl RulesEngine for BasicRules {
    fn board_state(&self) -> Board {
        self.position.board
    }

    fn current_turn(&self) -> Color {
        self.position.side_to_move
    }

    fn position(&self) -> Position {
        self.position
    }

    fn reset(&mut self) {
        self.position = Position::startpos();
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn make_move(&mut self, mv: Move) -> bool {
        let promotion_matches = |m: &Move| match m.promotion {
            Some(piece) => piece == mv.promotion.unwrap_or(PieceKind::Queen),
            None => mv.promotion.is_none(),
        };
        let Some(legal) = self
            .legal_moves()
            .into_iter()
            .find(|m| m.same_squares(&mv) && promotion_matches(m))
        else {
            return false;
        };
        apply_move(&mut self.position, legal);
        true
    }

    fn apply_legal_move(&mut self, mv: Move) {
        apply_move(&mut self.position, mv);
    }

    fn is_valid_move(&self, from: Square, to: Square) -> bool {
        self.legal_moves()
            .iter()
            .any(|m| m.from == from && m.to == to)
    }

    fn would_still_be_in_check(&self, from: Square, to: Square, color: Color) -> bool {
        let mut next = self.position;
        apply_move(&mut next, Move::quiet(from, to));
        king_attacked(&self.generator, &next.board, color)
    }

    fn legal_moves(&self) -> Vec<Move> {
        let color = self.position.side_to_move;
        let mut legal = Vec::new();
        for mv in self.pseudo_legal_with_specials() {
            if self.would_still_be_in_check(mv.from, mv.to, color) {
                continue;
            }
            let promotes = mv.to.row == color.promotion_row()
                && self.position.board.piece_at(mv.from) == Some((color, PieceKind::Pawn));
            if promotes {
                legal.extend(PROMOTION_PIECES.iter().map(|&p| mv.with_promotion(p)));
            } else {
                legal.push(mv);
            }
        }
        legal
    }

    fn game_status(&self) -> GameStatus {
        let color = self.position.side_to_move;
        let in_check = self.is_in_check(color);
        if self.legal_moves().is_empty() {
            if in_check {
                GameStatus::Checkmate { winner: !color }
            } else {
                GameStatus::Stalemate
            }
        } else if in_check {
            GameStatus::Check
        } else {
            GameStatus::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_move;

    fn rules(fen: &str) -> BasicRules {
        BasicRules::from_position(Position::from_fen(fen).unwrap())
    }

    fn play(rules: &mut BasicRules, moves: &[&str]) {
        for token in moves {
            assert!(rules.make_move(parse_move(token).unwrap()), "rejected {token}");
        }
    }

    #[test]
    fn test_perft_startpos() {
        let rules = BasicRules::new();
        assert_eq!(rules.perft(1), 20);
        assert_eq!(rules.perft(2), 400);
        assert_eq!(rules.perft(3), 8902);
    }

    #[test]
    fn test_perft_kiwipete() {
        let rules = rules("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(rules.perft(1), 48);
        assert_eq!(rules.perft(2), 2039);
    }

    #[test]
    fn test_perft_position_three() {
        let rules = rules("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        assert_eq!(rules.perft(1), 14);
        assert_eq!(rules.perft(2), 191);
        assert_eq!(rules.perft(3), 2812);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut rules = BasicRules::new();
        let before = rules.position();
        assert!(!rules.make_move(parse_move("e2e5").unwrap()));
        assert!(!rules.make_move(parse_move("e7e5").unwrap()));
        assert_eq!(rules.position(), before);
    }

    #[test]
    fn test_castling_and_rights() {
        let mut rules = rules("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        play(&mut rules, &["e1g1"]);
        let board = rules.board_state();
        assert_eq!(board.cell(Square::from_algebraic("g1").unwrap()), 'K');
        assert_eq!(board.cell(Square::from_algebraic("f1").unwrap()), 'R');
        assert!(board.is_empty(Square::from_algebraic("h1").unwrap()));
        assert!(!rules.position().castling.white_kingside);
        assert!(!rules.position().castling.white_queenside);

        play(&mut rules, &["e8c8"]);
        let board = rules.board_state();
        assert_eq!(board.cell(Square::from_algebraic("c8").unwrap()), 'k');
        assert_eq!(board.cell(Square::from_algebraic("d8").unwrap()), 'r');
        assert_eq!(rules.position().castling.to_string(), "-");
    }

    #[test]
    fn test_castling_through_check_refused() {
        // Black rook on f8 covers f1.
        let rules = rules("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(!rules.is_valid_move(
            Square::from_algebraic("e1").unwrap(),
            Square::from_algebraic("g1").unwrap()
        ));
        assert!(rules.is_valid_move(
            Square::from_algebraic("e1").unwrap(),
            Square::from_algebraic("c1").unwrap()
        ));
    }

    #[test]
    fn test_en_passant() {
        let mut rules = BasicRules::new();
        play(&mut rules, &["e2e4", "a7a6", "e4e5", "d7d5"]);
        assert_eq!(
            rules.position().en_passant,
            Some(Square::from_algebraic("d6").unwrap())
        );
        play(&mut rules, &["e5d6"]);
        let board = rules.board_state();
        assert_eq!(board.cell(Square::from_algebraic("d6").unwrap()), 'P');
        assert!(board.is_empty(Square::from_algebraic("d5").unwrap()));
        assert_eq!(rules.position().halfmove_clock, 0);
    }

    #[test]
    fn test_stale_en_passant_target_ignored() {
        // Built directly, so the target skips FEN validation
        let mut position = Position::from_fen("4k3/8/8/8/8/8/3PQ3/4K3 w - - 0 1").unwrap();
        position.en_passant = Some(Square::from_algebraic("e3").unwrap());
        let mut rules = BasicRules::from_position(position);

        assert!(!rules.legal_moves().iter().any(|m| m.to_string() == "d2e3"));
        assert!(!rules.make_move(parse_move("d2e3").unwrap()));
        assert_eq!(rules.board_state().cell(Square::from_algebraic("e2").unwrap()), 'Q');
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut rules = rules("8/P6k/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(rules.legal_moves().iter().filter(|m| m.promotion.is_some()).count(), 4);
        play(&mut rules, &["a7a8"]);
        assert_eq!(rules.board_state().cell(Square::new(0, 0)), 'Q');

        let mut rules = self::rules("8/P6k/8/8/8/8/8/4K3 w - - 0 1");
        play(&mut rules, &["a7a8n"]);
        assert_eq!(rules.board_state().cell(Square::new(0, 0)), 'N');
    }

    #[test]
    fn test_game_status() {
        let mut rules = BasicRules::new();
        assert_eq!(rules.game_status(), GameStatus::Ongoing);
        play(&mut rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            rules.game_status(),
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );
        assert!(rules.legal_moves().is_empty());

        let stalemate = self::rules("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(stalemate.game_status(), GameStatus::Stalemate);

        let check = self::rules("4k3/8/8/8/8/8/8/4RK2 b - - 0 1");
        assert_eq!(check.game_status(), GameStatus::Check);
    }

    #[test]
    fn test_would_still_be_in_check() {
        // White king e1 checked by the rook on e8.
        let rules = rules("4r1k1/8/8/8/8/8/8/3QK3 w - - 0 1");
        let e1 = Square::from_algebraic("e1").unwrap();
        assert!(rules.would_still_be_in_check(e1, Square::from_algebraic("e2").unwrap(), Color::White));
        assert!(!rules.would_still_be_in_check(e1, Square::from_algebraic("f2").unwrap(), Color::White));
        let d1 = Square::from_algebraic("d1").unwrap();
        assert!(!rules.would_still_be_in_check(d1, Square::from_algebraic("e2").unwrap(), Color::White));
    }

    #[test]
    fn test_clocks() {
        let mut rules = BasicRules::new();
        play(&mut rules, &["g1f3", "g8f6"]);
        let position = rules.position();
        assert_eq!(position.halfmove_clock, 2);
        assert_eq!(position.fullmove_number, 2);
        assert_eq!(position.side_to_move, Color::White);
    }

    #[test]
    fn test_best_move_finds_mate_in_one() {
        // Back-rank mate: Ra1-a8
        let rules = rules("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let best = rules.best_move(2).unwrap();
        assert_eq!(best.to_string(), "a1a8");
    }
}
