//! Bit-parallel pseudo-legal move generation.
//!
//! Moves produced here obey piece movement rules only. They are not filtered
//! for own-king safety, and castling, en passant and promotion choice belong
//! to the rules collaborator (see `rules`).

use crate::attack_tables::{tables, AttackTables, Direction, SlidingPiece};
use crate::bitboard::{rank_mask, BitIter, Bitboard, BitboardSet, NOT_A_FILE, NOT_H_FILE};
use crate::board::{Board, Color, Move, MoveKind, PieceKind, Square};

/// Stateless generator over the shared attack tables.
#[derive(Clone, Copy, Debug)]
pub struct BitboardMoveGenerator {
    tables: &'static AttackTables,
}

impl Default for BitboardMoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BitboardMoveGenerator {
    pub fn new() -> Self {
        Self { tables: tables() }
    }

    /// Decompose the board into per-piece masks.
    pub fn to_bitboards(&self, board: &Board) -> BitboardSet {
        BitboardSet::from_board(board)
    }

    /// Attacks of a sliding piece from `square`, stopping at (and including)
    /// the first occupied square in each direction.
    pub fn sliding_attacks(
        &self,
        square: Square,
        occupied: Bitboard,
        piece: SlidingPiece,
    ) -> Bitboard {
        let mut attacks = 0;
        for &direction in piece.directions() {
            let ray = self.tables.ray(square, direction);
            let blockers = ray & occupied;
            if blockers == 0 {
                attacks |= ray;
                continue;
            }
            let nearest = if increases_index(direction) {
                blockers.trailing_zeros()
            } else {
                63 - blockers.leading_zeros()
            };
            let beyond = self
                .tables
                .ray(Square::from_index(nearest as u8), direction);
            attacks |= ray ^ beyond;
        }
        attacks
    }

    /// Whether any piece of `by_color` attacks `square`.
    pub fn is_square_attacked(&self, board: &Board, square: Square, by_color: Color) -> bool {
        let set = self.to_bitboards(board);
        self.is_attacked_in(board, &set, square, by_color)
    }

    /// Same as `is_square_attacked` with the decomposition already built.
    pub fn is_attacked_in(
        &self,
        board: &Board,
        set: &BitboardSet,
        square: Square,
        by_color: Color,
    ) -> bool {
        // A pawn attacks diagonally forward, so look one row behind the
        // target from the attacker's point of view.
        let pawn_code = PieceKind::Pawn.to_char(by_color);
        let back = -by_color.pawn_direction();
        for dc in [-1, 1] {
            if let Some(from) = square.offset(back, dc) {
                if board.cell(from) == pawn_code {
                    return true;
                }
            }
        }

        if self.tables.knight_attacks(square) & set.piece(by_color, PieceKind::Knight) != 0 {
            return true;
        }

        let queens = set.piece(by_color, PieceKind::Queen);
        let straight = set.piece(by_color, PieceKind::Rook) | queens;
        if straight != 0
            && self.sliding_attacks(square, set.occupied, SlidingPiece::Rook) & straight != 0
        {
            return true;
        }
        let diagonal = set.piece(by_color, PieceKind::Bishop) | queens;
        if diagonal != 0
            && self.sliding_attacks(square, set.occupied, SlidingPiece::Bishop) & diagonal != 0
        {
            return true;
        }

        self.tables.king_attacks(square) & set.piece(by_color, PieceKind::King) != 0
    }

    /// All pseudo-legal moves for `color`, grouped by piece kind (pawns,
    /// knights, bishops, rooks, queens, king). Within a kind, quiet moves come
    /// before captures.
    pub fn pseudo_legal_moves(&self, board: &Board, color: Color) -> Vec<Move> {
        let set = self.to_bitboards(board);
        let mut moves = Vec::with_capacity(48);
        self.pawn_moves(&set, color, &mut moves);
        self.knight_moves(&set, color, &mut moves);
        self.slider_moves(&set, color, PieceKind::Bishop, SlidingPiece::Bishop, &mut moves);
        self.slider_moves(&set, color, PieceKind::Rook, SlidingPiece::Rook, &mut moves);
        self.slider_moves(&set, color, PieceKind::Queen, SlidingPiece::Queen, &mut moves);
        self.king_moves(&set, color, &mut moves);
        moves
    }

    fn pawn_moves(&self, set: &BitboardSet, color: Color, moves: &mut Vec<Move>) {
        let pawns = set.piece(color, PieceKind::Pawn);
        if pawns == 0 {
            return;
        }
        let empty = set.empty();
        let enemy = set.color_occupied(!color);

        // (targets, signed index delta from target back to origin, kind)
        let groups: [(Bitboard, i8, MoveKind); 4] = match color {
            Color::White => {
                let single = (pawns >> 8) & empty;
                let double = ((single & rank_mask(5)) >> 8) & empty;
                let toward_a = ((pawns & NOT_A_FILE) >> 9) & enemy;
                let toward_h = ((pawns & NOT_H_FILE) >> 7) & enemy;
                [
                    (single, 8, MoveKind::Quiet),
                    (double, 16, MoveKind::DoublePush),
                    (toward_a, 9, MoveKind::Capture),
                    (toward_h, 7, MoveKind::Capture),
                ]
            }
            Color::Black => {
                let single = (pawns << 8) & empty;
                let double = ((single & rank_mask(2)) << 8) & empty;
                let toward_a = ((pawns & NOT_A_FILE) << 7) & enemy;
                let toward_h = ((pawns & NOT_H_FILE) << 9) & enemy;
                [
                    (single, -8, MoveKind::Quiet),
                    (double, -16, MoveKind::DoublePush),
                    (toward_a, -7, MoveKind::Capture),
                    (toward_h, -9, MoveKind::Capture),
                ]
            }
        };

        for (targets, back, kind) in groups {
            for to in BitIter::new(targets) {
                let from = Square::from_index((to.index() as i16 + back as i16) as u8);
                moves.push(Move::new(from, to, kind));
            }
        }
    }

    fn knight_moves(&self, set: &BitboardSet, color: Color, moves: &mut Vec<Move>) {
        let knights = set.piece(color, PieceKind::Knight);
        emit_quiet_then_captures(set, color, knights, moves, |from| {
            self.tables.knight_attacks(from)
        });
    }

    fn slider_moves(
        &self,
        set: &BitboardSet,
        color: Color,
        kind: PieceKind,
        piece: SlidingPiece,
        moves: &mut Vec<Move>,
    ) {
        let sliders = set.piece(color, kind);
        let occupied = set.occupied;
        emit_quiet_then_captures(set, color, sliders, moves, |from| {
            self.sliding_attacks(from, occupied, piece)
        });
    }

    fn king_moves(&self, set: &BitboardSet, color: Color, moves: &mut Vec<Move>) {
        let kings = set.piece(color, PieceKind::King);
        emit_quiet_then_captures(set, color, kings, moves, |from| {
            self.tables.king_attacks(from)
        });
    }
}

fn emit_quiet_then_captures<F>(
    set: &BitboardSet,
    color: Color,
    pieces: Bitboard,
    moves: &mut Vec<Move>,
    attacks: F,
) where
    F: Fn(Square) -> Bitboard,
{
    if pieces == 0 {
        return;
    }
    let empty = set.empty();
    let enemy = set.color_occupied(!color);
    for from in BitIter::new(pieces) {
        for to in BitIter::new(attacks(from) & empty) {
            moves.push(Move::quiet(from, to));
        }
    }
    for from in BitIter::new(pieces) {
        for to in BitIter::new(attacks(from) & enemy) {
            moves.push(Move::capture(from, to));
        }
    }
}

/// Directions whose steps move to a higher square index.
#[inline]
fn increases_index(direction: Direction) -> bool {
    matches!(
        direction,
        Direction::East | Direction::South | Direction::SouthEast | Direction::SouthWest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn board(fen: &str) -> Board {
        Position::from_fen(fen).unwrap().board
    }

    fn has_move(moves: &[Move], from: &str, to: &str) -> bool {
        let from = Square::from_algebraic(from).unwrap();
        let to = Square::from_algebraic(to).unwrap();
        moves.iter().any(|m| m.from == from && m.to == to)
    }

    /// Reference walk, one square at a time.
    fn walk(square: Square, occupied: Bitboard, piece: SlidingPiece) -> Bitboard {
        let mut mask = 0;
        for direction in piece.directions() {
            let (dr, dc) = direction.delta();
            let mut current = square.offset(dr, dc);
            while let Some(next) = current {
                mask |= next.bit();
                if occupied & next.bit() != 0 {
                    break;
                }
                current = next.offset(dr, dc);
            }
        }
        mask
    }

    #[test]
    fn test_startpos_has_twenty_moves() {
        let generator = BitboardMoveGenerator::new();
        let moves = generator.pseudo_legal_moves(&Board::initial(), Color::White);
        assert_eq!(moves.len(), 20);
        assert_eq!(
            moves.iter().filter(|m| m.kind == MoveKind::DoublePush).count(),
            8
        );
        let black = generator.pseudo_legal_moves(&Board::initial(), Color::Black);
        assert_eq!(black.len(), 20);
        assert!(has_move(&black, "e7", "e5"));
        assert!(has_move(&black, "g8", "f6"));
    }

    #[test]
    fn test_empty_board_sliding_equals_rays() {
        let generator = BitboardMoveGenerator::new();
        for index in 0..64u8 {
            let sq = Square::from_index(index);
            for piece in [SlidingPiece::Rook, SlidingPiece::Bishop, SlidingPiece::Queen] {
                assert_eq!(
                    generator.sliding_attacks(sq, 0, piece),
                    tables().sliding_rays(sq, piece)
                );
            }
        }
    }

    #[test]
    fn test_sliding_attacks_match_walk() {
        let generator = BitboardMoveGenerator::new();
        let occupancies = [
            BitboardSet::from_board(&Board::initial()).occupied,
            0x0000_1824_2418_0000,
            0x8142_2418_1824_4281,
            0x00FF_0000_0000_FF00,
        ];
        for occupied in occupancies {
            for index in 0..64u8 {
                let sq = Square::from_index(index);
                for piece in [SlidingPiece::Rook, SlidingPiece::Bishop, SlidingPiece::Queen] {
                    assert_eq!(
                        generator.sliding_attacks(sq, occupied, piece),
                        walk(sq, occupied, piece),
                        "square {sq} piece {piece:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_double_push_requires_start_rank_and_clear_path() {
        let generator = BitboardMoveGenerator::new();

        // Pawn on e3 may not double push.
        let b = board("4k3/8/8/8/8/4P3/8/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        assert!(has_move(&moves, "e3", "e4"));
        assert!(!has_move(&moves, "e3", "e5"));

        // Blocked on the intermediate square.
        let b = board("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        assert!(!has_move(&moves, "e2", "e3"));
        assert!(!has_move(&moves, "e2", "e4"));

        // Blocked on the destination only.
        let b = board("4k3/8/8/8/4n3/8/4P3/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        assert!(has_move(&moves, "e2", "e3"));
        assert!(!has_move(&moves, "e2", "e4"));

        // Black mirror.
        let b = board("4k3/3p4/3N4/8/8/8/8/4K3 b - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::Black);
        assert!(!has_move(&moves, "d7", "d6"));
        assert!(!has_move(&moves, "d7", "d5"));
    }

    #[test]
    fn test_pawn_captures_do_not_wrap() {
        let generator = BitboardMoveGenerator::new();

        // White pawn on a4, black pieces on h5 and b5: only b5 is capturable.
        let b = board("4k3/8/8/1p5p/P7/8/8/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        assert!(has_move(&moves, "a4", "b5"));
        assert!(!moves.iter().any(|m| m.to == Square::from_algebraic("h5").unwrap()
            && m.from == Square::from_algebraic("a4").unwrap()));

        // White pawn on h4 with black pawns on g5 and a5 (the wrap target).
        let b = board("4k3/8/8/p5p1/7P/8/8/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        let captures: Vec<_> = moves.iter().filter(|m| m.is_capture()).collect();
        assert_eq!(captures.len(), 1);
        assert!(has_move(&moves, "h4", "g5"));

        // Black pawn on h5 with white pawns on g4 and a4.
        let b = board("4k3/8/8/7p/P5P1/8/8/4K3 b - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::Black);
        let captures: Vec<_> = moves.iter().filter(|m| m.is_capture()).collect();
        assert_eq!(captures.len(), 1);
        assert!(has_move(&moves, "h5", "g4"));
    }

    #[test]
    fn test_quiet_moves_precede_captures_per_piece() {
        let generator = BitboardMoveGenerator::new();
        let b = board("4k3/8/8/3p4/8/2N5/8/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        let knight: Vec<_> = moves
            .iter()
            .filter(|m| m.from == Square::from_algebraic("c3").unwrap())
            .collect();
        assert_eq!(knight.len(), 8);
        assert!(knight.last().unwrap().is_capture());
        assert_eq!(knight.iter().filter(|m| m.is_capture()).count(), 1);
    }

    #[test]
    fn test_square_attacked_by_each_piece() {
        let generator = BitboardMoveGenerator::new();
        let cases = [
            // (fen, square, attacked by white)
            ("4k3/8/8/8/8/3P4/8/4K3 w - - 0 1", "e4", true),
            ("4k3/8/8/8/8/3P4/8/4K3 w - - 0 1", "d4", false),
            ("4k3/8/8/8/8/3P4/8/4K3 w - - 0 1", "c4", true),
            ("4k3/8/8/8/8/8/8/1N2K3 w - - 0 1", "c3", true),
            ("4k3/8/8/8/8/8/8/1N2K3 w - - 0 1", "b3", false),
            ("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", "a8", true),
            ("4k3/8/8/8/p7/8/8/R3K3 w - - 0 1", "a8", false),
            ("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1", "h6", true),
            ("4k3/8/8/8/8/8/8/2Q1K3 w - - 0 1", "c8", true),
            ("4k3/8/8/8/8/8/8/2Q1K3 w - - 0 1", "g5", true),
            ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", "d2", true),
            ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", "e3", false),
        ];
        for (fen, square, expected) in cases {
            let b = board(fen);
            let sq = Square::from_algebraic(square).unwrap();
            assert_eq!(
                generator.is_square_attacked(&b, sq, Color::White),
                expected,
                "{fen} {square}"
            );
        }

        // Black pawns attack toward rank 1.
        let b = board("4k3/8/8/8/4p3/8/8/4K3 b - - 0 1");
        assert!(generator.is_square_attacked(&b, Square::from_algebraic("d3").unwrap(), Color::Black));
        assert!(!generator.is_square_attacked(&b, Square::from_algebraic("d5").unwrap(), Color::Black));
    }

    #[test]
    fn test_generator_never_sets_promotion() {
        let generator = BitboardMoveGenerator::new();
        let b = board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let moves = generator.pseudo_legal_moves(&b, Color::White);
        assert!(has_move(&moves, "a7", "a8"));
        assert!(moves.iter().all(|m| m.promotion.is_none()));
    }
}
