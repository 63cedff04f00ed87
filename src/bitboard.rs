//! 64-bit square sets and the per-piece decomposition of a board.

use crate::board::{Board, Color, PieceKind, Square};

/// Bit i set = square i (row * 8 + col) is in the set.
pub type Bitboard = u64;

/// Every square except file a. Mask with this before shifting toward file a.
pub const NOT_A_FILE: Bitboard = 0xFEFE_FEFE_FEFE_FEFE;
/// Every square except file h. Mask with this before shifting toward file h.
pub const NOT_H_FILE: Bitboard = 0x7F7F_7F7F_7F7F_7F7F;

/// All squares of one board row (row 0 = rank 8).
#[inline]
pub const fn rank_mask(row: u8) -> Bitboard {
    0xFFu64 << (row as u32 * 8)
}

/// All squares of one column (col 0 = file a).
#[inline]
pub const fn file_mask(col: u8) -> Bitboard {
    0x0101_0101_0101_0101u64 << col as u32
}

/// Iterator over the squares of a bitboard, lowest index first.
pub struct BitIter(Bitboard);

impl BitIter {
    pub fn new(bits: Bitboard) -> Self {
        BitIter(bits)
    }
}

impl Iterator for BitIter {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(Square::from_index(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

/// Per-color, per-kind piece masks plus occupancy summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitboardSet {
    /// `pieces[color][kind]`
    pub pieces: [[Bitboard; 6]; 2],
    pub occupied: Bitboard,
    pub white_occupied: Bitboard,
    pub black_occupied: Bitboard,
}

impl BitboardSet {
    /// Classify every cell of the board. Cells with unknown codes are
    /// skipped, which cannot happen for a `Board` built through its
    /// validating constructors.
    pub fn from_board(board: &Board) -> Self {
        let mut set = BitboardSet::default();
        for (square, color, kind) in board.pieces() {
            let bit = square.bit();
            set.pieces[color.index()][kind.index()] |= bit;
            match color {
                Color::White => set.white_occupied |= bit,
                Color::Black => set.black_occupied |= bit,
            }
        }
        set.occupied = set.white_occupied | set.black_occupied;
        set
    }

    #[inline]
    pub fn piece(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    #[inline]
    pub fn color_occupied(&self, color: Color) -> Bitboard {
        match color {
            Color::White => self.white_occupied,
            Color::Black => self.black_occupied,
        }
    }

    #[inline]
    pub fn empty(&self) -> Bitboard {
        !self.occupied
    }

    /// Occupancy summaries agree with the piece masks, and no square holds
    /// two pieces.
    pub fn is_consistent(&self) -> bool {
        if self.occupied != self.white_occupied | self.black_occupied {
            return false;
        }
        if self.white_occupied & self.black_occupied != 0 {
            return false;
        }
        let mut seen: Bitboard = 0;
        for color in [Color::White, Color::Black] {
            let mut union: Bitboard = 0;
            for kind in PieceKind::ALL {
                let mask = self.piece(color, kind);
                if mask & seen != 0 {
                    return false;
                }
                seen |= mask;
                union |= mask;
            }
            if union != self.color_occupied(color) {
                return false;
            }
        }
        seen == self.occupied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(NOT_A_FILE & file_mask(0), 0);
        assert_eq!(NOT_H_FILE & file_mask(7), 0);
        assert_eq!(rank_mask(6).count_ones(), 8);
        assert_eq!(rank_mask(0) & Square::new(0, 5).bit(), Square::new(0, 5).bit());
    }

    #[test]
    fn test_bit_iter() {
        let bits = Square::new(0, 0).bit() | Square::new(3, 4).bit() | Square::new(7, 7).bit();
        let squares: Vec<Square> = BitIter::new(bits).collect();
        assert_eq!(
            squares,
            vec![Square::new(0, 0), Square::new(3, 4), Square::new(7, 7)]
        );
        assert_eq!(BitIter::new(0).count(), 0);
    }

    #[test]
    fn test_initial_bitboards() {
        let set = BitboardSet::from_board(&Board::initial());
        assert!(set.is_consistent());
        assert_eq!(set.occupied.count_ones(), 32);
        assert_eq!(set.white_occupied, rank_mask(6) | rank_mask(7));
        assert_eq!(set.black_occupied, rank_mask(0) | rank_mask(1));
        assert_eq!(set.piece(Color::White, PieceKind::Pawn), rank_mask(6));
        assert_eq!(
            set.piece(Color::Black, PieceKind::King),
            Square::new(0, 4).bit()
        );
    }

    #[test]
    fn test_inconsistent_set_detected() {
        let mut set = BitboardSet::from_board(&Board::initial());
        set.pieces[0][0] |= Square::new(4, 4).bit();
        assert!(!set.is_consistent());
    }
}
