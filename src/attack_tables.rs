//! Precomputed attack masks.
//!
//! Built once per process (via `OnceLock`) and immutable afterwards. The
//! tables ignore occupancy: a ray runs all the way to the board edge, and
//! blockers are handled by `BitboardMoveGenerator::sliding_attacks`.

use crate::bitboard::Bitboard;
use crate::board::Square;
use std::sync::OnceLock;

/// The eight ray directions. The first four are orthogonal (rook), the last
/// four diagonal (bishop).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
    SouthEast,
    SouthWest,
    NorthEast,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthEast,
        Direction::NorthWest,
    ];

    pub const ROOK: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
    ];

    pub const BISHOP: [Direction; 4] = [
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthEast,
        Direction::NorthWest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// (row delta, col delta). North is toward row 0 (rank 8).
    #[inline]
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::South => (1, 0),
            Direction::North => (-1, 0),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (1, -1),
            Direction::NorthEast => (-1, 1),
            Direction::NorthWest => (-1, -1),
        }
    }
}

/// Pieces that move along rays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlidingPiece {
    Rook,
    Bishop,
    Queen,
}

impl SlidingPiece {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            SlidingPiece::Rook => &Direction::ROOK,
            SlidingPiece::Bishop => &Direction::BISHOP,
            SlidingPiece::Queen => &Direction::ALL,
        }
    }
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Get a reference to the process-wide attack tables.
pub fn tables() -> &'static AttackTables {
    static TABLES: OnceLock<AttackTables> = OnceLock::new();
    TABLES.get_or_init(AttackTables::build)
}

/// Per-square ray, knight and king masks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackTables {
    /// `rays[square][direction]`
    rays: [[Bitboard; 8]; 64],
    knight: [Bitboard; 64],
    king: [Bitboard; 64],
}

impl AttackTables {
    /// Compute all tables. Pure and deterministic.
    pub fn build() -> Self {
        let mut rays = [[0; 8]; 64];
        let mut knight = [0; 64];
        let mut king = [0; 64];

        for index in 0..64u8 {
            let square = Square::from_index(index);
            let i = index as usize;

            for direction in Direction::ALL {
                let (dr, dc) = direction.delta();
                let mut mask = 0;
                let mut current = square.offset(dr, dc);
                while let Some(next) = current {
                    mask |= next.bit();
                    current = next.offset(dr, dc);
                }
                rays[i][direction.index()] = mask;
            }

            knight[i] = hop_mask(square, &KNIGHT_OFFSETS);
            king[i] = hop_mask(square, &KING_OFFSETS);
        }

        AttackTables { rays, knight, king }
    }

    /// Full ray from `square` in one direction, excluding the square itself.
    #[inline]
    pub fn ray(&self, square: Square, direction: Direction) -> Bitboard {
        self.rays[square.index()][direction.index()]
    }

    /// Union of the piece's rays on an empty board.
    pub fn sliding_rays(&self, square: Square, piece: SlidingPiece) -> Bitboard {
        piece
            .directions()
            .iter()
            .fold(0, |acc, &direction| acc | self.ray(square, direction))
    }

    #[inline]
    pub fn knight_attacks(&self, square: Square) -> Bitboard {
        self.knight[square.index()]
    }

    #[inline]
    pub fn king_attacks(&self, square: Square) -> Bitboard {
        self.king[square.index()]
    }
}

fn hop_mask(square: Square, offsets: &[(i8, i8)]) -> Bitboard {
    offsets
        .iter()
        .filter_map(|&(dr, dc)| square.offset(dr, dc))
        .fold(0, |acc, target| acc | target.bit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knight_corner_and_center() {
        let t = tables();
        let a8 = Square::new(0, 0);
        assert_eq!(
            t.knight_attacks(a8),
            Square::new(1, 2).bit() | Square::new(2, 1).bit()
        );
        assert_eq!(t.knight_attacks(Square::new(3, 3)).count_ones(), 8);
    }

    #[test]
    fn test_king_masks() {
        let t = tables();
        assert_eq!(t.king_attacks(Square::new(0, 0)).count_ones(), 3);
        assert_eq!(t.king_attacks(Square::new(0, 4)).count_ones(), 5);
        assert_eq!(t.king_attacks(Square::new(4, 4)).count_ones(), 8);
    }

    #[test]
    fn test_rays() {
        let t = tables();
        let a1 = Square::new(7, 0);
        assert_eq!(t.ray(a1, Direction::East).count_ones(), 7);
        assert_eq!(t.ray(a1, Direction::North).count_ones(), 7);
        assert_eq!(t.ray(a1, Direction::South), 0);
        assert_eq!(t.ray(a1, Direction::NorthEast).count_ones(), 7);
        assert!(t.ray(a1, Direction::NorthEast) & Square::new(0, 7).bit() != 0);

        // Rook always sees 14 squares on an empty board.
        for index in 0..64u8 {
            let sq = Square::from_index(index);
            assert_eq!(t.sliding_rays(sq, SlidingPiece::Rook).count_ones(), 14);
            assert_eq!(
                t.sliding_rays(sq, SlidingPiece::Queen),
                t.sliding_rays(sq, SlidingPiece::Rook) | t.sliding_rays(sq, SlidingPiece::Bishop)
            );
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(&AttackTables::build(), tables());
    }
}
