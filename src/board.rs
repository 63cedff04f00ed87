//! Board representation shared by the move generator, the evaluator and the
//! rules collaborator.
//!
//! The board is an 8x8 grid of single-character piece codes. Row 0 is rank 8
//! (black's back rank), row 7 is rank 1. Square index = `row * 8 + col`.

use crate::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of the board
pub const BOARD_SIZE: usize = 8;

/// Code of an empty cell
pub const EMPTY: char = '.';

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The two sides in a chess game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Index for array lookups: White=0, Black=1.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Row delta of a pawn push (white moves toward row 0).
    #[inline]
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row the side's pawns start on.
    #[inline]
    pub const fn pawn_start_row(self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row a pawn of this side promotes on.
    #[inline]
    pub const fn promotion_row(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Back rank row (where the king and rooks start).
    #[inline]
    pub const fn back_row(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// FEN active-color letter.
    pub const fn fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

// ---------------------------------------------------------------------------
// PieceKind
// ---------------------------------------------------------------------------

/// The six piece kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// All piece kinds in index order.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Index for array lookups: Pawn=0 .. King=5.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Piece code: uppercase for white, lowercase for black.
    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Decode a piece code into its color and kind. `None` for `.` or any
    /// unknown character.
    pub fn from_char(c: char) -> Option<(Color, PieceKind)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some((color, kind))
    }

    /// Kinds a pawn may promote to, from the lowercase suffix letter.
    pub fn from_promotion_char(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'q' => Some(PieceKind::Queen),
            'r' => Some(PieceKind::Rook),
            'b' => Some(PieceKind::Bishop),
            'n' => Some(PieceKind::Knight),
            _ => None,
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceKind::Pawn => write!(f, "pawn"),
            PieceKind::Knight => write!(f, "knight"),
            PieceKind::Bishop => write!(f, "bishop"),
            PieceKind::Rook => write!(f, "rook"),
            PieceKind::Queen => write!(f, "queen"),
            PieceKind::King => write!(f, "king"),
        }
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A board square as (row, col), row 0 = rank 8, col 0 = file a.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    /// Build a square. Coordinates must be in 0..8.
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        debug_assert!(row < 8 && col < 8);
        Square { row, col }
    }

    /// Build a square from signed coordinates, `None` when off the board.
    #[inline]
    pub fn try_new(row: i8, col: i8) -> Option<Self> {
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Square from a bit index 0..64.
    #[inline]
    pub const fn from_index(index: u8) -> Self {
        Square::new(index / 8, index % 8)
    }

    /// Bit index `row * 8 + col`.
    #[inline]
    pub const fn index(self) -> usize {
        (self.row as usize) * 8 + self.col as usize
    }

    /// Single-bit mask of this square.
    #[inline]
    pub const fn bit(self) -> u64 {
        1u64 << self.index()
    }

    /// Square offset by (dr, dc), `None` when it leaves the board.
    #[inline]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        Square::try_new(self.row as i8 + dr, self.col as i8 + dc)
    }

    /// Square mirrored top to bottom (rank r <-> rank 9 - r).
    #[inline]
    pub const fn mirrored(self) -> Self {
        Square::new(7 - self.row, self.col)
    }

    /// Parse a two-character coordinate like `e4`.
    pub fn from_algebraic(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 2 {
            return Err(EngineError::InvalidMove(format!(
                "square '{text}' must be a file letter followed by a rank digit"
            )));
        }
        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(EngineError::InvalidMove(format!(
                "square '{text}' is off the board"
            )));
        }
        Ok(Square::new(8 - (rank - b'0'), file - b'a'))
    }

    /// File letter a..h.
    pub fn file_char(self) -> char {
        (b'a' + self.col) as char
    }

    /// Rank digit 1..8.
    pub fn rank_char(self) -> char {
        (b'0' + (8 - self.row)) as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// How a move interacts with the destination square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Quiet,
    DoublePush,
    Capture,
}

/// A move between two squares.
///
/// The bitboard generator never fills `promotion`; the protocol parser does
/// when a suffix is present, and the rules collaborator decides what a pawn
/// reaching the last rank becomes when it is absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub kind: MoveKind,
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub const fn new(from: Square, to: Square, kind: MoveKind) -> Self {
        Move {
            from,
            to,
            kind,
            promotion: None,
        }
    }

    pub const fn quiet(from: Square, to: Square) -> Self {
        Move::new(from, to, MoveKind::Quiet)
    }

    pub const fn capture(from: Square, to: Square) -> Self {
        Move::new(from, to, MoveKind::Capture)
    }

    pub const fn with_promotion(mut self, promotion: PieceKind) -> Self {
        self.promotion = Some(promotion);
        self
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.kind == MoveKind::Capture
    }

    /// Same origin and destination, ignoring kind and promotion tags.
    #[inline]
    pub fn same_squares(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::notation::format_move(self))
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// 8x8 grid of piece codes. A plain value: copies are snapshots, equality and
/// hashing are structural.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[char; BOARD_SIZE]; BOARD_SIZE],
}

const INITIAL_ROWS: [&str; 8] = [
    "rnbqkbnr", "pppppppp", "........", "........", "........", "........", "PPPPPPPP",
    "RNBQKBNR",
];

impl Board {
    /// Board with no pieces.
    pub const fn empty() -> Self {
        Board {
            cells: [[EMPTY; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Standard starting position.
    pub fn initial() -> Self {
        let mut board = Board::empty();
        for (row, line) in INITIAL_ROWS.iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                board.cells[row][col] = c;
            }
        }
        board
    }

    /// Build a board from eight strings of eight piece codes each.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let grid: Vec<Vec<char>> = rows.iter().map(|r| r.as_ref().chars().collect()).collect();
        Board::from_grid(&grid)
    }

    /// Build a board from an arbitrary grid, checking the 8x8 shape and the
    /// piece alphabet. This is the boundary where shape errors surface.
    pub fn from_grid(grid: &[Vec<char>]) -> Result<Self> {
        if grid.len() != BOARD_SIZE {
            return Err(EngineError::InvalidBoardShape(format!(
                "expected {BOARD_SIZE} rows, got {}",
                grid.len()
            )));
        }
        let mut board = Board::empty();
        for (row, cells) in grid.iter().enumerate() {
            if cells.len() != BOARD_SIZE {
                return Err(EngineError::InvalidBoardShape(format!(
                    "row {row} has {} cells, expected {BOARD_SIZE}",
                    cells.len()
                )));
            }
            for (col, &c) in cells.iter().enumerate() {
                if c != EMPTY && PieceKind::from_char(c).is_none() {
                    return Err(EngineError::InvalidBoardShape(format!(
                        "unknown piece code '{c}' at row {row}, col {col}"
                    )));
                }
                board.cells[row][col] = c;
            }
        }
        Ok(board)
    }

    /// Raw cell code.
    #[inline]
    pub fn cell(&self, square: Square) -> char {
        self.cells[square.row as usize][square.col as usize]
    }

    /// Overwrite a cell. Callers are responsible for passing a valid code.
    #[inline]
    pub fn set_cell(&mut self, square: Square, code: char) {
        self.cells[square.row as usize][square.col as usize] = code;
    }

    #[inline]
    pub fn is_empty(&self, square: Square) -> bool {
        self.cell(square) == EMPTY
    }

    /// Decoded piece on a square.
    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<(Color, PieceKind)> {
        PieceKind::from_char(self.cell(square))
    }

    /// Place a piece.
    pub fn put(&mut self, square: Square, color: Color, kind: PieceKind) {
        self.set_cell(square, kind.to_char(color));
    }

    /// Clear a square.
    pub fn clear(&mut self, square: Square) {
        self.set_cell(square, EMPTY);
    }

    /// Row-major iterator over occupied squares and their pieces.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Color, PieceKind)> + '_ {
        (0..64u8).filter_map(move |index| {
            let square = Square::from_index(index);
            self.piece_at(square)
                .map(|(color, kind)| (square, color, kind))
        })
    }

    /// First square holding the given side's king.
    pub fn find_king(&self, color: Color) -> Option<Square> {
        let code = PieceKind::King.to_char(color);
        (0..64u8)
            .map(Square::from_index)
            .find(|&square| self.cell(square) == code)
    }

    /// Rows as strings, top (rank 8) first.
    pub fn rows(&self) -> Vec<String> {
        self.cells.iter().map(|row| row.iter().collect()).collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::initial()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_board_layout() {
        let board = Board::initial();
        assert_eq!(board.cell(Square::new(0, 0)), 'r');
        assert_eq!(board.cell(Square::new(7, 4)), 'K');
        assert_eq!(board.cell(Square::new(6, 3)), 'P');
        assert!(board.is_empty(Square::new(4, 4)));
        assert_eq!(board.pieces().count(), 32);
    }

    #[test]
    fn test_from_rows_rejects_bad_shape() {
        let short = ["rnbqkbnr"; 7];
        assert!(matches!(
            Board::from_rows(&short),
            Err(EngineError::InvalidBoardShape(_))
        ));

        let mut rows = INITIAL_ROWS.map(String::from).to_vec();
        rows[3] = ".......".to_string();
        assert!(matches!(
            Board::from_rows(&rows),
            Err(EngineError::InvalidBoardShape(_))
        ));

        rows[3] = "...x....".to_string();
        assert!(Board::from_rows(&rows).is_err());
    }

    #[test]
    fn test_from_rows_round_trip() {
        let board = Board::from_rows(&INITIAL_ROWS).unwrap();
        assert_eq!(board, Board::initial());
        assert_eq!(board.rows()[0], "rnbqkbnr");
    }

    #[test]
    fn test_square_algebraic() {
        let e2 = Square::from_algebraic("e2").unwrap();
        assert_eq!(e2, Square::new(6, 4));
        assert_eq!(e2.to_string(), "e2");
        assert_eq!(Square::from_algebraic("a8").unwrap(), Square::new(0, 0));
        assert_eq!(Square::from_algebraic("h1").unwrap().index(), 63);
        assert!(Square::from_algebraic("i1").is_err());
        assert!(Square::from_algebraic("a9").is_err());
        assert!(Square::from_algebraic("a").is_err());
    }

    #[test]
    fn test_find_king_and_piece_codes() {
        let board = Board::initial();
        assert_eq!(board.find_king(Color::White), Some(Square::new(7, 4)));
        assert_eq!(board.find_king(Color::Black), Some(Square::new(0, 4)));
        assert_eq!(PieceKind::from_char('N'), Some((Color::White, PieceKind::Knight)));
        assert_eq!(PieceKind::from_char('.'), None);
        assert_eq!(PieceKind::Queen.to_char(Color::Black), 'q');
    }
}
