//! Full game position and FEN conversion.

use crate::board::{Board, Color, PieceKind, Square, EMPTY};
use crate::errors::{EngineError, Result};
use std::fmt;
use std::str::FromStr;

/// FEN of the standard starting position
pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Which castling moves are still available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub const NONE: CastlingRights = CastlingRights {
        white_kingside: false,
        white_queenside: false,
        black_kingside: false,
        black_queenside: false,
    };

    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside,
            Color::Black => self.black_kingside,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside,
            Color::Black => self.black_queenside,
        }
    }

    /// Drop both rights of one side.
    pub fn revoke(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            Color::Black => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
        }
    }

    /// Drop the right tied to a rook's home corner, if `square` is one.
    pub fn revoke_corner(&mut self, square: Square) {
        match (square.row, square.col) {
            (7, 7) => self.white_kingside = false,
            (7, 0) => self.white_queenside = false,
            (0, 7) => self.black_kingside = false,
            (0, 0) => self.black_queenside = false,
            _ => {}
        }
    }

    fn parse(field: &str, fen: &str) -> Result<Self> {
        let mut rights = CastlingRights::NONE;
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                other => {
                    return Err(EngineError::invalid_fen(
                        fen,
                        format!("unexpected castling flag '{other}'"),
                    ))
                }
            }
        }
        Ok(rights)
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        if self.white_kingside {
            text.push('K');
        }
        if self.white_queenside {
            text.push('Q');
        }
        if self.black_kingside {
            text.push('k');
        }
        if self.black_queenside {
            text.push('q');
        }
        if text.is_empty() {
            text.push('-');
        }
        write!(f, "{text}")
    }
}

/// Board plus all state needed to continue the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub board: Board,
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Position {
            board: Board::initial(),
            side_to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse a FEN string.
    ///
    /// The first four fields are required. The halfmove and fullmove counters
    /// are optional; when absent or unparsable they default to 0 and 1.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(EngineError::invalid_fen(
                fen,
                format!("expected at least 4 fields, got {}", fields.len()),
            ));
        }

        let board = parse_placement(fields[0], fen)?;

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(EngineError::invalid_fen(
                    fen,
                    format!("active color must be 'w' or 'b', got '{other}'"),
                ))
            }
        };

        let castling = CastlingRights::parse(fields[2], fen)?;

        let en_passant = match fields[3] {
            "-" => None,
            square => {
                let target = Square::from_algebraic(square).map_err(|_| {
                    EngineError::invalid_fen(fen, format!("bad en passant square '{square}'"))
                })?;
                if !en_passant_target_valid(&board, side_to_move, target) {
                    return Err(EngineError::invalid_fen(
                        fen,
                        format!("en passant square '{square}' does not follow a double push"),
                    ));
                }
                Some(target)
            }
        };

        let halfmove_clock = fields
            .get(4)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let fullmove_number = fields
            .get(5)
            .and_then(|s| s.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(1);

        Ok(Position {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Format as a six-field FEN string.
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for row in 0..8u8 {
            if row > 0 {
                placement.push('/');
            }
            let mut empties = 0;
            for col in 0..8u8 {
                let code = self.board.cell(Square::new(row, col));
                if code == EMPTY {
                    empties += 1;
                } else {
                    if empties > 0 {
                        placement.push_str(&empties.to_string());
                        empties = 0;
                    }
                    placement.push(code);
                }
            }
            if empties > 0 {
                placement.push_str(&empties.to_string());
            }
        }

        let en_passant = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            self.side_to_move.fen_char(),
            self.castling,
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

impl FromStr for Position {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Position::from_fen(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

/// An en passant target must be the empty square a pawn of the side that
/// just moved skipped over, with that pawn right in front of it.
pub(crate) fn en_passant_target_valid(
    board: &Board,
    side_to_move: Color,
    target: Square,
) -> bool {
    let pusher = !side_to_move;
    let skipped_row = pusher.pawn_start_row() as i8 + pusher.pawn_direction();
    if target.row as i8 != skipped_row || !board.is_empty(target) {
        return false;
    }
    target
        .offset(pusher.pawn_direction(), 0)
        .is_some_and(|square| board.piece_at(square) == Some((pusher, PieceKind::Pawn)))
}

fn parse_placement(field: &str, fen: &str) -> Result<Board> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(EngineError::invalid_fen(
            fen,
            format!("expected 8 ranks, got {}", ranks.len()),
        ));
    }

    let mut board = Board::empty();
    for (row, rank) in ranks.iter().enumerate() {
        let mut col = 0usize;
        for c in rank.chars() {
            if let Some(skip) = c.to_digit(10) {
                if skip == 0 || skip > 8 {
                    return Err(EngineError::invalid_fen(
                        fen,
                        format!("bad empty-square count '{c}'"),
                    ));
                }
                col += skip as usize;
            } else {
                if PieceKind::from_char(c).is_none() {
                    return Err(EngineError::invalid_fen(
                        fen,
                        format!("unknown piece '{c}'"),
                    ));
                }
                if col >= 8 {
                    return Err(EngineError::invalid_fen(
                        fen,
                        format!("rank {} is too long", 8 - row),
                    ));
                }
                board.set_cell(Square::new(row as u8, col as u8), c);
                col += 1;
            }
            if col > 8 {
                return Err(EngineError::invalid_fen(
                    fen,
                    format!("rank {} is too long", 8 - row),
                ));
            }
        }
        if col != 8 {
            return Err(EngineError::invalid_fen(
                fen,
                format!("rank {} has {col} squares", 8 - row),
            ));
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_fen() {
        let position = Position::from_fen(STARTPOS_FEN).unwrap();
        assert_eq!(position, Position::startpos());
        assert_eq!(position.to_fen(), STARTPOS_FEN);
    }

    #[test]
    fn test_fen_round_trip() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
            "4k3/8/8/8/8/8/8/4K3 b - - 12 40",
        ];
        for fen in fens {
            let position: Position = fen.parse().unwrap();
            assert_eq!(position.to_fen(), fen);
        }
    }

    #[test]
    fn test_lenient_counters() {
        let position = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - -").unwrap();
        assert_eq!(position.halfmove_clock, 0);
        assert_eq!(position.fullmove_number, 1);

        let position = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - x y").unwrap();
        assert_eq!(position.halfmove_clock, 0);
        assert_eq!(position.fullmove_number, 1);
    }

    #[test]
    fn test_invalid_fens() {
        let bad = [
            "",
            "8/8/8/8 w - -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq -",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/pppppppp/7/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq z9",
        ];
        for fen in bad {
            assert!(
                matches!(Position::from_fen(fen), Err(EngineError::InvalidFen { .. })),
                "accepted {fen:?}"
            );
        }
    }

    #[test]
    fn test_en_passant_square_must_follow_double_push() {
        let bad = [
            // Rank 3 target with white to move
            "4k3/8/8/8/8/8/3PQ3/4K3 w - e3 0 1",
            // Right rank, but no black pawn on e5
            "4k3/8/8/3P4/8/8/8/4K3 w - e6 0 1",
            // Target square occupied
            "4k3/8/4n3/3Pp3/8/8/8/4K3 w - e6 0 1",
            // White pawn on e4 but black is not to move
            "4k3/8/8/8/4P3/8/8/4K3 w - e3 0 1",
            // Rank 6 target with black to move
            "4k3/8/8/3pP3/8/8/8/4K3 b - d6 0 1",
        ];
        for fen in bad {
            assert!(
                matches!(Position::from_fen(fen), Err(EngineError::InvalidFen { .. })),
                "accepted {fen:?}"
            );
        }

        let position = Position::from_fen("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
        assert_eq!(position.en_passant, Some(Square::from_algebraic("d3").unwrap()));
    }

    #[test]
    fn test_castling_rights_revoke() {
        let mut rights = CastlingRights::ALL;
        rights.revoke_corner(Square::new(7, 7));
        assert!(!rights.white_kingside);
        assert!(rights.white_queenside);
        rights.revoke(Color::Black);
        assert_eq!(rights.to_string(), "Q");
    }
}
