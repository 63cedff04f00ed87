//! Coordinate move notation (`e2e4`, `e7e8q`).

use crate::board::{Move, MoveKind, PieceKind, Square};
use crate::errors::{EngineError, Result};

/// Parse a 4 or 5 character coordinate move.
///
/// The kind tag is always `Quiet`; the rules collaborator works out captures
/// and double pushes from the board. A fifth character must be one of
/// `q r b n` and becomes the promotion piece.
pub fn parse_move(token: &str) -> Result<Move> {
    let token = token.trim();
    if !token.is_ascii() || !(4..=5).contains(&token.len()) {
        return Err(EngineError::InvalidMove(format!(
            "'{token}' is not a coordinate move"
        )));
    }

    let from = Square::from_algebraic(&token[0..2])
        .map_err(|_| EngineError::InvalidMove(format!("bad origin square in '{token}'")))?;
    let to = Square::from_algebraic(&token[2..4])
        .map_err(|_| EngineError::InvalidMove(format!("bad target square in '{token}'")))?;

    let mut mv = Move::new(from, to, MoveKind::Quiet);
    if let Some(suffix) = token[4..].chars().next() {
        let piece = PieceKind::from_promotion_char(suffix).ok_or_else(|| {
            EngineError::InvalidMove(format!("bad promotion piece '{suffix}' in '{token}'"))
        })?;
        mv = mv.with_promotion(piece);
    }
    Ok(mv)
}

/// Format a move in coordinate notation, appending the lowercase promotion
/// letter only when one is set.
pub fn format_move(mv: &Move) -> String {
    let mut text = String::with_capacity(5);
    text.push_str(&mv.from.to_string());
    text.push_str(&mv.to.to_string());
    if let Some(piece) = mv.promotion {
        text.push(piece.to_char(crate::board::Color::Black));
    }
    text
}
