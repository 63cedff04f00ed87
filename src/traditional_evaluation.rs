//! Hand-crafted evaluation terms.
//!
//! Every component scores the board in centipawns from white's point of view.
//! `TraditionalEvaluator` sums them and converts to pawn units for the side to
//! move.

use crate::board::{Board, Color, PieceKind, Square};
use serde::{Deserialize, Serialize};

/// Centipawn values for chess pieces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceValues {
    pub pawn: i32,
    pub knight: i32,
    pub bishop: i32,
    pub rook: i32,
    pub queen: i32,
    pub king: i32,
}

impl Default for PieceValues {
    fn default() -> Self {
        Self {
            pawn: 100,
            knight: 320,
            bishop: 330,
            rook: 500,
            queen: 900,
            king: 20000,
        }
    }
}

impl PieceValues {
    pub fn value(&self, kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => self.pawn,
            PieceKind::Knight => self.knight,
            PieceKind::Bishop => self.bishop,
            PieceKind::Rook => self.rook,
            PieceKind::Queen => self.queen,
            PieceKind::King => self.king,
        }
    }
}

/// One evaluation term
pub trait EvaluationComponent: Send + Sync {
    fn evaluate(&self, board: &Board) -> i32; // Centipawns, white's perspective
    fn component_name(&self) -> &'static str;
}

#[inline]
fn signed(color: Color, value: i32) -> i32 {
    match color {
        Color::White => value,
        Color::Black => -value,
    }
}

/// Material balance
#[derive(Debug)]
pub struct MaterialEvaluator {
    piece_values: PieceValues,
}

impl MaterialEvaluator {
    pub fn new(piece_values: PieceValues) -> Self {
        Self { piece_values }
    }
}

impl EvaluationComponent for MaterialEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        board
            .pieces()
            .map(|(_, color, kind)| signed(color, self.piece_values.value(kind)))
            .sum()
    }

    fn component_name(&self) -> &'static str {
        "Material"
    }
}

/// Center occupation and minor piece development
#[derive(Debug)]
pub struct PositionalEvaluator {
    center_bonus: i32,      // Any piece on d4, e4, d5, e5
    development_bonus: i32, // Knight or bishop inside the c3-f6 box
}

impl Default for PositionalEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionalEvaluator {
    pub fn new() -> Self {
        Self {
            center_bonus: 10,
            development_bonus: 5,
        }
    }
}

const CENTER_SQUARES: [(u8, u8); 4] = [(3, 3), (3, 4), (4, 3), (4, 4)];

impl EvaluationComponent for PositionalEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        let mut score = 0;

        for (row, col) in CENTER_SQUARES {
            if let Some((color, _)) = board.piece_at(Square::new(row, col)) {
                score += signed(color, self.center_bonus);
            }
        }

        for (square, color, kind) in board.pieces() {
            let minor = matches!(kind, PieceKind::Knight | PieceKind::Bishop);
            if minor && (2..=5).contains(&square.row) && (2..=5).contains(&square.col) {
                score += signed(color, self.development_bonus);
            }
        }

        score
    }

    fn component_name(&self) -> &'static str {
        "Positional"
    }
}

/// Doubled and passed pawns
#[derive(Debug)]
pub struct PawnStructureEvaluator {
    doubled_penalty: i32, // Per extra pawn on a file
    passed_bonus: i32,
}

impl Default for PawnStructureEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PawnStructureEvaluator {
    pub fn new() -> Self {
        Self {
            doubled_penalty: 15,
            passed_bonus: 25,
        }
    }

    fn pawn_files(board: &Board, color: Color) -> [i32; 8] {
        let mut files = [0; 8];
        for (square, c, kind) in board.pieces() {
            if c == color && kind == PieceKind::Pawn {
                files[square.col as usize] += 1;
            }
        }
        files
    }

    /// No enemy pawn ahead on the same or an adjacent file.
    fn is_passed(board: &Board, square: Square, color: Color) -> bool {
        let enemy_pawn = PieceKind::Pawn.to_char(!color);
        let step = color.pawn_direction();
        let mut row = square.row as i8 + step;
        while (0..8).contains(&row) {
            for dc in -1..=1 {
                if let Some(ahead) = Square::try_new(row, square.col as i8 + dc) {
                    if board.cell(ahead) == enemy_pawn {
                        return false;
                    }
                }
            }
            row += step;
        }
        true
    }

    pub fn count_passed(board: &Board, color: Color) -> i32 {
        board
            .pieces()
            .filter(|&(square, c, kind)| {
                c == color && kind == PieceKind::Pawn && Self::is_passed(board, square, color)
            })
            .count() as i32
    }
}

impl EvaluationComponent for PawnStructureEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        let mut score = 0;
        for color in [Color::White, Color::Black] {
            let doubled: i32 = Self::pawn_files(board, color)
                .iter()
                .filter(|&&n| n > 1)
                .map(|&n| n - 1)
                .sum();
            score -= signed(color, doubled * self.doubled_penalty);
            score += signed(color, Self::count_passed(board, color) * self.passed_bonus);
        }
        score
    }

    fn component_name(&self) -> &'static str {
        "Pawn Structure"
    }
}

/// Pawn shield and edge exposure around each king
#[derive(Debug)]
pub struct KingSafetyEvaluator {
    shield_bonus: i32,      // Per own pawn next to the king
    edge_penalty: i32,      // King on the a or h file
    near_edge_penalty: i32, // King on the b or g file
    limit: i32,             // Per-king score clamped to [-limit, limit]
}

impl Default for KingSafetyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl KingSafetyEvaluator {
    pub fn new() -> Self {
        Self {
            shield_bonus: 10,
            edge_penalty: 15,
            near_edge_penalty: 5,
            limit: 50,
        }
    }

    fn king_score(&self, board: &Board, color: Color) -> i32 {
        let Some(king) = board.find_king(color) else {
            return 0;
        };
        let pawn = PieceKind::Pawn.to_char(color);

        let mut score = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                if let Some(square) = king.offset(dr, dc) {
                    if board.cell(square) == pawn {
                        score += self.shield_bonus;
                    }
                }
            }
        }

        match king.col {
            0 | 7 => score -= self.edge_penalty,
            1 | 6 => score -= self.near_edge_penalty,
            _ => {}
        }

        score.clamp(-self.limit, self.limit)
    }
}

impl EvaluationComponent for KingSafetyEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        self.king_score(board, Color::White) - self.king_score(board, Color::Black)
    }

    fn component_name(&self) -> &'static str {
        "King Safety"
    }
}

/// Sum of all components
pub struct TraditionalEvaluator {
    components: Vec<Box<dyn EvaluationComponent>>,
}

impl Default for TraditionalEvaluator {
    fn default() -> Self {
        Self::new(PieceValues::default())
    }
}

impl std::fmt::Debug for TraditionalEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.components.iter().map(|c| c.component_name()))
            .finish()
    }
}

impl TraditionalEvaluator {
    pub fn new(piece_values: PieceValues) -> Self {
        let components: Vec<Box<dyn EvaluationComponent>> = vec![
            Box::new(MaterialEvaluator::new(piece_values)),
            Box::new(PositionalEvaluator::new()),
            Box::new(PawnStructureEvaluator::new()),
            Box::new(KingSafetyEvaluator::new()),
        ];
        Self { components }
    }

    /// Add a custom evaluation component
    pub fn add_component(&mut self, component: Box<dyn EvaluationComponent>) {
        self.components.push(component);
    }

    /// Total in centipawns from white's point of view
    pub fn evaluate_centipawns(&self, board: &Board) -> i32 {
        self.components.iter().map(|c| c.evaluate(board)).sum()
    }

    /// Pawn units, positive when `side_to_move` is better off
    pub fn evaluate(&self, board: &Board, side_to_move: Color) -> f32 {
        signed(side_to_move, self.evaluate_centipawns(board)) as f32 / 100.0
    }

    /// Per-component scores, white's point of view
    pub fn evaluate_detailed(&self, board: &Board) -> EvaluationBreakdown {
        let components: Vec<(&'static str, i32)> = self
            .components
            .iter()
            .map(|c| (c.component_name(), c.evaluate(board)))
            .collect();
        let total = components.iter().map(|(_, v)| v).sum();
        EvaluationBreakdown { components, total }
    }
}

/// Detailed evaluation breakdown for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationBreakdown {
    pub components: Vec<(&'static str, i32)>,
    pub total: i32,
}

impl EvaluationBreakdown {
    pub fn component(&self, name: &str) -> Option<i32> {
        self.components
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }

    pub fn display(&self) -> String {
        let mut result = format!("Total: {} cp\n", self.total);
        result.push_str("Breakdown:\n");
        for (component, value) in &self.components {
            result.push_str(&format!("  {component}: {value} cp\n"));
        }
        result
    }
}
