use crate::board::Move;
use crate::hybrid_evaluation::PositionEvaluator;
use crate::rules::{GameStatus, RulesEngine};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Score of a mate at the root, in pawn units
pub const MATE_SCORE: f32 = 10_000.0;
/// Deepest iteration the search will attempt
pub const MAX_SEARCH_DEPTH: u32 = 64;

/// Default fixed depth when no other limit is given
pub const DEFAULT_SEARCH_DEPTH: u32 = 6;

/// When to stop searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: u32,
    pub move_time: Option<Duration>,
    pub infinite: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::depth(DEFAULT_SEARCH_DEPTH)
    }
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: depth.clamp(1, MAX_SEARCH_DEPTH),
            move_time: None,
            infinite: false,
        }
    }

    /// Search until the stop flag is raised
    pub fn infinite() -> Self {
        Self {
            depth: MAX_SEARCH_DEPTH,
            move_time: None,
            infinite: true,
        }
    }

    pub fn with_move_time(mut self, move_time: Duration) -> Self {
        self.move_time = Some(move_time);
        self
    }
}

/// Progress report after a completed iteration
#[derive(Debug, Clone, PartialEq)]
pub struct SearchInfo {
    pub depth: u32,
    pub score: f32, // Pawn units, side to move
    pub nodes: u64,
    pub time: Duration,
    pub pv: Vec<Move>,
}

impl SearchInfo {
    /// Moves to mate (negative when getting mated), if the score is a mate score
    pub fn mate_in(&self) -> Option<i32> {
        let distance = MATE_SCORE - self.score.abs();
        if distance > MAX_SEARCH_DEPTH as f32 + 1.0 {
            return None;
        }
        let moves = (distance.round() as i32 + 1) / 2;
        Some(if self.score > 0.0 { moves } else { -moves })
    }

    pub fn score_cp(&self) -> i32 {
        (self.score * 100.0).round() as i32
    }
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "info depth {}", self.depth)?;
        match self.mate_in() {
            Some(moves) => write!(f, " score mate {moves}")?,
            None => write!(f, " score cp {}", self.score_cp())?,
        }
        write!(f, " nodes {} time {}", self.nodes, self.time.as_millis())?;
        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

/// Tactical search result
#[derive(Debug, Clone)]
pub struct TacticalResult {
    pub evaluation: f32,
    pub best_move: Option<Move>,
    pub principal_variation: Vec<Move>,
    pub depth_reached: u32,
    pub nodes_searched: u64,
    pub time_elapsed: Duration,
    pub stopped: bool,
}

/// Iterative-deepening negamax with alpha-beta pruning.
///
/// Positions are explored by cloning the rules collaborator and playing
/// moves on the copy. The search polls the shared stop flag at every node;
/// an interrupted iteration is discarded and the last completed one wins.
pub struct TacticalSearch<'a> {
    limits: SearchLimits,
    stop: Arc<AtomicBool>,
    evaluator: &'a mut PositionEvaluator,
    nodes: u64,
    start: Instant,
    aborted: bool,
}

impl<'a> TacticalSearch<'a> {
    pub fn new(
        limits: SearchLimits,
        stop: Arc<AtomicBool>,
        evaluator: &'a mut PositionEvaluator,
    ) -> Self {
        Self {
            limits,
            stop,
            evaluator,
            nodes: 0,
            start: Instant::now(),
            aborted: false,
        }
    }

    /// Search the collaborator's current position, calling `on_info` after
    /// every completed iteration.
    pub fn run<R, F>(&mut self, rules: &R, mut on_info: F) -> TacticalResult
    where
        R: RulesEngine + Clone,
        F: FnMut(&SearchInfo),
    {
        self.nodes = 0;
        self.start = Instant::now();
        self.aborted = false;

        let mut root_moves = rules.legal_moves();
        if root_moves.is_empty() {
            let evaluation = match rules.game_status() {
                GameStatus::Checkmate { .. } => -MATE_SCORE,
                _ => 0.0,
            };
            self.wait_for_stop();
            return self.result(evaluation, Vec::new(), 0);
        }
        order_moves(&mut root_moves);

        // Fallback if even the first iteration is interrupted
        let mut best_pv = vec![root_moves[0]];
        let mut best_score = 0.0;
        let mut completed_depth = 0;

        for depth in 1..=self.limits.depth {
            let (score, pv) = self.search_root(rules, &root_moves, depth);
            if self.aborted {
                break;
            }
            let mv = pv[0];
            best_score = score;
            best_pv = pv;
            completed_depth = depth;

            // Try the previous iteration's choice first next time
            if let Some(index) = root_moves.iter().position(|m| *m == mv) {
                root_moves[..=index].rotate_right(1);
            }

            on_info(&SearchInfo {
                depth,
                score,
                nodes: self.nodes,
                time: self.start.elapsed(),
                pv: best_pv.clone(),
            });

            if !self.limits.infinite && score.abs() >= MATE_SCORE - MAX_SEARCH_DEPTH as f32 {
                break;
            }
            if self.should_stop() {
                break;
            }
        }

        self.wait_for_stop();
        tracing::debug!(
            depth = completed_depth,
            nodes = self.nodes,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "search finished"
        );
        self.result(best_score, best_pv, completed_depth)
    }

    fn result(&self, evaluation: f32, pv: Vec<Move>, depth: u32) -> TacticalResult {
        TacticalResult {
            evaluation,
            best_move: pv.first().copied(),
            principal_variation: pv,
            depth_reached: depth,
            nodes_searched: self.nodes,
            time_elapsed: self.start.elapsed(),
            stopped: self.stop.load(Ordering::Relaxed),
        }
    }

    /// An infinite search never reports on its own; hold until told to stop.
    fn wait_for_stop(&self) {
        if !self.limits.infinite {
            return;
        }
        while !self.stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        match self.limits.move_time {
            Some(budget) => self.start.elapsed() >= budget,
            None => false,
        }
    }

    /// Best score at the root and the principal variation starting with the
    /// best move.
    fn search_root<R>(&mut self, rules: &R, moves: &[Move], depth: u32) -> (f32, Vec<Move>)
    where
        R: RulesEngine + Clone,
    {
        let mut alpha = f32::NEG_INFINITY;
        let beta = f32::INFINITY;
        let mut best_pv = vec![moves[0]];
        let mut line = Vec::new();

        for &mv in moves {
            let mut child = rules.clone();
            child.apply_legal_move(mv);
            line.clear();
            let score = -self.negamax(&child, depth - 1, 1, -beta, -alpha, &mut line);
            if self.aborted {
                break;
            }
            if score > alpha {
                alpha = score;
                best_pv.clear();
                best_pv.push(mv);
                best_pv.extend_from_slice(&line);
            }
        }

        (alpha, best_pv)
    }

    /// Negamax score of `rules`. `pv` receives the best line from this node
    /// whenever a move raises alpha.
    fn negamax<R>(
        &mut self,
        rules: &R,
        depth: u32,
        ply: u32,
        mut alpha: f32,
        beta: f32,
        pv: &mut Vec<Move>,
    ) -> f32
    where
        R: RulesEngine + Clone,
    {
        self.nodes += 1;
        if self.should_stop() {
            self.aborted = true;
            return 0.0;
        }

        let mut moves = rules.legal_moves();
        if moves.is_empty() {
            return match rules.game_status() {
                GameStatus::Checkmate { .. } => -(MATE_SCORE - ply as f32),
                _ => 0.0,
            };
        }

        if depth == 0 {
            return self
                .evaluator
                .evaluate(&rules.board_state(), rules.current_turn());
        }

        order_moves(&mut moves);
        let mut best = f32::NEG_INFINITY;
        let mut line = Vec::new();
        for mv in moves {
            let mut child = rules.clone();
            child.apply_legal_move(mv);
            line.clear();
            let score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha, &mut line);
            if self.aborted {
                return 0.0;
            }
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(mv);
                pv.extend_from_slice(&line);
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }
}

/// Captures first, otherwise keep generation order
fn order_moves(moves: &mut [Move]) {
    moves.sort_by_key(|m| !m.is_capture());
}
