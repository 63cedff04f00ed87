//! UCI session: the line protocol state machine that drives the engine.
//!
//! Every output line, whether from the command loop or the search thread,
//! is sent through one `crossbeam` channel so a single writer owns stdout.

use crate::board::{Color, Move};
use crate::config::{EngineConfig, MAX_HASH_MB};
use crate::errors::{EngineError, Result};
use crate::hybrid_evaluation::{BlendWeights, PositionEvaluator};
use crate::notation::parse_move;
use crate::position::Position;
use crate::rules::RulesEngine;
use crate::tactical_search::{SearchLimits, TacticalSearch};
use crate::utils::cache::{entries_for_megabytes, CacheStats};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// UCI option types
#[derive(Debug, Clone, PartialEq)]
pub enum UciOption {
    Check {
        default: bool,
        value: bool,
    },
    Spin {
        default: i32,
        min: i32,
        max: i32,
        value: i32,
    },
    Combo {
        default: String,
        options: Vec<String>,
        value: String,
    },
    Button,
}

impl UciOption {
    fn spin(default: i32, min: i32, max: i32) -> Self {
        UciOption::Spin {
            default,
            min,
            max,
            value: default,
        }
    }

    fn check(default: bool) -> Self {
        UciOption::Check {
            default,
            value: default,
        }
    }

    /// The `option name ...` line announced in reply to `uci`
    pub fn option_line(&self, name: &str) -> String {
        match self {
            UciOption::Check { default, .. } => {
                format!("option name {name} type check default {default}")
            }
            UciOption::Spin {
                default, min, max, ..
            } => format!("option name {name} type spin default {default} min {min} max {max}"),
            UciOption::Combo {
                default, options, ..
            } => {
                let mut line = format!("option name {name} type combo default {default}");
                for option in options {
                    line.push_str(" var ");
                    line.push_str(option);
                }
                line
            }
            UciOption::Button => format!("option name {name} type button"),
        }
    }

    /// Current value as it would be written in `setoption`; empty for buttons
    pub fn value_string(&self) -> String {
        match self {
            UciOption::Check { value, .. } => value.to_string(),
            UciOption::Spin { value, .. } => value.to_string(),
            UciOption::Combo { value, .. } => value.clone(),
            UciOption::Button => String::new(),
        }
    }

    /// Validate and store a new value
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = |expected: String| EngineError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
            expected,
        };
        match self {
            UciOption::Check { value: current, .. } => {
                *current = if value.eq_ignore_ascii_case("true") {
                    true
                } else if value.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(invalid("true or false".to_string()));
                };
            }
            UciOption::Spin {
                value: current,
                min,
                max,
                ..
            } => {
                let expected = || format!("an integer in {min}..={max}");
                let parsed: i32 = value.parse().map_err(|_| invalid(expected()))?;
                if parsed < *min || parsed > *max {
                    return Err(invalid(expected()));
                }
                *current = parsed;
            }
            UciOption::Combo {
                value: current,
                options,
                ..
            } => match options.iter().find(|o| o.eq_ignore_ascii_case(value)) {
                Some(option) => *current = option.clone(),
                None => return Err(invalid(format!("one of {}", options.join(", ")))),
            },
            UciOption::Button => {}
        }
        Ok(())
    }
}

/// Where the session is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Ready,
    PositionSet,
    Searching,
    Stopped,
}

/// Base position named by the last `position` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionSetup {
    Startpos,
    Fen(String),
}

/// Parameters of a `go` command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u32>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
    pub ignored: Vec<String>, // Arguments that were not understood
}

impl GoParams {
    /// Parse the tokens after `go`. Unknown tokens and limits given without a
    /// value are skipped and recorded in `ignored`; a non-numeric value is an
    /// error.
    pub fn parse(parts: &[&str]) -> Result<Self> {
        let mut params = GoParams::default();
        let mut i = 0;
        while i < parts.len() {
            match parts[i] {
                "depth" if i + 1 < parts.len() => {
                    params.depth = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "movetime" if i + 1 < parts.len() => {
                    params.movetime = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "wtime" if i + 1 < parts.len() => {
                    params.wtime = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "btime" if i + 1 < parts.len() => {
                    params.btime = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "winc" if i + 1 < parts.len() => {
                    params.winc = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "binc" if i + 1 < parts.len() => {
                    params.binc = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "movestogo" if i + 1 < parts.len() => {
                    params.movestogo = Some(parts[i + 1].parse()?);
                    i += 2;
                }
                "infinite" => {
                    params.infinite = true;
                    i += 1;
                }
                "ponder" => {
                    params.ponder = true;
                    i += 1;
                }
                other => {
                    let valued = matches!(
                        other,
                        "depth" | "movetime" | "wtime" | "btime" | "winc" | "binc" | "movestogo"
                    );
                    params.ignored.push(if valued {
                        format!("{other} (missing value)")
                    } else {
                        other.to_string()
                    });
                    i += 1;
                }
            }
        }
        Ok(params)
    }

    /// Time to spend on this move. An explicit movetime wins over the clocks;
    /// otherwise the mover's clock is split over `movestogo` (or
    /// `clock_divisor`) moves, never more than half of it.
    pub fn move_budget(&self, side: Color, clock_divisor: u64) -> Option<Duration> {
        if let Some(ms) = self.movetime {
            return Some(Duration::from_millis(ms));
        }
        let clock = match side {
            Color::White => self.wtime,
            Color::Black => self.btime,
        }?;
        let moves_left = self.movestogo.unwrap_or(clock_divisor).max(1);
        Some(Duration::from_millis((clock / moves_left).min(clock / 2)))
    }

    pub fn limits(&self, side: Color, default_depth: u32, clock_divisor: u64) -> SearchLimits {
        if self.infinite {
            return SearchLimits::infinite();
        }
        let limits = SearchLimits::depth(self.depth.unwrap_or(default_depth));
        match self.move_budget(side, clock_divisor) {
            Some(budget) => limits.with_move_time(budget),
            None => limits,
        }
    }
}

/// Option effects waiting for a moment when no search holds the evaluator
#[derive(Debug, Default)]
struct PendingEffects {
    cache_capacity: Option<usize>,
    clear_cache: bool,
    blend: Option<BlendWeights>,
}

impl PendingEffects {
    fn is_empty(&self) -> bool {
        self.cache_capacity.is_none() && !self.clear_cache && self.blend.is_none()
    }
}

/// A running background search
struct SearchHandle {
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    thread: JoinHandle<()>,
}

/// One UCI conversation with a GUI
pub struct UciSession<R: RulesEngine + Clone + 'static> {
    config: EngineConfig,
    rules: R,
    evaluator: Arc<Mutex<PositionEvaluator>>,
    options: BTreeMap<String, UciOption>,
    pending: PendingEffects,
    out: Sender<String>,
    search: Option<SearchHandle>,
    setup: PositionSetup,
    moves: Vec<Move>,
    phase: SessionPhase,
    debug: bool,
}

impl<R: RulesEngine + Clone + 'static> UciSession<R> {
    pub fn new(config: EngineConfig, rules: R, out: Sender<String>) -> Result<Self> {
        config.validate()?;
        let mut evaluator_config = config.evaluator.clone();
        evaluator_config.cache_capacity = entries_for_megabytes(config.hash_mb);
        let evaluator = PositionEvaluator::new(evaluator_config)?;
        let options = default_options(&config);
        tracing::info!(
            name = %config.engine_name,
            hash_mb = config.hash_mb,
            default_depth = config.default_depth,
            "uci session created"
        );

        Ok(Self {
            debug: config.debug,
            config,
            rules,
            evaluator: Arc::new(Mutex::new(evaluator)),
            options,
            pending: PendingEffects::default(),
            out,
            search: None,
            setup: PositionSetup::Startpos,
            moves: Vec::new(),
            phase: SessionPhase::Idle,
        })
    }

    /// Session with a fresh unbounded output channel
    pub fn with_channel(config: EngineConfig, rules: R) -> Result<(Self, Receiver<String>)> {
        let (tx, rx) = channel::unbounded();
        Ok((Self::new(config, rules, tx)?, rx))
    }

    /// Read commands until `quit` or end of input
    pub fn run<B: BufRead>(&mut self, input: B) -> Result<()> {
        for line in input.lines() {
            if !self.handle_line(&line?) {
                break;
            }
        }
        self.cancel_search();
        self.phase = SessionPhase::Stopped;
        Ok(())
    }

    /// Process one input line. Returns false once the session should end.
    ///
    /// Errors never escape: they are reported as `info string` lines.
    pub fn handle_line(&mut self, line: &str) -> bool {
        if let Err(e) = self.process_command(line.trim()) {
            tracing::warn!(command = line.trim(), error = %e, "command failed");
            self.send(format!("info string {e}"));
        }
        self.phase != SessionPhase::Stopped
    }

    fn process_command(&mut self, command: &str) -> Result<()> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(());
        }

        match parts[0] {
            "uci" => self.handle_uci(),
            "debug" => self.handle_debug(&parts)?,
            "isready" => self.handle_isready()?,
            "setoption" => self.handle_setoption(&parts)?,
            "register" => {}
            "ucinewgame" => self.handle_ucinewgame(),
            "position" => self.handle_position(&parts)?,
            "go" => self.handle_go(&parts)?,
            "stop" => self.cancel_search(),
            "ponderhit" => self.send("info string Ponderhit received"),
            "quit" => {
                self.cancel_search();
                self.phase = SessionPhase::Stopped;
            }
            other => {
                return Err(EngineError::InvalidCommand(format!(
                    "unknown command '{other}'"
                )))
            }
        }
        Ok(())
    }

    fn handle_uci(&self) {
        self.send(format!("id name {}", self.config.engine_name));
        self.send(format!("id author {}", self.config.author));
        for (name, option) in &self.options {
            self.send(option.option_line(name));
        }
        self.send("uciok");
    }

    fn handle_debug(&mut self, parts: &[&str]) -> Result<()> {
        match parts[1..] {
            ["on"] => self.debug = true,
            ["off"] => self.debug = false,
            _ => {
                return Err(EngineError::InvalidCommand(
                    "debug expects 'on' or 'off'".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn handle_isready(&mut self) -> Result<()> {
        if !self.is_searching() {
            self.apply_pending()?;
            if self.phase == SessionPhase::Idle {
                self.phase = SessionPhase::Ready;
            }
        }
        self.send("readyok");
        Ok(())
    }

    fn handle_setoption(&mut self, parts: &[&str]) -> Result<()> {
        // setoption name <name...> [value <value...>]
        if parts.get(1) != Some(&"name") {
            return Err(EngineError::InvalidCommand(
                "setoption requires 'name'".to_string(),
            ));
        }
        let mut name_parts = Vec::new();
        let mut value_parts = Vec::new();
        let mut in_value = false;
        for &part in &parts[2..] {
            if part == "value" && !in_value {
                in_value = true;
            } else if in_value {
                value_parts.push(part);
            } else {
                name_parts.push(part);
            }
        }
        let name = name_parts.join(" ");
        let value = value_parts.join(" ");
        self.set_option(&name, &value)
    }

    /// Validate and store an option, queueing any evaluator effect
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let (key, option) = self
            .options
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownOption(name.to_string()))?;
        option.set(key, value)?;

        match (key.as_str(), &*option) {
            ("Hash", UciOption::Spin { value, .. }) => {
                self.pending.cache_capacity = Some(entries_for_megabytes(*value as usize));
            }
            ("Clear Hash", _) => self.pending.clear_cache = true,
            ("NNUE Weight", UciOption::Spin { value, .. }) => {
                self.pending.blend = Some(BlendWeights::from_percent(*value as u32));
            }
            _ => {}
        }
        tracing::debug!(option = %key, value, "option set");
        if self.debug {
            let line = format!("info string {key} set to {}", option.value_string());
            self.send(line);
        }
        Ok(())
    }

    fn handle_ucinewgame(&mut self) {
        self.cancel_search();
        self.rules.reset();
        self.setup = PositionSetup::Startpos;
        self.moves.clear();
        self.send("info string New game started");
    }

    fn handle_position(&mut self, parts: &[&str]) -> Result<()> {
        self.cancel_search();
        let moves_index = parts.iter().position(|&p| p == "moves");
        let (setup, position) = match parts.get(1) {
            Some(&"startpos") => (PositionSetup::Startpos, Position::startpos()),
            Some(&"fen") => {
                let end = moves_index.unwrap_or(parts.len());
                let fen = parts[2..end].join(" ");
                if fen.is_empty() {
                    return Err(EngineError::InvalidCommand(
                        "position fen requires a FEN string".to_string(),
                    ));
                }
                let position = Position::from_fen(&fen)?;
                (PositionSetup::Fen(fen), position)
            }
            _ => {
                return Err(EngineError::InvalidCommand(
                    "position requires 'startpos' or 'fen'".to_string(),
                ))
            }
        };

        self.rules.set_position(position);
        self.setup = setup;
        self.moves.clear();
        self.phase = SessionPhase::PositionSet;

        // Replay stops at the first bad move, keeping what was applied
        if let Some(index) = moves_index {
            for token in &parts[index + 1..] {
                let mv = parse_move(token)?;
                if !self.rules.make_move(mv) {
                    return Err(EngineError::IllegalMove(token.to_string()));
                }
                self.moves.push(mv);
            }
        }
        if self.debug {
            self.send(format!(
                "info string position {} after {} moves",
                self.rules.position(),
                self.moves.len()
            ));
        }
        Ok(())
    }

    fn handle_go(&mut self, parts: &[&str]) -> Result<()> {
        self.cancel_search();
        let params = GoParams::parse(&parts[1..])?;
        for argument in &params.ignored {
            self.send(format!("info string Ignored go argument: {argument}"));
        }
        self.apply_pending()?;
        let limits = params.limits(
            self.rules.current_turn(),
            self.config.default_depth,
            self.config.clock_divisor,
        );
        tracing::debug!(?params, ?limits, "starting search");
        self.start_search(limits)?;
        self.phase = SessionPhase::Searching;
        Ok(())
    }

    fn start_search(&mut self, limits: SearchLimits) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = channel::bounded(1);
        let rules = self.rules.clone();
        let evaluator = Arc::clone(&self.evaluator);
        let out = self.out.clone();
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("search".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut guard = evaluator.lock().unwrap_or_else(PoisonError::into_inner);
                    let mut search = TacticalSearch::new(limits, flag, &mut *guard);
                    search.run(&rules, |info| {
                        let _ = out.send(info.to_string());
                    })
                }));
                match outcome {
                    Ok(result) => {
                        let best = result
                            .best_move
                            .map_or_else(|| "(none)".to_string(), |mv| mv.to_string());
                        let _ = out.send(format!("bestmove {best}"));
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(%message, "search panicked");
                        let _ = out.send(format!("info string Search error: {message}"));
                        let _ = out.send("bestmove (none)".to_string());
                    }
                }
                let _ = done_tx.send(());
            })
            .map_err(|e| EngineError::SearchError(format!("cannot spawn search thread: {e}")))?;

        self.search = Some(SearchHandle {
            stop,
            done: done_rx,
            thread,
        });
        Ok(())
    }

    /// Raise the stop flag and wait, bounded, for the search to report back
    fn cancel_search(&mut self) {
        let Some(handle) = self.search.take() else {
            return;
        };
        handle.stop.store(true, Ordering::SeqCst);
        match handle.done.recv_timeout(self.config.stop_timeout()) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.thread.join().is_err() {
                    tracing::warn!("search thread ended abnormally");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = self.config.stop_timeout_ms,
                    "search did not stop in time, detaching"
                );
            }
        }
        if self.phase == SessionPhase::Searching {
            self.phase = SessionPhase::Idle;
        }
    }

    fn apply_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let mut evaluator = self.lock_evaluator();
        if let Some(capacity) = pending.cache_capacity {
            evaluator.resize_cache(capacity);
        }
        if pending.clear_cache {
            evaluator.clear_cache();
        }
        if let Some(blend) = pending.blend {
            evaluator.set_blend_weights(blend)?;
        }
        tracing::debug!(stats = ?evaluator.cache_stats(), "applied option changes");
        Ok(())
    }

    fn lock_evaluator(&self) -> MutexGuard<'_, PositionEvaluator> {
        self.evaluator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, line: impl Into<String>) {
        let _ = self.out.send(line.into());
    }

    /// Current value of an option, matched case-insensitively
    pub fn option_value(&self, name: &str) -> Option<String> {
        self.options
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, option)| option.value_string())
    }

    pub fn is_searching(&self) -> bool {
        self.search
            .as_ref()
            .is_some_and(|handle| !handle.thread.is_finished())
    }

    pub fn phase(&self) -> SessionPhase {
        if self.phase == SessionPhase::Searching && !self.is_searching() {
            SessionPhase::Idle
        } else {
            self.phase
        }
    }

    pub fn position(&self) -> Position {
        self.rules.position()
    }

    pub fn position_setup(&self) -> &PositionSetup {
        &self.setup
    }

    /// Moves replayed by the last `position` command
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Evaluator cache statistics. Blocks while a search holds the evaluator.
    pub fn cache_stats(&self) -> CacheStats {
        self.lock_evaluator().cache_stats()
    }

    pub fn blend_weights(&self) -> BlendWeights {
        self.lock_evaluator().blend_weights()
    }
}

impl<R: RulesEngine + Clone + 'static> Drop for UciSession<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.search.take() {
            handle.stop.store(true, Ordering::SeqCst);
        }
    }
}

fn default_options(config: &EngineConfig) -> BTreeMap<String, UciOption> {
    let mut options = BTreeMap::new();
    let hash = config.hash_mb.clamp(1, MAX_HASH_MB) as i32;
    options.insert("Hash".to_string(), UciOption::spin(hash, 1, MAX_HASH_MB as i32));
    options.insert("Threads".to_string(), UciOption::spin(1, 1, 128));
    options.insert("MultiPV".to_string(), UciOption::spin(1, 1, 5));
    options.insert("Contempt".to_string(), UciOption::spin(0, -100, 100));
    options.insert("Skill Level".to_string(), UciOption::spin(20, 0, 20));
    options.insert("Ponder".to_string(), UciOption::check(false));
    options.insert("UCI_AnalyseMode".to_string(), UciOption::check(false));
    options.insert(
        "NNUE Weight".to_string(),
        UciOption::spin(config.evaluator.blend.nnue_percent() as i32, 0, 100),
    );
    options.insert("Clear Hash".to_string(), UciOption::Button);
    options
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "search panicked".to_string()
    }
}
