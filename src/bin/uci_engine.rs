use clap::{Arg, ArgAction, Command};
use crossbeam::channel;
use maestro_chess_engine::{BasicRules, EngineConfig, UciSession};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing_subscriber::EnvFilter;

/// UCI chess engine binary
///
/// Speaks the UCI protocol on stdin/stdout and can be added to any
/// UCI-compatible GUI (Arena, Cute Chess, Scid vs. PC, BanksiaGUI, ...).
/// Logs go to stderr so they never mix with protocol output.
///
/// Usage:
/// 1. Compile: `cargo build --release --bin uci_engine`
/// 2. Add the resulting binary to your chess GUI as a new engine
/// 3. Optional: `--config engine.json`, `--depth 8`, `--log-level debug`
///
/// UCI Options:
/// - Hash: Evaluation cache size in MB (1-1024, default 64)
/// - Threads: Accepted for GUI compatibility (1-128, default 1)
/// - MultiPV: Accepted for GUI compatibility (1-5, default 1)
/// - Contempt: Draw contempt in centipawns (-100-100, default 0)
/// - Skill Level: 0-20, default 20
/// - Ponder / UCI_AnalyseMode: true/false, default false
/// - NNUE Weight: Share of the network in the blended score (0-100, default 80)
/// - Clear Hash: Empty the evaluation cache
fn main() -> ExitCode {
    let matches = Command::new("uci_engine")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Chess Engine Team")
        .about("Maestro Chess Engine speaking UCI on stdin/stdout")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON engine configuration")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("depth")
                .short('d')
                .long("depth")
                .value_name("DEPTH")
                .help("Default search depth for 'go' without limits")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("nnue-weights")
                .short('w')
                .long("nnue-weights")
                .value_name("PATH")
                .help("Network weights saved by AccumulatorNetwork::save")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log filter written to stderr (overrides RUST_LOG)"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Start with UCI debug output enabled")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let filter = match matches.get_one::<String>("log-level") {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => match EngineConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(&depth) = matches.get_one::<u32>("depth") {
        config.default_depth = depth;
    }
    if let Some(path) = matches.get_one::<PathBuf>("nnue-weights") {
        config.evaluator.weights_path = Some(path.clone());
    }
    if matches.get_flag("debug") {
        config.debug = true;
    }

    let (tx, rx) = channel::unbounded::<String>();
    let writer = thread::spawn(move || {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        for line in rx {
            if writeln!(stdout, "{line}").and_then(|_| stdout.flush()).is_err() {
                break;
            }
        }
    });

    let mut session = match UciSession::new(config, BasicRules::new(), tx) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to start engine: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "uci engine started");

    let result = session.run(io::stdin().lock());
    // Dropping the session drops the last sender and lets the writer finish
    drop(session);
    let _ = writer.join();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "uci loop ended with an error");
            ExitCode::FAILURE
        }
    }
}
