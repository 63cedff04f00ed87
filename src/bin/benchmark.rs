use maestro_chess_engine::{
    BasicRules, BitboardMoveGenerator, EvaluatorConfig, NetworkConfig, Position,
    PositionEvaluator, RulesEngine, SearchLimits, TacticalSearch,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R w KQkq - 0 5",
];

fn main() {
    println!("Maestro Chess Engine Benchmark");
    println!("==============================");

    let positions: Vec<Position> = BENCH_POSITIONS
        .iter()
        .filter_map(|fen| Position::from_fen(fen).ok())
        .collect();
    let generator = BitboardMoveGenerator::new();

    // Benchmark 1: Pseudo-legal move generation
    println!("\n=== Move Generation Benchmark ===");
    let iterations = 100_000u32;
    let start = Instant::now();
    let mut generated = 0usize;
    for _ in 0..iterations {
        for position in &positions {
            generated += generator
                .pseudo_legal_moves(&position.board, position.side_to_move)
                .len();
        }
    }
    let elapsed = start.elapsed();
    let calls = iterations as usize * positions.len();
    println!("Generated {generated} moves in {calls} calls ({elapsed:?})");
    println!(
        "Generation rate: {:.0} positions/second",
        calls as f64 / elapsed.as_secs_f64()
    );

    // Benchmark 2: Perft through the rules collaborator
    println!("\n=== Perft Benchmark ===");
    for depth in 1..=4 {
        let rules = BasicRules::new();
        let start = Instant::now();
        let nodes = rules.perft(depth);
        let elapsed = start.elapsed();
        println!(
            "  Depth {depth}: {nodes} nodes in {elapsed:?} ({:.0} nodes/second)",
            nodes as f64 / elapsed.as_secs_f64()
        );
    }

    // Benchmark 3: Evaluation with and without the cache
    println!("\n=== Evaluation Benchmark ===");
    let mut evaluator = match PositionEvaluator::new(EvaluatorConfig::default()) {
        Ok(evaluator) => evaluator,
        Err(e) => {
            eprintln!("Failed to create evaluator: {e}");
            return;
        }
    };
    println!(
        "Network parameters: {}",
        evaluator.network().parameter_count()
    );

    let eval_iterations = 2_000u32;
    let start = Instant::now();
    for _ in 0..eval_iterations {
        for position in &positions {
            let _score = evaluator.evaluate_breakdown(&position.board, position.side_to_move);
        }
    }
    let uncached = start.elapsed();
    let evals = eval_iterations as usize * positions.len();
    println!(
        "Uncached: {evals} evaluations in {uncached:?} ({:?} each)",
        uncached / evals as u32
    );

    let start = Instant::now();
    for _ in 0..eval_iterations {
        for position in &positions {
            let _score = evaluator.evaluate(&position.board, position.side_to_move);
        }
    }
    let cached = start.elapsed();
    let stats = evaluator.cache_stats();
    println!(
        "Cached:   {evals} evaluations in {cached:?} ({:?} each)",
        cached / evals as u32
    );
    println!(
        "  Cache: {} hits, {} misses, {:.1}% hit rate, {}/{} entries",
        stats.hits,
        stats.misses,
        stats.hit_rate(),
        stats.size,
        stats.capacity
    );
    println!(
        "  Speedup: {:.1}x",
        uncached.as_secs_f64() / cached.as_secs_f64().max(f64::EPSILON)
    );

    // Benchmark 4: Fixed-depth search along a random game
    println!("\n=== Search Benchmark ===");
    let mut compact = match PositionEvaluator::new(EvaluatorConfig {
        network: NetworkConfig::compact(),
        ..Default::default()
    }) {
        Ok(evaluator) => evaluator,
        Err(e) => {
            eprintln!("Failed to create evaluator: {e}");
            return;
        }
    };
    let mut rng = StdRng::seed_from_u64(7);
    let mut rules = BasicRules::new();
    for ply in 0..6 {
        let stop = Arc::new(AtomicBool::new(false));
        let mut search = TacticalSearch::new(SearchLimits::depth(3), stop, &mut compact);
        let result = search.run(&rules, |_| {});
        println!(
            "  Ply {ply}: best {} eval {:+.2} depth {} nodes {} in {:?}",
            result
                .best_move
                .map_or_else(|| "(none)".to_string(), |mv| mv.to_string()),
            result.evaluation,
            result.depth_reached,
            result.nodes_searched,
            result.time_elapsed
        );

        let moves = rules.legal_moves();
        match moves.choose(&mut rng) {
            Some(&mv) => rules.apply_legal_move(mv),
            None => break,
        }
    }

    println!("\nBenchmark complete.");
}
