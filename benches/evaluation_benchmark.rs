use criterion::{black_box, criterion_group, criterion_main, Criterion};
use maestro_chess_engine::{
    EvaluatorConfig, Position, PositionEvaluator, SearchLimits, TacticalSearch,
    TraditionalEvaluator,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn positions() -> Vec<Position> {
    let fens = vec![
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", // Starting position
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2", // King's pawn opening
        "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R b KQkq - 0 4", // Middle game
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",                 // Endgame position
    ];
    fens.iter()
        .map(|fen| Position::from_fen(fen).expect("Valid FEN"))
        .collect()
}

fn benchmark_evaluation(c: &mut Criterion) {
    let positions = positions();

    c.bench_function("traditional_evaluation", |b| {
        let evaluator = TraditionalEvaluator::default();
        b.iter(|| {
            for position in &positions {
                black_box(evaluator.evaluate(&position.board, position.side_to_move));
            }
        })
    });

    // Fresh network pass on every call
    c.bench_function("blended_evaluation_without_cache", |b| {
        let evaluator = PositionEvaluator::new(EvaluatorConfig::default()).expect("evaluator");
        b.iter(|| {
            for position in &positions {
                black_box(evaluator.evaluate_breakdown(&position.board, position.side_to_move));
            }
        })
    });

    c.bench_function("blended_evaluation_with_cache", |b| {
        let mut evaluator = PositionEvaluator::new(EvaluatorConfig::default()).expect("evaluator");
        b.iter(|| {
            for position in &positions {
                black_box(evaluator.evaluate(&position.board, position.side_to_move));
            }
        })
    });
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);
    group.bench_function("startpos_depth_3", |b| {
        let mut evaluator = PositionEvaluator::new(EvaluatorConfig::default()).expect("evaluator");
        let rules = maestro_chess_engine::BasicRules::new();
        b.iter(|| {
            evaluator.clear_cache();
            let stop = Arc::new(AtomicBool::new(false));
            let mut search = TacticalSearch::new(SearchLimits::depth(3), stop, &mut evaluator);
            black_box(search.run(&rules, |_| {}))
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_evaluation, benchmark_search);
criterion_main!(benches);
