//! Battle replay benchmarks for breach_core.
//!
//! The evaluator runs many full replays inside a live turn's deadline, so
//! the replay itself is the number that matters.
//!
//! Run with: `cargo bench -p breach_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use breach_core::prelude::*;
use breach_test_utils::fixtures::{empty_board, enemy_wall_row, stack_walkers};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn contested_board() -> BoardSnapshot {
    let mut board = empty_board();
    enemy_wall_row(&mut board, 14, 4, 23);
    board
        .place_unit(Side::Enemy, UnitKind::Turret, false, Coord::new(24, 15), None)
        .unwrap();
    board
        .place_unit(Side::Enemy, UnitKind::Turret, false, Coord::new(3, 15), None)
        .unwrap();
    board
        .place_unit(Side::Friendly, UnitKind::Support, false, Coord::new(13, 4), None)
        .unwrap();
    stack_walkers(&mut board, UnitKind::Scout, Coord::new(13, 0), 8);
    stack_walkers(&mut board, UnitKind::Demolisher, Coord::new(14, 0), 3);
    board
}

/// Runs simulation benchmarks for the breach_core crate.
pub fn battle_benchmark(c: &mut Criterion) {
    let board = contested_board();
    c.bench_function("contested_battle_replay", |b| {
        b.iter(|| simulate(black_box(board.clone())))
    });

    let base = {
        let mut board = empty_board();
        enemy_wall_row(&mut board, 14, 10, 20);
        board.set_resources(Side::Friendly, Fixed::from_num(0), Fixed::from_num(30));
        board
    };
    type Plan = fn(&mut BoardSnapshot, &());
    let plans: Vec<Plan> = vec![
        |board, _| {
            board.attempt_spawn(UnitKind::Scout, Coord::new(13, 0), 10);
        },
        |board, _| {
            board.attempt_spawn(UnitKind::Demolisher, Coord::new(20, 6), 5);
        },
        |board, _| {
            board.attempt_spawn(UnitKind::Demolisher, Coord::new(7, 6), 2);
            board.attempt_spawn(UnitKind::Scout, Coord::new(13, 0), 8);
        },
    ];
    let config = EvaluatorConfig::default();
    c.bench_function("evaluate_three_waves", |b| {
        b.iter(|| {
            evaluate(
                black_box(&base),
                &plans,
                &(),
                score_then_damage(0, Fixed::from_num(1000)),
                &config,
            )
        })
    });
}

criterion_group!(benches, battle_benchmark);
criterion_main!(benches);
