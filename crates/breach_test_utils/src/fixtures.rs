//! Test fixtures and helpers.
//!
//! Pre-built boards and spawn shorthands for consistent testing.

use std::sync::Arc;

use breach_core::prelude::*;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// An empty board under the default season rules.
#[must_use]
pub fn empty_board() -> BoardSnapshot {
    BoardSnapshot::new(Arc::new(GameRules::default()))
}

/// An empty board under a mutated copy of the season rules.
#[must_use]
pub fn board_with_rules(mutate: impl FnOnce(&mut GameRules)) -> BoardSnapshot {
    let mut rules = GameRules::default();
    mutate(&mut rules);
    BoardSnapshot::new(Arc::new(rules))
}

/// Stack `count` friendly walkers of one kind on a spawn cell, bypassing
/// cost checks.
pub fn stack_walkers(board: &mut BoardSnapshot, kind: UnitKind, cell: Coord, count: u32) {
    assert!(kind.is_mobile(), "stack_walkers is for mobile kinds");
    let edge = if TargetEdge::BottomLeft.contains(cell) {
        TargetEdge::TopRight
    } else {
        TargetEdge::TopLeft
    };
    for _ in 0..count {
        board
            .place_unit(Side::Friendly, kind, false, cell, Some(edge))
            .expect("walker spawn cell is valid");
    }
}

/// Run an enemy wall line along a row between two columns, inclusive.
pub fn enemy_wall_row(board: &mut BoardSnapshot, y: i32, x_from: i32, x_to: i32) {
    for x in x_from..=x_to {
        let cell = Coord::new(x, y);
        if in_arena_bounds(cell) {
            board
                .place_unit(Side::Enemy, UnitKind::Wall, false, cell, None)
                .expect("wall cell is free");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_board_is_empty_and_funded() {
        let board = empty_board();
        assert!(board.units().is_empty());
        assert!(board.mobile_points(Side::Friendly) > fixed(0));
    }

    #[test]
    fn test_stack_walkers_share_a_cell() {
        let mut board = empty_board();
        stack_walkers(&mut board, UnitKind::Scout, Coord::new(13, 0), 4);
        assert_eq!(board.units().len(), 4);
        assert!(board.units().iter().all(|u| u.pos == Coord::new(13, 0)));
    }
}
