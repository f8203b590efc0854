//! Route resolution for mobile units.
//!
//! This reproduces the live engine's pathing exactly, because every
//! downstream prediction desyncs silently if a single tie-break differs:
//!
//! 1. **Idealness search** - breadth-first over unblocked cells from the
//!    origin, scoring each reachable cell by how far it sits toward the
//!    target edge; an actual edge cell is infinitely ideal.
//! 2. **Validation** - breadth-first back from the most ideal cell (or the
//!    whole edge, if it was reached), labelling every cell with its path
//!    length.
//! 3. **Walk** - from the origin, repeatedly step to the neighbor with the
//!    lowest path length, breaking ties by the zigzag rule (prefer changing
//!    axis; the first move prefers vertical) and then by movement toward
//!    the target edge.
//!
//! Only stationary units block. Mobile units stack and never obstruct each
//! other. An empty result means the origin itself is blocked; a single-cell
//! result means the unit is boxed in and will self-destruct.

use std::collections::{HashMap, VecDeque};

use crate::board::{in_arena_bounds, BoardSnapshot, ARENA_SIZE};
use crate::math::Coord;
use crate::unit::TargetEdge;

const CELL_COUNT: usize = (ARENA_SIZE * ARENA_SIZE) as usize;
const UNSET: u16 = u16::MAX;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MoveDirection {
    None,
    Horizontal,
    Vertical,
}

#[inline]
fn index(cell: Coord) -> usize {
    (cell.y * ARENA_SIZE + cell.x) as usize
}

/// Obstruction-aware route resolver for one stationary landscape.
///
/// Build one per obstruction generation via [`PathResolver::for_board`];
/// the frame stepper rebuilds it only when a structure appears or dies.
#[derive(Debug, Clone)]
pub struct PathResolver {
    blocked: Vec<bool>,
}

impl PathResolver {
    /// Capture the blocked-cell landscape of a board: every live
    /// stationary unit obstructs its cell.
    #[must_use]
    pub fn for_board(board: &BoardSnapshot) -> Self {
        let mut blocked = vec![false; CELL_COUNT];
        for unit in board.units() {
            if unit.active && unit.is_stationary() {
                blocked[index(unit.pos)] = true;
            }
        }
        Self { blocked }
    }

    /// A resolver with an explicit blocked set, for route analysis outside
    /// a board context.
    #[must_use]
    pub fn with_blocked(cells: &[Coord]) -> Self {
        let mut blocked = vec![false; CELL_COUNT];
        for &cell in cells {
            if in_arena_bounds(cell) {
                blocked[index(cell)] = true;
            }
        }
        Self { blocked }
    }

    #[inline]
    fn is_blocked(&self, cell: Coord) -> bool {
        self.blocked[index(cell)]
    }

    /// Every cell a unit at `start` will occupy walking toward `edge`,
    /// starting with `start` itself.
    ///
    /// Returns an empty route if `start` is out of bounds or blocked, and a
    /// route that never reaches `edge` if the unit is walled off (it ends
    /// at the most edge-ward reachable cell, where the unit self-destructs).
    #[must_use]
    pub fn resolve(&self, start: Coord, edge: TargetEdge) -> Vec<Coord> {
        if !in_arena_bounds(start) || self.is_blocked(start) {
            return Vec::new();
        }

        let end_points = edge.cells();
        let mut edge_mask = vec![false; CELL_COUNT];
        for &cell in &end_points {
            edge_mask[index(cell)] = true;
        }

        let most_ideal = self.idealness_search(start, edge, &edge_mask);
        let pathlength = self.validate(most_ideal, &end_points, &edge_mask);
        self.walk(start, edge, &pathlength)
    }

    /// Breadth-first reachability from `start`, tracking the most ideal
    /// reachable cell.
    fn idealness_search(&self, start: Coord, edge: TargetEdge, edge_mask: &[bool]) -> Coord {
        let mut visited = vec![false; CELL_COUNT];
        let mut queue = VecDeque::new();
        visited[index(start)] = true;
        queue.push_back(start);

        let mut best = idealness(start, edge, edge_mask);
        let mut most_ideal = start;

        while let Some(cell) = queue.pop_front() {
            for neighbor in cell.neighbors() {
                if !in_arena_bounds(neighbor) || self.is_blocked(neighbor) {
                    continue;
                }
                let ideal = idealness(neighbor, edge, edge_mask);
                if ideal > best {
                    best = ideal;
                    most_ideal = neighbor;
                }
                if !visited[index(neighbor)] {
                    visited[index(neighbor)] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        most_ideal
    }

    /// Label every cell reachable from the destination with its path
    /// length. If the ideal cell is on the target edge, the whole edge
    /// seeds at zero so the walk may finish on any of its cells.
    fn validate(&self, most_ideal: Coord, end_points: &[Coord], edge_mask: &[bool]) -> Vec<u16> {
        let mut pathlength = vec![UNSET; CELL_COUNT];
        let mut queue = VecDeque::new();

        if edge_mask[index(most_ideal)] {
            for &cell in end_points {
                pathlength[index(cell)] = 0;
                queue.push_back(cell);
            }
        } else {
            pathlength[index(most_ideal)] = 0;
            queue.push_back(most_ideal);
        }

        while let Some(cell) = queue.pop_front() {
            // Blocked edge cells seed at zero but never spread.
            if self.is_blocked(cell) {
                continue;
            }
            let next = pathlength[index(cell)] + 1;
            for neighbor in cell.neighbors() {
                if !in_arena_bounds(neighbor)
                    || self.is_blocked(neighbor)
                    || pathlength[index(neighbor)] != UNSET
                {
                    continue;
                }
                pathlength[index(neighbor)] = next;
                queue.push_back(neighbor);
            }
        }

        pathlength
    }

    /// Descend the path-length field from `start`, applying the engine's
    /// tie-break rules at every step.
    fn walk(&self, start: Coord, edge: TargetEdge, pathlength: &[u16]) -> Vec<Coord> {
        let mut path = vec![start];
        if pathlength[index(start)] == UNSET {
            debug_assert!(false, "origin unreachable from its own ideal cell");
            return path;
        }

        let mut current = start;
        let mut move_direction = MoveDirection::None;

        while pathlength[index(current)] != 0 {
            let mut ideal_neighbor = current;
            let mut best_pathlength = pathlength[index(current)];

            for neighbor in current.neighbors() {
                if !in_arena_bounds(neighbor)
                    || self.is_blocked(neighbor)
                    || pathlength[index(neighbor)] == UNSET
                {
                    continue;
                }

                let mut new_best = false;
                let length = pathlength[index(neighbor)];
                if length > best_pathlength {
                    continue;
                }
                if length < best_pathlength {
                    new_best = true;
                }

                if !new_best
                    && !better_direction(current, neighbor, ideal_neighbor, move_direction, edge)
                {
                    continue;
                }

                ideal_neighbor = neighbor;
                best_pathlength = length;
            }

            if ideal_neighbor == current {
                break;
            }
            move_direction = if current.x == ideal_neighbor.x {
                MoveDirection::Vertical
            } else {
                MoveDirection::Horizontal
            };
            path.push(ideal_neighbor);
            current = ideal_neighbor;
        }

        path
    }
}

/// Edge-directed desirability of a cell. Higher is better; a cell on the
/// target edge beats everything.
fn idealness(cell: Coord, edge: TargetEdge, edge_mask: &[bool]) -> u32 {
    if edge_mask[index(cell)] {
        return u32::MAX;
    }
    let (dx, dy) = edge.direction();
    let x_term = if dx == 1 { cell.x } else { ARENA_SIZE - 1 - cell.x };
    let y_term = if dy == 1 { cell.y } else { ARENA_SIZE - 1 - cell.y };
    (ARENA_SIZE * y_term + x_term) as u32
}

/// The engine's tie-break between two equal-length next steps.
///
/// Units zigzag: after a horizontal move they prefer vertical and vice
/// versa, and the very first move prefers vertical. When both options stay
/// on the same axis, the one moving toward the target edge wins.
fn better_direction(
    prev: Coord,
    new: Coord,
    prev_best: Coord,
    move_direction: MoveDirection,
    edge: TargetEdge,
) -> bool {
    match move_direction {
        MoveDirection::Horizontal if new.x != prev_best.x => {
            return new.y != prev.y;
        }
        MoveDirection::Vertical if new.y != prev_best.y => {
            return new.x != prev.x;
        }
        MoveDirection::None => {
            return new.y != prev.y;
        }
        _ => {}
    }

    let (dx, dy) = edge.direction();
    if new.y == prev_best.y {
        return (dx == 1 && new.x > prev_best.x) || (dx == -1 && new.x < prev_best.x);
    }
    if new.x == prev_best.x {
        return (dy == 1 && new.y > prev_best.y) || (dy == -1 && new.y < prev_best.y);
    }
    true
}

/// Route memo for one simulated battle.
///
/// Stacked units walking from the same cell toward the same edge share one
/// resolution - the dominant cost of the whole simulator is pathfinding, so
/// the cache is keyed exactly by `(origin, edge)` and invalidated wholesale
/// when the obstruction generation moves.
#[derive(Debug, Default)]
pub struct PathCache {
    generation: u64,
    entries: HashMap<(Coord, TargetEdge), Vec<Coord>>,
}

impl PathCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The route from `start` toward `edge` under `generation`, resolving
    /// and memoizing on miss. A generation change drops every entry.
    pub fn path_for(
        &mut self,
        resolver: &PathResolver,
        generation: u64,
        start: Coord,
        edge: TargetEdge,
    ) -> Vec<Coord> {
        if generation != self.generation {
            self.entries.clear();
            self.generation = generation;
        }
        self.entries
            .entry((start, edge))
            .or_insert_with(|| resolver.resolve(start, edge))
            .clone()
    }

    /// Number of memoized routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
