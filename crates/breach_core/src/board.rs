//! Board snapshot: unit roster, arena geometry, resources, and the
//! deployment mutation primitives candidate plans act through.
//!
//! A snapshot is owned exclusively by one simulation run. The evaluator
//! deep-copies it per candidate; nothing here is shared mutable state.
//!
//! # Determinism
//!
//! All queries iterate the roster in deployment order. Target selection
//! reproduces the engine's published cascade exactly; there is no hashing
//! or randomness anywhere in the selection path.

use std::sync::Arc;

use crate::config::GameRules;
use crate::math::{Coord, Fixed};
use crate::pathfinding::PathResolver;
use crate::unit::{Side, TargetEdge, Unit, UnitId, UnitKind};

/// Width and height of the diamond arena's bounding square.
pub const ARENA_SIZE: i32 = 28;

/// Row index splitting the friendly and enemy halves.
pub const HALF_ARENA: i32 = 14;

/// Whether a cell lies inside the diamond arena.
#[must_use]
pub const fn in_arena_bounds(cell: Coord) -> bool {
    let (x, y) = (cell.x, cell.y);
    if x < 0 || y < 0 || x >= ARENA_SIZE || y >= ARENA_SIZE {
        return false;
    }
    if y < HALF_ARENA {
        let row = y + 1;
        x >= HALF_ARENA - row && x <= HALF_ARENA + row - 1
    } else {
        let row = ARENA_SIZE - y;
        x >= HALF_ARENA - row && x <= HALF_ARENA + row - 1
    }
}

/// Full board state for one hypothetical timeline branch.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    rules: Arc<GameRules>,
    units: Vec<Unit>,
    next_unit_id: UnitId,
    structure_points: [Fixed; 2],
    mobile_points: [Fixed; 2],
    obstruction_generation: u64,
}

impl BoardSnapshot {
    /// Create an empty board with each side's starting resources.
    #[must_use]
    pub fn new(rules: Arc<GameRules>) -> Self {
        let sp = rules.starting_structure_points;
        let mp = rules.starting_mobile_points;
        Self {
            rules,
            units: Vec::new(),
            next_unit_id: 0,
            structure_points: [sp; 2],
            mobile_points: [mp; 2],
            obstruction_generation: 0,
        }
    }

    /// The rule configuration this board was built against.
    #[must_use]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// All units in deployment order, including pending-dead ones awaiting
    /// cleanup.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub(crate) fn units_mut(&mut self) -> &mut Vec<Unit> {
        &mut self.units
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Structure points available to a side.
    #[must_use]
    pub fn structure_points(&self, side: Side) -> Fixed {
        self.structure_points[side.index()]
    }

    /// Mobile points available to a side.
    #[must_use]
    pub fn mobile_points(&self, side: Side) -> Fixed {
        self.mobile_points[side.index()]
    }

    /// Overwrite a side's resource pools.
    ///
    /// The collaborator layer calls this when reconstructing a live turn,
    /// where the engine reports the authoritative totals.
    pub fn set_resources(&mut self, side: Side, structure: Fixed, mobile: Fixed) {
        self.structure_points[side.index()] = structure;
        self.mobile_points[side.index()] = mobile;
    }

    /// Counter bumped whenever the stationary landscape changes. The frame
    /// stepper re-resolves paths when it observes a new value.
    #[must_use]
    pub const fn obstruction_generation(&self) -> u64 {
        self.obstruction_generation
    }

    pub(crate) fn mark_obstructions_dirty(&mut self) {
        self.obstruction_generation += 1;
    }

    /// The stationary unit occupying a cell, if any. Mobile units never
    /// occupy a cell in this sense; they stack freely.
    #[must_use]
    pub fn structure_at(&self, cell: Coord) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.active && u.is_stationary() && u.pos == cell)
    }

    /// Place a unit directly, bypassing cost and ownership checks.
    ///
    /// This is the reconstruction primitive: the collaborator layer uses it
    /// to mirror the engine's reported board, and tests use it to build
    /// hypothetical positions for either side. Returns `None` if the cell
    /// is out of bounds, a stationary cell is already occupied, or a mobile
    /// kind arrives without a target edge.
    pub fn place_unit(
        &mut self,
        side: Side,
        kind: UnitKind,
        upgraded: bool,
        cell: Coord,
        target_edge: Option<TargetEdge>,
    ) -> Option<UnitId> {
        if !in_arena_bounds(cell) {
            return None;
        }
        if kind.is_stationary() {
            if self.structure_at(cell).is_some() {
                return None;
            }
        } else if target_edge.is_none() {
            return None;
        }

        let id = self.next_unit_id;
        self.next_unit_id += 1;
        let rules = Arc::clone(&self.rules);
        self.units
            .push(Unit::new(id, side, kind, upgraded, cell, target_edge, &rules));
        if kind.is_stationary() {
            self.mark_obstructions_dirty();
        }
        Some(id)
    }

    /// How many units of a kind the friendly side can currently afford.
    #[must_use]
    pub fn number_affordable(&self, kind: UnitKind) -> u32 {
        let cost = self.rules.stats(kind, false).cost;
        if cost <= Fixed::ZERO {
            return u32::MAX;
        }
        let pool = if kind.is_stationary() {
            self.structure_points(Side::Friendly)
        } else {
            self.mobile_points(Side::Friendly)
        };
        (pool / cost).to_num::<i64>().max(0) as u32
    }

    /// Attempt to deploy `count` units of a kind at a cell for the friendly
    /// side, spending resources. Returns how many were actually placed;
    /// zero is a normal outcome plans must expect, never an error.
    ///
    /// Stationary kinds go anywhere unoccupied on the friendly half, at
    /// most one per cell. Mobile kinds deploy only on the friendly edge
    /// cells and are committed to the diagonally opposite edge, stacking
    /// freely.
    pub fn attempt_spawn(&mut self, kind: UnitKind, cell: Coord, count: u32) -> u32 {
        let mut placed = 0;
        for _ in 0..count {
            if !self.try_spawn_one(kind, cell) {
                break;
            }
            placed += 1;
        }
        placed
    }

    /// Attempt one spawn per listed cell; returns how many succeeded.
    pub fn attempt_spawn_many(&mut self, kind: UnitKind, cells: &[Coord]) -> u32 {
        cells
            .iter()
            .map(|&cell| self.attempt_spawn(kind, cell, 1))
            .sum()
    }

    fn try_spawn_one(&mut self, kind: UnitKind, cell: Coord) -> bool {
        if !in_arena_bounds(cell) {
            return false;
        }
        let cost = self.rules.stats(kind, false).cost;

        if kind.is_stationary() {
            if cell.y >= HALF_ARENA
                || self.structure_at(cell).is_some()
                || self.structure_points(Side::Friendly) < cost
            {
                return false;
            }
            self.structure_points[Side::Friendly.index()] -= cost;
            self.place_unit(Side::Friendly, kind, false, cell, None)
                .is_some()
        } else {
            let target = if TargetEdge::BottomLeft.contains(cell) {
                TargetEdge::TopRight
            } else if TargetEdge::BottomRight.contains(cell) {
                TargetEdge::TopLeft
            } else {
                return false;
            };
            if self.structure_at(cell).is_some()
                || self.mobile_points(Side::Friendly) < cost
            {
                return false;
            }
            self.mobile_points[Side::Friendly.index()] -= cost;
            self.place_unit(Side::Friendly, kind, false, cell, Some(target))
                .is_some()
        }
    }

    /// Attempt to remove the friendly structure at a cell, crediting the
    /// configured refund fraction of everything paid for it.
    pub fn attempt_remove(&mut self, cell: Coord) -> bool {
        let Some(index) = self
            .units
            .iter()
            .position(|u| u.active && u.is_stationary() && u.pos == cell && u.side == Side::Friendly)
        else {
            return false;
        };
        let unit = self.units.remove(index);
        let mut paid = self.rules.stats(unit.kind, false).cost;
        if unit.upgraded {
            paid += self.rules.stats(unit.kind, true).cost;
        }
        self.structure_points[Side::Friendly.index()] += paid * self.rules.refund_percentage;
        self.mark_obstructions_dirty();
        true
    }

    /// Attempt to upgrade the friendly structure at a cell. Damage already
    /// taken carries over; the health ceiling delta is granted on top.
    pub fn attempt_upgrade(&mut self, cell: Coord) -> bool {
        let Some(index) = self
            .units
            .iter()
            .position(|u| u.active && u.is_stationary() && u.pos == cell)
        else {
            return false;
        };
        let unit = &self.units[index];
        if unit.side != Side::Friendly || unit.upgraded {
            return false;
        }
        let stats = *self.rules.stats(unit.kind, true);
        if self.structure_points(Side::Friendly) < stats.cost {
            return false;
        }
        self.structure_points[Side::Friendly.index()] -= stats.cost;

        let unit = &mut self.units[index];
        let old_max = unit.stats.max_health;
        unit.upgraded = true;
        unit.stats = stats;
        unit.health += stats.max_health - old_max;
        true
    }

    /// Ids of live units within `range` of a cell, in deployment order.
    #[must_use]
    pub fn ids_in_range(&self, center: Coord, range: Fixed) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.active && center.within(u.pos, range))
            .map(|u| u.id)
            .collect()
    }

    /// Select the target an attacker would strike this frame, or `None` if
    /// no valid enemy is in range.
    #[must_use]
    pub fn select_target(&self, attacker: &Unit) -> Option<UnitId> {
        let candidates = self.ids_in_range(attacker.pos, attacker.stats.attack_range);
        self.select_target_from(attacker, &candidates)
    }

    /// Select a target from a pre-filtered candidate list (the attack
    /// phase caches in-range lists per cell; see the simulation module).
    ///
    /// The engine's published cascade: mobile units over stationary, then
    /// nearest, then lowest health, then deepest into the attacker's own
    /// territory, then farthest from the board's center line. Attackers
    /// with zero structure damage never target stationary units; dead or
    /// inactive units are never targets.
    #[must_use]
    pub fn select_target_from(&self, attacker: &Unit, candidates: &[UnitId]) -> Option<UnitId> {
        let mut target: Option<UnitId> = None;
        let mut target_stationary = true;
        let mut target_distance = i64::MAX;
        let mut target_health = Fixed::MAX;
        let mut target_y = ARENA_SIZE;
        let mut target_x_distance = 0;

        for &id in candidates {
            let Some(unit) = self.unit(id) else { continue };
            if unit.side == attacker.side
                || !unit.is_alive()
                || unit.id == attacker.id
                || (attacker.stats.structure_damage == Fixed::ZERO && unit.is_stationary())
            {
                continue;
            }

            let mut new_target = false;
            let stationary = unit.is_stationary();
            let distance = attacker.pos.distance_squared(unit.pos);
            // Distance of the unit's column from the board's center line,
            // doubled to stay integral (center is x = 13.5).
            let x_distance = (2 * unit.pos.x - (ARENA_SIZE - 1)).abs();

            if target_stationary && !stationary {
                new_target = true;
            } else if !target_stationary && stationary {
                continue;
            }

            if distance < target_distance {
                new_target = true;
            } else if distance > target_distance && !new_target {
                continue;
            }

            if unit.health < target_health {
                new_target = true;
            } else if unit.health > target_health && !new_target {
                continue;
            }

            // Deeper into the attacker's territory wins the next tie.
            match attacker.side {
                Side::Friendly => {
                    if unit.pos.y < target_y {
                        new_target = true;
                    } else if unit.pos.y > target_y && !new_target {
                        continue;
                    }
                }
                Side::Enemy => {
                    if unit.pos.y > target_y {
                        new_target = true;
                    } else if unit.pos.y < target_y && !new_target {
                        continue;
                    }
                }
            }

            if x_distance > target_x_distance {
                new_target = true;
            }

            if new_target {
                target = Some(unit.id);
                target_stationary = stationary;
                target_distance = distance;
                target_health = unit.health;
                target_y = unit.pos.y;
                target_x_distance = x_distance;
            }
        }

        target
    }

    /// The route a mobile unit at `cell` would take toward `edge` on the
    /// current obstruction landscape. Strategy code probes routes with this
    /// outside battles; an empty result means the cell itself is blocked.
    #[must_use]
    pub fn find_path_to_edge(&self, cell: Coord, edge: TargetEdge) -> Vec<Coord> {
        PathResolver::for_board(self).resolve(cell, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardSnapshot {
        BoardSnapshot::new(Arc::new(GameRules::default()))
    }

    #[test]
    fn test_arena_bounds_diamond() {
        assert!(in_arena_bounds(Coord::new(13, 0)));
        assert!(in_arena_bounds(Coord::new(14, 0)));
        assert!(!in_arena_bounds(Coord::new(12, 0)));
        assert!(in_arena_bounds(Coord::new(0, 13)));
        assert!(in_arena_bounds(Coord::new(0, 14)));
        assert!(!in_arena_bounds(Coord::new(0, 12)));
        assert!(in_arena_bounds(Coord::new(27, 14)));
        assert!(!in_arena_bounds(Coord::new(28, 14)));
        assert!(!in_arena_bounds(Coord::new(13, -1)));
    }

    #[test]
    fn test_spawn_structure_spends_points() {
        let mut board = board();
        let before = board.structure_points(Side::Friendly);
        assert_eq!(board.attempt_spawn(UnitKind::Wall, Coord::new(13, 5), 1), 1);
        let cost = board.rules().stats(UnitKind::Wall, false).cost;
        assert_eq!(board.structure_points(Side::Friendly), before - cost);
        assert!(board.structure_at(Coord::new(13, 5)).is_some());
    }

    #[test]
    fn test_spawn_structure_rejects_occupied_cell() {
        let mut board = board();
        assert_eq!(board.attempt_spawn(UnitKind::Wall, Coord::new(13, 5), 1), 1);
        assert_eq!(board.attempt_spawn(UnitKind::Turret, Coord::new(13, 5), 1), 0);
    }

    #[test]
    fn test_spawn_structure_rejects_enemy_half() {
        let mut board = board();
        assert_eq!(board.attempt_spawn(UnitKind::Wall, Coord::new(13, 14), 1), 0);
    }

    #[test]
    fn test_spawn_many_skips_illegal_cells() {
        let mut board = board();
        let cells = [
            Coord::new(10, 5),
            Coord::new(13, 14), // enemy half
            Coord::new(11, 5),
        ];
        assert_eq!(board.attempt_spawn_many(UnitKind::Wall, &cells), 2);
    }

    #[test]
    fn test_spawn_mobile_only_on_own_edge() {
        let mut board = board();
        assert_eq!(board.attempt_spawn(UnitKind::Scout, Coord::new(13, 5), 1), 0);
        assert_eq!(board.attempt_spawn(UnitKind::Scout, Coord::new(13, 0), 1), 1);

        let scout = board.units().last().unwrap();
        assert_eq!(scout.target_edge, Some(TargetEdge::TopRight));
    }

    #[test]
    fn test_spawn_mobile_targets_opposite_edge() {
        let mut board = board();
        assert_eq!(board.attempt_spawn(UnitKind::Scout, Coord::new(20, 6), 1), 1);
        let scout = board.units().last().unwrap();
        assert_eq!(scout.target_edge, Some(TargetEdge::TopLeft));
    }

    #[test]
    fn test_spawn_stops_when_unaffordable() {
        let mut board = board();
        // 10 starting mobile points, demolishers cost 3
        assert_eq!(board.number_affordable(UnitKind::Demolisher), 3);
        assert_eq!(
            board.attempt_spawn(UnitKind::Demolisher, Coord::new(13, 0), 100),
            3
        );
        assert_eq!(board.number_affordable(UnitKind::Demolisher), 0);
    }

    #[test]
    fn test_remove_refunds_fraction() {
        let mut board = board();
        board.attempt_spawn(UnitKind::Support, Coord::new(13, 5), 1);
        let before = board.structure_points(Side::Friendly);
        assert!(board.attempt_remove(Coord::new(13, 5)));
        let cost = board.rules().stats(UnitKind::Support, false).cost;
        let refund = cost * board.rules().refund_percentage;
        assert_eq!(board.structure_points(Side::Friendly), before + refund);
        assert!(board.structure_at(Coord::new(13, 5)).is_none());
    }

    #[test]
    fn test_remove_rejects_enemy_structure() {
        let mut board = board();
        board
            .place_unit(Side::Enemy, UnitKind::Wall, false, Coord::new(13, 20), None)
            .unwrap();
        assert!(!board.attempt_remove(Coord::new(13, 20)));
    }

    #[test]
    fn test_upgrade_carries_damage_over() {
        let mut board = board();
        board.attempt_spawn(UnitKind::Wall, Coord::new(13, 5), 1);
        let id = board.units().last().unwrap().id;
        board.unit_mut(id).unwrap().health = Fixed::from_num(40);

        assert!(board.attempt_upgrade(Coord::new(13, 5)));
        let wall = board.unit(id).unwrap();
        assert!(wall.upgraded);
        // 20 damage taken stays taken: 40 + (120 - 60) = 100
        assert_eq!(wall.health, Fixed::from_num(100));
        assert!(!board.attempt_upgrade(Coord::new(13, 5)));
    }

    #[test]
    fn test_obstruction_generation_tracks_structures() {
        let mut board = board();
        let g0 = board.obstruction_generation();
        board.attempt_spawn(UnitKind::Wall, Coord::new(13, 5), 1);
        let g1 = board.obstruction_generation();
        assert!(g1 > g0);
        board.attempt_spawn(UnitKind::Scout, Coord::new(13, 0), 1);
        assert_eq!(board.obstruction_generation(), g1);
        board.attempt_remove(Coord::new(13, 5));
        assert!(board.obstruction_generation() > g1);
    }

    #[test]
    fn test_target_cascade_prefers_mobile_over_closer_structure() {
        let mut board = board();
        let turret = board
            .place_unit(Side::Friendly, UnitKind::Turret, false, Coord::new(13, 10), None)
            .unwrap();
        board
            .place_unit(Side::Enemy, UnitKind::Wall, false, Coord::new(13, 11), None)
            .unwrap();
        let scout = board
            .place_unit(
                Side::Enemy,
                UnitKind::Scout,
                false,
                Coord::new(13, 12),
                Some(TargetEdge::BottomLeft),
            )
            .unwrap();

        // Turrets cannot hit structures at all, but a demolisher with
        // structure damage still prefers the farther mobile unit.
        let attacker = board.unit(turret).unwrap().clone();
        assert_eq!(board.select_target(&attacker), Some(scout));

        let demolisher = Unit::new(
            99,
            Side::Friendly,
            UnitKind::Demolisher,
            false,
            Coord::new(13, 10),
            Some(TargetEdge::TopRight),
            board.rules(),
        );
        assert_eq!(board.select_target(&demolisher), Some(scout));
    }

    #[test]
    fn test_target_cascade_nearest_then_health() {
        let mut board = board();
        let turret = board
            .place_unit(Side::Friendly, UnitKind::Turret, false, Coord::new(13, 10), None)
            .unwrap();
        let near = board
            .place_unit(
                Side::Enemy,
                UnitKind::Scout,
                false,
                Coord::new(13, 11),
                Some(TargetEdge::BottomLeft),
            )
            .unwrap();
        board
            .place_unit(
                Side::Enemy,
                UnitKind::Scout,
                false,
                Coord::new(13, 12),
                Some(TargetEdge::BottomLeft),
            )
            .unwrap();

        let attacker = board.unit(turret).unwrap().clone();
        assert_eq!(board.select_target(&attacker), Some(near));

        // Same distance, lower health wins.
        let hurt = board
            .place_unit(
                Side::Enemy,
                UnitKind::Scout,
                false,
                Coord::new(13, 9),
                Some(TargetEdge::BottomLeft),
            )
            .unwrap();
        board.unit_mut(hurt).unwrap().health = Fixed::from_num(3);
        assert_eq!(board.select_target(&attacker), Some(hurt));
    }

    #[test]
    fn test_target_cascade_ignores_dead_units() {
        let mut board = board();
        let turret = board
            .place_unit(Side::Friendly, UnitKind::Turret, false, Coord::new(13, 10), None)
            .unwrap();
        let scout = board
            .place_unit(
                Side::Enemy,
                UnitKind::Scout,
                false,
                Coord::new(13, 11),
                Some(TargetEdge::BottomLeft),
            )
            .unwrap();
        board.unit_mut(scout).unwrap().health = Fixed::ZERO;

        let attacker = board.unit(turret).unwrap().clone();
        assert_eq!(board.select_target(&attacker), None);
    }

    #[test]
    fn test_resources_settable_by_collaborator() {
        let mut board = board();
        board.set_resources(Side::Enemy, Fixed::from_num(12), Fixed::from_num(7));
        assert_eq!(board.structure_points(Side::Enemy), Fixed::from_num(12));
        assert_eq!(board.mobile_points(Side::Enemy), Fixed::from_num(7));
    }
}
