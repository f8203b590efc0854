//! Unit identity and per-unit combat state.
//!
//! A [`Unit`] is one deployed piece: its identity (side, kind, upgrade
//! tier), its grid position, the stats snapshot pulled from [`GameRules`]
//! at construction, and the transient state the frame stepper mutates
//! (path, cooldown, shield sources).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::{GameRules, UnitStats};
use crate::math::{Coord, Fixed};

/// Identifier a board assigns to each unit it creates.
///
/// Stable across snapshot clones, so per-battle bookkeeping like "this
/// support already shielded that walker" survives the evaluator's deep
/// copies.
pub type UnitId = u32;

/// The two players on the board.
///
/// `Friendly` is the deploying agent (player 0, bottom half of the arena);
/// `Enemy` is the opponent (player 1, top half).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The deploying agent.
    Friendly,
    /// The opponent.
    Enemy,
}

impl Side {
    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Friendly => Self::Enemy,
            Self::Enemy => Self::Friendly,
        }
    }

    /// Stable index for per-side tally arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Friendly => 0,
            Self::Enemy => 1,
        }
    }

    /// Rows of depth a cell at `y` sits from this side's back edge.
    ///
    /// Friendly territory starts at row 0, enemy territory at row 27.
    #[must_use]
    pub const fn depth_of(self, y: i32) -> i32 {
        match self {
            Self::Friendly => y,
            Self::Enemy => 27 - y,
        }
    }
}

/// The closed set of unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Stationary blocker.
    Wall,
    /// Stationary shield generator.
    Support,
    /// Stationary attacker.
    Turret,
    /// Fast mobile attacker.
    Scout,
    /// Anti-structure mobile attacker.
    Demolisher,
    /// Anti-mobile walker with a wide self-destruct blast.
    Interceptor,
}

impl UnitKind {
    /// Every kind, in stable tally order.
    pub const ALL: [Self; 6] = [
        Self::Wall,
        Self::Support,
        Self::Turret,
        Self::Scout,
        Self::Demolisher,
        Self::Interceptor,
    ];

    /// Stable index for per-kind tally arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Wall => 0,
            Self::Support => 1,
            Self::Turret => 2,
            Self::Scout => 3,
            Self::Demolisher => 4,
            Self::Interceptor => 5,
        }
    }

    /// Whether this kind is fixed in place once deployed.
    #[must_use]
    pub const fn is_stationary(self) -> bool {
        matches!(self, Self::Wall | Self::Support | Self::Turret)
    }

    /// Whether this kind walks a path toward an edge.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !self.is_stationary()
    }

    /// Whether this kind participates in the attack phase.
    #[must_use]
    pub const fn can_attack(self) -> bool {
        matches!(
            self,
            Self::Turret | Self::Scout | Self::Demolisher | Self::Interceptor
        )
    }
}

/// The four board perimeters a mobile unit can be committed to reaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetEdge {
    /// Upper-right diagonal of the diamond.
    TopRight,
    /// Upper-left diagonal.
    TopLeft,
    /// Lower-left diagonal.
    BottomLeft,
    /// Lower-right diagonal.
    BottomRight,
}

impl TargetEdge {
    /// Every edge, in engine order.
    pub const ALL: [Self; 4] = [
        Self::TopRight,
        Self::TopLeft,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// The 14 cells composing this edge of the diamond arena.
    #[must_use]
    pub fn cells(self) -> [Coord; 14] {
        let mut cells = [Coord::new(0, 0); 14];
        let mut i = 0;
        while i < 14 {
            let n = i as i32;
            cells[i] = match self {
                Self::TopRight => Coord::new(14 + n, 27 - n),
                Self::TopLeft => Coord::new(13 - n, 27 - n),
                Self::BottomLeft => Coord::new(13 - n, n),
                Self::BottomRight => Coord::new(14 + n, n),
            };
            i += 1;
        }
        cells
    }

    /// Signed direction this edge lies in, as (x, y) components.
    ///
    /// Drives both the pathfinder's idealness score and its final
    /// tie-break toward the edge.
    #[must_use]
    pub const fn direction(self) -> (i32, i32) {
        match self {
            Self::TopRight => (1, 1),
            Self::TopLeft => (-1, 1),
            Self::BottomLeft => (-1, -1),
            Self::BottomRight => (1, -1),
        }
    }

    /// The edge diagonally opposite this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::TopRight => Self::BottomLeft,
            Self::TopLeft => Self::BottomRight,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }

    /// Whether a cell belongs to this edge.
    #[must_use]
    pub fn contains(self, cell: Coord) -> bool {
        self.cells().contains(&cell)
    }
}

/// One deployed piece and its battle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Board-assigned identifier.
    pub id: UnitId,
    /// Owning player.
    pub side: Side,
    /// Unit kind.
    pub kind: UnitKind,
    /// Upgrade tier.
    pub upgraded: bool,
    /// Current grid position.
    pub pos: Coord,
    /// Edge this unit walks toward. Fixed at deployment; `None` for
    /// stationary kinds.
    pub target_edge: Option<TargetEdge>,
    /// Current health, in `[0, stats.max_health]`.
    pub health: Fixed,
    /// Current shield, never negative.
    pub shield: Fixed,
    /// Stats snapshot pulled from the rules at construction.
    pub stats: UnitStats,
    /// Whether the unit is still in play. Scored units deactivate without
    /// counting as casualties.
    pub active: bool,
    /// Frames remaining before the next move is allowed.
    pub frames_until_move: u32,
    /// Remaining waypoints, front first. Recomputed whenever the
    /// obstruction landscape changes.
    pub path: VecDeque<Coord>,
    /// Supports that already shielded this unit this battle.
    pub shielded_by: Vec<UnitId>,
}

impl Unit {
    /// Create a unit at full health with stats pulled from `rules`.
    #[must_use]
    pub fn new(
        id: UnitId,
        side: Side,
        kind: UnitKind,
        upgraded: bool,
        pos: Coord,
        target_edge: Option<TargetEdge>,
        rules: &GameRules,
    ) -> Self {
        let stats = *rules.stats(kind, upgraded);
        Self {
            id,
            side,
            kind,
            upgraded,
            pos,
            target_edge,
            health: stats.max_health,
            shield: Fixed::ZERO,
            stats,
            active: true,
            frames_until_move: 0,
            path: VecDeque::new(),
            shielded_by: Vec::new(),
        }
    }

    /// Whether this unit is fixed in place.
    #[must_use]
    pub const fn is_stationary(&self) -> bool {
        self.kind.is_stationary()
    }

    /// Whether this unit is a live target or attacker.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.active && self.health > Fixed::ZERO
    }

    /// Absorb incoming damage, shield first, and return the amount that
    /// actually landed.
    ///
    /// The engine's absorption rule is not a linear subtract: the combined
    /// pool `health + shield` takes the hit, and whatever remains above
    /// `max_health` stays on the shield. Shield is zeroed the moment the
    /// remainder drops below max health.
    pub fn absorb(&mut self, damage: Fixed) -> Fixed {
        debug_assert!(damage >= Fixed::ZERO, "damage cannot be negative");
        debug_assert!(self.shield >= Fixed::ZERO, "shield invariant violated");

        let total = self.health + self.shield;
        let after = (total - damage).max(Fixed::ZERO);

        if after < self.stats.max_health {
            self.health = after;
            self.shield = Fixed::ZERO;
        } else {
            self.health = self.stats.max_health;
            self.shield = after - self.stats.max_health;
        }

        total - after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scout(health: f64, shield: f64) -> Unit {
        let rules = GameRules::default();
        let mut unit = Unit::new(
            1,
            Side::Friendly,
            UnitKind::Scout,
            false,
            Coord::new(13, 0),
            Some(TargetEdge::TopRight),
            &rules,
        );
        unit.health = Fixed::from_num(health);
        unit.shield = Fixed::from_num(shield);
        unit
    }

    #[test]
    fn test_edge_cells_form_the_diamond_perimeter() {
        let tr = TargetEdge::TopRight.cells();
        assert_eq!(tr[0], Coord::new(14, 27));
        assert_eq!(tr[13], Coord::new(27, 14));

        let bl = TargetEdge::BottomLeft.cells();
        assert_eq!(bl[0], Coord::new(13, 0));
        assert_eq!(bl[13], Coord::new(0, 13));
    }

    #[test]
    fn test_edge_opposites_pair_up() {
        for edge in TargetEdge::ALL {
            assert_eq!(edge.opposite().opposite(), edge);
        }
        assert_eq!(TargetEdge::BottomLeft.opposite(), TargetEdge::TopRight);
    }

    #[test]
    fn test_depth_is_measured_from_own_back_edge() {
        assert_eq!(Side::Friendly.depth_of(5), 5);
        assert_eq!(Side::Enemy.depth_of(5), 22);
        assert_eq!(Side::Enemy.depth_of(27), 0);
    }

    #[test]
    fn test_absorb_shield_takes_damage_first() {
        let mut unit = scout(15.0, 10.0);
        let dealt = unit.absorb(Fixed::from_num(4));
        assert_eq!(dealt, Fixed::from_num(4));
        assert_eq!(unit.health, Fixed::from_num(15));
        assert_eq!(unit.shield, Fixed::from_num(6));
    }

    #[test]
    fn test_absorb_overflow_zeroes_shield() {
        // 12 health + 10 shield - 9 damage = 13, below max health 15:
        // shield collapses and health takes the clamped remainder.
        let mut unit = scout(12.0, 10.0);
        let dealt = unit.absorb(Fixed::from_num(9));
        assert_eq!(dealt, Fixed::from_num(9));
        assert_eq!(unit.health, Fixed::from_num(13));
        assert_eq!(unit.shield, Fixed::ZERO);
    }

    #[test]
    fn test_absorb_overkill_floors_at_zero() {
        let mut unit = scout(3.0, 1.0);
        let dealt = unit.absorb(Fixed::from_num(100));
        assert_eq!(dealt, Fixed::from_num(4));
        assert_eq!(unit.health, Fixed::ZERO);
        assert_eq!(unit.shield, Fixed::ZERO);
    }

    #[test]
    fn test_absorb_zero_damage_is_identity() {
        let mut unit = scout(15.0, 3.0);
        assert_eq!(unit.absorb(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(unit.health, Fixed::from_num(15));
        assert_eq!(unit.shield, Fixed::from_num(3));
    }

    proptest! {
        /// The absorption rule never creates health or shield, never pushes
        /// health over the ceiling, and zeroes shield whenever health dips
        /// below max.
        #[test]
        fn prop_absorption_conserves_pool(
            health in 0.0f64..15.0,
            shield in 0.0f64..30.0,
            damage in 0.0f64..60.0,
        ) {
            let mut unit = scout(health, shield);
            let before = unit.health + unit.shield;
            let dealt = unit.absorb(Fixed::from_num(damage));
            let after = unit.health + unit.shield;

            prop_assert!(after <= before);
            prop_assert_eq!(dealt, before - after);
            prop_assert!(unit.health <= unit.stats.max_health);
            prop_assert!(unit.shield >= Fixed::ZERO);
            if unit.health < unit.stats.max_health {
                prop_assert_eq!(unit.shield, Fixed::ZERO);
            }
        }
    }
}
