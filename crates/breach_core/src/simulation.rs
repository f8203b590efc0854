//! Frame-by-frame battle replay.
//!
//! A battle is a sequence of discrete frames; each frame applies four
//! phases in fixed order - support, move, attack, cleanup - to every unit
//! active at the start of the frame. The live engine is phase-synchronous
//! across all units, so this order must never be interleaved per unit.
//!
//! # Determinism
//!
//! All phases iterate the roster in deployment order. Route and target
//! caches are keyed lookups only; no hash iteration affects outcomes.
//! Same snapshot in, same [`BattleReport`] out.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::board::BoardSnapshot;
use crate::math::{Coord, Fixed};
use crate::pathfinding::{PathCache, PathResolver};
use crate::unit::{Side, TargetEdge, UnitId, UnitKind};

/// The phases of one simulated frame, in execution order. Path resolution
/// runs as a fifth, on-demand step whenever the obstruction landscape
/// changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Route re-resolution after an obstruction change.
    Pathfind,
    /// Shield grants from support units.
    Support,
    /// Walker movement, scoring, and self-destructs.
    Move,
    /// Target selection and damage application.
    Attack,
    /// Casualty removal and tallying.
    Cleanup,
}

/// Sink for per-phase timing, injectable so the hot loop never carries
/// heavier instrumentation than the caller asked for.
pub trait PhaseObserver {
    /// Called once per executed phase with its wall-clock cost.
    fn phase_complete(&mut self, phase: Phase, elapsed: Duration) {
        let _ = (phase, elapsed);
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PhaseObserver for NoopObserver {}

/// Cumulative per-phase wall-clock cost of one battle. Diagnostic only;
/// never feeds back into simulation outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Time spent resolving routes.
    pub pathfind: Duration,
    /// Time spent in the support phase.
    pub support: Duration,
    /// Time spent in the move phase.
    pub movement: Duration,
    /// Time spent in the attack phase.
    pub attack: Duration,
    /// Time spent removing casualties.
    pub cleanup: Duration,
}

impl PhaseTimings {
    fn add(&mut self, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Pathfind => self.pathfind += elapsed,
            Phase::Support => self.support += elapsed,
            Phase::Move => self.movement += elapsed,
            Phase::Attack => self.attack += elapsed,
            Phase::Cleanup => self.cleanup += elapsed,
        }
    }
}

/// Casualties for one side, bucketed by kind and upgrade tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CasualtyTally {
    // [tier][kind]: tier 0 = base, tier 1 = upgraded
    counts: [[u32; 6]; 2],
}

impl CasualtyTally {
    /// Record one destroyed unit.
    pub fn record(&mut self, kind: UnitKind, upgraded: bool) {
        self.counts[usize::from(upgraded)][kind.index()] += 1;
    }

    /// Casualties of one kind at one tier.
    #[must_use]
    pub const fn count(&self, kind: UnitKind, upgraded: bool) -> u32 {
        self.counts[upgraded as usize][kind.index()]
    }

    /// Total casualties across kinds and tiers.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    /// Total mobile-kind casualties.
    #[must_use]
    pub fn mobile(&self) -> u32 {
        UnitKind::ALL
            .iter()
            .filter(|k| k.is_mobile())
            .map(|&k| self.count(k, false) + self.count(k, true))
            .sum()
    }

    /// Total stationary-kind casualties.
    #[must_use]
    pub fn stationary(&self) -> u32 {
        self.total() - self.mobile()
    }
}

/// Everything one completed battle replay predicts.
#[derive(Debug, Clone, Default)]
pub struct BattleReport {
    /// Points the friendly side scored on the enemy.
    pub friendly_score: u32,
    /// Points the enemy scored on the friendly side.
    pub enemy_score: u32,
    /// Friendly units destroyed, by kind and tier.
    pub friendly_losses: CasualtyTally,
    /// Enemy units destroyed, by kind and tier.
    pub enemy_losses: CasualtyTally,
    /// Raw damage friendly units inflicted on enemy units.
    pub friendly_damage_dealt: Fixed,
    /// Raw damage enemy units inflicted on friendly units.
    pub enemy_damage_dealt: Fixed,
    /// Structure points the candidate plan spent. Filled by the evaluator.
    pub structure_points_spent: Fixed,
    /// Mobile points the candidate plan spent. Filled by the evaluator.
    pub mobile_points_spent: Fixed,
    /// False when the frame cap cut the battle short; scorers must treat
    /// such statistics as non-authoritative.
    pub complete: bool,
    /// Frames simulated.
    pub frames: u32,
    /// Diagnostic phase costs.
    pub timings: PhaseTimings,
}

impl BattleReport {
    /// Points a side scored.
    #[must_use]
    pub const fn score(&self, side: Side) -> u32 {
        match side {
            Side::Friendly => self.friendly_score,
            Side::Enemy => self.enemy_score,
        }
    }

    /// Casualties a side suffered.
    #[must_use]
    pub const fn losses(&self, side: Side) -> &CasualtyTally {
        match side {
            Side::Friendly => &self.friendly_losses,
            Side::Enemy => &self.enemy_losses,
        }
    }

    /// Raw damage a side inflicted.
    #[must_use]
    pub const fn damage_dealt(&self, side: Side) -> Fixed {
        match side {
            Side::Friendly => self.friendly_damage_dealt,
            Side::Enemy => self.enemy_damage_dealt,
        }
    }
}

/// One battle replay over an exclusively owned snapshot.
#[derive(Debug)]
pub struct Battle {
    board: BoardSnapshot,
    resolver: PathResolver,
    cache: PathCache,
    resolved_generation: Option<u64>,
    mobile_units_remain: bool,
    removal_needed: bool,
    report: BattleReport,
}

impl Battle {
    /// Take ownership of a snapshot and prepare to replay it.
    #[must_use]
    pub fn new(board: BoardSnapshot) -> Self {
        let resolver = PathResolver::for_board(&board);
        let mobile_units_remain = board
            .units()
            .iter()
            .any(|u| u.active && !u.is_stationary());
        Self {
            board,
            resolver,
            cache: PathCache::new(),
            resolved_generation: None,
            mobile_units_remain,
            removal_needed: false,
            report: BattleReport {
                complete: true,
                ..BattleReport::default()
            },
        }
    }

    /// Run the battle to completion or to the frame cap.
    #[must_use]
    pub fn run(self) -> BattleReport {
        self.run_observed(&mut NoopObserver)
    }

    /// Run the battle, forwarding phase timings to an observer.
    pub fn run_observed(mut self, observer: &mut dyn PhaseObserver) -> BattleReport {
        let frame_cap = self.board.rules().frame_cap;

        while self.mobile_units_remain {
            if self.report.frames >= frame_cap {
                self.report.complete = false;
                debug!(frame_cap, "frame cap reached, result incomplete");
                break;
            }

            if self.resolved_generation != Some(self.board.obstruction_generation()) {
                self.timed(Phase::Pathfind, observer, Self::pathfind_all);
            }
            self.timed(Phase::Support, observer, Self::support_all);
            self.timed(Phase::Move, observer, Self::move_all);
            self.timed(Phase::Attack, observer, Self::attack_all);
            if self.removal_needed {
                self.timed(Phase::Cleanup, observer, Self::remove_destroyed);
                self.removal_needed = false;
            }

            self.report.frames += 1;
            trace!(frame = self.report.frames, "frame complete");
        }

        debug!(
            frames = self.report.frames,
            friendly_score = self.report.friendly_score,
            enemy_score = self.report.enemy_score,
            complete = self.report.complete,
            "battle finished"
        );
        self.report
    }

    fn timed(&mut self, phase: Phase, observer: &mut dyn PhaseObserver, f: fn(&mut Self)) {
        let start = Instant::now();
        f(self);
        let elapsed = start.elapsed();
        self.report.timings.add(phase, elapsed);
        observer.phase_complete(phase, elapsed);
    }

    /// Re-resolve every active walker's route against the current
    /// obstruction landscape. Stacked walkers share cached routes.
    fn pathfind_all(&mut self) {
        self.resolver = PathResolver::for_board(&self.board);
        let generation = self.board.obstruction_generation();
        self.resolved_generation = Some(generation);

        let movers: Vec<(UnitId, Coord, TargetEdge)> = self
            .board
            .units()
            .iter()
            .filter(|u| u.active && !u.is_stationary())
            .map(|u| {
                let edge = u.target_edge.expect("mobile units carry a target edge");
                (u.id, u.pos, edge)
            })
            .collect();

        self.mobile_units_remain = !movers.is_empty();
        for (id, pos, edge) in movers {
            let path = self.cache.path_for(&self.resolver, generation, pos, edge);
            trace!(unit = id, ?pos, ?edge, waypoints = path.len(), "route assigned");
            if let Some(unit) = self.board.unit_mut(id) {
                unit.path = path.into();
            }
        }
    }

    /// Grant shield from every active support to every same-side walker in
    /// range it has not already shielded this battle. The grant scales with
    /// the support's depth from its own back edge.
    fn support_all(&mut self) {
        let supports: Vec<UnitId> = self
            .board
            .units()
            .iter()
            .filter(|u| u.active && u.kind == UnitKind::Support)
            .map(|u| u.id)
            .collect();

        for sid in supports {
            let Some(support) = self.board.unit(sid) else { continue };
            let pos = support.pos;
            let side = support.side;
            let range = support.stats.shield_range;
            let grant = support.stats.shield_per_unit
                + support.stats.shield_bonus_per_y * Fixed::from_num(side.depth_of(pos.y));

            let targets: Vec<UnitId> = self
                .board
                .units()
                .iter()
                .filter(|u| {
                    u.active
                        && !u.is_stationary()
                        && u.side == side
                        && pos.within(u.pos, range)
                        && !u.shielded_by.contains(&sid)
                })
                .map(|u| u.id)
                .collect();

            for tid in targets {
                let Some(target) = self.board.unit_mut(tid) else { continue };
                target.shield += grant;
                target.shielded_by.push(sid);
                trace!(support = sid, target = tid, %grant, "shield granted");
            }
        }
    }

    /// Advance every walker whose cooldown expired: consume a waypoint,
    /// score on an exhausted route that ends on the target edge, or
    /// self-destruct on an exhausted route that does not.
    fn move_all(&mut self) {
        let movers: Vec<UnitId> = self
            .board
            .units()
            .iter()
            .filter(|u| u.active && !u.is_stationary())
            .map(|u| u.id)
            .collect();

        for id in movers {
            let Some(unit) = self.board.unit_mut(id) else { continue };
            if !unit.active {
                continue;
            }
            if unit.frames_until_move > 0 {
                unit.frames_until_move -= 1;
                continue;
            }

            let exhausted = unit.path.is_empty()
                || (unit.path.len() == 1 && unit.path[0] == unit.pos);
            if exhausted {
                let edge = unit.target_edge.expect("mobile units carry a target edge");
                if edge.contains(unit.pos) {
                    let side = unit.side;
                    unit.active = false;
                    self.removal_needed = true;
                    match side {
                        Side::Friendly => self.report.friendly_score += 1,
                        Side::Enemy => self.report.enemy_score += 1,
                    }
                    trace!(unit = id, "walker reached its edge and scored");
                } else {
                    self.handle_self_destruct(id);
                }
                continue;
            }

            let mut next = unit.path.pop_front().expect("checked non-empty");
            if next == unit.pos {
                match unit.path.pop_front() {
                    Some(cell) => next = cell,
                    None => continue,
                }
            }
            unit.pos = next;
            unit.frames_until_move = unit.stats.speed.saturating_sub(1);
        }
    }

    /// Detonate a walker that cannot continue: its current health lands on
    /// every live enemy within its blast radius, once each, then the unit
    /// itself dies.
    fn handle_self_destruct(&mut self, id: UnitId) {
        let Some(unit) = self.board.unit(id) else { return };
        let pos = unit.pos;
        let side = unit.side;
        let blast = unit.health;
        let radius = unit.stats.blast_radius;

        let victims: Vec<UnitId> = self
            .board
            .units()
            .iter()
            .filter(|u| u.is_alive() && u.side != side && pos.within(u.pos, radius))
            .map(|u| u.id)
            .collect();

        trace!(unit = id, victims = victims.len(), %blast, "self-destruct");
        for victim in victims {
            self.apply_damage(victim, blast, side);
        }

        if let Some(unit) = self.board.unit_mut(id) {
            unit.health = Fixed::ZERO;
        }
        self.removal_needed = true;
    }

    /// Every live attacker picks exactly one target through the engine's
    /// cascade and strikes it once. In-range candidate lists are cached per
    /// (cell, range, side), since stacked walkers share them.
    fn attack_all(&mut self) {
        use std::collections::HashMap;

        let attackers: Vec<UnitId> = self
            .board
            .units()
            .iter()
            .filter(|u| u.active && u.kind.can_attack())
            .map(|u| u.id)
            .collect();

        let mut candidates_cache: HashMap<(Coord, i64, Side), Vec<UnitId>> = HashMap::new();

        for id in attackers {
            let Some(attacker) = self.board.unit(id) else { continue };
            // Units that died earlier this frame never attack.
            if !attacker.is_alive() {
                continue;
            }
            let attacker = attacker.clone();

            let key = (
                attacker.pos,
                attacker.stats.attack_range.to_bits(),
                attacker.side,
            );
            let candidates = candidates_cache
                .entry(key)
                .or_insert_with(|| {
                    self.board
                        .units()
                        .iter()
                        .filter(|u| {
                            u.side != attacker.side
                                && u.is_alive()
                                && attacker.pos.within(u.pos, attacker.stats.attack_range)
                        })
                        .map(|u| u.id)
                        .collect()
                })
                .clone();

            let Some(target_id) = self.board.select_target_from(&attacker, &candidates) else {
                continue;
            };
            let target_stationary = self
                .board
                .unit(target_id)
                .is_some_and(|t| t.is_stationary());
            let damage = if target_stationary {
                attacker.stats.structure_damage
            } else {
                attacker.stats.walker_damage
            };
            trace!(attacker = id, target = target_id, %damage, "attack");
            self.apply_damage(target_id, damage, attacker.side);
        }
    }

    /// Shield-then-health damage application, crediting the dealt amount to
    /// the attacking side's running total.
    fn apply_damage(&mut self, target_id: UnitId, amount: Fixed, attacker_side: Side) {
        let Some(target) = self.board.unit_mut(target_id) else {
            return;
        };
        debug_assert!(target.is_alive(), "damage applied to a dead unit");

        let dealt = target.absorb(amount);
        let died = target.health == Fixed::ZERO;

        match attacker_side {
            Side::Friendly => self.report.friendly_damage_dealt += dealt,
            Side::Enemy => self.report.enemy_damage_dealt += dealt,
        }
        if died {
            self.removal_needed = true;
        }
    }

    /// Drop every dead or scored unit from the roster, tallying casualties
    /// and flagging the obstruction landscape when a structure fell.
    fn remove_destroyed(&mut self) {
        let mut stationary_destroyed = false;
        let mut mobile_remain = false;

        let old = std::mem::take(self.board.units_mut());
        let mut kept = Vec::with_capacity(old.len());

        for unit in old {
            if unit.health > Fixed::ZERO && unit.active {
                if !unit.is_stationary() {
                    mobile_remain = true;
                }
                kept.push(unit);
                continue;
            }
            if unit.is_stationary() {
                stationary_destroyed = true;
            }
            if !unit.active {
                // Scored walkers leave the board without counting as losses.
                continue;
            }
            trace!(unit = unit.id, kind = ?unit.kind, "casualty");
            match unit.side {
                Side::Friendly => self.report.friendly_losses.record(unit.kind, unit.upgraded),
                Side::Enemy => self.report.enemy_losses.record(unit.kind, unit.upgraded),
            }
        }

        *self.board.units_mut() = kept;
        self.mobile_units_remain = mobile_remain;
        if stationary_destroyed {
            self.board.mark_obstructions_dirty();
        }
    }
}

/// Replay one snapshot to completion and return its report.
///
/// The evaluator calls this once per candidate; it is also the single-run
/// entry point for callers that already committed to a deployment.
#[must_use]
pub fn simulate(board: BoardSnapshot) -> BattleReport {
    Battle::new(board).run()
}
