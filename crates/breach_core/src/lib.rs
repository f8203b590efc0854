//! # Breach Core
//!
//! Deterministic battle forecast core for the Breach tower-defense agent.
//!
//! Each game turn the agent must commit deployments without observing the
//! outcome. This crate replays the engine's combat rules frame-by-frame
//! over hypothetical board snapshots so the agent can compare candidate
//! deployments before submitting one. It contains **only** deterministic
//! logic:
//! - No rendering
//! - No IO (the turn protocol lives in the collaborator layer)
//! - No system randomness
//! - No floating-point math in simulation (fixed-point throughout)
//!
//! This separation enables:
//! - Bit-faithful replay of the live engine's battles
//! - Many full replays per decision, inside a hard wall-clock budget
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`board`] - board snapshots, geometry, deployment primitives
//! - [`config`] - the game-balance rule table
//! - [`pathfinding`] - the engine's route resolution and the route cache
//! - [`simulation`] - the four-phase frame stepper and battle reports
//! - [`evaluator`] - multi-candidate search over deployment plans
//! - [`math`] - fixed-point math and grid coordinates

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod board;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod math;
pub mod pathfinding;
pub mod simulation;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::board::{in_arena_bounds, BoardSnapshot, ARENA_SIZE, HALF_ARENA};
    pub use crate::config::{GameRules, KindRules, UnitStats, UnitTable};
    pub use crate::error::{Result, SimError};
    pub use crate::evaluator::{
        evaluate, score_then_damage, value_per_cost, DeploymentPlan, Evaluated, EvaluatorConfig,
        StructureValueTable,
    };
    pub use crate::math::{Coord, Fixed};
    pub use crate::pathfinding::{PathCache, PathResolver};
    pub use crate::simulation::{
        simulate, Battle, BattleReport, CasualtyTally, NoopObserver, Phase, PhaseObserver,
        PhaseTimings,
    };
    pub use crate::unit::{Side, TargetEdge, Unit, UnitId, UnitKind};
}
