//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battle replays produce identical
//! predictions given identical snapshots.
//!
//! # Testing Strategy
//!
//! Forecasts are only useful if they are bit-faithful, so every source of
//! non-determinism is designed out and then verified here:
//!
//! - **Floating-point math**: fixed-point arithmetic throughout the
//!   simulation; floats exist only at the rules-parsing boundary.
//!
//! - **HashMap iteration order**: the route and target caches are keyed
//!   lookups only; all semantic iteration runs in deployment order.
//!
//! - **System randomness**: none. Candidate variety comes from the caller.
//!
//! Phase timings are wall-clock and legitimately vary between runs, so the
//! harness hashes only the semantic fields of a report.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use breach_core::prelude::*;

/// Hash the semantic content of a report: scores, casualties, damage,
/// frames, completeness. Timings are excluded.
#[must_use]
pub fn report_signature(report: &BattleReport) -> u64 {
    let mut hasher = DefaultHasher::new();
    report.friendly_score.hash(&mut hasher);
    report.enemy_score.hash(&mut hasher);
    report.frames.hash(&mut hasher);
    report.complete.hash(&mut hasher);
    report.friendly_damage_dealt.to_bits().hash(&mut hasher);
    report.enemy_damage_dealt.to_bits().hash(&mut hasher);
    for kind in UnitKind::ALL {
        for upgraded in [false, true] {
            report.friendly_losses.count(kind, upgraded).hash(&mut hasher);
            report.enemy_losses.count(kind, upgraded).hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Signatures from each run.
    pub signatures: Vec<u64>,
}

impl DeterminismResult {
    fn from_signatures(signatures: Vec<u64>) -> Self {
        let is_deterministic = signatures.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            signatures,
        }
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the replays produced different signatures across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let mut unique: Vec<u64> = self.signatures.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Battle replay is non-deterministic!\n\
                 Runs: {}\n\
                 Unique signatures: {} (expected 1)\n\
                 All signatures: {:?}",
                self.signatures.len(),
                unique.len(),
                self.signatures
            );
        }
    }
}

/// Replay the same snapshot `runs` times sequentially and compare.
#[must_use]
pub fn replay_repeatedly(board: &BoardSnapshot, runs: usize) -> DeterminismResult {
    let signatures = (0..runs)
        .map(|_| report_signature(&simulate(board.clone())))
        .collect();
    DeterminismResult::from_signatures(signatures)
}

/// Replay the same snapshot across `runs` threads at once and compare.
///
/// Each thread owns its deep copy, mirroring how the evaluator would fan
/// candidates out to workers.
#[must_use]
pub fn replay_in_parallel(board: &BoardSnapshot, runs: usize) -> DeterminismResult {
    let handles: Vec<_> = (0..runs)
        .map(|_| {
            let board = board.clone();
            thread::spawn(move || report_signature(&simulate(board)))
        })
        .collect();
    let signatures = handles
        .into_iter()
        .map(|h| h.join().expect("replay thread panicked"))
        .collect();
    DeterminismResult::from_signatures(signatures)
}
