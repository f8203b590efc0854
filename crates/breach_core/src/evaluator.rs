//! Multi-candidate deployment search.
//!
//! The evaluator clones the current board once per candidate plan, applies
//! the plan, replays the battle to completion, and hands every collected
//! [`BattleReport`] to a caller-supplied scorer. It imposes no scoring
//! policy of its own - callers swap risk heuristics freely - only the
//! clone-apply-simulate pipeline and the wall-clock budget.
//!
//! The budget is the only cancellation mechanism and is checked between
//! candidates, never mid-battle: a started battle always finishes, so no
//! candidate is ever scored from a half-replayed, inconsistent state.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::board::BoardSnapshot;
use crate::math::Fixed;
use crate::simulation::{simulate, BattleReport, CasualtyTally};
use crate::unit::{Side, UnitKind};

/// A candidate deployment: a pure mutation of a hypothetical board.
///
/// Implemented for any `Fn(&mut BoardSnapshot, &I)`, so strategy code can
/// keep expressing candidates as closures capturing their own context.
/// `I` is whatever shared intelligence the caller threads through to every
/// plan (scouting reports, past-turn patterns); the evaluator never looks
/// inside it.
pub trait DeploymentPlan<I: ?Sized> {
    /// Mutate the board into the hypothetical position this plan proposes.
    ///
    /// Placement attempts can fail (insufficient resources, occupied
    /// cells); plans must check each attempt's return value and adapt
    /// rather than assume success.
    fn apply(&self, board: &mut BoardSnapshot, info: &I);
}

impl<I: ?Sized, F> DeploymentPlan<I> for F
where
    F: Fn(&mut BoardSnapshot, &I),
{
    fn apply(&self, board: &mut BoardSnapshot, info: &I) {
        self(board, info);
    }
}

/// Evaluation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Wall-clock budget for the whole candidate batch. Once exceeded, the
    /// remaining candidates are skipped and only collected reports are
    /// scored. The owning turn loop has its own deadline; the evaluator
    /// must never block past this.
    pub budget: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(4),
        }
    }
}

/// One candidate's outcome, tagged with its position in the input order.
#[derive(Debug, Clone)]
pub struct Evaluated {
    /// Index of the plan in the candidate list handed to [`evaluate`].
    pub candidate: usize,
    /// The battle prediction for that plan.
    pub report: BattleReport,
}

fn evaluate_one<I: ?Sized, P: DeploymentPlan<I>>(
    base: &BoardSnapshot,
    candidate: usize,
    plan: &P,
    info: &I,
) -> Evaluated {
    let mut board = base.clone();
    plan.apply(&mut board, info);

    // Refunds can make this negative; scorers normalizing by cost must
    // handle that.
    let structure_spent =
        base.structure_points(Side::Friendly) - board.structure_points(Side::Friendly);
    let mobile_spent = base.mobile_points(Side::Friendly) - board.mobile_points(Side::Friendly);

    let mut report = simulate(board);
    report.structure_points_spent = structure_spent;
    report.mobile_points_spent = mobile_spent;
    debug!(
        candidate,
        score = report.friendly_score,
        complete = report.complete,
        frames = report.frames,
        "candidate evaluated"
    );
    Evaluated { candidate, report }
}

/// Evaluate candidate plans in order and return the scorer's pick.
///
/// Returns `None` when the scorer judges no candidate worth committing;
/// the caller is expected to fall back to its own default action. A
/// returned index refers to the original candidate list, so the winning
/// plan can be re-applied to the real board.
pub fn evaluate<I, P, S>(
    base: &BoardSnapshot,
    plans: &[P],
    info: &I,
    scorer: S,
    config: &EvaluatorConfig,
) -> Option<usize>
where
    I: ?Sized,
    P: DeploymentPlan<I>,
    S: Fn(&[Evaluated]) -> Option<usize>,
{
    let started = Instant::now();
    let mut evaluated = Vec::with_capacity(plans.len());

    for (candidate, plan) in plans.iter().enumerate() {
        evaluated.push(evaluate_one(base, candidate, plan, info));

        if started.elapsed() > config.budget {
            debug!(
                evaluated = evaluated.len(),
                total = plans.len(),
                "evaluation budget exhausted, scoring the collected subset"
            );
            break;
        }
    }

    scorer(&evaluated)
}

/// Evaluate candidates on a rayon pool, one exclusive board copy each.
///
/// Semantics match [`evaluate`]: the budget is checked before each battle
/// starts (never mid-battle), candidates that miss the deadline are
/// skipped, and the scorer sees reports in candidate order.
#[cfg(feature = "parallel")]
pub fn evaluate_parallel<I, P, S>(
    base: &BoardSnapshot,
    plans: &[P],
    info: &I,
    scorer: S,
    config: &EvaluatorConfig,
) -> Option<usize>
where
    I: ?Sized + Sync,
    P: DeploymentPlan<I> + Sync,
    S: Fn(&[Evaluated]) -> Option<usize>,
{
    use rayon::prelude::*;

    let deadline = Instant::now() + config.budget;
    let mut evaluated: Vec<Evaluated> = plans
        .par_iter()
        .enumerate()
        .filter_map(|(candidate, plan)| {
            if Instant::now() >= deadline {
                return None;
            }
            Some(evaluate_one(base, candidate, plan, info))
        })
        .collect();

    evaluated.sort_by_key(|e| e.candidate);
    scorer(&evaluated)
}

/// Scorer: best completed score above a floor, falling back to best
/// completed raw damage above a floor.
///
/// Incomplete reports never win - a capped battle's statistics are not
/// authoritative. Ties keep the earliest candidate.
pub fn score_then_damage(
    min_score: u32,
    min_damage: Fixed,
) -> impl Fn(&[Evaluated]) -> Option<usize> {
    move |evaluated| {
        let mut best_score = 0u32;
        let mut pick = None;
        for e in evaluated {
            if e.report.complete && e.report.friendly_score > best_score {
                best_score = e.report.friendly_score;
                pick = Some(e.candidate);
            }
        }
        if best_score > min_score {
            return pick;
        }

        let mut best_damage = Fixed::ZERO;
        let mut pick = None;
        for e in evaluated {
            if e.report.complete && e.report.friendly_damage_dealt > best_damage {
                best_damage = e.report.friendly_damage_dealt;
                pick = Some(e.candidate);
            }
        }
        if best_damage > min_damage {
            return pick;
        }
        None
    }
}

/// Structure-point value of destroyed enemy structures, used to weigh
/// attrition against deployment cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureValueTable {
    base: [Fixed; 6],
    upgraded: [Fixed; 6],
}

impl StructureValueTable {
    /// Value one side's casualty tally in structure points.
    #[must_use]
    pub fn value(&self, losses: &CasualtyTally) -> Fixed {
        let mut total = Fixed::ZERO;
        for kind in UnitKind::ALL {
            total += self.base[kind.index()] * Fixed::from_num(losses.count(kind, false));
            total += self.upgraded[kind.index()] * Fixed::from_num(losses.count(kind, true));
        }
        total
    }
}

impl Default for StructureValueTable {
    /// Replacement-cost weights for the current season: upgraded pieces
    /// are worth their base cost plus the upgrade sunk into them, walls a
    /// token amount.
    fn default() -> Self {
        let mut base = [Fixed::ZERO; 6];
        let mut upgraded = [Fixed::ZERO; 6];
        base[UnitKind::Wall.index()] = Fixed::from_num(0.5);
        base[UnitKind::Support.index()] = Fixed::from_num(4);
        base[UnitKind::Turret.index()] = Fixed::from_num(6);
        upgraded[UnitKind::Wall.index()] = Fixed::from_num(2);
        upgraded[UnitKind::Support.index()] = Fixed::from_num(6);
        upgraded[UnitKind::Turret.index()] = Fixed::from_num(10);
        Self { base, upgraded }
    }
}

/// Scorer: value generated per mobile point spent.
///
/// A candidate's value is `3 x points scored + structure value destroyed`,
/// divided by what it spent; the best ratio wins if it clears `min_ratio`.
/// Free candidates and incomplete reports never win.
pub fn value_per_cost(
    table: StructureValueTable,
    min_ratio: Fixed,
) -> impl Fn(&[Evaluated]) -> Option<usize> {
    move |evaluated| {
        let mut best = Fixed::ZERO;
        let mut pick = None;
        for e in evaluated {
            if !e.report.complete || e.report.mobile_points_spent <= Fixed::ZERO {
                continue;
            }
            let value = Fixed::from_num(3) * Fixed::from_num(e.report.friendly_score)
                + table.value(&e.report.enemy_losses);
            let ratio = value / e.report.mobile_points_spent;
            if ratio > best {
                best = ratio;
                pick = Some(e.candidate);
            }
        }
        if best > min_ratio {
            pick
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::math::Coord;
    use crate::unit::TargetEdge;
    use std::sync::Arc;

    type Plan = fn(&mut BoardSnapshot, &());

    fn base_board() -> BoardSnapshot {
        BoardSnapshot::new(Arc::new(GameRules::default()))
    }

    fn spawn_scout(board: &mut BoardSnapshot, _info: &()) {
        board.attempt_spawn(UnitKind::Scout, Coord::new(13, 0), 1);
    }

    fn hold_back(_board: &mut BoardSnapshot, _info: &()) {}

    #[test]
    fn test_only_scoring_candidate_wins_regardless_of_order() {
        let base = base_board();
        let scorer = score_then_damage(0, Fixed::from_num(1000));
        let config = EvaluatorConfig::default();

        for position in 0..3 {
            let mut plans: Vec<Plan> = vec![hold_back, hold_back, hold_back];
            plans[position] = spawn_scout;
            let winner = evaluate(&base, &plans, &(), &scorer, &config);
            assert_eq!(winner, Some(position));
        }
    }

    #[test]
    fn test_scorer_none_means_no_candidate_is_worth_it() {
        let base = base_board();
        let plans: Vec<Plan> = vec![hold_back, hold_back];
        let winner = evaluate(
            &base,
            &plans,
            &(),
            score_then_damage(8, Fixed::from_num(1000)),
            &EvaluatorConfig::default(),
        );
        assert_eq!(winner, None);
    }

    #[test]
    fn test_zero_budget_scores_only_the_first_candidate() {
        let base = base_board();
        let plans: Vec<Plan> = vec![hold_back, spawn_scout, spawn_scout];
        let config = EvaluatorConfig {
            budget: Duration::ZERO,
        };

        // Only candidate 0 runs before the cutoff; it never scores, so the
        // decision over the collected subset is "do nothing" - and no error.
        let winner = evaluate(
            &base,
            &plans,
            &(),
            score_then_damage(0, Fixed::from_num(1000)),
            &config,
        );
        assert_eq!(winner, None);

        // The scorer still sees exactly one record.
        let seen = std::cell::Cell::new(0usize);
        let _ = evaluate(
            &base,
            &plans,
            &(),
            |evaluated: &[Evaluated]| {
                seen.set(evaluated.len());
                None
            },
            &config,
        );
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_plans_adapt_to_failed_placements() {
        let base = base_board();
        // Wants five demolishers, affords three; the plan reacts to the
        // actual count instead of assuming success.
        let greedy = |board: &mut BoardSnapshot, _info: &()| {
            let placed = board.attempt_spawn(UnitKind::Demolisher, Coord::new(13, 0), 5);
            if placed < 5 {
                board.attempt_spawn(UnitKind::Scout, Coord::new(14, 0), 1);
            }
        };
        let plans = [greedy];

        let spent = std::cell::Cell::new(Fixed::ZERO);
        let _ = evaluate(
            &base,
            &plans,
            &(),
            |evaluated: &[Evaluated]| {
                spent.set(evaluated[0].report.mobile_points_spent);
                None
            },
            &EvaluatorConfig::default(),
        );
        // 3 demolishers at 3 plus the fallback scout at 1.
        assert_eq!(spent.get(), Fixed::from_num(10));
    }

    #[test]
    fn test_value_per_cost_prefers_attrition() {
        let table = StructureValueTable::default();
        let mut cheap = BattleReport {
            complete: true,
            mobile_points_spent: Fixed::from_num(2),
            ..BattleReport::default()
        };
        cheap.enemy_losses.record(UnitKind::Turret, false);

        let expensive = BattleReport {
            complete: true,
            friendly_score: 1,
            mobile_points_spent: Fixed::from_num(10),
            ..BattleReport::default()
        };

        let evaluated = vec![
            Evaluated {
                candidate: 0,
                report: expensive,
            },
            Evaluated {
                candidate: 1,
                report: cheap,
            },
        ];

        // 3/10 vs 6/2: the cheap turret trade wins.
        let scorer = value_per_cost(table, Fixed::from_num(0.5));
        assert_eq!(scorer(&evaluated), Some(1));

        // Raise the floor past both ratios and nothing is worth it.
        let strict = value_per_cost(table, Fixed::from_num(10));
        assert_eq!(strict(&evaluated), None);
    }

    #[test]
    fn test_incomplete_reports_never_win() {
        let complete_low = BattleReport {
            complete: true,
            friendly_score: 2,
            ..BattleReport::default()
        };
        let incomplete_high = BattleReport {
            complete: false,
            friendly_score: 9,
            ..BattleReport::default()
        };
        let evaluated = vec![
            Evaluated {
                candidate: 0,
                report: incomplete_high,
            },
            Evaluated {
                candidate: 1,
                report: complete_low,
            },
        ];

        let scorer = score_then_damage(1, Fixed::from_num(1000));
        assert_eq!(scorer(&evaluated), Some(1));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_agrees_with_sequential() {
        let base = base_board();
        let mut plans: Vec<Plan> = vec![hold_back; 4];
        plans[2] = spawn_scout;

        let scorer = score_then_damage(0, Fixed::from_num(1000));
        let config = EvaluatorConfig::default();
        let sequential = evaluate(&base, &plans, &(), &scorer, &config);
        let parallel = evaluate_parallel(&base, &plans, &(), &scorer, &config);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel, Some(2));
    }
}
