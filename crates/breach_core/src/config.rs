//! Game-balance configuration.
//!
//! Every number the real engine publishes in its rule table lives here:
//! unit stats by kind and upgrade tier, the shield-depth bonus, self-destruct
//! blast radii, the frame ceiling. Nothing in the simulator hardcodes
//! these: components receive a [`GameRules`] value at construction, and
//! balance patches arrive as data, not code changes.
//!
//! Rules are plain serde values and load from RON documents, with a
//! [`Default`] carrying the currently published season table.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{fixed_decimal, Fixed};
use crate::unit::UnitKind;

/// Combat and economy stats for one unit kind at one upgrade tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Health the unit spawns with; also the health ceiling.
    #[serde(with = "fixed_decimal")]
    pub max_health: Fixed,
    /// Attack range (Euclidean, inclusive). Zero for units that cannot attack.
    #[serde(with = "fixed_decimal")]
    pub attack_range: Fixed,
    /// Damage dealt per attack to mobile targets.
    #[serde(with = "fixed_decimal")]
    pub walker_damage: Fixed,
    /// Damage dealt per attack to stationary targets.
    #[serde(with = "fixed_decimal")]
    pub structure_damage: Fixed,
    /// Frames between moves for mobile kinds (1 = moves every frame).
    /// Zero for stationary kinds.
    pub speed: u32,
    /// Shield grant range (support kind only, zero otherwise).
    #[serde(with = "fixed_decimal")]
    pub shield_range: Fixed,
    /// Base shield granted per supported unit (support kind only).
    #[serde(with = "fixed_decimal")]
    pub shield_per_unit: Fixed,
    /// Extra shield per row of depth from the support's own back edge.
    #[serde(with = "fixed_decimal")]
    pub shield_bonus_per_y: Fixed,
    /// Self-destruct blast radius (mobile kinds only, zero otherwise).
    #[serde(with = "fixed_decimal")]
    pub blast_radius: Fixed,
    /// Deployment cost: structure points for stationary kinds, mobile
    /// points for mobile kinds. For the upgraded tier this is the upgrade
    /// cost paid on top of the base placement.
    #[serde(with = "fixed_decimal")]
    pub cost: Fixed,
}

/// Stats for one unit kind at both upgrade tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindRules {
    /// Stats for a freshly placed, non-upgraded unit.
    pub base: UnitStats,
    /// Stats once the unit has been upgraded.
    pub upgraded: UnitStats,
}

/// Per-kind rule table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    /// Wall: cheap blocker, no attack.
    pub wall: KindRules,
    /// Support: grants shield to passing friendly walkers.
    pub support: KindRules,
    /// Turret: stationary attacker, hits mobile units only.
    pub turret: KindRules,
    /// Scout: fast, fragile walker.
    pub scout: KindRules,
    /// Demolisher: slow walker with long range and high damage.
    pub demolisher: KindRules,
    /// Interceptor: durable walker that cannot damage structures but
    /// detonates over a wide radius.
    pub interceptor: KindRules,
}

impl UnitTable {
    /// Rules for one unit kind.
    #[must_use]
    pub const fn kind(&self, kind: UnitKind) -> &KindRules {
        match kind {
            UnitKind::Wall => &self.wall,
            UnitKind::Support => &self.support,
            UnitKind::Turret => &self.turret,
            UnitKind::Scout => &self.scout,
            UnitKind::Demolisher => &self.demolisher,
            UnitKind::Interceptor => &self.interceptor,
        }
    }
}

/// Complete rule configuration for one game season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRules {
    /// Hard ceiling on frames per simulated battle. Hitting it marks the
    /// result incomplete rather than failing.
    pub frame_cap: u32,
    /// Structure points each side starts a turn with.
    #[serde(with = "fixed_decimal")]
    pub starting_structure_points: Fixed,
    /// Mobile points each side starts a turn with.
    #[serde(with = "fixed_decimal")]
    pub starting_mobile_points: Fixed,
    /// Fraction of a structure's cost credited back on removal.
    #[serde(with = "fixed_decimal")]
    pub refund_percentage: Fixed,
    /// Per-kind stats.
    pub units: UnitTable,
}

impl GameRules {
    /// Look up the stats for a kind at an upgrade tier.
    #[must_use]
    pub const fn stats(&self, kind: UnitKind, upgraded: bool) -> &UnitStats {
        let rules = self.units.kind(kind);
        if upgraded {
            &rules.upgraded
        } else {
            &rules.base
        }
    }

    /// Parse rules from a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RulesParse`] if the document is malformed and
    /// [`SimError::InvalidRules`] if it parses but carries unusable values.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let rules: Self = ron::from_str(source).map_err(|e| SimError::RulesParse {
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check the invariants a rule table must satisfy to simulate.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRules`] naming the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.frame_cap == 0 {
            return Err(SimError::InvalidRules("frame_cap must be positive".into()));
        }
        for kind in UnitKind::ALL {
            for (tier, stats) in [
                ("base", &self.units.kind(kind).base),
                ("upgraded", &self.units.kind(kind).upgraded),
            ] {
                if stats.max_health <= Fixed::ZERO {
                    return Err(SimError::InvalidRules(format!(
                        "{kind:?} {tier}: max_health must be positive"
                    )));
                }
                if kind.is_mobile() && stats.speed == 0 {
                    return Err(SimError::InvalidRules(format!(
                        "{kind:?} {tier}: mobile kinds need a positive speed"
                    )));
                }
                if stats.cost < Fixed::ZERO {
                    return Err(SimError::InvalidRules(format!(
                        "{kind:?} {tier}: cost cannot be negative"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for GameRules {
    /// The published season rule table.
    fn default() -> Self {
        let none = Fixed::ZERO;
        let stationary = |health: f64, cost: f64| UnitStats {
            max_health: Fixed::from_num(health),
            attack_range: none,
            walker_damage: none,
            structure_damage: none,
            speed: 0,
            shield_range: none,
            shield_per_unit: none,
            shield_bonus_per_y: none,
            blast_radius: none,
            cost: Fixed::from_num(cost),
        };
        let walker = |health: f64, range: f64, damage: f64, structure: f64, speed: u32, blast: f64, cost: f64| {
            UnitStats {
                max_health: Fixed::from_num(health),
                attack_range: Fixed::from_num(range),
                walker_damage: Fixed::from_num(damage),
                structure_damage: Fixed::from_num(structure),
                speed,
                shield_range: none,
                shield_per_unit: none,
                shield_bonus_per_y: none,
                blast_radius: Fixed::from_num(blast),
                cost: Fixed::from_num(cost),
            }
        };

        let wall = KindRules {
            base: stationary(60.0, 1.0),
            upgraded: UnitStats {
                max_health: Fixed::from_num(120),
                ..stationary(120.0, 1.0)
            },
        };
        let support = KindRules {
            base: UnitStats {
                shield_range: Fixed::from_num(3.5),
                shield_per_unit: Fixed::from_num(3),
                ..stationary(30.0, 4.0)
            },
            upgraded: UnitStats {
                shield_range: Fixed::from_num(7),
                shield_per_unit: Fixed::from_num(4),
                shield_bonus_per_y: Fixed::from_num(0.34),
                ..stationary(30.0, 4.0)
            },
        };
        let turret = KindRules {
            base: UnitStats {
                attack_range: Fixed::from_num(2.5),
                walker_damage: Fixed::from_num(6),
                ..stationary(75.0, 2.0)
            },
            upgraded: UnitStats {
                attack_range: Fixed::from_num(3.5),
                walker_damage: Fixed::from_num(14),
                ..stationary(75.0, 4.0)
            },
        };
        let scout = KindRules {
            base: walker(15.0, 3.5, 2.0, 2.0, 1, 1.5, 1.0),
            upgraded: walker(15.0, 3.5, 2.0, 2.0, 1, 1.5, 1.0),
        };
        let demolisher = KindRules {
            base: walker(5.0, 4.5, 8.0, 8.0, 2, 1.5, 3.0),
            upgraded: walker(5.0, 4.5, 8.0, 8.0, 2, 1.5, 3.0),
        };
        let interceptor = KindRules {
            base: walker(40.0, 4.5, 20.0, 0.0, 4, 9.0, 1.0),
            upgraded: walker(40.0, 4.5, 20.0, 0.0, 4, 9.0, 1.0),
        };

        Self {
            frame_cap: 500,
            starting_structure_points: Fixed::from_num(40),
            starting_mobile_points: Fixed::from_num(10),
            refund_percentage: Fixed::from_num(0.75),
            units: UnitTable {
                wall,
                support,
                turret,
                scout,
                demolisher,
                interceptor,
            },
        }
    }
}
