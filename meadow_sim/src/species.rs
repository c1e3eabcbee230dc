// Species data: data-driven plant configuration.
//
// Every behavioral difference between plant species is expressed as data in
// `SpeciesData`, keyed by `Species` in the sim config. One generic set of
// growth states (see `growth.rs`) reads these parameters at runtime; there is
// no per-species state code.
//
// A species is a combination of:
// - seed germination (`SeedParams`): daily chance, shadow curve, survival
//   window;
// - a growth target (`GrowthTarget`): fixed days, scale threshold, or a
//   number of neighbor absorptions;
// - optional offspring trials while growing and/or mature, plus how new
//   seeds claim their cell (`PlacementMode`);
// - optional mature lifespan and offspring cap;
// - optional seasonal dormancy;
// - optional cell contention (`AbsorptionParams`).
//
// See also: `config.rs` where the species table lives, `types.rs` for the
// `Species` enum.
//
// **Critical constraint: determinism.** Species data is part of the sim
// config; two runs only match if their configs match.

use serde::{Deserialize, Serialize};

use crate::shadow::ShadowCurve;
use crate::types::{Season, Species};

/// Data-driven behavioral parameters for a plant species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesData {
    pub seed: SeedParams,
    pub growth: GrowthTarget,
    /// Offspring trials while still growing (stolon-style spread).
    pub growing_offspring: Option<OffspringParams>,
    /// Offspring trials once mature.
    pub mature_offspring: Option<OffspringParams>,
    pub placement: PlacementMode,
    /// Days a mature unit lives. `None` = until something else kills it.
    pub mature_lifespan_days: Option<u32>,
    /// The mature unit dies after placing this many offspring.
    pub offspring_cap: Option<u32>,
    pub dormancy: Option<DormancyParams>,
    /// Present for species that contest cells with rivals.
    pub absorption: Option<AbsorptionParams>,
    /// Give leaf visuals a random rotation about the vertical axis.
    pub random_yaw: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedParams {
    /// Base probability per day that the seed germinates.
    pub daily_growth_chance: f32,
    pub survival_days_average: u32,
    /// Survival is drawn uniformly from `average ± variation`, inclusive.
    pub survival_days_variation: u32,
    pub shadow_curve: ShadowCurve,
    /// Whether seeds get a visual placeholder while waiting.
    pub placeholder_visual: bool,
}

/// What "grown up" means for a species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GrowthTarget {
    /// Mature after a fixed number of growing days. Visual scale is lerped
    /// from `initial_scale` to `final_scale` over that span.
    Days {
        days: u32,
        initial_scale: f32,
        final_scale: f32,
    },
    /// Scale grows by `daily_gain` until it exceeds a per-unit threshold
    /// drawn from `[min_target, max_target)`.
    Scale {
        initial_scale: f32,
        daily_gain: f32,
        min_target: f32,
        max_target: f32,
    },
    /// Mature after absorbing `count` rival neighbors.
    Absorptions { count: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffspringParams {
    pub daily_chance: f32,
    pub shadow_curve: ShadowCurve,
    /// Horizontal distance from the parent at which the seed lands.
    pub spread_distance: f32,
    /// Maximum random vertical offset before surface projection.
    pub vertical_jitter: f32,
}

impl OffspringParams {
    pub fn new(daily_chance: f32, spread_distance: f32) -> Self {
        Self {
            daily_chance,
            shadow_curve: ShadowCurve::IGNORE,
            spread_distance,
            vertical_jitter: 0.0,
        }
    }
}

/// How a newly placed seed claims its cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Near-surface claim that may reuse the parent plant's own cells.
    ClaimShared,
    /// Near-surface claim that requires an unoccupied cell.
    ClaimExclusive,
    /// No claim on placement; the seed contests its cell when it sprouts.
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DormancyParams {
    pub season: Season,
    pub daily_wither_chance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbsorptionParams {
    /// Days between absorption attempts, drawn inclusive each time.
    pub interval_min_days: u32,
    pub interval_max_days: u32,
    /// Keep absorbing after maturity.
    pub absorb_while_mature: bool,
    /// Lifetime absorptions after which the unit dies.
    pub lifetime_limit: Option<u32>,
}

impl SpeciesData {
    pub fn contests_cells(&self) -> bool {
        self.absorption.is_some()
    }

    /// Built-in parameters for `species`.
    pub fn default_for(species: Species) -> Self {
        match species {
            Species::Grass => Self::grass(),
            Species::BlueGrass => Self::blue_grass(),
            Species::TestPlant => Self::test_plant(),
            Species::Annual => Self::annual(),
        }
    }

    pub fn grass() -> Self {
        Self {
            seed: SeedParams {
                daily_growth_chance: 0.01,
                survival_days_average: 17,
                survival_days_variation: 12,
                shadow_curve: ShadowCurve::sun(0.9, 0.0, 0.25, 1.0),
                placeholder_visual: true,
            },
            growth: GrowthTarget::Days {
                days: 30,
                initial_scale: 0.1,
                final_scale: 0.2,
            },
            growing_offspring: None,
            mature_offspring: Some(OffspringParams::new(0.01, 0.5)),
            placement: PlacementMode::ClaimShared,
            mature_lifespan_days: Some(50),
            offspring_cap: None,
            dormancy: None,
            absorption: None,
            random_yaw: false,
        }
    }

    pub fn blue_grass() -> Self {
        Self {
            seed: SeedParams {
                daily_growth_chance: 0.01,
                survival_days_average: 17,
                survival_days_variation: 12,
                shadow_curve: ShadowCurve::shade(0.9, 0.0, 0.25, 1.0),
                placeholder_visual: true,
            },
            growth: GrowthTarget::Scale {
                initial_scale: 0.75,
                daily_gain: 0.0025,
                min_target: 0.9,
                max_target: 1.1,
            },
            growing_offspring: Some(OffspringParams {
                daily_chance: 0.12,
                shadow_curve: ShadowCurve::shade(0.45, 0.5, 0.0, 1.0),
                spread_distance: 0.5,
                vertical_jitter: 2.5,
            }),
            mature_offspring: Some(OffspringParams::new(0.12, 0.5)),
            placement: PlacementMode::ClaimExclusive,
            mature_lifespan_days: None,
            offspring_cap: None,
            dormancy: Some(DormancyParams {
                season: Season::Winter,
                daily_wither_chance: 0.001,
            }),
            absorption: None,
            random_yaw: true,
        }
    }

    pub fn test_plant() -> Self {
        Self {
            seed: SeedParams {
                daily_growth_chance: 0.01,
                survival_days_average: 17,
                survival_days_variation: 12,
                shadow_curve: ShadowCurve::IGNORE,
                placeholder_visual: false,
            },
            growth: GrowthTarget::Absorptions { count: 4 },
            growing_offspring: None,
            mature_offspring: Some(OffspringParams::new(0.10, 0.5)),
            placement: PlacementMode::Deferred,
            mature_lifespan_days: None,
            offspring_cap: Some(100),
            dormancy: Some(DormancyParams {
                season: Season::Autumn,
                daily_wither_chance: 0.0,
            }),
            absorption: Some(AbsorptionParams {
                interval_min_days: 1,
                interval_max_days: 91,
                absorb_while_mature: true,
                lifetime_limit: Some(8),
            }),
            random_yaw: true,
        }
    }

    pub fn annual() -> Self {
        Self {
            seed: SeedParams {
                daily_growth_chance: 0.05,
                survival_days_average: 15,
                survival_days_variation: 5,
                shadow_curve: ShadowCurve::IGNORE,
                placeholder_visual: true,
            },
            growth: GrowthTarget::Days {
                days: 30,
                initial_scale: 0.1,
                final_scale: 0.4,
            },
            growing_offspring: None,
            mature_offspring: None,
            placement: PlacementMode::ClaimShared,
            mature_lifespan_days: None,
            offspring_cap: None,
            dormancy: None,
            absorption: None,
            random_yaw: false,
        }
    }
}
