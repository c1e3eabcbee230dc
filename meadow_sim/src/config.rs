// Data-driven simulation configuration.
//
// All tunable parameters live in `SimConfig`: grid quantization, the
// simulation area, surface projection limits, the season calendar, how many
// plants of each species are scattered at start-up, and the per-species
// `SpeciesData` table (see `species.rs`). `Default` reproduces the built-in
// meadow without any file; `from_json` loads and validates an override.
//
// `validate` rejects values the simulation cannot run with (`ConfigError`)
// and repairs the one value it can: a seed survival variation that would
// allow zero-day survival widens the average instead, with a warning.
//
// See also: `sim.rs` which owns the `SimConfig` as part of `SimState`,
// `species.rs` for `SpeciesData`, `calendar.rs` for `SeasonLengths`.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic. Identical configs and seeds give identical runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{SeasonCycle, SeasonLengths};
use crate::occupancy::{Area, GridLayout};
use crate::species::{GrowthTarget, SpeciesData};
use crate::types::{Season, Species};

/// Errors raised when a configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{species:?}: {field} = {value} is not a probability in [0, 1]")]
    InvalidProbability {
        species: Species,
        field: &'static str,
        value: f32,
    },
    #[error("cell size on axis {axis} must be positive and finite, got {value}")]
    InvalidCellSize { axis: usize, value: f32 },
    #[error("simulation area is empty or inverted: {0:?}")]
    InvalidArea(Area),
    #[error("no species data configured for {0:?}")]
    MissingSpecies(Species),
    #[error("{species:?}: absorption interval {min}..={max} days is invalid")]
    InvalidAbsorptionInterval { species: Species, min: u32, max: u32 },
    #[error("{species:?}: growth target is invalid ({reason})")]
    InvalidGrowthTarget {
        species: Species,
        reason: &'static str,
    },
    #[error("{species:?}: seed survival {average} ± {variation} days overflows")]
    SurvivalOverflow {
        species: Species,
        average: u32,
        variation: u32,
    },
    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Per-axis size of one occupancy cell in world units.
    pub cell_size: [f32; 3],

    /// Horizontal extent of the meadow. Claims outside it fail.
    pub area: Area,

    /// How far (vertically) initial and commanded spawns may be moved to
    /// reach a walkable surface.
    pub spawn_max_vertical_delta: f32,

    /// How close an offspring position must be to a surface to be placed.
    pub surface_tolerance: f32,

    /// Plants scattered by `SimState::seed_initial_population`.
    pub initial_seeds: BTreeMap<Species, u32>,

    pub season_lengths: SeasonLengths,
    pub starting_season: Season,

    /// Per-species behavioral data, keyed by `Species`.
    pub species: BTreeMap<Species, SpeciesData>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let species = [
            Species::Grass,
            Species::BlueGrass,
            Species::TestPlant,
            Species::Annual,
        ]
        .into_iter()
        .map(|s| (s, SpeciesData::default_for(s)))
        .collect();

        let mut initial_seeds = BTreeMap::new();
        initial_seeds.insert(Species::Grass, 20);
        initial_seeds.insert(Species::BlueGrass, 10);
        initial_seeds.insert(Species::TestPlant, 5);

        Self {
            cell_size: [0.4, 0.5, 0.4],
            area: Area {
                min_x: -10.0,
                min_z: -10.0,
                max_x: 10.0,
                max_z: 10.0,
            },
            spawn_max_vertical_delta: 3.0,
            surface_tolerance: 0.01,
            initial_seeds,
            season_lengths: SeasonLengths::default(),
            starting_season: Season::Spring,
            species,
        }
    }
}

fn check_probability(species: Species, field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            species,
            field,
            value,
        })
    }
}

impl SimConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.cell_size)
    }

    pub fn calendar(&self) -> SeasonCycle {
        SeasonCycle::new(self.season_lengths, self.starting_season)
    }

    pub fn species_data(&self, species: Species) -> Result<&SpeciesData, ConfigError> {
        self.species
            .get(&species)
            .ok_or(ConfigError::MissingSpecies(species))
    }

    /// Reject unusable values; widen seed survival averages that would let
    /// a seed die on day zero.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for (axis, &value) in self.cell_size.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidCellSize { axis, value });
            }
        }
        let area = self.area;
        if !(area.min_x < area.max_x && area.min_z < area.max_z) {
            return Err(ConfigError::InvalidArea(area));
        }
        for species in self.initial_seeds.keys() {
            if !self.species.contains_key(species) {
                return Err(ConfigError::MissingSpecies(*species));
            }
        }

        for (&species, data) in self.species.iter_mut() {
            check_probability(species, "seed.daily_growth_chance", data.seed.daily_growth_chance)?;
            if let Some(o) = &data.growing_offspring {
                check_probability(species, "growing_offspring.daily_chance", o.daily_chance)?;
            }
            if let Some(o) = &data.mature_offspring {
                check_probability(species, "mature_offspring.daily_chance", o.daily_chance)?;
            }
            if let Some(d) = &data.dormancy {
                check_probability(species, "dormancy.daily_wither_chance", d.daily_wither_chance)?;
            }
            if let Some(a) = &data.absorption {
                if a.interval_min_days == 0 || a.interval_min_days > a.interval_max_days {
                    return Err(ConfigError::InvalidAbsorptionInterval {
                        species,
                        min: a.interval_min_days,
                        max: a.interval_max_days,
                    });
                }
            }
            match data.growth {
                GrowthTarget::Scale {
                    min_target,
                    max_target,
                    ..
                } if min_target > max_target => {
                    return Err(ConfigError::InvalidGrowthTarget {
                        species,
                        reason: "min_target exceeds max_target",
                    });
                }
                GrowthTarget::Absorptions { .. } if data.absorption.is_none() => {
                    return Err(ConfigError::InvalidGrowthTarget {
                        species,
                        reason: "absorption target without absorption parameters",
                    });
                }
                _ => {}
            }

            let seed = &mut data.seed;
            let overflow = ConfigError::SurvivalOverflow {
                species,
                average: seed.survival_days_average,
                variation: seed.survival_days_variation,
            };
            if seed.survival_days_variation >= seed.survival_days_average {
                let Some(widened) = seed.survival_days_variation.checked_add(1) else {
                    return Err(overflow);
                };
                log::warn!(
                    "{species:?}: survival {} ± {} days allows zero; average widened to {widened}",
                    seed.survival_days_average,
                    seed.survival_days_variation,
                );
                seed.survival_days_average = widened;
            }
            if seed
                .survival_days_average
                .checked_add(seed.survival_days_variation)
                .is_none()
            {
                return Err(overflow);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let mut config = SimConfig::default();
        let before = config.clone();
        config.validate().unwrap();
        assert_eq!(config, before);
    }

    #[test]
    fn default_config_serializes() {
        let config = SimConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = SimConfig::from_json(&json).unwrap();
        assert_eq!(config.cell_size, restored.cell_size);
        assert_eq!(config.species.len(), restored.species.len());
        let grass = &restored.species[&Species::Grass];
        assert_eq!(grass.mature_lifespan_days, Some(50));
    }

    #[test]
    fn survival_variation_widens_average() {
        let mut config = SimConfig::default();
        let seed = &mut config.species.get_mut(&Species::Grass).unwrap().seed;
        seed.survival_days_average = 5;
        seed.survival_days_variation = 8;
        config.validate().unwrap();
        let seed = &config.species[&Species::Grass].seed;
        assert_eq!(seed.survival_days_average, 9);
        assert_eq!(seed.survival_days_variation, 8);
    }

    #[test]
    fn bad_probability_is_rejected() {
        let mut config = SimConfig::default();
        config
            .species
            .get_mut(&Species::BlueGrass)
            .unwrap()
            .seed
            .daily_growth_chance = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidProbability {
                species: Species::BlueGrass,
                ..
            }
        ));
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let mut config = SimConfig::default();
        config.cell_size[1] = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCellSize { axis: 1, .. })
        ));

        let mut config = SimConfig::default();
        config.area.max_x = config.area.min_x;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidArea(_))));
    }

    #[test]
    fn seeding_unknown_species_is_rejected() {
        let mut config = SimConfig::default();
        config.species.remove(&Species::TestPlant);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSpecies(Species::TestPlant))
        ));
    }

    #[test]
    fn overflowing_survival_window_is_rejected() {
        let mut config = SimConfig::default();
        let seed = &mut config.species.get_mut(&Species::Annual).unwrap().seed;
        seed.survival_days_average = u32::MAX;
        seed.survival_days_variation = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SurvivalOverflow {
                species: Species::Annual,
                ..
            })
        ));

        let mut config = SimConfig::default();
        let seed = &mut config.species.get_mut(&Species::Annual).unwrap().seed;
        seed.survival_days_average = 3;
        seed.survival_days_variation = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SurvivalOverflow { .. })
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("malformed config JSON"));
    }
}
