// Core simulation state and day-tick dispatcher.
//
// `SimState` is the single source of truth for a meadow. It owns the config,
// every plant (`BTreeMap<PlantId, Plant>`, so iteration follows
// registration order), and the `GrowthContext` holding the PRNG, the
// occupancy grid and the visual registry. The outside world drives it by
// calling `pass_day` (or `step` with day-stamped commands) and supplies the
// shadow, season and surface collaborators through an `Environment`.
//
// ## One day
//
// `pass_day` runs:
//
//   1. Sweep: drop units and plants that died during the previous day.
//   2. Advance the day counter and read today's season.
//   3. For each plant registered before this day, in registration order,
//      update each unit that existed when the plant's turn started.
//      Offspring placed during the turn wait for tomorrow.
//   4. After each unit's update, apply what it asked for: offspring
//      placements and evictions first, then its own death if it died.
//
// Death is two-phase. A unit (or plant) that dies is flagged immediately,
// its visual is destroyed and its cells are released, but it stays in the
// collections until the next day's sweep. Dead units are never updated
// again. A plant dies with its last unit; `release_all_by` frees every cell
// it still held.
//
// ## Spawning
//
// Plants enter through `spawn_plant` (commands and start-up seeding). A
// spawn is dropped onto the nearest walkable surface; if there is none, or
// it lands outside the area, the spawn is silently abandoned. The root unit
// claims no cell until its seed sprouts.
//
// Offspring of an existing plant are placed according to the species'
// `PlacementMode`: a near-surface claim (shared or exclusive) made on the
// spot, or a deferred placement that contests its cell when it sprouts.
//
// See also: `growth.rs` for the per-unit state machine, `context.rs` for the
// request types units emit, `occupancy.rs` for the grid.
//
// **Critical constraint: determinism.** All randomness comes from the one
// `SimRng` in the context, all entity iteration is over `BTreeMap`s or
// `Vec`s, and IDs are monotonic. Same seed + same config + same commands +
// same collaborators = same meadow.

use std::collections::BTreeMap;

use meadow_prng::SimRng;

use crate::command::{SimAction, SimCommand};
use crate::config::{ConfigError, SimConfig};
use crate::context::{GrowthContext, GrowthRequest, UnitBody};
use crate::environment::{Environment, SeasonProvider};
use crate::event::{SimEvent, SimEventKind, WitherCause};
use crate::growth::GrowthUnit;
use crate::occupancy::{Claim, OccupancyGrid};
use crate::species::PlacementMode;
use crate::types::*;
use crate::visual::VisualRegistry;

/// A plant organism: one root plus the growth units it has spread into.
#[derive(Debug)]
pub struct Plant {
    pub id: PlantId,
    pub species: Species,
    /// Where the plant was spawned (after surface projection).
    pub root: Position,
    /// Shadow factor at `root`.
    pub shadow: f32,
    pub units: Vec<GrowthUnit>,
    /// Set when the last unit dies; removed at the next sweep.
    pub destroyed: bool,
}

impl Plant {
    pub fn live_units(&self) -> impl Iterator<Item = &GrowthUnit> {
        self.units.iter().filter(|u| !u.is_dead())
    }

    pub fn live_unit_count(&self) -> usize {
        self.live_units().count()
    }
}

/// The result of processing commands and advancing the simulation.
pub struct StepResult {
    /// Narrative events emitted during this step.
    pub events: Vec<SimEvent>,
}

#[derive(Debug)]
pub struct SimState {
    config: SimConfig,
    ctx: GrowthContext,
    plants: BTreeMap<PlantId, Plant>,
    plant_ids: IdCounter,
    unit_ids: IdCounter,
}

impl SimState {
    /// Create a simulation with the default config and the given seed.
    pub fn new(seed: u64) -> Self {
        Self::build(seed, SimConfig::default())
    }

    /// Create a simulation with the given seed and config. The config is
    /// validated (and possibly corrected) first.
    pub fn with_config(seed: u64, mut config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(seed, config))
    }

    fn build(seed: u64, config: SimConfig) -> Self {
        let grid = OccupancyGrid::new(config.layout(), Some(config.area));
        let season = config.calendar().season_on(0);
        Self {
            ctx: GrowthContext::new(SimRng::new(seed), grid, season),
            config,
            plants: BTreeMap::new(),
            plant_ids: IdCounter::default(),
            unit_ids: IdCounter::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of days passed so far.
    pub fn day(&self) -> u64 {
        self.ctx.day
    }

    pub fn season(&self) -> Season {
        self.ctx.season
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.ctx.grid
    }

    pub fn visuals(&self) -> &VisualRegistry {
        &self.ctx.visuals
    }

    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.get(&id)
    }

    /// All plants still held, including ones destroyed today.
    pub fn plants(&self) -> impl Iterator<Item = &Plant> {
        self.plants.values()
    }

    pub fn live_plant_count(&self) -> usize {
        self.plants.values().filter(|p| !p.destroyed).count()
    }

    pub fn live_unit_count(&self) -> usize {
        self.plants.values().map(Plant::live_unit_count).sum()
    }

    /// Live units per species.
    pub fn census(&self) -> BTreeMap<Species, usize> {
        let mut counts = BTreeMap::new();
        for plant in self.plants.values() {
            let live = plant.live_unit_count();
            if live > 0 {
                *counts.entry(plant.species).or_insert(0) += live;
            }
        }
        counts
    }

    /// Take the events recorded since the last drain (spawns made outside
    /// `pass_day` land here).
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.ctx.events)
    }

    // -----------------------------------------------------------------------
    // Spawning
    // -----------------------------------------------------------------------

    /// Register a new plant with one seed unit at `position`, dropped onto
    /// the nearest walkable surface. Returns `None` if there is no surface
    /// in reach, the spot is outside the area, or the species has no data.
    pub fn spawn_plant(
        &mut self,
        species: Species,
        position: Position,
        env: &Environment<'_>,
    ) -> Option<PlantId> {
        let data = match self.config.species_data(species) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("{err}; spawn at {position} ignored");
                return None;
            }
        };
        let Some(ground) = env
            .surfaces
            .nearest_walkable_surface(position, self.config.spawn_max_vertical_delta)
        else {
            log::debug!("{species:?} spawn at {position} abandoned: no walkable surface");
            return None;
        };
        if !self.config.area.contains(ground) {
            log::debug!("{species:?} spawn at {ground} abandoned: outside the area");
            return None;
        }

        let shadow = env.shadow.shadow_at(ground);
        let plant_id = PlantId(self.plant_ids.next_raw());
        self.ctx.species_of.insert(plant_id, species);
        let body = UnitBody::new(UnitId(self.unit_ids.next_raw()), plant_id, ground, shadow);
        let root = GrowthUnit::spawn(body, data, &mut self.ctx);
        self.plants.insert(
            plant_id,
            Plant {
                id: plant_id,
                species,
                root: ground,
                shadow,
                units: vec![root],
                destroyed: false,
            },
        );
        self.ctx.emit(SimEventKind::PlantSpawned {
            plant_id,
            species,
            position: ground,
        });
        log::debug!("spawned {plant_id} ({species:?}) at {ground}, shadow {shadow:.2}");
        Some(plant_id)
    }

    /// Scatter `count` plants of `species` at random spots in the area.
    /// A spot with no surface below is pulled toward the area center in
    /// tenths until one is found. Returns how many plants were spawned.
    pub fn seed_population(&mut self, species: Species, count: u32, env: &Environment<'_>) -> u32 {
        let area = self.config.area;
        let center = area.center();
        let reach = self.config.spawn_max_vertical_delta;
        let mut spawned = 0;
        for _ in 0..count {
            let x = self.ctx.rng.range_f32_or_low(area.min_x, area.max_x);
            let z = self.ctx.rng.range_f32_or_low(area.min_z, area.max_z);
            let y = self.ctx.rng.range_f32_or_low(-reach, reach);
            let ground = (0..=10).find_map(|step| {
                let t = step as f32 / 10.0;
                let spot = Position::new(x + (center.x - x) * t, y, z + (center.z - z) * t);
                env.surfaces.nearest_walkable_surface(spot, reach)
            });
            match ground {
                Some(ground) => {
                    if self.spawn_plant(species, ground, env).is_some() {
                        spawned += 1;
                    }
                }
                None => log::debug!("no surface found for {species:?} near ({x:.2}, {z:.2})"),
            }
        }
        spawned
    }

    /// Scatter the configured start-up population.
    pub fn seed_initial_population(&mut self, env: &Environment<'_>) -> u32 {
        let seeds = self.config.initial_seeds.clone();
        let spawned: u32 = seeds
            .into_iter()
            .map(|(species, count)| self.seed_population(species, count, env))
            .sum();
        log::info!("seeded {spawned} plants");
        spawned
    }

    // -----------------------------------------------------------------------
    // Day tick
    // -----------------------------------------------------------------------

    /// Advance the meadow by one day. Returns the day's events (plus any
    /// produced by spawns since the last drain).
    pub fn pass_day(&mut self, env: &Environment<'_>) -> Vec<SimEvent> {
        self.sweep();
        self.ctx.day += 1;
        self.ctx.season = env.seasons.season_on(self.ctx.day);

        let ids: Vec<PlantId> = self.plants.keys().copied().collect();
        for id in ids {
            self.run_plant(id, env);
        }

        log::trace!(
            "day {} ({}): {} plants, {} live units, {} cells occupied",
            self.ctx.day,
            self.ctx.season,
            self.live_plant_count(),
            self.live_unit_count(),
            self.ctx.grid.occupied_count(),
        );
        self.drain_events()
    }

    /// Apply a batch of day-stamped commands and pass days until
    /// `target_day`. Commands must be sorted by day; a command stamped `d`
    /// is applied once the sim has reached day `d`. Commands past
    /// `target_day` are ignored.
    pub fn step(
        &mut self,
        commands: &[SimCommand],
        target_day: u64,
        env: &Environment<'_>,
    ) -> StepResult {
        let mut events = Vec::new();
        let mut cmd_idx = 0;
        loop {
            while cmd_idx < commands.len() && commands[cmd_idx].day <= self.ctx.day {
                self.apply_command(&commands[cmd_idx], env);
                cmd_idx += 1;
            }
            if self.ctx.day >= target_day {
                break;
            }
            events.extend(self.pass_day(env));
        }
        events.extend(self.drain_events());
        StepResult { events }
    }

    fn apply_command(&mut self, cmd: &SimCommand, env: &Environment<'_>) {
        match cmd.action {
            SimAction::SpawnPlant { species, position } => {
                self.spawn_plant(species, position, env);
            }
            SimAction::SeedPopulation { species, count } => {
                self.seed_population(species, count, env);
            }
        }
    }

    /// Drop units and plants flagged dead during the previous day.
    fn sweep(&mut self) {
        for plant in self.plants.values_mut() {
            plant.units.retain(|u| !u.is_dead());
        }
        let species_of = &mut self.ctx.species_of;
        self.plants.retain(|id, plant| {
            if plant.destroyed {
                species_of.remove(id);
            }
            !plant.destroyed
        });
    }

    fn run_plant(&mut self, id: PlantId, env: &Environment<'_>) {
        let count = match self.plants.get(&id) {
            Some(plant) if !plant.destroyed => plant.units.len(),
            _ => return,
        };
        for index in 0..count {
            let Some(plant) = self.plants.get_mut(&id) else {
                return;
            };
            if plant.destroyed {
                return;
            }
            let unit = &mut plant.units[index];
            if unit.is_dead() {
                continue;
            }
            unit.update(&mut self.ctx);
            self.settle_unit(id, index, env);
        }
    }

    /// Apply the requests and fate of the unit that just updated.
    fn settle_unit(&mut self, plant_id: PlantId, index: usize, env: &Environment<'_>) {
        let Some(unit) = self.plants.get(&plant_id).map(|p| &p.units[index]) else {
            return;
        };
        let parent = unit.body.id;
        let fate = unit.body.fate;

        for request in std::mem::take(&mut self.ctx.requests) {
            match request {
                GrowthRequest::Offspring { position } => {
                    self.place_offspring(plant_id, parent, position, env);
                }
                GrowthRequest::Evict { cell, victim } => self.evict(plant_id, victim, cell),
            }
        }
        if let Some(cause) = fate {
            self.retire_unit(plant_id, index, cause);
        }
    }

    fn place_offspring(
        &mut self,
        plant_id: PlantId,
        parent: UnitId,
        position: Position,
        env: &Environment<'_>,
    ) {
        let Some(species) = self
            .plants
            .get(&plant_id)
            .filter(|p| !p.destroyed)
            .map(|p| p.species)
        else {
            return;
        };
        let Ok(data) = self.config.species_data(species) else {
            return;
        };

        let (ground, shadow, cell) = match data.placement {
            PlacementMode::ClaimShared | PlacementMode::ClaimExclusive => {
                let claim = if data.placement == PlacementMode::ClaimExclusive {
                    Claim::Exclusive
                } else {
                    Claim::AllowSelf
                };
                match self.ctx.grid.occupy_near_surface(
                    position,
                    plant_id,
                    self.config.surface_tolerance,
                    claim,
                    env.surfaces,
                    env.shadow,
                ) {
                    Some(claimed) => (claimed.position, claimed.shadow, Some(claimed.cell)),
                    None => {
                        log::trace!("{plant_id} offspring at {position} found no free surface");
                        return;
                    }
                }
            }
            PlacementMode::Deferred => {
                let Some(ground) = env
                    .surfaces
                    .nearest_walkable_surface(position, self.config.spawn_max_vertical_delta)
                    .filter(|g| self.ctx.grid.in_area(*g))
                else {
                    log::trace!("{plant_id} offspring at {position} has nowhere to land");
                    return;
                };
                (ground, env.shadow.shadow_at(ground), None)
            }
        };

        let unit_id = UnitId(self.unit_ids.next_raw());
        let mut body = UnitBody::new(unit_id, plant_id, ground, shadow);
        body.claimed_cell = cell;
        let unit = GrowthUnit::spawn(body, data, &mut self.ctx);
        if let Some(plant) = self.plants.get_mut(&plant_id) {
            plant.units.push(unit);
        }
        self.ctx.emit(SimEventKind::OffspringPlaced {
            plant_id,
            parent,
            unit_id,
            position: ground,
        });
    }

    /// `absorber` took `cell` from `victim`: the victim's units rooted in
    /// that cell die.
    fn evict(&mut self, absorber: PlantId, victim: PlantId, cell: CellCoord) {
        self.ctx.emit(SimEventKind::CellAbsorbed {
            absorber,
            victim,
            cell,
        });
        log::debug!("{absorber} absorbed {cell} from {victim}");

        let Some(plant) = self.plants.get(&victim).filter(|p| !p.destroyed) else {
            return;
        };
        let doomed: Vec<usize> = plant
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| !u.is_dead() && u.body.claimed_cell == Some(cell))
            .map(|(i, _)| i)
            .collect();
        for index in doomed {
            self.retire_unit(victim, index, WitherCause::Absorbed);
        }
    }

    /// Finish off a unit: record its fate, destroy its visual, release its
    /// cell unless a live sibling shares it, and destroy the plant if this
    /// was its last live unit.
    fn retire_unit(&mut self, plant_id: PlantId, index: usize, cause: WitherCause) {
        let Some(plant) = self.plants.get_mut(&plant_id) else {
            return;
        };
        let unit = &mut plant.units[index];
        unit.body.wither(cause);
        let cause = unit.body.fate.unwrap_or(cause);
        let unit_id = unit.body.id;
        let cell = unit.body.claimed_cell;
        if let Some(handle) = unit.body.visual.take() {
            self.ctx.visuals.destroy(handle);
        }

        if let Some(cell) = cell {
            let shared = plant
                .live_units()
                .any(|u| u.body.claimed_cell == Some(cell));
            if !shared {
                self.ctx.grid.release_if_held(cell, plant_id);
            }
        }
        self.ctx.emit(SimEventKind::UnitWithered {
            plant_id,
            unit_id,
            cause,
        });
        log::debug!("{unit_id} of {plant_id} withered: {cause:?}");

        if plant.live_unit_count() == 0 {
            plant.destroyed = true;
            let released = self.ctx.grid.release_all_by(plant_id);
            self.ctx.emit(SimEventKind::PlantDied { plant_id });
            log::debug!(
                "{plant_id} ({:?}) died on day {}, released {released} cells",
                plant.species,
                self.ctx.day
            );
        }
    }
}
