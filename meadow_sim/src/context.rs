// Shared context handed to every growth-state call.
//
// A `GrowthContext` carries what a state may touch while it runs: the day
// and season, the simulation's random stream, the occupancy grid, the visual
// registry, and the body of the unit currently being updated. States never
// reach the plant table or other units; anything that affects them (placing
// offspring, evicting a rival's unit) is queued as a `GrowthRequest` and
// applied by the dispatcher after the unit's update returns.
//
// The unit body is moved into the context for the duration of the unit's
// update and moved back afterwards (`GrowthUnit::update` swaps it), so the
// context owns no borrowed data and can be threaded through the boxed
// transition closures.

use std::collections::BTreeMap;

use meadow_prng::SimRng;

use crate::event::{SimEvent, SimEventKind, WitherCause};
use crate::occupancy::{Claim, OccupancyGrid};
use crate::types::{CellCoord, PlantId, Position, Season, Species, UnitId, VisualHandle};
use crate::visual::VisualRegistry;

/// Per-unit data that lives outside the state machine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitBody {
    pub id: UnitId,
    pub plant: PlantId,
    pub position: Position,
    /// Shadow factor at `position`, sampled when the unit was placed.
    pub shadow: f32,
    pub visual: Option<VisualHandle>,
    pub claimed_cell: Option<CellCoord>,
    /// Current visual scale.
    pub scale: f32,
    /// Neighbor cells absorbed over the unit's life.
    pub absorbed: u32,
    /// Set once the unit dies. A unit with a fate is never updated again.
    pub fate: Option<WitherCause>,
}

impl UnitBody {
    pub fn new(id: UnitId, plant: PlantId, position: Position, shadow: f32) -> Self {
        Self {
            id,
            plant,
            position,
            shadow,
            scale: 1.0,
            ..Self::default()
        }
    }

    pub fn is_dead(&self) -> bool {
        self.fate.is_some()
    }

    pub fn wither(&mut self, cause: WitherCause) {
        if self.fate.is_none() {
            self.fate = Some(cause);
        }
    }
}

/// Side effects a unit asks the dispatcher to apply after its update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrowthRequest {
    /// Place a new seed unit for the current unit's plant near `position`.
    Offspring { position: Position },
    /// `cell` was taken from `victim`; kill the victim's units rooted there.
    Evict { cell: CellCoord, victim: PlantId },
}

/// Outcome of one absorption attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsorbOutcome {
    Empty,
    Kin,
    Absorbed,
}

#[derive(Debug)]
pub struct GrowthContext {
    pub day: u64,
    pub season: Season,
    pub rng: SimRng,
    pub grid: OccupancyGrid,
    pub visuals: VisualRegistry,
    /// Species of every registered plant, for kin checks.
    pub species_of: BTreeMap<PlantId, Species>,
    /// Body of the unit being updated.
    pub unit: UnitBody,
    pub requests: Vec<GrowthRequest>,
    /// Events produced since the last drain.
    pub events: Vec<SimEvent>,
}

impl GrowthContext {
    pub fn new(rng: SimRng, grid: OccupancyGrid, season: Season) -> Self {
        Self {
            day: 0,
            season,
            rng,
            grid,
            visuals: VisualRegistry::default(),
            species_of: BTreeMap::new(),
            unit: UnitBody::default(),
            requests: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            day: self.day,
            kind,
        });
    }

    /// Whether `other` is the same species as the current unit's plant.
    pub fn is_kin(&self, other: PlantId) -> bool {
        let own = self.species_of.get(&self.unit.plant);
        own.is_some() && own == self.species_of.get(&other)
    }

    pub fn destroy_unit_visual(&mut self) {
        if let Some(handle) = self.unit.visual.take() {
            self.visuals.destroy(handle);
        }
    }

    /// Claim the current unit's cell for its plant.
    ///
    /// A contesting unit first inspects the cell: kin there withers it, a
    /// rival there is evicted. Records the claimed cell on success.
    pub fn claim_unit_cell(&mut self, contest: bool) -> Result<CellCoord, WitherCause> {
        let position = self.unit.position;
        let plant = self.unit.plant;
        let cell = self.grid.cell_of(position);

        if contest {
            match self.grid.occupant(cell) {
                Some(occupant) if self.is_kin(occupant) => return Err(WitherCause::KinInCell),
                Some(victim) => {
                    if !self.grid.in_area(position) {
                        return Err(WitherCause::CellTaken);
                    }
                    self.grid.release_cell(cell);
                    self.requests.push(GrowthRequest::Evict { cell, victim });
                }
                None => {}
            }
        }

        if self.grid.occupy_with(position, plant, Claim::AllowSelf) {
            self.unit.claimed_cell = Some(cell);
            Ok(cell)
        } else {
            Err(WitherCause::CellTaken)
        }
    }

    /// Pick a random horizontal neighbor cell and take it if a rival holds
    /// it. The direction may be zero, which always lands on kin.
    pub fn try_absorb(&mut self) -> AbsorbOutcome {
        let direction = CellCoord::new(
            self.rng.range_i32_inclusive(-1, 1),
            0,
            self.rng.range_i32_inclusive(-1, 1),
        );
        match self.grid.neighbor_at(self.unit.position, direction) {
            None => AbsorbOutcome::Empty,
            Some(occupant) if self.is_kin(occupant) => AbsorbOutcome::Kin,
            Some(victim) => {
                let cell = self.grid.cell_of(self.unit.position).offset(direction);
                self.grid.release_cell(cell);
                self.grid.occupy_cell(cell, self.unit.plant, Claim::AllowSelf);
                self.requests.push(GrowthRequest::Evict { cell, victim });
                self.unit.absorbed += 1;
                AbsorbOutcome::Absorbed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::GridLayout;

    fn ctx() -> GrowthContext {
        let grid = OccupancyGrid::new(GridLayout::new([1.0, 1.0, 1.0]), None);
        let mut ctx = GrowthContext::new(SimRng::new(5), grid, Season::Spring);
        ctx.species_of.insert(PlantId(0), Species::TestPlant);
        ctx.species_of.insert(PlantId(1), Species::Grass);
        ctx.species_of.insert(PlantId(2), Species::TestPlant);
        ctx.unit = UnitBody::new(UnitId(0), PlantId(0), Position::new(0.5, 0.0, 0.5), 0.0);
        ctx
    }

    #[test]
    fn uncontested_claim_records_cell() {
        let mut ctx = ctx();
        let cell = ctx.claim_unit_cell(false).unwrap();
        assert_eq!(ctx.unit.claimed_cell, Some(cell));
        assert_eq!(ctx.grid.occupant(cell), Some(PlantId(0)));
    }

    #[test]
    fn claim_fails_on_foreign_cell_without_contest() {
        let mut ctx = ctx();
        ctx.grid.occupy(ctx.unit.position, PlantId(1));
        assert_eq!(ctx.claim_unit_cell(false), Err(WitherCause::CellTaken));
        assert!(ctx.requests.is_empty());
    }

    #[test]
    fn contest_evicts_rival_but_not_kin() {
        let mut ctx = ctx();
        ctx.grid.occupy(ctx.unit.position, PlantId(1));
        let cell = ctx.claim_unit_cell(true).unwrap();
        assert_eq!(ctx.grid.occupant(cell), Some(PlantId(0)));
        assert_eq!(
            ctx.requests,
            vec![GrowthRequest::Evict {
                cell,
                victim: PlantId(1)
            }]
        );

        let mut ctx = self::ctx();
        ctx.grid.occupy(ctx.unit.position, PlantId(2));
        assert_eq!(ctx.claim_unit_cell(true), Err(WitherCause::KinInCell));
        assert_eq!(ctx.grid.occupant(ctx.grid.cell_of(ctx.unit.position)), Some(PlantId(2)));
    }

    #[test]
    fn absorption_takes_rival_cells_only() {
        let mut ctx = ctx();
        // Surround the unit: rivals on the x axis, kin on the z axis.
        for dx in [-1, 1] {
            ctx.grid.occupy_cell(CellCoord::new(dx, 0, 0), PlantId(1), Claim::AllowSelf);
        }
        for dz in [-1, 1] {
            ctx.grid.occupy_cell(CellCoord::new(0, 0, dz), PlantId(2), Claim::AllowSelf);
        }
        let mut absorbed = 0;
        for _ in 0..200 {
            if ctx.try_absorb() == AbsorbOutcome::Absorbed {
                absorbed += 1;
            }
        }
        assert_eq!(absorbed, 2);
        assert_eq!(ctx.unit.absorbed, 2);
        assert_eq!(ctx.grid.occupant(CellCoord::new(1, 0, 0)), Some(PlantId(0)));
        assert_eq!(ctx.grid.occupant(CellCoord::new(0, 0, 1)), Some(PlantId(2)));
    }
}
