// Spatial occupancy grid.
//
// Continuous positions are quantized into integer cells by `GridLayout`
// (floor division by a per-axis cell size). Each cell is in one of three
// states:
//
// - `Unvisited`: never claimed. Represented by an absent key.
// - `Vacant`: claimed once and released since. A present key.
// - `OccupiedBy(plant)`: currently held by `plant`.
//
// Both `Unvisited` and `Vacant` count as unoccupied for contention. The
// distinction is kept because `release` on an unvisited cell must not make
// it visited.
//
// Claims are per *plant*, not per growth unit: several units of one plant
// may share a cell under `Claim::AllowSelf`. An optional `Area` bounds where
// claims may land at all.
//
// Storage is an `FxHashMap`. Nothing iterates it in a way that feeds a
// simulation decision, except `cells_held_by`, which sorts its output.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::environment::{ShadowSampler, SurfaceDetector};
use crate::types::{CellCoord, PlantId, Position};

/// Tri-state of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Unvisited,
    Vacant,
    OccupiedBy(PlantId),
}

impl CellState {
    pub fn is_occupied(self) -> bool {
        matches!(self, CellState::OccupiedBy(_))
    }
}

/// How a claim treats a cell already held by the claiming plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Claim {
    /// Succeeds if the cell is unoccupied or already ours.
    AllowSelf,
    /// Succeeds only if the cell is unoccupied.
    Exclusive,
}

/// Position → cell quantization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub cell_size: [f32; 3],
}

impl GridLayout {
    pub fn new(cell_size: [f32; 3]) -> Self {
        Self { cell_size }
    }

    pub fn cell_of(&self, position: Position) -> CellCoord {
        CellCoord::new(
            (position.x / self.cell_size[0]).floor() as i32,
            (position.y / self.cell_size[1]).floor() as i32,
            (position.z / self.cell_size[2]).floor() as i32,
        )
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new([0.4, 0.5, 0.4])
    }
}

/// Horizontal rectangle the simulation lives in. Height is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

impl Area {
    pub fn contains(&self, position: Position) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_z..=self.max_z).contains(&position.z)
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) * 0.5,
            0.0,
            (self.min_z + self.max_z) * 0.5,
        )
    }
}

/// Result of a successful surface-projected claim.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceClaim {
    /// The projected position on the surface.
    pub position: Position,
    pub cell: CellCoord,
    /// Shadow factor sampled at `position`.
    pub shadow: f32,
}

#[derive(Clone, Debug, Default)]
pub struct OccupancyGrid {
    layout: GridLayout,
    area: Option<Area>,
    cells: FxHashMap<CellCoord, CellState>,
}

impl OccupancyGrid {
    pub fn new(layout: GridLayout, area: Option<Area>) -> Self {
        Self {
            layout,
            area,
            cells: FxHashMap::default(),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn area(&self) -> Option<&Area> {
        self.area.as_ref()
    }

    pub fn cell_of(&self, position: Position) -> CellCoord {
        self.layout.cell_of(position)
    }

    pub fn in_area(&self, position: Position) -> bool {
        self.area.is_none_or(|a| a.contains(position))
    }

    pub fn cell_state(&self, cell: CellCoord) -> CellState {
        self.cells.get(&cell).copied().unwrap_or(CellState::Unvisited)
    }

    pub fn occupant(&self, cell: CellCoord) -> Option<PlantId> {
        match self.cell_state(cell) {
            CellState::OccupiedBy(plant) => Some(plant),
            _ => None,
        }
    }

    /// Claim the cell containing `position`, allowing the plant's own cells.
    pub fn occupy(&mut self, position: Position, plant: PlantId) -> bool {
        self.occupy_with(position, plant, Claim::AllowSelf)
    }

    /// Claim the cell containing `position`. Fails without mutating
    /// anything when the position is outside the area or the cell is held
    /// by a plant the claim mode does not allow.
    pub fn occupy_with(&mut self, position: Position, plant: PlantId, claim: Claim) -> bool {
        if !self.in_area(position) {
            return false;
        }
        let cell = self.layout.cell_of(position);
        self.occupy_cell(cell, plant, claim)
    }

    /// Claim `cell` directly. No area check.
    pub fn occupy_cell(&mut self, cell: CellCoord, plant: PlantId, claim: Claim) -> bool {
        match self.cell_state(cell) {
            CellState::OccupiedBy(holder) if holder != plant => false,
            CellState::OccupiedBy(_) if claim == Claim::Exclusive => false,
            _ => {
                self.cells.insert(cell, CellState::OccupiedBy(plant));
                true
            }
        }
    }

    /// Project `position` onto a walkable surface within `tolerance`, then
    /// claim the cell at the projected point.
    pub fn occupy_near_surface(
        &mut self,
        position: Position,
        plant: PlantId,
        tolerance: f32,
        claim: Claim,
        surfaces: &dyn SurfaceDetector,
        shadow: &dyn ShadowSampler,
    ) -> Option<SurfaceClaim> {
        let projected = surfaces.is_near_surface(position, tolerance)?;
        if !self.occupy_with(projected, plant, claim) {
            return None;
        }
        Some(SurfaceClaim {
            position: projected,
            cell: self.layout.cell_of(projected),
            shadow: shadow.shadow_at(projected),
        })
    }

    /// Vacate the cell containing `position`, whoever holds it. An
    /// unvisited cell stays unvisited.
    pub fn release(&mut self, position: Position) {
        let cell = self.layout.cell_of(position);
        self.release_cell(cell);
    }

    pub fn release_cell(&mut self, cell: CellCoord) {
        if let Some(state) = self.cells.get_mut(&cell) {
            *state = CellState::Vacant;
        }
    }

    /// Vacate `cell` only if `plant` holds it. Returns whether it did.
    pub fn release_if_held(&mut self, cell: CellCoord, plant: PlantId) -> bool {
        match self.cells.get_mut(&cell) {
            Some(state) if *state == CellState::OccupiedBy(plant) => {
                *state = CellState::Vacant;
                true
            }
            _ => false,
        }
    }

    /// Vacate every cell held by `plant`. Returns how many were released.
    pub fn release_all_by(&mut self, plant: PlantId) -> usize {
        let mut released = 0;
        for state in self.cells.values_mut() {
            if *state == CellState::OccupiedBy(plant) {
                *state = CellState::Vacant;
                released += 1;
            }
        }
        released
    }

    /// Occupant of the cell one `direction` step away from `position`'s.
    pub fn neighbor_at(&self, position: Position, direction: CellCoord) -> Option<PlantId> {
        let cell = self.layout.cell_of(position).offset(direction);
        self.occupant(cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.values().filter(|s| s.is_occupied()).count()
    }

    /// Cells held by `plant`, sorted.
    pub fn cells_held_by(&self, plant: PlantId) -> Vec<CellCoord> {
        let mut cells: Vec<CellCoord> = self
            .cells
            .iter()
            .filter(|(_, s)| **s == CellState::OccupiedBy(plant))
            .map(|(c, _)| *c)
            .collect();
        cells.sort();
        cells
    }
}
