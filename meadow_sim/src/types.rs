// Core types shared across the simulation.
//
// Defines continuous world positions (`Position`), quantized grid cells
// (`CellCoord`), compact entity identifiers, and the `Season` / `Species`
// enums. Everything derives serde so configs, commands and events can be
// written as JSON.
//
// **Critical constraint: determinism.** IDs are monotonic counters handed
// out by `SimState`, never random or time-based, so two runs with the same
// seed and inputs name their entities identically.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A point on (or near) the terrain surface, in world units.
///
/// Y is up. Plants spread in the X/Z plane; Y only matters for surface
/// projection and for cell quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: f32, dy: f32, dz: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Distance ignoring height, the way spread radii are measured.
    pub fn planar_distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An integer cell of the occupancy grid. Also used as a direction offset
/// for neighbor lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell reached by stepping `direction` away from this one.
    pub fn offset(self, direction: CellCoord) -> Self {
        Self::new(
            self.x + direction.x,
            self.y + direction.y,
            self.z + direction.z,
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Entity IDs: compact monotonic integers
// ---------------------------------------------------------------------------

macro_rules! compact_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

compact_id!(/// A plant organism (the root record owning one or more growth units).
PlantId);
compact_id!(/// One growth unit (leaf, stolon node or seed) of a plant.
UnitId);
compact_id!(/// Opaque handle to a visual representation owned by a growth unit.
VisualHandle);

/// Hands out monotonically increasing raw IDs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn next_raw(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Simulation enums
// ---------------------------------------------------------------------------

/// The four seasons, in calendar order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Autumn,
    ];

    /// The season that follows this one (Autumn wraps to Winter).
    pub fn next(self) -> Self {
        match self {
            Season::Winter => Season::Spring,
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        };
        f.write_str(name)
    }
}

/// Plant species. Behavior differences live entirely in `SpeciesData`
/// (see `species.rs`); code never branches on the variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    /// Simple grass: spreads slowly from mature leaves, ages out.
    Grass,
    /// Stoloniferous grass: spreads while still growing, favors shade,
    /// winters over dormant.
    BlueGrass,
    /// Competitive plant: grows by absorbing neighboring rivals.
    TestPlant,
    /// Single-unit annual: sprouts, grows, never spreads.
    Annual,
}
