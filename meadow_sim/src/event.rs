// Narrative events emitted by the simulation.
//
// Every observable lifecycle change (a plant appearing, a seed sprouting or
// withering, a unit going dormant, an absorption) is reported as a
// `SimEvent` stamped with the day it happened. `SimState::pass_day` returns
// the events of that day in the order they occurred; callers use them for
// logs, UI feeds and test assertions.
//
// See also: `sim.rs` for where events are produced, `types.rs` for the ID
// types carried here.
//
// **Critical constraint: determinism.** Event order follows the dispatcher's
// plant/unit iteration order, so identical runs produce identical streams.

use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub day: u64,
    pub kind: SimEventKind,
}

/// Why a growth unit died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitherCause {
    /// A seed ran out of survival days before germinating.
    SurvivalExpired,
    /// A sprouting seed could not claim its cell.
    CellTaken,
    /// A contesting seed found kin already rooted in its cell.
    KinInCell,
    /// The mature lifespan ran out.
    OldAge,
    /// The last allowed offspring was placed.
    OffspringExhausted,
    /// The lifetime absorption limit was reached.
    AbsorptionLimit,
    /// Died while dormant.
    DormantWither,
    /// A rival absorbed the unit's cell.
    Absorbed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// A new plant was registered with its first (seed) unit.
    PlantSpawned {
        plant_id: PlantId,
        species: Species,
        position: Position,
    },
    /// A seed passed its growth trial and claimed its cell.
    SeedSprouted { plant_id: PlantId, unit_id: UnitId },
    UnitMatured { plant_id: PlantId, unit_id: UnitId },
    UnitWithered {
        plant_id: PlantId,
        unit_id: UnitId,
        cause: WitherCause,
    },
    EnteredDormancy { plant_id: PlantId, unit_id: UnitId },
    LeftDormancy { plant_id: PlantId, unit_id: UnitId },
    /// `absorber` took `cell` from `victim`.
    CellAbsorbed {
        absorber: PlantId,
        victim: PlantId,
        cell: CellCoord,
    },
    /// A growth unit placed a new seed unit for its plant.
    OffspringPlaced {
        plant_id: PlantId,
        parent: UnitId,
        unit_id: UnitId,
        position: Position,
    },
    /// The plant's last unit died; all its cells were released.
    PlantDied { plant_id: PlantId },
}

impl SimEventKind {
    /// The plant the event is primarily about.
    pub fn plant(&self) -> PlantId {
        match self {
            SimEventKind::PlantSpawned { plant_id, .. }
            | SimEventKind::SeedSprouted { plant_id, .. }
            | SimEventKind::UnitMatured { plant_id, .. }
            | SimEventKind::UnitWithered { plant_id, .. }
            | SimEventKind::EnteredDormancy { plant_id, .. }
            | SimEventKind::LeftDormancy { plant_id, .. }
            | SimEventKind::OffspringPlaced { plant_id, .. }
            | SimEventKind::PlantDied { plant_id } => *plant_id,
            SimEventKind::CellAbsorbed { absorber, .. } => *absorber,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_roundtrip() {
        let event = SimEvent {
            day: 12,
            kind: SimEventKind::UnitWithered {
                plant_id: PlantId(3),
                unit_id: UnitId(7),
                cause: WitherCause::SurvivalExpired,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let restored: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, restored);
    }

    #[test]
    fn absorption_is_attributed_to_the_absorber() {
        let kind = SimEventKind::CellAbsorbed {
            absorber: PlantId(1),
            victim: PlantId(2),
            cell: CellCoord::ZERO,
        };
        assert_eq!(kind.plant(), PlantId(1));
    }
}
