// Commands that add plants to the simulation from outside.
//
// Besides the day tick itself, the only external input to the meadow is a
// list of day-stamped `SimCommand`s handed to `SimState::step()`. A command
// stamped with day `d` is applied once the simulation has reached day `d`
// (before day `d + 1` passes).
//
// Current actions:
// - `SpawnPlant`: register one plant at a position (dropped onto the
//   nearest walkable surface).
// - `SeedPopulation`: scatter `count` plants of a species over the area,
//   the same way start-up seeding does.
//
// See also: `sim.rs` for `apply_command()`.

use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimCommand {
    pub day: u64,
    pub action: SimAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimAction {
    SpawnPlant { species: Species, position: Position },
    SeedPopulation { species: Species, count: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serialization_roundtrip() {
        let commands = vec![
            SimCommand {
                day: 3,
                action: SimAction::SpawnPlant {
                    species: Species::BlueGrass,
                    position: Position::new(1.0, 0.0, -2.0),
                },
            },
            SimCommand {
                day: 10,
                action: SimAction::SeedPopulation {
                    species: Species::Grass,
                    count: 4,
                },
            },
        ];
        let json = serde_json::to_string(&commands).unwrap();
        let restored: Vec<SimCommand> = serde_json::from_str(&json).unwrap();
        assert_eq!(commands, restored);
    }
}
