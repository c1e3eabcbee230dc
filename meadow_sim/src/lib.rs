// meadow_sim: procedural vegetation growth simulation.
//
// This crate grows a meadow of plants one day at a time. Each plant is a set
// of growth units; each unit runs a small stack-based state machine (seed,
// growing, mature, dormant) whose behavior comes from per-species data.
// Units compete for cells of a coarse occupancy grid, spread offspring onto
// nearby walkable surfaces, and respond to shadow and season. The host
// (renderer, terrain, lighting) is reached only through the collaborator
// traits in `environment.rs`, so the crate runs headless.
//
// Module overview:
// - `sim.rs`:           SimState, the day-tick dispatcher, spawning and seeding.
// - `growth.rs`:        The four growth states and the per-unit machine builder.
// - `state_machine.rs`: Generic stack-based state machine (swap/push/pop transitions).
// - `context.rs`:       GrowthContext handed to states; cell claims and absorption.
// - `occupancy.rs`:     Sparse cell grid: which plant holds which cell.
// - `environment.rs`:   Shadow, season and surface collaborator traits + simple impls.
// - `calendar.rs`:      Season lengths and the day-to-season cycle.
// - `shadow.rs`:        Linear clamped shadow response curves.
// - `species.rs`:       SpeciesData: data-driven plant behavior.
// - `config.rs`:        SimConfig: all tunable parameters, JSON loading, validation.
// - `visual.rs`:        Registry of placeholder/leaf visual instances.
// - `command.rs`:       SimCommand / SimAction: external spawns.
// - `event.rs`:         Narrative SimEvents and wither causes.
// - `types.rs`:         Positions, cell coordinates, IDs, Season, Species.
// - `prng`:             Re-exported from `meadow_prng`: xoshiro256++ PRNG with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Given the same seed, config,
// commands and collaborator answers, a run is reproducible bit for bit. All
// randomness comes from one seeded PRNG. Entities live in `BTreeMap`s or
// `Vec`s and are visited in registration order. No system time, no OS
// entropy.

pub mod calendar;
pub mod command;
pub mod config;
pub mod context;
pub mod environment;
pub mod event;
pub mod growth;
pub mod occupancy;
pub use meadow_prng as prng;
pub mod shadow;
pub mod sim;
pub mod species;
pub mod state_machine;
pub mod types;
pub mod visual;
