// External collaborators the simulation consults but does not own.
//
// The engine asks the outside world three things: how shadowed a surface
// position is, which season a given day falls in, and where the walkable
// surface is near a point. Each is a small trait so callers (and tests) can
// plug in anything from a closure to a real terrain query. `Environment`
// bundles one of each and is passed into every `pass_day` call.
//
// Reference implementations live here too: `UniformShadow`, `FixedSeason`
// and `FlatTerrain`. The calendar-driven season provider is in
// `calendar.rs`.

use crate::occupancy::Area;
use crate::types::{Position, Season};

/// Shadow factor in [0, 1] at a surface position.
pub trait ShadowSampler {
    fn shadow_at(&self, position: Position) -> f32;
}

impl<F: Fn(Position) -> f32> ShadowSampler for F {
    fn shadow_at(&self, position: Position) -> f32 {
        self(position)
    }
}

/// Same shadow everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformShadow(pub f32);

impl ShadowSampler for UniformShadow {
    fn shadow_at(&self, _position: Position) -> f32 {
        self.0
    }
}

/// Which season a day (1-based count of passed days) falls in.
pub trait SeasonProvider {
    fn season_on(&self, day: u64) -> Season;
}

impl<F: Fn(u64) -> Season> SeasonProvider for F {
    fn season_on(&self, day: u64) -> Season {
        self(day)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedSeason(pub Season);

impl SeasonProvider for FixedSeason {
    fn season_on(&self, _day: u64) -> Season {
        self.0
    }
}

/// Surface projection queries.
pub trait SurfaceDetector {
    /// Drop `position` onto the nearest walkable surface no more than
    /// `max_vertical_delta` away vertically.
    fn nearest_walkable_surface(&self, position: Position, max_vertical_delta: f32)
    -> Option<Position>;

    /// Like `nearest_walkable_surface`, but only accepts positions that are
    /// already within `tolerance` of a surface body.
    fn is_near_surface(&self, position: Position, tolerance: f32) -> Option<Position>;
}

/// A horizontal plane at `height`, optionally limited to `bounds`.
///
/// `thickness` is the half-height of the walkable body around the plane, so
/// positions up to `thickness + tolerance` above or below it count as near.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
    pub thickness: f32,
    pub bounds: Option<Area>,
}

impl FlatTerrain {
    /// Body half-height of `new` terrain. Matches the widest built-in
    /// offspring vertical jitter (blue grass), so lifted offspring positions
    /// still count as near the surface. With a thinner body, jittered
    /// offspring only land when the jitter happens to be within the
    /// configured `surface_tolerance`.
    pub const DEFAULT_THICKNESS: f32 = 2.5;

    pub fn new(height: f32) -> Self {
        Self {
            height,
            thickness: Self::DEFAULT_THICKNESS,
            bounds: None,
        }
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_bounds(mut self, bounds: Area) -> Self {
        self.bounds = Some(bounds);
        self
    }

    fn project(&self, position: Position, reach: f32) -> Option<Position> {
        if self.bounds.is_some_and(|b| !b.contains(position)) {
            return None;
        }
        if (position.y - self.height).abs() > reach {
            return None;
        }
        Some(Position::new(position.x, self.height, position.z))
    }
}

impl SurfaceDetector for FlatTerrain {
    fn nearest_walkable_surface(
        &self,
        position: Position,
        max_vertical_delta: f32,
    ) -> Option<Position> {
        self.project(position, max_vertical_delta)
    }

    fn is_near_surface(&self, position: Position, tolerance: f32) -> Option<Position> {
        self.project(position, self.thickness + tolerance)
    }
}

/// The collaborators consulted during one simulation call.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub shadow: &'a dyn ShadowSampler,
    pub seasons: &'a dyn SeasonProvider,
    pub surfaces: &'a dyn SurfaceDetector,
}

impl<'a> Environment<'a> {
    pub fn new(
        shadow: &'a dyn ShadowSampler,
        seasons: &'a dyn SeasonProvider,
        surfaces: &'a dyn SurfaceDetector,
    ) -> Self {
        Self {
            shadow,
            seasons,
            surfaces,
        }
    }
}
