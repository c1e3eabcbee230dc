// Shadow-modulated probabilities.
//
// Daily chances (seed germination, offspring placement) are multiplied by a
// factor derived from the shadow at the unit's position. A `ShadowCurve`
// describes that factor per species: `Shade` favors shadowed spots, `Sun`
// favors lit ones, `Ignore` disables the modulation. The orientation is a
// per-species tuning knob; grass and blue grass use opposite ones.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Factor is always 1.
    Ignore,
    /// Factor grows with shadow.
    Shade,
    /// Factor grows with light (`1 - shadow`).
    Sun,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowCurve {
    pub orientation: Orientation,
    pub scale: f32,
    pub offset: f32,
    pub min: f32,
    pub max: f32,
}

impl ShadowCurve {
    pub const IGNORE: Self = Self {
        orientation: Orientation::Ignore,
        scale: 1.0,
        offset: 0.0,
        min: 0.0,
        max: 1.0,
    };

    pub const fn shade(scale: f32, offset: f32, min: f32, max: f32) -> Self {
        Self {
            orientation: Orientation::Shade,
            scale,
            offset,
            min,
            max,
        }
    }

    pub const fn sun(scale: f32, offset: f32, min: f32, max: f32) -> Self {
        Self {
            orientation: Orientation::Sun,
            scale,
            offset,
            min,
            max,
        }
    }

    /// `clamp(f(shadow) * scale + offset, min, max)`. Shadow values outside
    /// [0, 1] are clamped first.
    pub fn modulate(&self, shadow: f32) -> f32 {
        let s = shadow.clamp(0.0, 1.0);
        let base = match self.orientation {
            Orientation::Ignore => return 1.0,
            Orientation::Shade => s,
            Orientation::Sun => 1.0 - s,
        };
        (base * self.scale + self.offset).clamp(self.min, self.max)
    }
}

impl Default for ShadowCurve {
    fn default() -> Self {
        Self::IGNORE
    }
}

/// Free-function form of [`ShadowCurve::modulate`].
pub fn modulate(curve: &ShadowCurve, shadow: f32) -> f32 {
    curve.modulate(shadow)
}
