// Seedable pseudo-random number generator for the vegetation simulation.
//
// xoshiro256++ (Blackman & Vigna, 2019) seeded through SplitMix64. Every
// random decision the simulation makes (seed germination trials, survival
// countdowns, offspring angles, absorption timing, initial scattering) draws
// from one `SimRng` owned by the simulation instance, so a run is fully
// reproducible from its seed. Tests construct their own instances to get
// deterministic growth outcomes.
//
// **Critical constraint: determinism.** The integer core must produce the
// same stream on every platform. Float helpers derive from the integer
// stream by mantissa filling only; never mix in OS entropy or a thread-local
// generator.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ generator. Cheap to clone; clones continue the same stream
/// independently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimRng {
    s: [u64; 4],
}

impl SimRng {
    /// Create a generator from a `u64` seed. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform `f32` in [0, 1), built from the upper 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Bernoulli trial: `true` with probability `p`.
    ///
    /// The comparison is strict, so `p <= 0.0` never succeeds and
    /// `p >= 1.0` always does. Growth chances of exactly 0 and 1 rely on
    /// this.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Uniform value in `[low, high)`. Panics if `low >= high`.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(low < high, "range_f32: low must be less than high");
        low + self.next_f32() * (high - low)
    }

    /// Like `range_f32`, but a degenerate range (`low == high`) returns
    /// `low` instead of panicking. Used for per-instance thresholds whose
    /// spread may be configured as zero.
    pub fn range_f32_or_low(&mut self, low: f32, high: f32) -> f32 {
        if high > low {
            self.range_f32(low, high)
        } else {
            low
        }
    }

    /// Uniform angle in radians, `[0, 2π)`.
    pub fn angle(&mut self) -> f32 {
        self.next_f32() * std::f32::consts::TAU
    }

    /// Uniform integer in `[low, high)` by rejection sampling (no modulo
    /// bias). Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `u32` in `[low, high]`, both ends inclusive. Panics if
    /// `low > high`.
    pub fn range_u32_inclusive(&mut self, low: u32, high: u32) -> u32 {
        assert!(low <= high, "range_u32_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as u32
    }

    /// Uniform `i32` in `[low, high]`, both ends inclusive. Panics if
    /// `low > high`.
    pub fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        assert!(low <= high, "range_i32_inclusive: low must be <= high");
        let span = (high as i64 - low as i64) as u64 + 1;
        (low as i64 + self.range_u64(0, span) as i64) as i32
    }
}

/// SplitMix64 step, used only to expand the seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(8);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn chance_extremes_are_exact() {
        let mut rng = SimRng::new(3);
        for _ in 0..10_000 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
    }

    #[test]
    fn chance_tracks_probability() {
        let mut rng = SimRng::new(11);
        let n = 20_000;
        let hits = (0..n).filter(|_| rng.chance(0.25)).count();
        let pct = hits as f64 / n as f64;
        assert!((0.22..0.28).contains(&pct), "chance(0.25) gave {pct}");
    }

    #[test]
    fn float_helpers_stay_in_range() {
        let mut rng = SimRng::new(12345);
        for _ in 0..10_000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f));
            let d = rng.next_f64();
            assert!((0.0..1.0).contains(&d));
            let a = rng.angle();
            assert!((0.0..std::f32::consts::TAU).contains(&a));
            let r = rng.range_f32(-2.5, 2.5);
            assert!((-2.5..2.5).contains(&r));
        }
    }

    #[test]
    fn degenerate_float_range_returns_low() {
        let mut rng = SimRng::new(1);
        assert_eq!(rng.range_f32_or_low(0.4, 0.4), 0.4);
        let v = rng.range_f32_or_low(0.9, 1.1);
        assert!((0.9..1.1).contains(&v));
    }

    #[test]
    fn inclusive_ranges_reach_both_ends() {
        let mut rng = SimRng::new(99);
        let mut seen_u = [false; 3];
        let mut seen_i = [false; 3];
        for _ in 0..10_000 {
            let u = rng.range_u32_inclusive(5, 7);
            assert!((5..=7).contains(&u));
            seen_u[(u - 5) as usize] = true;
            let i = rng.range_i32_inclusive(-1, 1);
            assert!((-1..=1).contains(&i));
            seen_i[(i + 1) as usize] = true;
        }
        assert!(seen_u.iter().all(|s| *s));
        assert!(seen_i.iter().all(|s| *s));
    }

    #[test]
    fn single_value_inclusive_range() {
        let mut rng = SimRng::new(4);
        assert_eq!(rng.range_u32_inclusive(17, 17), 17);
        assert_eq!(rng.range_i32_inclusive(0, 0), 0);
    }

    #[test]
    fn serialized_state_continues_the_stream() {
        let mut rng = SimRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: SimRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
