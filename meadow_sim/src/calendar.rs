// Season calendar.
//
// `SeasonCycle` turns a count of passed days into a season: the run begins
// in `starting_season`, and each season lasts its configured number of days
// before the next one (Winter → Spring → Summer → Autumn → Winter) takes
// over. It is a pure function of the day, so any day can be queried in any
// order.

use serde::{Deserialize, Serialize};

use crate::environment::SeasonProvider;
use crate::types::Season;

/// Length of each season in days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonLengths {
    pub winter: u32,
    pub spring: u32,
    pub summer: u32,
    pub autumn: u32,
}

impl SeasonLengths {
    pub fn uniform(days: u32) -> Self {
        Self {
            winter: days,
            spring: days,
            summer: days,
            autumn: days,
        }
    }

    pub fn of(&self, season: Season) -> u32 {
        match season {
            Season::Winter => self.winter,
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
        }
    }

    pub fn year(&self) -> u64 {
        Season::ALL.iter().map(|s| u64::from(self.of(*s))).sum()
    }
}

impl Default for SeasonLengths {
    fn default() -> Self {
        Self::uniform(91)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCycle {
    pub lengths: SeasonLengths,
    pub starting_season: Season,
}

impl SeasonCycle {
    pub fn new(lengths: SeasonLengths, starting_season: Season) -> Self {
        Self {
            lengths,
            starting_season,
        }
    }
}

impl Default for SeasonCycle {
    fn default() -> Self {
        Self::new(SeasonLengths::default(), Season::Spring)
    }
}

impl SeasonProvider for SeasonCycle {
    /// Day 0 is the first day of `starting_season`; the season changes once
    /// its full length has passed. Zero-length seasons are skipped.
    fn season_on(&self, day: u64) -> Season {
        let year = self.lengths.year();
        if year == 0 {
            return self.starting_season;
        }
        let mut remaining = day % year;
        let mut season = self.starting_season;
        loop {
            let len = u64::from(self.lengths.of(season));
            if remaining < len {
                return season;
            }
            remaining -= len;
            season = season.next();
        }
    }
}
