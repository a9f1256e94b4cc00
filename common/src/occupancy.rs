use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimated crowdedness of the observed room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyLevel {
    Empty,
    Some,
    Crowded,
}

impl OccupancyLevel {
    /// Numeric code sent to downstream receivers (0 = empty, 1 = some, 2 = crowded).
    pub fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Some => 1,
            Self::Crowded => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Some => "some",
            Self::Crowded => "crowded",
        }
    }
}

impl fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The verdict of one completed detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyReport {
    /// Cycle sequence number, counting every frame fed to the monitor.
    pub seq: u64,
    pub level: OccupancyLevel,
    /// Classifier probability that people are present, in [0, 1].
    pub people_probability: f32,
    /// Fraction of pixels that differ from the background, in [0, 1].
    pub change_ratio: f32,
    pub decided_at: DateTime<Utc>,
}
