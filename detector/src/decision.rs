use crowdedness_common::config::PolicyConfig;
use crowdedness_common::occupancy::OccupancyLevel;
use tracing::debug;

/// Hand-tuned two-signal threshold policy.
///
/// Rules are evaluated in order and the first match wins:
///
/// 1. `probability >= crowded_min_probability` **and** `ratio > crowded_min_ratio` → `Crowded`
/// 2. `probability >= some_min_probability` **or** `ratio > some_min_ratio` → `Some`
/// 3. otherwise `Empty`
///
/// Rule 2 is looser than rule 1 on the ratio and stricter on the probability,
/// so a frame can satisfy both; ordering decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyPolicy {
    pub crowded_min_probability: f32,
    pub crowded_min_ratio: f32,
    pub some_min_probability: f32,
    pub some_min_ratio: f32,
}

impl Default for OccupancyPolicy {
    fn default() -> Self {
        Self {
            crowded_min_probability: 0.65,
            crowded_min_ratio: 0.40,
            some_min_probability: 0.75,
            some_min_ratio: 0.30,
        }
    }
}

impl From<&PolicyConfig> for OccupancyPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            crowded_min_probability: config.crowded_min_probability,
            crowded_min_ratio: config.crowded_min_ratio,
            some_min_probability: config.some_min_probability,
            some_min_ratio: config.some_min_ratio,
        }
    }
}

impl OccupancyPolicy {
    /// Map a people probability and a change ratio to an occupancy level.
    ///
    /// Both inputs must lie in [0, 1]; anything else (including NaN) is
    /// rejected rather than clamped.
    pub fn decide(&self, probability: f32, ratio: f32) -> Result<OccupancyLevel, DecisionError> {
        check_unit("probability", probability)?;
        check_unit("ratio", ratio)?;

        let level = if probability >= self.crowded_min_probability && ratio > self.crowded_min_ratio
        {
            OccupancyLevel::Crowded
        } else if probability >= self.some_min_probability || ratio > self.some_min_ratio {
            OccupancyLevel::Some
        } else {
            OccupancyLevel::Empty
        };

        debug!(probability, ratio, %level, "occupancy decided");
        Ok(level)
    }
}

fn check_unit(signal: &'static str, value: f32) -> Result<(), DecisionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DecisionError::OutOfRange { signal, value })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("{signal} must lie in [0, 1], got {value}")]
    OutOfRange { signal: &'static str, value: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(probability: f32, ratio: f32) -> OccupancyLevel {
        OccupancyPolicy::default().decide(probability, ratio).unwrap()
    }

    #[test]
    fn reference_table() {
        assert_eq!(decide(0.70, 0.45), OccupancyLevel::Crowded);
        assert_eq!(decide(0.80, 0.10), OccupancyLevel::Some);
        assert_eq!(decide(0.50, 0.35), OccupancyLevel::Some);
        assert_eq!(decide(0.50, 0.10), OccupancyLevel::Empty);
    }

    #[test]
    fn crowded_needs_ratio_strictly_above() {
        assert_eq!(decide(0.65, 0.40), OccupancyLevel::Some);
        assert_eq!(decide(0.65, 0.41), OccupancyLevel::Crowded);
    }

    #[test]
    fn probability_bounds_are_inclusive() {
        assert_eq!(decide(0.75, 0.0), OccupancyLevel::Some);
        assert_eq!(decide(0.74, 0.0), OccupancyLevel::Empty);
        assert_eq!(decide(0.64, 0.90), OccupancyLevel::Some);
    }

    #[test]
    fn some_ratio_bound_is_strict() {
        assert_eq!(decide(0.0, 0.30), OccupancyLevel::Empty);
        assert_eq!(decide(0.0, 0.31), OccupancyLevel::Some);
    }

    #[test]
    fn first_match_wins_over_looser_rule() {
        // Satisfies both rule 1 and rule 2.
        assert_eq!(decide(0.90, 0.90), OccupancyLevel::Crowded);
    }

    #[test]
    fn extremes() {
        assert_eq!(decide(0.0, 0.0), OccupancyLevel::Empty);
        assert_eq!(decide(1.0, 1.0), OccupancyLevel::Crowded);
    }

    #[test]
    fn out_of_range_rejected() {
        let policy = OccupancyPolicy::default();
        assert!(matches!(
            policy.decide(1.2, 0.1),
            Err(DecisionError::OutOfRange { signal: "probability", .. })
        ));
        assert!(matches!(
            policy.decide(0.5, -0.01),
            Err(DecisionError::OutOfRange { signal: "ratio", .. })
        ));
        assert!(policy.decide(f32::NAN, 0.5).is_err());
    }

    #[test]
    fn policy_from_config() {
        let config = PolicyConfig {
            crowded_min_probability: 0.5,
            crowded_min_ratio: 0.2,
            some_min_probability: 0.9,
            some_min_ratio: 0.1,
        };
        let policy = OccupancyPolicy::from(&config);
        assert_eq!(policy.decide(0.5, 0.25).unwrap(), OccupancyLevel::Crowded);
        assert_eq!(policy.decide(0.4, 0.15).unwrap(), OccupancyLevel::Some);
    }

    #[test]
    fn default_matches_config_defaults() {
        let config = crowdedness_common::config::Config::parse("").unwrap();
        assert_eq!(OccupancyPolicy::from(&config.policy), OccupancyPolicy::default());
    }
}
