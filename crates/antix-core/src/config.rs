use antix_index::MAX_CELLS;
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::WorldError;

/// How a tick orders sensing relative to acting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scheduling {
    /// Each robot senses, decides and moves before the next robot senses.
    #[default]
    Sequential,
    /// All robots sense the pre-tick world in parallel, then act one by one.
    Phased,
}

/// Static configuration for an Antix world, fixed for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AntixConfig {
    /// Pucks scattered at startup.
    pub puck_count: usize,
    /// Number of home zones.
    pub home_count: usize,
    /// Robots created for each home.
    pub home_population: usize,
    /// Side length of the toroidal world.
    pub world_size: f64,
    /// Sensor field of view in radians, centered on the heading.
    pub fov: f64,
    /// Maximum sensing distance.
    pub sensor_range: f64,
    /// Maximum distance between a robot and a puck it picks up.
    pub pickup_range: f64,
    /// Radius of every robot body.
    pub robot_radius: f64,
    /// Radius of every home zone.
    pub home_radius: f64,
    /// Grid cells along each world axis.
    pub matrix_width: usize,
    /// Ticks to run before stopping; 0 runs until stopped externally.
    pub max_ticks: u64,
    /// Milliseconds to sleep between ticks.
    pub sleep_ms: u64,
    /// Milliseconds between redraws (presentation only).
    pub gui_interval_ms: u64,
    /// Initial window size in pixels (presentation only).
    pub window_size: u32,
    /// Draw sensor fields (presentation only).
    pub show_sensors: bool,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    pub scheduling: Scheduling,
    /// Ticks between progress reports; 0 disables them.
    pub report_interval: u64,
}

impl Default for AntixConfig {
    fn default() -> Self {
        Self {
            puck_count: 100,
            home_count: 1,
            home_population: 20,
            world_size: 1.0,
            fov: 90f64.to_radians(),
            sensor_range: 0.1,
            pickup_range: 0.02,
            robot_radius: 0.01,
            home_radius: 0.1,
            matrix_width: 10,
            max_ticks: 0,
            sleep_ms: 10,
            gui_interval_ms: 100,
            window_size: 600,
            show_sensors: false,
            rng_seed: Some(0),
            scheduling: Scheduling::Sequential,
            report_interval: 100,
        }
    }
}

impl AntixConfig {
    /// Total robots across all homes.
    #[must_use]
    pub fn population(&self) -> usize {
        self.home_count * self.home_population
    }

    /// Rejects values the world cannot be built from.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !self.world_size.is_finite() || self.world_size <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "world_size must be finite and positive",
            ));
        }
        if self.matrix_width == 0 {
            return Err(WorldError::InvalidConfig("matrix_width must be non-zero"));
        }
        if self
            .matrix_width
            .checked_mul(self.matrix_width)
            .is_none_or(|cells| cells > MAX_CELLS)
        {
            return Err(WorldError::InvalidConfig("matrix_width is too large"));
        }
        if !self.fov.is_finite() || self.fov <= 0.0 || self.fov > std::f64::consts::TAU {
            return Err(WorldError::InvalidConfig("fov must lie in (0, 2π]"));
        }
        if !self.sensor_range.is_finite() || self.sensor_range <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "sensor_range must be finite and positive",
            ));
        }
        if !self.pickup_range.is_finite() || self.pickup_range < 0.0 {
            return Err(WorldError::InvalidConfig(
                "pickup_range must be finite and non-negative",
            ));
        }
        if !self.robot_radius.is_finite() || self.robot_radius < 0.0 {
            return Err(WorldError::InvalidConfig(
                "robot_radius must be finite and non-negative",
            ));
        }
        if !self.home_radius.is_finite()
            || self.home_radius < 0.0
            || self.home_radius >= self.world_size * 0.5
        {
            return Err(WorldError::InvalidConfig(
                "home_radius must be non-negative and smaller than half the world",
            ));
        }
        if self.home_count == 0 && self.home_population > 0 {
            return Err(WorldError::InvalidConfig(
                "robots need at least one home to belong to",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy when no seed is set.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AntixConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.population(), 20);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            AntixConfig {
                world_size: 0.0,
                ..AntixConfig::default()
            },
            AntixConfig {
                matrix_width: 0,
                ..AntixConfig::default()
            },
            AntixConfig {
                matrix_width: usize::MAX,
                ..AntixConfig::default()
            },
            AntixConfig {
                matrix_width: 2_000,
                ..AntixConfig::default()
            },
            AntixConfig {
                fov: 7.0,
                ..AntixConfig::default()
            },
            AntixConfig {
                sensor_range: f64::NAN,
                ..AntixConfig::default()
            },
            AntixConfig {
                pickup_range: -0.1,
                ..AntixConfig::default()
            },
            AntixConfig {
                home_radius: 0.6,
                ..AntixConfig::default()
            },
            AntixConfig {
                home_count: 0,
                ..AntixConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(WorldError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AntixConfig = toml::from_str(
            r#"
            puck_count = 5
            scheduling = "phased"
            "#,
        )
        .expect("parse");
        assert_eq!(config.puck_count, 5);
        assert_eq!(config.scheduling, Scheduling::Phased);
        assert_eq!(config.matrix_width, AntixConfig::default().matrix_width);
    }
}
