//! Tunable parameters for a simulation instance.
//!
//! Every section falls back to its defaults when omitted, so an empty TOML
//! document yields [`SimulationConfig::default`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete configuration for a simulation instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// World extent.
    pub world: WorldConfig,
    /// Spatial index parameters.
    pub spatial: SpatialConfig,
    /// Territory connectivity parameters.
    pub territory: TerritoryConfig,
    /// Fog of war parameters.
    pub visibility: VisibilityConfig,
    /// Wave spawning parameters.
    pub spawning: SpawningConfig,
    /// Disconnection penalty parameters.
    pub penalty: PenaltyConfig,
}

impl SimulationConfig {
    /// Checks that every parameter lies inside its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("spatial.grid_cell_size", self.spatial.grid_cell_size)?;
        nonzero("spatial.quadtree_capacity", self.spatial.quadtree_capacity)?;
        nonzero("spatial.resync_interval_ticks", self.spatial.resync_interval_ticks)?;
        positive("territory.radius", self.territory.radius)?;
        if self.territory.settle_ticks > self.territory.max_latency_ticks {
            return Err(ConfigError::LatencyBelowSettle {
                settle: self.territory.settle_ticks,
                max_latency: self.territory.max_latency_ticks,
            });
        }
        positive("visibility.cell_size", self.visibility.cell_size)?;
        positive(
            "visibility.sector_drift_threshold",
            self.visibility.sector_drift_threshold,
        )?;
        nonzero("spawning.interval_ticks", self.spawning.interval_ticks)?;
        if self.penalty.fire_interval_factor < 1 {
            return Err(ConfigError::NotPositive {
                field: "penalty.fire_interval_factor",
            });
        }
        Ok(())
    }
}

/// World extent in world units. The origin sits at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1_000.0,
            height: 1_000.0,
        }
    }
}

/// Parameters for the quadtree and the hash grids.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Side length of a hash grid cell.
    pub grid_cell_size: f32,
    /// Extra cells on each side of the world that keep grid keys non-negative.
    pub grid_margin_cells: u32,
    /// Entities a quadtree node holds before it splits.
    pub quadtree_capacity: usize,
    /// Deepest level a quadtree node may split to.
    pub quadtree_max_depth: u32,
    /// Ticks between full grid resynchronisations.
    pub resync_interval_ticks: u64,
    /// Build the quadtree and grids. When off, range queries scan linearly.
    pub indexed: bool,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 64.0,
            grid_margin_cells: 16,
            quadtree_capacity: 8,
            quadtree_max_depth: 6,
            resync_interval_ticks: 240,
            indexed: true,
        }
    }
}

/// Parameters for territory connectivity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Territory radius of a providing structure. Providers link within twice this.
    pub radius: f32,
    /// Quiet ticks after the last dirty mark before a recompute runs.
    pub settle_ticks: u64,
    /// Upper bound on ticks between the first dirty mark and the recompute.
    pub max_latency_ticks: u64,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            settle_ticks: 2,
            max_latency_ticks: 10,
        }
    }
}

/// Parameters for the fog of war.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Side length of a visibility cache cell.
    pub cell_size: f32,
    /// Accumulated sector rotation, in radians, that forces a sector refresh.
    pub sector_drift_threshold: f32,
    /// Ticks a new beacon takes to fade in to full strength.
    pub sector_fade_ticks: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            cell_size: 32.0,
            sector_drift_threshold: 0.05,
            sector_fade_ticks: 30,
        }
    }
}

/// Parameters for wave spawning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Ticks between spawn bursts.
    pub interval_ticks: u64,
    /// Ticks per wave; each new wave adds one monster per burst.
    pub wave_length_ticks: u64,
    /// Monsters per burst during the first wave.
    pub initial_burst: u32,
    /// Seed for the spawning random number generator.
    pub seed: u64,
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 60,
            wave_length_ticks: 1_200,
            initial_burst: 1,
            seed: 0x4d59_5df4_d0f3_3173,
        }
    }
}

/// Parameters for the disconnection penalty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyConfig {
    /// Multiplier applied to a disconnected structure's fire interval.
    pub fire_interval_factor: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            fire_interval_factor: 2,
        }
    }
}

/// Reasons a configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was zero, negative or NaN.
    #[error("`{field}` must be positive")]
    NotPositive {
        /// Dotted path of the offending parameter.
        field: &'static str,
    },
    /// The settle window is longer than the maximum recompute latency.
    #[error("territory.settle_ticks ({settle}) exceeds territory.max_latency_ticks ({max_latency})")]
    LatencyBelowSettle {
        /// Configured settle window.
        settle: u64,
        /// Configured latency bound.
        max_latency: u64,
    },
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field })
    }
}

fn nonzero<T: Default + PartialEq>(field: &'static str, value: T) -> Result<(), ConfigError> {
    if value == T::default() {
        Err(ConfigError::NotPositive { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config: SimulationConfig = toml::from_str("").expect("parse");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: SimulationConfig = toml::from_str(
            "[spatial]\ngrid_cell_size = 32.0\n\n[territory]\nradius = 150.0\n",
        )
        .expect("parse");
        assert_eq!(config.spatial.grid_cell_size, 32.0);
        assert_eq!(config.spatial.resync_interval_ticks, 240);
        assert_eq!(config.territory.radius, 150.0);
        assert_eq!(config.territory.max_latency_ticks, 10);
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let mut config = SimulationConfig::default();
        config.spatial.grid_cell_size = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "spatial.grid_cell_size"
            })
        );
    }

    #[test]
    fn rejects_settle_window_longer_than_latency() {
        let mut config = SimulationConfig::default();
        config.territory.settle_ticks = 20;
        config.territory.max_latency_ticks = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LatencyBelowSettle { .. })
        ));
    }
}
