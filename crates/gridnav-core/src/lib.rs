//! Core types for the gridnav navigation environment.
//!
//! The environment supplies egocentric sensory state to an external pattern learner. One
//! [`Environment`] owns the world grid, the agent pose, the episode counters, and the
//! double-buffered sensor frame; callers drive it one tick at a time.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod codec;
pub mod counters;
pub mod env;
pub mod frame;
pub mod kinematics;
pub mod pattern;
pub mod policy;
pub mod sensor;
pub mod world;

pub use codec::PopulationCodec;
pub use counters::{Counter, CounterReading, EpisodeCounters, Scale};
pub use env::{Environment, TickReport};
pub use frame::{Channel, SensorFrame};
pub use kinematics::{AgentPose, MoveOutcome, Turn, heading_vector, wrap_degrees};
pub use pattern::{PatternTable, Tensor2};
pub use policy::{Action, ReactivePolicy};
pub use sensor::{Contacts, Direction, ProximalSample, ProximalScan};
pub use world::{GridPos, WorldGrid};

/// Material index reserved for background (empty) cells.
pub const BACKGROUND: u16 = 0;

/// Errors raised while building or driving an environment.
#[derive(Debug, Error, PartialEq)]
pub enum EnvError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A coordinate fell outside the world grid.
    #[error("cell ({x}, {y}) is outside the world grid")]
    OutOfBounds { x: i32, y: i32 },
    /// A material name is not part of the configured material list.
    #[error("unknown material `{0}`")]
    UnknownMaterial(String),
    /// A tensor does not have the shape the rendering stage expects for `name`.
    #[error("pattern `{name}` has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: [usize; 2],
        found: [usize; 2],
    },
    /// A tensor shape whose element count does not fit in memory.
    #[error("tensor shape {shape:?} is too large")]
    ShapeOverflow { shape: [usize; 2] },
    /// A tensor's value buffer does not match its declared shape.
    #[error("tensor holds {found} values but its shape requires {expected}")]
    LengthMismatch { expected: usize, found: usize },
    /// A pattern table lacks an entry required for rendering.
    #[error("pattern table has no entry for `{0}`")]
    MissingPattern(String),
}

/// Where the agent is placed on [`Environment::init`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StartPose {
    /// Center cell, heading 0.
    #[default]
    Center,
    /// Uniformly random passable cell and heading.
    Random,
}

/// Optional wrap limits for each counter scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CounterLimits {
    pub run_max: Option<u64>,
    pub epoch_max: Option<u64>,
    pub trial_max: Option<u64>,
    pub tick_max: Option<u64>,
    pub event_max: Option<u64>,
    pub scene_max: Option<u64>,
    pub episode_max: Option<u64>,
}

impl Default for CounterLimits {
    fn default() -> Self {
        Self {
            run_max: None,
            epoch_max: None,
            trial_max: Some(100),
            tick_max: None,
            event_max: None,
            scene_max: None,
            episode_max: None,
        }
    }
}

impl CounterLimits {
    /// Returns the configured maximum for `scale`.
    #[must_use]
    pub const fn max(&self, scale: Scale) -> Option<u64> {
        match scale {
            Scale::Run => self.run_max,
            Scale::Epoch => self.epoch_max,
            Scale::Trial => self.trial_max,
            Scale::Tick => self.tick_max,
            Scale::Event => self.event_max,
            Scale::Scene => self.scene_max,
            Scale::Episode => self.episode_max,
        }
    }
}

/// Static configuration for a navigation environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    /// Width of the world in cells.
    pub world_width: u32,
    /// Height of the world in cells.
    pub world_height: u32,
    /// Ordered material names; index 0 is background.
    pub materials: Vec<String>,
    /// Materials with index in `(0, barrier_index]` block forward movement.
    pub barrier_index: u16,
    /// Rotation step in degrees; must divide 360.
    pub angle_increment: i32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Counter wrap limits.
    pub limits: CounterLimits,
    /// Bump width handed to the ring encoder, as a fraction of the full circle.
    pub ring_width: f32,
    /// Initial placement of the agent.
    pub start: StartPose,
    /// Shape of every action pattern.
    pub action_pattern_shape: [usize; 2],
    /// Shape of every material pattern.
    pub material_pattern_shape: [usize; 2],
    /// Number of active units in generated default patterns.
    pub pattern_active: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            world_width: 20,
            world_height: 20,
            materials: ["Empty", "Wall", "Food", "Water"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            barrier_index: 1,
            angle_increment: 15,
            rng_seed: None,
            limits: CounterLimits::default(),
            ring_width: 0.1,
            start: StartPose::Center,
            action_pattern_shape: [4, 4],
            material_pattern_shape: [4, 4],
            pattern_active: 4,
        }
    }
}

impl NavConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.world_width < 3 || self.world_height < 3 {
            return Err(EnvError::InvalidConfig(
                "world dimensions must be at least 3x3",
            ));
        }
        if self.angle_increment <= 0 || 360 % self.angle_increment != 0 {
            return Err(EnvError::InvalidConfig(
                "angle_increment must be positive and divide 360",
            ));
        }
        if self.materials.len() < 2 {
            return Err(EnvError::InvalidConfig(
                "materials must name the background and at least one barrier",
            ));
        }
        if self.barrier_index == 0 || usize::from(self.barrier_index) >= self.materials.len() {
            return Err(EnvError::InvalidConfig(
                "barrier_index must select a non-background material",
            ));
        }
        world::check_material_names(&self.materials)?;
        if !(self.ring_width > 0.0 && self.ring_width <= 1.0) {
            return Err(EnvError::InvalidConfig("ring_width must lie in (0, 1]"));
        }
        if Scale::ALL
            .iter()
            .any(|&scale| self.limits.max(scale) == Some(0))
        {
            return Err(EnvError::InvalidConfig("counter limits must be non-zero"));
        }
        for shape in [self.action_pattern_shape, self.material_pattern_shape] {
            if shape[0] == 0 || shape[1] == 0 {
                return Err(EnvError::InvalidConfig("pattern shapes must be non-empty"));
            }
            let Some(size) = shape[0].checked_mul(shape[1]) else {
                return Err(EnvError::ShapeOverflow { shape });
            };
            if self.pattern_active > size {
                return Err(EnvError::InvalidConfig(
                    "pattern_active cannot exceed the pattern size",
                ));
            }
        }
        Ok(())
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        self.derived_rng(0)
    }

    /// Independent RNG stream `stream` derived from the configured seed.
    #[must_use]
    pub fn derived_rng(&self, stream: u64) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(stream)),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
