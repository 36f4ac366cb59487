//! Gaussian population codes for gridnav.
//!
//! [`GaussianCodec`] encodes a circular value as a bump of activity on a ring of units and a
//! point in the unit square as a bump on a 2D grid of units. Decoding uses weighted means
//! (circular for the ring), so round trips are accurate to well under one unit spacing away
//! from the grid edges.

use gridnav_core::{PopulationCodec, Tensor2};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use thiserror::Error;
use tracing::debug;

/// Errors raised when building a codec.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// Indicates an invalid configuration value.
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Parameters of the Gaussian codec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GaussianCodecConfig {
    /// Units on the heading ring.
    pub ring_units: usize,
    /// Rows of the position grid (y axis).
    pub grid_rows: usize,
    /// Columns of the position grid (x axis).
    pub grid_cols: usize,
    /// Standard deviation of the position bump, in unit-square coordinates.
    pub grid_sigma: f32,
    /// Grid units below this fraction of the peak are ignored when decoding.
    pub decode_threshold: f32,
}

impl Default for GaussianCodecConfig {
    fn default() -> Self {
        Self {
            ring_units: 16,
            grid_rows: 8,
            grid_cols: 8,
            grid_sigma: 0.15,
            decode_threshold: 0.2,
        }
    }
}

/// Gaussian ring and 2D bump codec.
#[derive(Debug, Clone)]
pub struct GaussianCodec {
    config: GaussianCodecConfig,
    ring_angles: Vec<(f32, f32)>,
}

impl GaussianCodec {
    /// Build a codec, validating the configuration.
    pub fn new(config: GaussianCodecConfig) -> Result<Self, CodecError> {
        if config.ring_units < 3 {
            return Err(CodecError::InvalidConfig("ring_units must be at least 3"));
        }
        if config.grid_rows < 2 || config.grid_cols < 2 {
            return Err(CodecError::InvalidConfig(
                "position grid must be at least 2x2",
            ));
        }
        if config.grid_sigma <= 0.0 {
            return Err(CodecError::InvalidConfig("grid_sigma must be positive"));
        }
        if !(0.0..1.0).contains(&config.decode_threshold) {
            return Err(CodecError::InvalidConfig(
                "decode_threshold must lie in [0, 1)",
            ));
        }
        let ring_angles = (0..config.ring_units)
            .map(|idx| {
                let theta = TAU * idx as f32 / config.ring_units as f32;
                (theta.sin(), theta.cos())
            })
            .collect();
        debug!(?config, "built Gaussian population codec");
        Ok(Self {
            config,
            ring_angles,
        })
    }

    /// Build a codec and box it for an environment.
    pub fn boxed(config: GaussianCodecConfig) -> Result<Box<dyn PopulationCodec>, CodecError> {
        Ok(Box::new(Self::new(config)?))
    }

    #[must_use]
    pub const fn config(&self) -> &GaussianCodecConfig {
        &self.config
    }

    fn preferred(idx: usize, count: usize) -> f32 {
        idx as f32 / (count - 1) as f32
    }
}

/// Shortest distance between two points on the unit circle `[0, 1)`.
fn circular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(1.0);
    d.min(1.0 - d)
}

impl PopulationCodec for GaussianCodec {
    fn kind(&self) -> &'static str {
        "gaussian"
    }

    fn ring_units(&self) -> usize {
        self.config.ring_units
    }

    fn grid_shape(&self) -> [usize; 2] {
        [self.config.grid_rows, self.config.grid_cols]
    }

    fn encode_ring(&self, value: f32, width: f32) -> Vec<f32> {
        let units = self.config.ring_units;
        let sigma = width.max(f32::EPSILON);
        let value = value.rem_euclid(1.0);
        (0..units)
            .map(|idx| {
                let d = circular_distance(value, idx as f32 / units as f32);
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect()
    }

    fn decode_ring(&self, activity: &[f32]) -> f32 {
        let (mut sin_sum, mut cos_sum) = (0.0_f32, 0.0_f32);
        for (&a, &(sin, cos)) in activity.iter().zip(&self.ring_angles) {
            sin_sum += a * sin;
            cos_sum += a * cos;
        }
        if sin_sum.abs() < f32::EPSILON && cos_sum.abs() < f32::EPSILON {
            return 0.0;
        }
        (sin_sum.atan2(cos_sum) / TAU).rem_euclid(1.0)
    }

    fn encode_2d(&self, point: [f32; 2]) -> Tensor2 {
        let [rows, cols] = self.grid_shape();
        let sigma = self.config.grid_sigma;
        let x = point[0].clamp(0.0, 1.0);
        let y = point[1].clamp(0.0, 1.0);
        let mut grid = Tensor2::zeros([rows, cols]);
        for row in 0..rows {
            let dy = Self::preferred(row, rows) - y;
            for col in 0..cols {
                let dx = Self::preferred(col, cols) - x;
                let value = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                grid.values_mut()[row * cols + col] = value;
            }
        }
        grid
    }

    fn decode_2d(&self, grid: &Tensor2) -> [f32; 2] {
        let [rows, cols] = grid.shape();
        if rows < 2 || cols < 2 {
            return [0.0, 0.0];
        }
        let peak = grid.values().iter().copied().fold(0.0_f32, f32::max);
        if peak <= 0.0 {
            return [0.5, 0.5];
        }
        let cutoff = peak * self.config.decode_threshold;
        let (mut sum, mut sx, mut sy) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (idx, &value) in grid.values().iter().enumerate() {
            if value < cutoff {
                continue;
            }
            sum += value;
            sx += value * Self::preferred(idx % cols, cols);
            sy += value * Self::preferred(idx / cols, rows);
        }
        [sx / sum, sy / sum]
    }
}
