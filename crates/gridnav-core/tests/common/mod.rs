#![allow(dead_code)]

use gridnav_core::{CounterLimits, Environment, NavConfig, PopulationCodec, Tensor2};

/// Ring/grid codec placing all activity on the nearest unit.
pub struct NearestUnitCodec {
    pub units: usize,
    pub side: usize,
}

impl Default for NearestUnitCodec {
    fn default() -> Self {
        Self { units: 24, side: 7 }
    }
}

impl PopulationCodec for NearestUnitCodec {
    fn kind(&self) -> &'static str {
        "test.nearest"
    }

    fn ring_units(&self) -> usize {
        self.units
    }

    fn grid_shape(&self) -> [usize; 2] {
        [self.side, self.side]
    }

    fn encode_ring(&self, value: f32, _width: f32) -> Vec<f32> {
        let mut activity = vec![0.0; self.units];
        let idx = (value * self.units as f32).round() as usize % self.units;
        activity[idx] = 1.0;
        activity
    }

    fn decode_ring(&self, activity: &[f32]) -> f32 {
        activity
            .iter()
            .position(|&v| v > 0.5)
            .map_or(0.0, |idx| idx as f32 / self.units as f32)
    }

    fn encode_2d(&self, point: [f32; 2]) -> Tensor2 {
        let span = (self.side - 1) as f32;
        let mut grid = Tensor2::zeros([self.side, self.side]);
        grid.set(
            (point[1] * span).round() as usize,
            (point[0] * span).round() as usize,
            1.0,
        );
        grid
    }

    fn decode_2d(&self, grid: &Tensor2) -> [f32; 2] {
        let span = (self.side - 1) as f32;
        let idx = grid.values().iter().position(|&v| v > 0.5).unwrap_or(0);
        [(idx % self.side) as f32 / span, (idx / self.side) as f32 / span]
    }
}

pub fn config(size: u32, seed: u64) -> NavConfig {
    NavConfig {
        world_width: size,
        world_height: size,
        rng_seed: Some(seed),
        limits: CounterLimits {
            trial_max: Some(50),
            ..CounterLimits::default()
        },
        ..NavConfig::default()
    }
}

pub fn walled_env(size: u32, seed: u64) -> Environment {
    Environment::with_default_world(config(size, seed), Box::new(NearestUnitCodec::default()))
        .expect("environment")
}
