//! Two-dimensional tensors and the name-indexed pattern tables built from them.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::policy::Action;
use crate::{EnvError, NavConfig};

/// Dense row-major 2D tensor with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor2 {
    shape: [usize; 2],
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct RawTensor {
    shape: [usize; 2],
    values: Vec<f32>,
}

impl TryFrom<RawTensor> for Tensor2 {
    type Error = EnvError;

    fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
        Self::from_vec(raw.shape, raw.values)
    }
}

impl Tensor2 {
    /// Zero-filled tensor of `shape`.
    ///
    /// `shape` comes from validated configuration or codecs; file input goes through
    /// [`Tensor2::from_vec`].
    #[must_use]
    pub fn zeros(shape: [usize; 2]) -> Self {
        Self {
            shape,
            values: vec![0.0; shape[0] * shape[1]],
        }
    }

    /// Wrap `values` with `shape`, checking the length.
    pub fn from_vec(shape: [usize; 2], values: Vec<f32>) -> Result<Self, EnvError> {
        let expected = shape[0]
            .checked_mul(shape[1])
            .ok_or(EnvError::ShapeOverflow { shape })?;
        if values.len() != expected {
            return Err(EnvError::LengthMismatch {
                expected,
                found: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    #[must_use]
    pub const fn shape(&self) -> [usize; 2] {
        self.shape
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.shape[0] && col < self.shape[1])
            .then(|| self.values[row * self.shape[1] + col])
    }

    /// Write one element; out-of-range writes are ignored and return `false`.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> bool {
        if row < self.shape[0] && col < self.shape[1] {
            self.values[row * self.shape[1] + col] = value;
            true
        } else {
            false
        }
    }

    pub fn fill(&mut self, value: f32) {
        self.values.fill(value);
    }

    /// Copy `other` into `self`; shapes must agree.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), EnvError> {
        if self.shape != other.shape {
            return Err(EnvError::ShapeMismatch {
                name: "tensor".to_string(),
                expected: self.shape,
                found: other.shape,
            });
        }
        self.values.copy_from_slice(&other.values);
        Ok(())
    }

    /// Copy a flat slice into `self`; lengths must agree.
    pub fn copy_from_slice(&mut self, values: &[f32]) -> Result<(), EnvError> {
        if self.values.len() != values.len() {
            return Err(EnvError::LengthMismatch {
                expected: self.values.len(),
                found: values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }
}

/// Named sensory patterns for every material and action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTable {
    pub materials: BTreeMap<String, Tensor2>,
    pub actions: BTreeMap<String, Tensor2>,
}

impl PatternTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct sparse binary patterns, one per name, with `active` units on.
    ///
    /// Each pattern is a fresh permutation; with fewer than two possible patterns the names
    /// may collide.
    pub fn permuted_binary<R: Rng + ?Sized>(
        names: &[&str],
        shape: [usize; 2],
        active: usize,
        rng: &mut R,
    ) -> BTreeMap<String, Tensor2> {
        let size = shape[0] * shape[1];
        let active = active.min(size);
        let mut order: Vec<usize> = (0..size).collect();
        let mut table = BTreeMap::new();
        for &name in names {
            let mut pattern = Tensor2::zeros(shape);
            // Retry a few times so that patterns differ whenever the shape allows it.
            for _ in 0..8 {
                order.shuffle(rng);
                pattern.fill(0.0);
                for &idx in &order[..active] {
                    pattern.values[idx] = 1.0;
                }
                if !table.values().any(|existing: &Tensor2| *existing == pattern) {
                    break;
                }
            }
            table.insert(name.to_string(), pattern);
        }
        table
    }

    /// Generated table covering every material of `config` and every [`Action`].
    pub fn generate<R: Rng + ?Sized>(config: &NavConfig, rng: &mut R) -> Self {
        let materials: Vec<&str> = config.materials.iter().map(String::as_str).collect();
        let actions: Vec<&str> = Action::ALL.iter().map(|action| action.as_str()).collect();
        Self {
            materials: Self::permuted_binary(
                &materials,
                config.material_pattern_shape,
                config.pattern_active,
                rng,
            ),
            actions: Self::permuted_binary(
                &actions,
                config.action_pattern_shape,
                config.pattern_active,
                rng,
            ),
        }
    }

    #[must_use]
    pub fn material(&self, name: &str) -> Option<&Tensor2> {
        self.materials.get(name)
    }

    #[must_use]
    pub fn action(&self, action: Action) -> Option<&Tensor2> {
        self.actions.get(action.as_str())
    }

    /// Check that every material and action has an entry of the configured shape.
    pub fn validate(&self, materials: &[String], config: &NavConfig) -> Result<(), EnvError> {
        for name in materials {
            check_entry(
                &self.materials,
                name,
                config.material_pattern_shape,
            )?;
        }
        for action in Action::ALL {
            check_entry(&self.actions, action.as_str(), config.action_pattern_shape)?;
        }
        for extra in self.materials.keys().filter(|key| !materials.contains(key)) {
            warn!(pattern = %extra, "pattern table holds an entry for an unused material");
        }
        for extra in self
            .actions
            .keys()
            .filter(|key| Action::from_name(key).is_none())
        {
            warn!(pattern = %extra, "pattern table holds an entry for an unknown action");
        }
        Ok(())
    }
}

fn check_entry(
    entries: &BTreeMap<String, Tensor2>,
    name: &str,
    expected: [usize; 2],
) -> Result<(), EnvError> {
    let tensor = entries
        .get(name)
        .ok_or_else(|| EnvError::MissingPattern(name.to_string()))?;
    if tensor.shape() != expected {
        return Err(EnvError::ShapeMismatch {
            name: name.to_string(),
            expected,
            found: tensor.shape(),
        });
    }
    Ok(())
}
