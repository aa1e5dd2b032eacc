//! # Environments
//!
//! The training loop talks to its simulator only through [`Environment`].
//! Spaces are read once at startup: the observation dimension sizes the
//! networks and `action_space().high` becomes the action-scale vector.

pub mod pendulum;

pub use pendulum::Pendulum;

use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};

use crate::error::{Result, SacError};

/// A bounded box in `R^n`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSpace {
    pub low: Array1<f32>,
    pub high: Array1<f32>,
}

impl BoxSpace {
    pub fn new(low: Array1<f32>, high: Array1<f32>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(SacError::dimension_mismatch(
                format!("high of length {}", low.len()),
                format!("{}", high.len()),
            ));
        }
        Ok(BoxSpace { low, high })
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, x: ArrayView1<f32>) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }
}

/// Result of one environment step.
#[derive(Clone, Debug)]
pub struct Step {
    pub next_state: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: HashMap<String, f32>,
}

pub trait Environment {
    fn observation_space(&self) -> &BoxSpace;

    fn action_space(&self) -> &BoxSpace;

    fn reset(&mut self) -> Result<Array1<f32>>;

    fn step(&mut self, action: ArrayView1<f32>) -> Result<Step>;

    fn seed(&mut self, seed: u64);

    fn render(&self) -> Result<()>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn observation_space(&self) -> &BoxSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> &BoxSpace {
        (**self).action_space()
    }

    fn reset(&mut self) -> Result<Array1<f32>> {
        (**self).reset()
    }

    fn step(&mut self, action: ArrayView1<f32>) -> Result<Step> {
        (**self).step(action)
    }

    fn seed(&mut self, seed: u64) {
        (**self).seed(seed)
    }

    fn render(&self) -> Result<()> {
        (**self).render()
    }
}

/// Build an environment from its identifier.
pub fn make_env(id: &str) -> Result<Box<dyn Environment>> {
    match id {
        "Pendulum-v0" | "Pendulum-v1" => Ok(Box::new(Pendulum::new())),
        other => Err(SacError::environment(format!("unknown environment id '{}'", other))),
    }
}
