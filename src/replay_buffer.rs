use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SacError};

/// One environment step as stored for replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// Fixed-capacity ring buffer of transitions with uniform sampling.
///
/// Until the buffer is full, inserts append; afterwards the write cursor wraps
/// and overwrites the oldest slot.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    storage: Vec<Transition>,
    capacity: usize,
    cursor: usize,
    total_inserted: u64,
}

impl ReplayBuffer {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        ReplayBuffer {
            storage: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
            cursor: 0,
            total_inserted: 0,
        }
    }

    pub fn insert(&mut self, transition: Transition) {
        if self.storage.len() < self.capacity {
            self.storage.push(transition);
        } else {
            self.storage[self.cursor] = transition;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        self.total_inserted += 1;
    }

    /// Draw `batch_size` distinct stored transitions uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&Transition>> {
        if batch_size > self.storage.len() {
            return Err(SacError::InsufficientData {
                requested: batch_size,
                available: self.storage.len(),
            });
        }
        let indices = rand::seq::index::sample(rng, self.storage.len(), batch_size);
        Ok(indices.into_iter().map(|i| &self.storage[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts since construction, including overwritten ones.
    pub fn total_inserted(&self) -> u64 {
        self.total_inserted
    }

    /// Stored transitions in slot order (not insertion order once wrapped).
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.storage.iter()
    }
}

/// A sampled batch laid out as row-major matrices.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    /// 1.0 where the episode ended, 0.0 otherwise
    pub dones: Array1<f32>,
}

impl TransitionBatch {
    pub fn from_transitions(batch: &[&Transition], state_size: usize, action_size: usize) -> Result<Self> {
        let rows = batch.len();
        let mut states = Array2::zeros((rows, state_size));
        let mut actions = Array2::zeros((rows, action_size));
        let mut next_states = Array2::zeros((rows, state_size));

        for (i, t) in batch.iter().enumerate() {
            if t.state.len() != state_size || t.next_state.len() != state_size {
                return Err(SacError::dimension_mismatch(
                    format!("state of length {}", state_size),
                    format!("{} / {}", t.state.len(), t.next_state.len()),
                ));
            }
            if t.action.len() != action_size {
                return Err(SacError::dimension_mismatch(
                    format!("action of length {}", action_size),
                    format!("{}", t.action.len()),
                ));
            }
            states.row_mut(i).assign(&t.state);
            actions.row_mut(i).assign(&t.action);
            next_states.row_mut(i).assign(&t.next_state);
        }

        Ok(TransitionBatch {
            states,
            actions,
            rewards: batch.iter().map(|t| t.reward).collect(),
            next_states,
            dones: batch.iter().map(|t| if t.done { 1.0 } else { 0.0 }).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}
