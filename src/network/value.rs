use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::layers::{DenseCache, DenseGrads, DenseLayer};
use super::Network;

/// State-value estimator `V(s)`: the critic trunk without the action input.
///
/// The same type backs the target copy, which is only ever produced by
/// [`super::soft_update`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValueNetwork {
    pub fc1: DenseLayer,
    pub fc2: DenseLayer,
    pub fc3: DenseLayer,
}

pub struct ValueCache {
    fc1: DenseCache,
    fc2: DenseCache,
    fc3: DenseCache,
}

impl ValueNetwork {
    pub fn new<R: Rng + ?Sized>(state_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        ValueNetwork {
            fc1: DenseLayer::new(state_size, hidden_size, Activation::Relu, rng),
            fc2: DenseLayer::new(hidden_size, hidden_size, Activation::Relu, rng),
            fc3: DenseLayer::new(hidden_size, 1, Activation::Linear, rng),
        }
    }

    pub fn state_size(&self) -> usize {
        self.fc1.input_size()
    }

    pub fn forward(&self, states: ArrayView2<f32>) -> Array1<f32> {
        let h1 = self.fc1.forward(states);
        let h2 = self.fc2.forward(h1.view());
        self.fc3.forward(h2.view()).index_axis_move(Axis(1), 0)
    }

    pub fn forward_cached(&self, states: ArrayView2<f32>) -> (Array1<f32>, ValueCache) {
        let (h1, fc1) = self.fc1.forward_cached(states);
        let (h2, fc2) = self.fc2.forward_cached(h1.view());
        let (v, fc3) = self.fc3.forward_cached(h2.view());
        (v.index_axis_move(Axis(1), 0), ValueCache { fc1, fc2, fc3 })
    }

    /// Backpropagate `d_v` (dLoss/dV per batch row); gradients come back in
    /// [`Network::layers`] order.
    pub fn backward(&self, cache: &ValueCache, d_v: ArrayView1<f32>) -> Vec<DenseGrads> {
        let (g3, dh2) = self.fc3.backward(&cache.fc3, d_v.insert_axis(Axis(1)));
        let (g2, dh1) = self.fc2.backward(&cache.fc2, dh2.view());
        let (g1, _) = self.fc1.backward(&cache.fc1, dh1.view());
        vec![g1, g2, g3]
    }
}

impl Network for ValueNetwork {
    fn layers(&self) -> Vec<&DenseLayer> {
        vec![&self.fc1, &self.fc2, &self.fc3]
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        vec![&mut self.fc1, &mut self.fc2, &mut self.fc3]
    }
}
