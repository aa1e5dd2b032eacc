use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::layers::{DenseCache, DenseGrads, DenseLayer};
use super::{concat_columns, Network};

/// Action-value estimator `Q(s, a)`.
///
/// The state passes through one ReLU layer, the raw action is appended to that
/// hidden representation, and a second ReLU layer plus a linear projection
/// produce the scalar.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QNetwork {
    pub fc1: DenseLayer,
    pub fc2: DenseLayer,
    pub fc3: DenseLayer,
}

pub struct QCache {
    fc1: DenseCache,
    fc2: DenseCache,
    fc3: DenseCache,
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(state_size: usize, action_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        QNetwork {
            fc1: DenseLayer::new(state_size, hidden_size, Activation::Relu, rng),
            fc2: DenseLayer::new(hidden_size + action_size, hidden_size, Activation::Relu, rng),
            fc3: DenseLayer::new(hidden_size, 1, Activation::Linear, rng),
        }
    }

    pub fn state_size(&self) -> usize {
        self.fc1.input_size()
    }

    pub fn action_size(&self) -> usize {
        self.fc2.input_size() - self.fc1.output_size()
    }

    pub fn forward(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Array1<f32> {
        let h1 = self.fc1.forward(states);
        let joined = concat_columns(h1.view(), actions);
        let h2 = self.fc2.forward(joined.view());
        self.fc3.forward(h2.view()).index_axis_move(Axis(1), 0)
    }

    pub fn forward_cached(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> (Array1<f32>, QCache) {
        let (h1, fc1) = self.fc1.forward_cached(states);
        let joined = concat_columns(h1.view(), actions);
        let (h2, fc2) = self.fc2.forward_cached(joined.view());
        let (q, fc3) = self.fc3.forward_cached(h2.view());
        (q.index_axis_move(Axis(1), 0), QCache { fc1, fc2, fc3 })
    }

    /// Backpropagate `d_q` (dLoss/dQ per batch row).
    ///
    /// Returns parameter gradients in [`Network::layers`] order and the
    /// gradient with respect to the action input.
    pub fn backward(&self, cache: &QCache, d_q: ArrayView1<f32>) -> (Vec<DenseGrads>, Array2<f32>) {
        let d_out = d_q.insert_axis(Axis(1));
        let (g3, dh2) = self.fc3.backward(&cache.fc3, d_out);
        let (g2, d_joined) = self.fc2.backward(&cache.fc2, dh2.view());
        let split = self.fc1.output_size();
        let dh1 = d_joined.slice(ndarray::s![.., ..split]).to_owned();
        let d_actions = d_joined.slice(ndarray::s![.., split..]).to_owned();
        let (g1, _) = self.fc1.backward(&cache.fc1, dh1.view());
        (vec![g1, g2, g3], d_actions)
    }
}

impl Network for QNetwork {
    fn layers(&self) -> Vec<&DenseLayer> {
        vec![&self.fc1, &self.fc2, &self.fc3]
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        vec![&mut self.fc1, &mut self.fc2, &mut self.fc3]
    }
}

/// The twin critics. Both are always trained together, so the pair is one
/// parameter list for the optimizer: `q1`'s layers followed by `q2`'s.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CriticPair {
    pub q1: QNetwork,
    pub q2: QNetwork,
}

impl CriticPair {
    pub fn new<R: Rng + ?Sized>(state_size: usize, action_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        CriticPair {
            q1: QNetwork::new(state_size, action_size, hidden_size, rng),
            q2: QNetwork::new(state_size, action_size, hidden_size, rng),
        }
    }

    /// Element-wise `min(Q1(s, a), Q2(s, a))`.
    pub fn min_q(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Array1<f32> {
        let q1 = self.q1.forward(states, actions);
        let q2 = self.q2.forward(states, actions);
        elementwise_min(&q1, &q2)
    }
}

impl Network for CriticPair {
    fn layers(&self) -> Vec<&DenseLayer> {
        let mut layers = self.q1.layers();
        layers.extend(self.q2.layers());
        layers
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        let mut layers = self.q1.layers_mut();
        layers.extend(self.q2.layers_mut());
        layers
    }
}

pub(crate) fn elementwise_min(a: &Array1<f32>, b: &Array1<f32>) -> Array1<f32> {
    ndarray::Zip::from(a).and(b).map_collect(|&x, &y| x.min(y))
}
