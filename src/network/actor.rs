use ndarray::{Array2, ArrayView2, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::layers::{DenseCache, DenseGrads, DenseLayer};
use super::Network;

/// Stochastic Gaussian policy.
///
/// Two ReLU hidden layers feed two linear heads: the mean and the log standard
/// deviation of a Gaussian over the pre-squash action. The log-std head is
/// clamped to `[logstd_min, logstd_max]`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Actor {
    pub fc1: DenseLayer,
    pub fc2: DenseLayer,
    pub fc_mean: DenseLayer,
    pub fc_logstd: DenseLayer,
    pub logstd_min: f32,
    pub logstd_max: f32,
}

/// Batched distribution parameters, one row per state.
#[derive(Clone, Debug)]
pub struct ActorOutput {
    pub mean: Array2<f32>,
    pub logstd: Array2<f32>,
}

pub struct ActorCache {
    fc1: DenseCache,
    fc2: DenseCache,
    mean: DenseCache,
    logstd: DenseCache,
    raw_logstd: Array2<f32>,
}

impl Actor {
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        action_size: usize,
        hidden_size: usize,
        logstd_min: f32,
        logstd_max: f32,
        rng: &mut R,
    ) -> Self {
        Actor {
            fc1: DenseLayer::new(state_size, hidden_size, Activation::Relu, rng),
            fc2: DenseLayer::new(hidden_size, hidden_size, Activation::Relu, rng),
            fc_mean: DenseLayer::new(hidden_size, action_size, Activation::Linear, rng),
            fc_logstd: DenseLayer::new(hidden_size, action_size, Activation::Linear, rng),
            logstd_min,
            logstd_max,
        }
    }

    pub fn state_size(&self) -> usize {
        self.fc1.input_size()
    }

    pub fn action_size(&self) -> usize {
        self.fc_mean.output_size()
    }

    pub fn forward(&self, states: ArrayView2<f32>) -> ActorOutput {
        let hidden = self.fc2.forward(self.fc1.forward(states).view());
        ActorOutput {
            mean: self.fc_mean.forward(hidden.view()),
            logstd: self.clamp(&self.fc_logstd.forward(hidden.view())),
        }
    }

    pub fn forward_cached(&self, states: ArrayView2<f32>) -> (ActorOutput, ActorCache) {
        let (h1, fc1) = self.fc1.forward_cached(states);
        let (h2, fc2) = self.fc2.forward_cached(h1.view());
        let (mean_out, mean) = self.fc_mean.forward_cached(h2.view());
        let (raw_logstd, logstd) = self.fc_logstd.forward_cached(h2.view());
        let output = ActorOutput {
            mean: mean_out,
            logstd: self.clamp(&raw_logstd),
        };
        let cache = ActorCache { fc1, fc2, mean, logstd, raw_logstd };
        (output, cache)
    }

    /// Backpropagate gradients of a scalar loss with respect to the (clamped)
    /// mean and log-std outputs. Entries whose raw log-std fell outside the
    /// clamp range receive no gradient.
    ///
    /// Returns gradients in [`Network::layers`] order.
    pub fn backward(
        &self,
        cache: &ActorCache,
        d_mean: ArrayView2<f32>,
        d_logstd: ArrayView2<f32>,
    ) -> Vec<DenseGrads> {
        let (lo, hi) = (self.logstd_min, self.logstd_max);
        let mut d_raw = d_logstd.to_owned();
        Zip::from(&mut d_raw).and(&cache.raw_logstd).for_each(|d, &raw| {
            if !(lo..=hi).contains(&raw) {
                *d = 0.0;
            }
        });

        let (g_mean, dh_mean) = self.fc_mean.backward(&cache.mean, d_mean);
        let (g_logstd, dh_logstd) = self.fc_logstd.backward(&cache.logstd, d_raw.view());
        let dh2 = dh_mean + dh_logstd;
        let (g2, dh1) = self.fc2.backward(&cache.fc2, dh2.view());
        let (g1, _) = self.fc1.backward(&cache.fc1, dh1.view());
        vec![g1, g2, g_mean, g_logstd]
    }

    // NaN collapses to the lower bound: f32::max returns the non-NaN operand.
    fn clamp(&self, raw: &Array2<f32>) -> Array2<f32> {
        let (lo, hi) = (self.logstd_min, self.logstd_max);
        raw.mapv(|v| v.max(lo).min(hi))
    }
}

impl Network for Actor {
    fn layers(&self) -> Vec<&DenseLayer> {
        vec![&self.fc1, &self.fc2, &self.fc_mean, &self.fc_logstd]
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        vec![&mut self.fc1, &mut self.fc2, &mut self.fc_mean, &mut self.fc_logstd]
    }
}
