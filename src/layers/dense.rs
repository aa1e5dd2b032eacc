use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use super::initialization::{fan_in_uniform_biases, fan_in_uniform_weights};

/// A fully connected (dense) layer: `activation(inputs · weights + biases)`.
///
/// Weights are stored `(input_size, output_size)` so a batch of row vectors
/// multiplies on the left. The layer holds parameters only; everything the
/// backward pass needs is returned from [`DenseLayer::forward_cached`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

/// Values recorded during a forward pass and consumed by the backward pass.
#[derive(Clone, Debug)]
pub struct DenseCache {
    inputs: Array2<f32>,
    pre_activation: Array2<f32>,
}

/// Gradients of a scalar loss with respect to one layer's parameters.
#[derive(Clone, Debug)]
pub struct DenseGrads {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl DenseLayer {
    /// Create a new dense layer initialized like a PyTorch linear layer.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let weights = fan_in_uniform_weights((input_size, output_size), rng);
        let biases = fan_in_uniform_biases(input_size, output_size, rng);
        DenseLayer { weights, biases, activation }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of scalar parameters (weights and biases).
    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass for a batch of row vectors.
    pub fn forward(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = self.affine(inputs);
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass that also returns the cache needed by [`DenseLayer::backward`].
    pub fn forward_cached(&self, inputs: ArrayView2<f32>) -> (Array2<f32>, DenseCache) {
        let pre_activation = self.affine(inputs);
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        let cache = DenseCache {
            inputs: inputs.to_owned(),
            pre_activation,
        };
        (outputs, cache)
    }

    /// Backward pass. `output_errors` is dLoss/dOutput for the batch; returns
    /// the parameter gradients and dLoss/dInput.
    pub fn backward(&self, cache: &DenseCache, output_errors: ArrayView2<f32>) -> (DenseGrads, Array2<f32>) {
        let activation_deriv = self.activation.derivative_batch(cache.pre_activation.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weights = cache.inputs.t().dot(&adjusted_error);
        let biases = adjusted_error.sum_axis(Axis(0));
        let input_errors = adjusted_error.dot(&self.weights.t());
        (DenseGrads { weights, biases }, input_errors)
    }

    fn affine(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_dense_forward_applies_affine_then_activation() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(2, 2, Activation::Relu, &mut rng)
            .with_weights(array![[1.0, -1.0], [2.0, 0.5]])
            .with_biases(array![0.0, -10.0]);

        let out = layer.forward(array![[1.0, 1.0]].view());
        assert_eq!(out, array![[3.0, 0.0]]);
    }

    #[test]
    fn test_fan_in_initialization_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = DenseLayer::new(16, 8, Activation::Linear, &mut rng);
        let bound = 1.0 / 4.0;
        assert!(layer.weights.iter().all(|w| w.abs() <= bound));
        assert!(layer.biases.iter().all(|b| b.abs() <= bound));
    }

    #[test]
    fn test_backward_linear_layer() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(2, 1, Activation::Linear, &mut rng)
            .with_weights(array![[2.0], [3.0]])
            .with_biases(array![1.0]);
        let inputs = array![[1.0, 2.0], [0.5, -1.0]];
        let (_, cache) = layer.forward_cached(inputs.view());

        let (grads, input_errors) = layer.backward(&cache, array![[1.0], [2.0]].view());
        assert_eq!(grads.weights, array![[2.0], [0.0]]);
        assert_eq!(grads.biases, array![3.0]);
        assert_eq!(input_errors, array![[2.0, 3.0], [4.0, 6.0]]);
    }
}
