//! # Function Approximators
//!
//! The four network shapes SAC needs, each a plain record of [`DenseLayer`]s
//! with a pure forward pass and a hand-written backward pass:
//!
//! - [`Actor`]: Gaussian policy with shared trunk and separate mean / log-std heads
//! - [`QNetwork`]: `Q(s, a)`, the action joins after the first hidden layer
//! - [`CriticPair`]: the twin critics, exposed as one joint parameter list
//! - [`ValueNetwork`]: `V(s)` and its slowly tracking target copy
//!
//! Parameter traversal goes through the [`Network`] trait so optimizers and
//! [`soft_update`] treat every network the same way.

pub mod actor;
pub mod critic;
pub mod value;

pub use actor::{Actor, ActorCache, ActorOutput};
pub use critic::{CriticPair, QCache, QNetwork};
pub use value::{ValueCache, ValueNetwork};

use ndarray::{Array2, ArrayView2};

use crate::error::{Result, SacError};
use crate::layers::DenseLayer;

/// Ordered access to the layers of a network.
///
/// The order returned by [`Network::layers`] and [`Network::layers_mut`] is
/// also the order of the gradient vectors produced by the network's backward
/// pass.
pub trait Network: Clone {
    fn layers(&self) -> Vec<&DenseLayer>;

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer>;

    fn num_parameters(&self) -> usize {
        self.layers().iter().map(|l| l.num_parameters()).sum()
    }

    /// Fails unless `other` has exactly the same layer shapes.
    fn check_same_shape(&self, other: &Self) -> Result<()> {
        let mine: Vec<_> = self.layers().iter().map(|l| l.weights.dim()).collect();
        let theirs: Vec<_> = other.layers().iter().map(|l| l.weights.dim()).collect();
        if mine != theirs {
            return Err(SacError::dimension_mismatch(format!("{:?}", mine), format!("{:?}", theirs)));
        }
        Ok(())
    }
}

/// Exponential smoothing of `source` into `target`:
/// `coeff * source + (1 - coeff) * target` for every weight and bias.
///
/// Returns a fresh network and leaves both arguments untouched.
pub fn soft_update<N: Network>(target: &N, source: &N, coeff: f32) -> N {
    let mut next = target.clone();
    for (t, s) in next.layers_mut().into_iter().zip(source.layers()) {
        t.weights = &s.weights * coeff + &t.weights * (1.0 - coeff);
        t.biases = &s.biases * coeff + &t.biases * (1.0 - coeff);
    }
    next
}

/// Concatenate two batches column-wise: `[left | right]`.
pub(crate) fn concat_columns(left: ArrayView2<f32>, right: ArrayView2<f32>) -> Array2<f32> {
    let rows = left.nrows();
    let split = left.ncols();
    let mut result = Array2::zeros((rows, split + right.ncols()));
    result.slice_mut(ndarray::s![.., ..split]).assign(&left);
    result.slice_mut(ndarray::s![.., split..]).assign(&right);
    result
}
