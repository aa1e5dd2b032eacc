//! # Activation Functions Module
//!
//! Element-wise non-linearities used by the SAC networks.
//!
//! - **ReLU**: `max(0, x)`, used on every hidden layer
//! - **Linear**: identity, used on output heads
//! - **Tanh**: squashes the sampled pre-action into `(-1, 1)`
//!
//! ```rust
//! use softac::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
