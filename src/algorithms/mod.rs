//! # RL Algorithms
//!
//! - **SAC (Soft Actor-Critic)**: off-policy maximum-entropy actor-critic for
//!   continuous actions, with twin Q critics, a state-value network and an
//!   exponentially smoothed target value network.

pub mod sac;

pub use sac::{Losses, SacAgent};
