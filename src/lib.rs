//! # softac - Soft Actor-Critic for Continuous Control
//!
//! `softac` trains a stochastic Gaussian policy with twin Q critics, a
//! state-value network and its slowly tracking target copy. All networks are
//! small fully connected `ndarray` models with hand-written backward passes;
//! everything runs on the CPU in a single thread.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use softac::config::SacConfig;
//! use softac::env::make_env;
//! use softac::tensorboard::MemoryWriter;
//! use softac::trainer::Trainer;
//!
//! let config = SacConfig { n_episodes: 10, render: false, ..SacConfig::default() };
//! let env = make_env(&config.env_id)?;
//! let mut trainer = Trainer::new(config, env, MemoryWriter::new())?;
//! let reports = trainer.run()?;
//! println!("last episode reward: {}", reports[reports.len() - 1].reward);
//! # Ok::<(), softac::error::SacError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Tanh, Linear)
//! - [`algorithms`] - The SAC agent and its optimisation step
//! - [`checkpoint`] - Opaque parameter blobs for saving and loading networks
//! - [`config`] - Immutable run configuration
//! - [`env`] - Environment trait and the Pendulum simulator
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layers and weight initialisation
//! - [`network`] - Actor, critic and value networks, target smoothing
//! - [`optimizer`] - SGD and Adam
//! - [`replay_buffer`] - Fixed-capacity experience replay
//! - [`tensorboard`] - Scalar metric writers
//! - [`trainer`] - Training and evaluation loop

pub mod activations;
pub mod algorithms;
pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod tensorboard;
pub mod trainer;

#[cfg(test)]
mod tests;
