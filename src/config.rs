//! Run configuration.
//!
//! One immutable [`SacConfig`] is built at startup (defaults, optionally
//! overlaid by a JSON file and CLI flags) and handed by reference to the
//! buffer, the networks, the agent and the trainer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SacError};

/// Compute device. Only the CPU ndarray backend exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = SacError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            other => Err(SacError::invalid_parameter(
                "device".to_string(),
                format!("unsupported device '{}', only 'cpu' is available", other),
            )),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SacConfig {
    pub env_id: String,
    pub n_episodes: usize,
    pub hidden_size: usize,
    pub replay_buffer_size: usize,
    pub train_batch_size: usize,
    /// Discount factor
    pub gamma: f32,
    /// Target value smoothing coefficient (tau)
    pub target_smoothing_coeff: f32,
    pub lr: f32,
    pub logstd_min: f32,
    pub logstd_max: f32,
    /// Multiplies every reward before it is stored
    pub reward_scaling: f32,
    /// Entropy coefficient (alpha)
    pub entropy_coeff: f32,
    pub evaluate_freq: usize,
    pub seed: u64,
    pub load_path: Option<PathBuf>,
    pub save_freq: usize,
    pub device: Device,
    pub optimizer: OptimizerKind,
    /// Render the environment during evaluation episodes
    pub render: bool,
    pub log_dir: PathBuf,
}

impl Default for SacConfig {
    fn default() -> Self {
        SacConfig {
            env_id: "Pendulum-v0".to_string(),
            n_episodes: 10_000,
            hidden_size: 256,
            replay_buffer_size: 1_000_000,
            train_batch_size: 256,
            gamma: 0.99,
            target_smoothing_coeff: 0.005,
            lr: 3e-4,
            logstd_min: -20.0,
            logstd_max: 2.0,
            reward_scaling: 1.0,
            entropy_coeff: -1e-10,
            evaluate_freq: 25,
            seed: 0,
            load_path: None,
            save_freq: 100,
            device: Device::Cpu,
            optimizer: OptimizerKind::Adam,
            render: true,
            log_dir: PathBuf::from("/tmp/rl_implementations/sac"),
        }
    }
}

impl SacConfig {
    /// Load a JSON config; absent fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// The binary stores the resolved config in each run directory so the
    /// run can be repeated with `--config`.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("n_episodes", self.n_episodes),
            ("hidden_size", self.hidden_size),
            ("replay_buffer_size", self.replay_buffer_size),
            ("train_batch_size", self.train_batch_size),
            ("evaluate_freq", self.evaluate_freq),
            ("save_freq", self.save_freq),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(invalid(name, "must be greater than zero"));
            }
        }

        let finite = [
            ("gamma", self.gamma),
            ("target_smoothing_coeff", self.target_smoothing_coeff),
            ("lr", self.lr),
            ("logstd_min", self.logstd_min),
            ("logstd_max", self.logstd_max),
            ("reward_scaling", self.reward_scaling),
            ("entropy_coeff", self.entropy_coeff),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(name, "must be finite"));
            }
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid("gamma", "must lie in [0, 1]"));
        }
        if self.target_smoothing_coeff <= 0.0 || self.target_smoothing_coeff > 1.0 {
            return Err(invalid("target_smoothing_coeff", "must lie in (0, 1]"));
        }
        if self.lr <= 0.0 {
            return Err(invalid("lr", "must be positive"));
        }
        if self.logstd_min >= self.logstd_max {
            return Err(invalid("logstd_min", "must be below logstd_max"));
        }
        if self.env_id.is_empty() {
            return Err(invalid("env_id", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> SacError {
    SacError::invalid_parameter(name, reason)
}
