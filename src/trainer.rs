//! Episode loop: rollout, store, optimise, smooth, and periodic evaluation.

use std::path::PathBuf;

use ndarray::{Array1, ArrayView1};
use tracing::{debug, info};

use crate::algorithms::{Losses, SacAgent};
use crate::config::SacConfig;
use crate::env::{Environment, Step};
use crate::error::{Result, SacError};
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::tensorboard::ScalarWriter;

/// Summary of one deterministic evaluation episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub total_reward: f32,
    /// Policy standard deviation averaged over the episode, per action dimension.
    pub mean_std: Array1<f32>,
    pub steps: usize,
}

/// Summary of one training episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeReport {
    pub episode: usize,
    pub reward: f32,
    pub steps: usize,
    /// Losses of the episode's last optimisation step.
    pub losses: Losses,
    pub evaluation: Option<EvaluationReport>,
}

pub struct Trainer<E: Environment, W: ScalarWriter> {
    config: SacConfig,
    env: E,
    writer: W,
    agent: SacAgent,
    buffer: ReplayBuffer,
    total_steps: u64,
    checkpoint_dir: Option<PathBuf>,
    warmup_reported: bool,
    warm: bool,
}

impl<E: Environment, W: ScalarWriter> Trainer<E, W> {
    /// Seed the environment, size the agent from its spaces and, if
    /// `config.load_path` is set, restore the networks from that checkpoint.
    pub fn new(config: SacConfig, mut env: E, writer: W) -> Result<Self> {
        config.validate()?;
        env.seed(config.seed);

        let state_size = env.observation_space().dim();
        let action_scale = env.action_space().high.clone();
        if state_size == 0 || action_scale.is_empty() {
            return Err(SacError::environment(format!(
                "environment '{}' has an empty observation or action space",
                config.env_id
            )));
        }

        let mut agent = SacAgent::new(state_size, action_scale, &config)?;
        if let Some(path) = &config.load_path {
            agent.load_checkpoint(path)?;
        }
        let buffer = ReplayBuffer::new(config.replay_buffer_size);

        info!(
            env = %config.env_id,
            state_size,
            action_size = agent.action_size(),
            action_scale = %agent.action_scale(),
            parameters = agent.num_parameters(),
            log_dir = %config.log_dir.display(),
            "starting SAC run"
        );

        Ok(Trainer {
            config,
            env,
            writer,
            agent,
            buffer,
            total_steps: 0,
            checkpoint_dir: None,
            warmup_reported: false,
            warm: false,
        })
    }

    /// Save a checkpoint to `dir/ep{n}` every `save_freq` episodes. Without
    /// a directory nothing is saved.
    pub fn with_checkpoint_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn agent(&self) -> &SacAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut SacAgent {
        &mut self.agent
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Run `n_episodes` training episodes.
    pub fn run(&mut self) -> Result<Vec<EpisodeReport>> {
        let mut reports = Vec::with_capacity(self.config.n_episodes.min(1 << 16));
        for episode in 0..self.config.n_episodes {
            reports.push(self.run_episode(episode)?);
        }
        self.writer.flush()?;
        info!(episodes = reports.len(), total_steps = self.total_steps, "training finished");
        Ok(reports)
    }

    /// Play one stochastic episode, optimising and smoothing after every
    /// step, then write the episode metrics and evaluate or checkpoint when due.
    pub fn run_episode(&mut self, episode: usize) -> Result<EpisodeReport> {
        let mut state = self.checked_reset()?;
        let mut done = false;
        let mut reward: f32 = 0.0;
        let mut steps: usize = 0;
        let mut losses = Losses::default();

        while !done {
            self.total_steps += 1;
            steps += 1;

            let action = self.agent.act(state.view())?;
            let step = self.checked_step(action.view())?;
            reward += step.reward;
            self.buffer.insert(Transition {
                state,
                action,
                reward: self.config.reward_scaling * step.reward,
                next_state: step.next_state.clone(),
                done: step.done,
            });

            losses = self.optimize()?;
            self.agent.smooth_target();

            state = step.next_state;
            done = step.done;
        }

        let ep = episode as u64;
        self.writer.add_scalar("train/V-loss", losses.value, ep)?;
        self.writer.add_scalar("train/Q-loss", losses.critic, ep)?;
        self.writer.add_scalar("train/Pi-loss", losses.policy, ep)?;
        self.writer.add_scalar("train/Total loss", losses.total(), ep)?;
        self.writer.add_scalar("train/steps", self.total_steps as f32, ep)?;
        debug!(episode, reward, steps, total_steps = self.total_steps, ?losses, "episode finished");

        let evaluation = if episode % self.config.evaluate_freq == 0 {
            let report = self.evaluate()?;
            self.writer.add_scalar("eval/rewards", report.total_reward, ep)?;
            Some(report)
        } else {
            None
        };

        if (episode + 1) % self.config.save_freq == 0 {
            if let Some(dir) = &self.checkpoint_dir {
                self.agent.save_checkpoint(dir.join(format!("ep{}", episode + 1)))?;
            }
        }

        Ok(EpisodeReport {
            episode,
            reward,
            steps,
            losses,
            evaluation,
        })
    }

    /// Play one episode with the deterministic policy, rendering each step
    /// when `config.render` is set. Nothing is stored or trained.
    pub fn evaluate(&mut self) -> Result<EvaluationReport> {
        let mut state = self.checked_reset()?;
        let mut done = false;
        let mut total_reward: f32 = 0.0;
        let mut steps: usize = 0;
        let mut std_sum = Array1::<f32>::zeros(self.agent.action_size());

        while !done {
            if self.config.render {
                self.env.render()?;
            }
            std_sum += &self.agent.policy_std(state.view())?;
            let action = self.agent.act_deterministic(state.view())?;
            let step = self.checked_step(action.view())?;
            total_reward += step.reward;
            steps += 1;
            state = step.next_state;
            done = step.done;
        }

        let mean_std = std_sum / steps.max(1) as f32;
        info!("Evaluation Reward: {}, Average Std: {}", total_reward, mean_std);
        Ok(EvaluationReport {
            total_reward,
            mean_std,
            steps,
        })
    }

    fn optimize(&mut self) -> Result<Losses> {
        let batch_size = self.config.train_batch_size;
        if self.buffer.len() < batch_size {
            if !self.warmup_reported {
                debug!(batch_size, "replay buffer warming up, optimisation skipped");
                self.warmup_reported = true;
            }
        } else if !self.warm {
            info!(total_steps = self.total_steps, "replay buffer holds a full batch, optimisation starts");
            self.warm = true;
        }
        self.agent.optimize(&self.buffer)
    }

    fn checked_reset(&mut self) -> Result<Array1<f32>> {
        let state = self.env.reset()?;
        self.check_observation(state.view())?;
        Ok(state)
    }

    fn checked_step(&mut self, action: ArrayView1<f32>) -> Result<Step> {
        let step = self.env.step(action)?;
        self.check_observation(step.next_state.view())?;
        if !step.reward.is_finite() {
            return Err(SacError::environment(format!("non-finite reward {}", step.reward)));
        }
        Ok(step)
    }

    fn check_observation(&self, observation: ArrayView1<f32>) -> Result<()> {
        let expected = self.agent.state_size();
        if observation.len() != expected {
            return Err(SacError::environment(format!(
                "observation of length {}, expected {}",
                observation.len(),
                expected
            )));
        }
        if observation.iter().any(|v| !v.is_finite()) {
            return Err(SacError::environment(format!("non-finite observation {}", observation)));
        }
        Ok(())
    }
}
