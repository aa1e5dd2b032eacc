use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, StandardNormal};
use tracing::{info, warn};

use crate::checkpoint;
use crate::config::SacConfig;
use crate::error::{Result, SacError};
use crate::network::critic::elementwise_min;
use crate::network::{soft_update, Actor, ActorOutput, CriticPair, Network, QCache, QNetwork, ValueNetwork};
use crate::optimizer::{Optimizer, OptimizerWrapper};
use crate::replay_buffer::{ReplayBuffer, TransitionBatch};

/// `0.5 * ln(2π)`
const HALF_LN_2PI: f32 = 0.918_938_5;

const ACTOR_FILE: &str = "actor.bin";
const Q1_FILE: &str = "q1.bin";
const Q2_FILE: &str = "q2.bin";
const VALUE_FILE: &str = "value.bin";
const VALUE_TARGET_FILE: &str = "value_target.bin";

/// Losses from one optimisation step. All zero when the step was skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Losses {
    pub value: f32,
    pub critic: f32,
    pub policy: f32,
}

impl Losses {
    pub fn total(&self) -> f32 {
        self.value + self.critic + self.policy
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.critic.is_finite() && self.policy.is_finite()
    }
}

/// Soft Actor-Critic agent with a state-value network.
///
/// Each optimisation step runs three updates in order, each with its own
/// optimizer: the value network towards `min Q(s, a') - α log π(a'|s)`, the
/// twin critics jointly towards `r + γ (1 - done) V_target(s')`, and the policy
/// by the reparameterised gradient of `α log π(a'|s) - min Q(s, a')`.
///
/// The log-probability is the Gaussian density of the pre-squash action, with
/// no tanh Jacobian correction; near the action bounds this biases the
/// entropy bonus.
pub struct SacAgent {
    pub actor: Actor,
    pub critics: CriticPair,
    pub value: ValueNetwork,
    /// Only ever written by [`SacAgent::smooth_target`] and checkpoint loading.
    pub value_target: ValueNetwork,
    actor_optimizer: OptimizerWrapper,
    critic_optimizer: OptimizerWrapper,
    value_optimizer: OptimizerWrapper,
    action_scale: Array1<f32>,
    state_size: usize,
    config: SacConfig,
    rng: StdRng,
}

impl SacAgent {
    /// Build all networks for `state_size` observations and one action
    /// dimension per entry of `action_scale`. Every random draw (weights,
    /// exploration noise, batch sampling) comes from one generator seeded
    /// with `config.seed`.
    pub fn new(state_size: usize, action_scale: Array1<f32>, config: &SacConfig) -> Result<Self> {
        config.validate()?;
        if state_size == 0 {
            return Err(SacError::invalid_parameter("state_size", "must be greater than zero"));
        }
        if action_scale.is_empty() || action_scale.iter().any(|s| !s.is_finite()) {
            return Err(SacError::invalid_parameter(
                "action_scale".to_string(),
                format!("must be a non-empty finite vector, got {}", action_scale),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let action_size = action_scale.len();
        let hidden = config.hidden_size;

        let actor = Actor::new(state_size, action_size, hidden, config.logstd_min, config.logstd_max, &mut rng);
        let critics = CriticPair::new(state_size, action_size, hidden, &mut rng);
        let value = ValueNetwork::new(state_size, hidden, &mut rng);
        let value_target = value.clone();

        let actor_optimizer = OptimizerWrapper::from_kind(config.optimizer, &actor.layers());
        let critic_optimizer = OptimizerWrapper::from_kind(config.optimizer, &critics.layers());
        let value_optimizer = OptimizerWrapper::from_kind(config.optimizer, &value.layers());

        Ok(SacAgent {
            actor,
            critics,
            value,
            value_target,
            actor_optimizer,
            critic_optimizer,
            value_optimizer,
            action_scale,
            state_size,
            config: config.clone(),
            rng,
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn action_size(&self) -> usize {
        self.action_scale.len()
    }

    pub fn action_scale(&self) -> &Array1<f32> {
        &self.action_scale
    }

    pub fn config(&self) -> &SacConfig {
        &self.config
    }

    /// Trainable parameters over actor, both critics and the value network.
    pub fn num_parameters(&self) -> usize {
        self.actor.num_parameters() + self.critics.num_parameters() + self.value.num_parameters()
    }

    /// Sample an exploration action: `tanh(N(mean, std)) * action_scale`.
    pub fn act(&mut self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let pi = self.distribution(state)?;
        let mut action = Array1::zeros(self.action_size());
        for j in 0..action.len() {
            let normal = Normal::new(pi.mean[[0, j]], pi.logstd[[0, j]].exp())
                .map_err(|e| SacError::Numerical(e.to_string()))?;
            action[j] = normal.sample(&mut self.rng).tanh() * self.action_scale[j];
        }
        Ok(action)
    }

    /// Evaluation action `tanh(mean) * action_scale`; no randomness.
    pub fn act_deterministic(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let pi = self.distribution(state)?;
        Ok(pi.mean.index_axis(Axis(0), 0).mapv(f32::tanh) * &self.action_scale)
    }

    /// Standard deviation of the policy's pre-squash Gaussian at `state`.
    pub fn policy_std(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let pi = self.distribution(state)?;
        Ok(pi.logstd.index_axis(Axis(0), 0).mapv(f32::exp))
    }

    fn distribution(&self, state: ArrayView1<f32>) -> Result<ActorOutput> {
        if state.len() != self.state_size {
            return Err(SacError::dimension_mismatch(
                format!("state of length {}", self.state_size),
                format!("{}", state.len()),
            ));
        }
        Ok(self.actor.forward(state.insert_axis(Axis(0))))
    }

    /// Sample a batch from `buffer` and run one value / critic / policy update.
    ///
    /// While the buffer holds fewer than `train_batch_size` transitions this
    /// changes nothing and returns zero losses; those zeros are placeholders,
    /// not measurements.
    pub fn optimize(&mut self, buffer: &ReplayBuffer) -> Result<Losses> {
        let batch_size = self.config.train_batch_size;
        if buffer.len() < batch_size {
            return Ok(Losses::default());
        }
        let sampled = buffer.sample(batch_size, &mut self.rng)?;
        let batch = TransitionBatch::from_transitions(&sampled, self.state_size, self.action_size())?;
        let losses = self.update(&batch)?;
        if !losses.is_finite() {
            warn!(?losses, "non-finite loss in optimisation step");
        }
        Ok(losses)
    }

    /// One optimisation step on an already prepared batch.
    pub fn update(&mut self, batch: &TransitionBatch) -> Result<Losses> {
        if batch.is_empty() {
            return Err(SacError::InsufficientData { requested: 1, available: 0 });
        }
        let n = batch.len() as f32;
        let alpha = self.config.entropy_coeff;
        let gamma = self.config.gamma;
        let lr = self.config.lr;
        let states = batch.states.view();

        let (q1, q1_cache) = self.critics.q1.forward_cached(states, batch.actions.view());
        let (q2, q2_cache) = self.critics.q2.forward_cached(states, batch.actions.view());
        let (v, v_cache) = self.value.forward_cached(states);
        let v_next = self.value_target.forward(batch.next_states.view());

        let (pi, actor_cache) = self.actor.forward_cached(states);
        let eps: Array2<f32> = Array2::random_using(pi.mean.dim(), StandardNormal, &mut self.rng);
        let (new_actions, log_probs) = reparameterize(&pi, &eps);

        let (new_q1, new_q1_cache) = self.critics.q1.forward_cached(states, new_actions.view());
        let (new_q2, new_q2_cache) = self.critics.q2.forward_cached(states, new_actions.view());
        let q_min = elementwise_min(&new_q1, &new_q2);
        // dQmin/da' from the critics as they are before this step's update.
        let dqmin_da = min_q_action_grad(
            &self.critics,
            (&new_q1, &new_q1_cache),
            (&new_q2, &new_q2_cache),
        );

        // Value: regress V(s) on the detached soft target.
        let v_targets = Zip::from(&q_min).and(&log_probs).map_collect(|&q, &lp| q - alpha * lp);
        let v_err = &v - &v_targets;
        let value_loss = mean_square(&v_err);
        let v_grads = self.value.backward(&v_cache, (&v_err * (2.0 / n)).view());
        self.value_optimizer.step(self.value.layers_mut(), &v_grads, lr)?;

        // Critics: one joint step on the summed loss, bootstrapping from the
        // target value network before this step's smoothing.
        let targets = Zip::from(&batch.rewards)
            .and(&batch.dones)
            .and(&v_next)
            .map_collect(|&r, &d, &vn| r + gamma * (1.0 - d) * vn);
        let e1 = &q1 - &targets;
        let e2 = &q2 - &targets;
        let critic_loss = mean_square(&e1) + mean_square(&e2);
        let (g1, _) = self.critics.q1.backward(&q1_cache, (&e1 * (2.0 / n)).view());
        let (g2, _) = self.critics.q2.backward(&q2_cache, (&e2 * (2.0 / n)).view());
        let critic_grads: Vec<_> = g1.into_iter().chain(g2).collect();
        self.critic_optimizer.step(self.critics.layers_mut(), &critic_grads, lr)?;

        // Policy: gradients flow from min Q back through a' into mean and log-std.
        let policy_loss = Zip::from(&log_probs)
            .and(&q_min)
            .fold(0.0, |acc, &lp, &q| acc + alpha * lp - q)
            / n;
        let (d_mean, d_logstd) = policy_output_grads(&pi, &eps, &dqmin_da, alpha);
        let actor_grads = self.actor.backward(&actor_cache, d_mean.view(), d_logstd.view());
        self.actor_optimizer.step(self.actor.layers_mut(), &actor_grads, lr)?;

        Ok(Losses {
            value: value_loss,
            critic: critic_loss,
            policy: policy_loss,
        })
    }

    /// Move the target value network towards the value network by
    /// `target_smoothing_coeff`.
    pub fn smooth_target(&mut self) {
        self.value_target = soft_update(&self.value_target, &self.value, self.config.target_smoothing_coeff);
    }

    /// Write one blob file per network into `dir`.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        checkpoint::save_to_file(&self.actor, dir.join(ACTOR_FILE))?;
        checkpoint::save_to_file(&self.critics.q1, dir.join(Q1_FILE))?;
        checkpoint::save_to_file(&self.critics.q2, dir.join(Q2_FILE))?;
        checkpoint::save_to_file(&self.value, dir.join(VALUE_FILE))?;
        checkpoint::save_to_file(&self.value_target, dir.join(VALUE_TARGET_FILE))?;
        info!(path = %dir.display(), "saved checkpoint");
        Ok(())
    }

    /// Replace every network with the blobs in `dir`. Shapes must match this
    /// agent; nothing is replaced unless all five load. Optimizer state is
    /// reset.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let mut actor: Actor = checkpoint::load_from_file(dir.join(ACTOR_FILE))?;
        let q1: QNetwork = checkpoint::load_from_file(dir.join(Q1_FILE))?;
        let q2: QNetwork = checkpoint::load_from_file(dir.join(Q2_FILE))?;
        let value: ValueNetwork = checkpoint::load_from_file(dir.join(VALUE_FILE))?;
        let value_target: ValueNetwork = checkpoint::load_from_file(dir.join(VALUE_TARGET_FILE))?;

        self.actor.check_same_shape(&actor)?;
        self.critics.q1.check_same_shape(&q1)?;
        self.critics.q2.check_same_shape(&q2)?;
        self.value.check_same_shape(&value)?;
        self.value.check_same_shape(&value_target)?;

        actor.logstd_min = self.config.logstd_min;
        actor.logstd_max = self.config.logstd_max;
        self.actor = actor;
        self.critics = CriticPair { q1, q2 };
        self.value = value;
        self.value_target = value_target;

        let kind = self.config.optimizer;
        self.actor_optimizer = OptimizerWrapper::from_kind(kind, &self.actor.layers());
        self.critic_optimizer = OptimizerWrapper::from_kind(kind, &self.critics.layers());
        self.value_optimizer = OptimizerWrapper::from_kind(kind, &self.value.layers());
        info!(path = %dir.display(), "loaded checkpoint");
        Ok(())
    }
}

/// Reparameterised sample `a' = mean + eps * std` and its Gaussian
/// log-density summed over action dimensions (no tanh correction).
///
/// The sum gives one log-probability per row, so with `A` action dimensions
/// the entropy term weighs `A` times more than a per-element mean would; for
/// a single action dimension both are the same.
pub(crate) fn reparameterize(pi: &ActorOutput, eps: &Array2<f32>) -> (Array2<f32>, Array1<f32>) {
    let std = pi.logstd.mapv(f32::exp);
    let actions = &pi.mean + &(eps * &std);
    let per_dim = Zip::from(&actions)
        .and(&pi.mean)
        .and(&pi.logstd)
        .and(&std)
        .map_collect(|&a, &m, &ls, &s| -(a - m).powi(2) / (2.0 * s * s) - ls - HALF_LN_2PI);
    (actions, per_dim.sum_axis(Axis(1)))
}

/// Gradient of `min(Q1, Q2)` with respect to the action input; each row
/// follows whichever critic was smaller.
///
/// On an exact tie the whole gradient goes to Q1 rather than being split
/// between the two critics.
pub(crate) fn min_q_action_grad(
    critics: &CriticPair,
    (q1, q1_cache): (&Array1<f32>, &QCache),
    (q2, q2_cache): (&Array1<f32>, &QCache),
) -> Array2<f32> {
    let picks_q1 = Zip::from(q1).and(q2).map_collect(|&a, &b| if a <= b { 1.0 } else { 0.0 });
    let picks_q2 = picks_q1.mapv(|p| 1.0 - p);
    let (_, dq1_da) = critics.q1.backward(q1_cache, picks_q1.view());
    let (_, dq2_da) = critics.q2.backward(q2_cache, picks_q2.view());
    dq1_da + dq2_da
}

/// Gradients of the batch-mean policy loss `α log π(a') - min Q(s, a')` with
/// respect to the actor's mean and log-std outputs.
///
/// With `a' - mean = eps * std` the density depends on the mean only through
/// that difference, so `∂logπ/∂mean = 0` and `∂logπ/∂logstd = -1`; the critic
/// term contributes `∂Q/∂a'` to the mean and `∂Q/∂a' * eps * std` to the
/// log-std.
pub(crate) fn policy_output_grads(
    pi: &ActorOutput,
    eps: &Array2<f32>,
    dqmin_da: &Array2<f32>,
    alpha: f32,
) -> (Array2<f32>, Array2<f32>) {
    let n = pi.mean.nrows() as f32;
    let d_mean = dqmin_da.mapv(|g| -g / n);
    let d_logstd = Zip::from(dqmin_da)
        .and(eps)
        .and(&pi.logstd)
        .map_collect(|&g, &e, &ls| (-alpha - g * e * ls.exp()) / n);
    (d_mean, d_logstd)
}

fn mean_square(errors: &Array1<f32>) -> f32 {
    errors.mapv(|e| e * e).mean().unwrap_or(0.0)
}
