//! # Optimizers
//!
//! Each network (or, for the twin critics, each network pair) owns its own
//! optimizer instance, so moment estimates never leak between the value,
//! critic and policy updates.

use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

use crate::config::OptimizerKind;
use crate::error::{Result, SacError};
use crate::layers::{DenseGrads, DenseLayer};

pub trait Optimizer {
    /// Apply one gradient step. `grads[i]` belongs to `layers[i]`.
    fn step(&mut self, layers: Vec<&mut DenseLayer>, grads: &[DenseGrads], learning_rate: f32) -> Result<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    pub fn from_kind(kind: OptimizerKind, layers: &[&DenseLayer]) -> Self {
        match kind {
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::with_defaults(layers)),
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, layers: Vec<&mut DenseLayer>, grads: &[DenseGrads], learning_rate: f32) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(layers, grads, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(layers, grads, learning_rate),
        }
    }
}

fn check_counts(layers: usize, grads: usize) -> Result<()> {
    if layers != grads {
        return Err(SacError::dimension_mismatch(
            format!("{} gradient sets", layers),
            format!("{}", grads),
        ));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn step(&mut self, layers: Vec<&mut DenseLayer>, grads: &[DenseGrads], learning_rate: f32) -> Result<()> {
        check_counts(layers.len(), grads.len())?;
        for (layer, grad) in layers.into_iter().zip(grads) {
            layer.weights.zip_mut_with(&grad.weights, |w, &g| *w -= learning_rate * g);
            layer.biases.zip_mut_with(&grad.biases, |b, &g| *b -= learning_rate * g);
        }
        Ok(())
    }
}

/// Adam with bias-corrected moments, one moment pair per parameter tensor.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Number of completed steps
    pub t: usize,
}

impl Adam {
    pub fn new(layers: &[&DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        let m_weights = layers.iter().map(|l| Array2::<f32>::zeros(l.weights.dim())).collect();
        let v_weights = layers.iter().map(|l| Array2::<f32>::zeros(l.weights.dim())).collect();
        let m_biases = layers.iter().map(|l| Array1::<f32>::zeros(l.biases.dim())).collect();
        let v_biases = layers.iter().map(|l| Array1::<f32>::zeros(l.biases.dim())).collect();

        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights,
            v_weights,
            m_biases,
            v_biases,
            t: 0,
        }
    }

    pub fn with_defaults(layers: &[&DenseLayer]) -> Self {
        Self::new(layers, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: Vec<&mut DenseLayer>, grads: &[DenseGrads], learning_rate: f32) -> Result<()> {
        check_counts(layers.len(), grads.len())?;
        check_counts(self.m_weights.len(), grads.len())?;

        self.t += 1;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - beta1.powi(self.t as i32);
        let correction2 = 1.0 - beta2.powi(self.t as i32);
        let update = |p: &mut f32, m: &mut f32, v: &mut f32, g: f32| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        };

        for (i, (layer, grad)) in layers.into_iter().zip(grads).enumerate() {
            ndarray::Zip::from(&mut layer.weights)
                .and(&mut self.m_weights[i])
                .and(&mut self.v_weights[i])
                .and(&grad.weights)
                .for_each(|p, m, v, &g| update(p, m, v, g));
            ndarray::Zip::from(&mut layer.biases)
                .and(&mut self.m_biases[i])
                .and(&mut self.v_biases[i])
                .and(&grad.biases)
                .for_each(|p, m, v, &g| update(p, m, v, g));
        }
        Ok(())
    }
}
