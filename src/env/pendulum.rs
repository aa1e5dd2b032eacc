use std::collections::HashMap;
use std::f32::consts::PI;

use ndarray::{array, Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SacError};
use super::{BoxSpace, Environment, Step};

/// Inverted pendulum swing-up with Pendulum-v0 dynamics.
///
/// Observation `[cos θ, sin θ, θ̇]`, action a single torque in `[-2, 2]`,
/// reward `-(θ² + 0.1 θ̇² + 0.001 u²)`, episodes end after 200 steps.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    last_torque: f32,
    steps: usize,

    max_speed: f32,
    max_torque: f32,
    dt: f32,
    gravity: f32,
    mass: f32,
    length: f32,
    max_steps: usize,

    observation_space: BoxSpace,
    action_space: BoxSpace,
    rng: StdRng,
}

impl Pendulum {
    pub fn new() -> Self {
        let max_speed = 8.0;
        let max_torque = 2.0;
        Pendulum {
            theta: 0.0,
            theta_dot: 0.0,
            last_torque: 0.0,
            steps: 0,
            max_speed,
            max_torque,
            dt: 0.05,
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            max_steps: 200,
            observation_space: BoxSpace {
                low: array![-1.0, -1.0, -max_speed],
                high: array![1.0, 1.0, max_speed],
            },
            action_space: BoxSpace {
                low: array![-max_torque],
                high: array![max_torque],
            },
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn observation(&self) -> Array1<f32> {
        array![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new()
    }
}

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl Environment for Pendulum {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        self.last_torque = 0.0;
        self.steps = 0;
        Ok(self.observation())
    }

    fn step(&mut self, action: ArrayView1<f32>) -> Result<Step> {
        if action.len() != 1 || !action[0].is_finite() {
            return Err(SacError::environment(format!(
                "pendulum expects one finite torque, got {:?}",
                action.to_vec()
            )));
        }
        let (g, m, l, dt) = (self.gravity, self.mass, self.length, self.dt);
        let u = action[0].clamp(-self.max_torque, self.max_torque);
        self.last_torque = u;

        let costs = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * u.powi(2);

        let new_theta_dot = self.theta_dot
            + (-3.0 * g / (2.0 * l) * (self.theta + PI).sin() + 3.0 / (m * l * l) * u) * dt;
        self.theta += new_theta_dot * dt;
        self.theta_dot = new_theta_dot.clamp(-self.max_speed, self.max_speed);
        self.steps += 1;

        let mut info = HashMap::new();
        info.insert("torque".to_string(), u);

        Ok(Step {
            next_state: self.observation(),
            reward: -costs,
            done: self.steps >= self.max_steps,
            info,
        })
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn render(&self) -> Result<()> {
        const WIDTH: usize = 41;
        const HEIGHT: usize = 21;
        let mut grid = vec![vec![' '; WIDTH]; HEIGHT];
        let (cx, cy) = (WIDTH / 2, HEIGHT / 2);
        // Upright (theta = 0) points to the top row.
        for r in 1..=cy {
            let x = cx as f32 + 2.0 * r as f32 * self.theta.sin();
            let y = cy as f32 - r as f32 * self.theta.cos();
            let (x, y) = (x.round() as isize, y.round() as isize);
            if (0..WIDTH as isize).contains(&x) && (0..HEIGHT as isize).contains(&y) {
                grid[y as usize][x as usize] = if r == cy { '@' } else { '*' };
            }
        }
        grid[cy][cx] = 'O';

        let frame: Vec<String> = grid.into_iter().map(|row| row.into_iter().collect()).collect();
        println!("{}", frame.join("\n"));
        println!(
            "step {:3}  theta {:7.2} deg  omega {:6.2} rad/s  torque {:5.2}",
            self.steps,
            angle_normalize(self.theta).to_degrees(),
            self.theta_dot,
            self.last_torque
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_terminates_after_time_limit() {
        let mut env = Pendulum::new();
        env.seed(1);
        env.reset().unwrap();
        let mut steps = 0;
        loop {
            let step = env.step(array![0.0].view()).unwrap();
            steps += 1;
            assert!(step.reward <= 0.0);
            assert!(step.next_state.iter().all(|v| v.is_finite()));
            if step.done {
                break;
            }
        }
        assert_eq!(steps, 200);
    }

    #[test]
    fn test_seeded_resets_are_reproducible() {
        let mut a = Pendulum::new();
        let mut b = Pendulum::new();
        a.seed(9);
        b.seed(9);
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
    }

    #[test]
    fn test_upright_at_rest_costs_nothing() {
        let mut env = Pendulum::new();
        env.reset().unwrap();
        env.theta = 0.0;
        env.theta_dot = 0.0;
        let step = env.step(array![0.0].view()).unwrap();
        assert_eq!(step.reward, 0.0);
    }

    #[test]
    fn test_rejects_malformed_action() {
        let mut env = Pendulum::new();
        env.reset().unwrap();
        assert!(env.step(array![0.0, 1.0].view()).is_err());
        assert!(env.step(array![f32::NAN].view()).is_err());
    }

    #[test]
    fn test_angle_normalize() {
        assert!((angle_normalize(3.0 * PI) - PI).abs() < 1e-5 || (angle_normalize(3.0 * PI) + PI).abs() < 1e-5);
        assert!((angle_normalize(0.5) - 0.5).abs() < 1e-6);
    }
}
