#[cfg(test)]
mod property_tests {
    use ndarray::{Array1, Array2};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use softac::algorithms::SacAgent;
    use softac::config::SacConfig;
    use softac::network::{soft_update, Actor, Network, ValueNetwork};
    use softac::replay_buffer::{ReplayBuffer, Transition};

    fn transition(reward: f32) -> Transition {
        Transition {
            state: Array1::from_elem(2, reward),
            action: Array1::from_elem(1, 0.0),
            reward,
            next_state: Array1::from_elem(2, reward),
            done: false,
        }
    }

    // Any f32 bit pattern, including infinities and NaN
    fn any_input(len: usize) -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(any::<f32>(), len)
    }

    proptest! {
        #[test]
        fn test_logstd_always_within_bounds(input in any_input(12), seed in 0u64..1000) {
            let mut rng = StdRng::seed_from_u64(seed);
            let actor = Actor::new(3, 2, 8, -20.0, 2.0, &mut rng);
            let states = Array2::from_shape_vec((4, 3), input).unwrap();

            let out = actor.forward(states.view());
            for &ls in out.logstd.iter() {
                prop_assert!((-20.0..=2.0).contains(&ls), "logstd {} escaped the clamp", ls);
            }
        }

        #[test]
        fn test_ring_buffer_keeps_newest(capacity in 1usize..20, inserts in 0usize..60) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..inserts {
                buffer.insert(transition(i as f32));
            }

            prop_assert_eq!(buffer.len(), inserts.min(capacity));
            let mut kept: Vec<usize> = buffer.iter().map(|t| t.reward as usize).collect();
            kept.sort();
            let expected: Vec<usize> = (inserts.saturating_sub(capacity)..inserts).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn test_sample_is_distinct_subset(size in 1usize..40, fraction in 0.0f64..=1.0, seed in any::<u64>()) {
            let mut buffer = ReplayBuffer::new(size);
            for i in 0..size {
                buffer.insert(transition(i as f32));
            }
            let batch_size = ((size as f64) * fraction) as usize;
            let batch = buffer.sample(batch_size, &mut StdRng::seed_from_u64(seed)).unwrap();

            let mut rewards: Vec<usize> = batch.iter().map(|t| t.reward as usize).collect();
            prop_assert_eq!(rewards.len(), batch_size);
            rewards.sort();
            rewards.dedup();
            prop_assert_eq!(rewards.len(), batch_size);
            prop_assert!(rewards.iter().all(|&r| r < size));
        }

        #[test]
        fn test_soft_update_stays_between_endpoints(coeff in 0.001f32..=1.0, seed in 0u64..1000) {
            let mut rng = StdRng::seed_from_u64(seed);
            let target = ValueNetwork::new(3, 4, &mut rng);
            let source = ValueNetwork::new(3, 4, &mut rng);
            let smoothed = soft_update(&target, &source, coeff);

            for ((s, t), n) in source.layers().iter().zip(target.layers()).zip(smoothed.layers()) {
                for ((&a, &b), &c) in s.weights.iter().zip(t.weights.iter()).zip(n.weights.iter()) {
                    prop_assert!(c >= a.min(b) - 1e-6 && c <= a.max(b) + 1e-6);
                }
            }
        }

        #[test]
        fn test_actions_within_scale(state in prop::collection::vec(-100.0f32..100.0, 3), scale in 0.1f32..10.0) {
            let config = SacConfig { hidden_size: 8, ..SacConfig::default() };
            let mut agent = SacAgent::new(3, Array1::from_elem(1, scale), &config).unwrap();
            let state = Array1::from_vec(state);

            let sampled = agent.act(state.view()).unwrap();
            let greedy = agent.act_deterministic(state.view()).unwrap();
            prop_assert!(sampled[0].abs() <= scale);
            prop_assert!(greedy[0].abs() <= scale);
        }
    }
}
