use std::collections::HashSet;

use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::SacError;
use crate::replay_buffer::{ReplayBuffer, Transition, TransitionBatch};

fn transition(reward: f32) -> Transition {
    Transition {
        state: array![reward, -reward],
        action: array![0.5 * reward],
        reward,
        next_state: array![reward + 1.0, -reward - 1.0],
        done: reward >= 7.0,
    }
}

fn rewards(buffer: &ReplayBuffer) -> Vec<i32> {
    let mut rewards: Vec<i32> = buffer.iter().map(|t| t.reward as i32).collect();
    rewards.sort();
    rewards
}

#[test]
fn test_replay_buffer_insert_and_sample() {
    let mut buffer = ReplayBuffer::new(10);
    assert!(buffer.is_empty());
    buffer.insert(transition(1.0));
    assert_eq!(buffer.len(), 1);

    let sample = buffer.sample(1, &mut StdRng::seed_from_u64(0)).unwrap();
    assert_eq!(sample[0], &transition(1.0));
}

#[test]
fn test_oldest_transitions_evicted_first() {
    let mut buffer = ReplayBuffer::new(5);
    for r in 1..=7 {
        buffer.insert(transition(r as f32));
    }

    assert_eq!(buffer.len(), 5);
    assert_eq!(buffer.capacity(), 5);
    assert_eq!(buffer.total_inserted(), 7);
    assert_eq!(rewards(&buffer), vec![3, 4, 5, 6, 7]);

    buffer.insert(transition(8.0));
    assert_eq!(rewards(&buffer), vec![4, 5, 6, 7, 8]);
}

#[test]
fn test_sample_returns_distinct_transitions() {
    let mut buffer = ReplayBuffer::new(50);
    for r in 0..50 {
        buffer.insert(transition(r as f32));
    }
    let mut rng = StdRng::seed_from_u64(9);

    for batch_size in [1, 17, 50] {
        let batch = buffer.sample(batch_size, &mut rng).unwrap();
        assert_eq!(batch.len(), batch_size);
        let distinct: HashSet<i32> = batch.iter().map(|t| t.reward as i32).collect();
        assert_eq!(distinct.len(), batch_size);
    }
}

#[test]
fn test_sample_more_than_stored_fails() {
    let mut buffer = ReplayBuffer::new(10);
    for r in 0..3 {
        buffer.insert(transition(r as f32));
    }
    let result = buffer.sample(4, &mut StdRng::seed_from_u64(0));
    assert!(matches!(
        result,
        Err(SacError::InsufficientData { requested: 4, available: 3 })
    ));
}

#[test]
fn test_transition_batch_layout() {
    let stored = [transition(2.0), transition(7.0)];
    let refs: Vec<&Transition> = stored.iter().collect();
    let batch = TransitionBatch::from_transitions(&refs, 2, 1).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.states, array![[2.0, -2.0], [7.0, -7.0]]);
    assert_eq!(batch.actions, array![[1.0], [3.5]]);
    assert_eq!(batch.rewards, array![2.0, 7.0]);
    assert_eq!(batch.next_states, array![[3.0, -3.0], [8.0, -8.0]]);
    assert_eq!(batch.dones, array![0.0, 1.0]);
}

#[test]
fn test_transition_batch_rejects_wrong_sizes() {
    let stored = [transition(1.0)];
    let refs: Vec<&Transition> = stored.iter().collect();
    assert!(matches!(
        TransitionBatch::from_transitions(&refs, 3, 1),
        Err(SacError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        TransitionBatch::from_transitions(&refs, 2, 2),
        Err(SacError::DimensionMismatch { .. })
    ));
}
