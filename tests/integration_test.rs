use ndarray::array;
use softac::algorithms::SacAgent;
use softac::config::SacConfig;
use softac::env::{make_env, Environment, Pendulum};
use softac::error::SacError;
use softac::replay_buffer::{ReplayBuffer, Transition};
use softac::tensorboard::{MemoryWriter, ScalarWriter, TensorboardWriter};
use softac::trainer::Trainer;

fn short_run_config() -> SacConfig {
    SacConfig {
        n_episodes: 3,
        hidden_size: 16,
        train_batch_size: 32,
        replay_buffer_size: 500,
        evaluate_freq: 2,
        save_freq: 2,
        render: false,
        ..SacConfig::default()
    }
}

#[test]
fn test_end_to_end_training() {
    let env = Pendulum::new().with_max_steps(40);
    let mut writer = MemoryWriter::new();
    let reports = {
        let mut trainer = Trainer::new(short_run_config(), env, &mut writer).unwrap();
        let reports = trainer.run().unwrap();
        assert_eq!(trainer.total_steps(), 120);
        assert_eq!(trainer.buffer().len(), 120);
        reports
    };

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.steps == 40));
    // The buffer holds a full batch from step 32 on, so every episode ends
    // with a real optimisation step.
    assert!(reports.iter().all(|r| r.losses.is_finite() && r.losses.critic > 0.0));
    assert!(reports[0].evaluation.is_some());
    assert!(reports[1].evaluation.is_none());
    assert!(reports[2].evaluation.is_some());

    for tag in ["train/V-loss", "train/Q-loss", "train/Pi-loss", "train/Total loss", "train/steps"] {
        let steps: Vec<u64> = writer.series(tag).iter().map(|&(s, _)| s).collect();
        assert_eq!(steps, vec![0, 1, 2], "{}", tag);
    }
    assert_eq!(writer.series("train/steps"), vec![(0, 40.0), (1, 80.0), (2, 120.0)]);
    let evals: Vec<u64> = writer.series("eval/rewards").iter().map(|&(s, _)| s).collect();
    assert_eq!(evals, vec![0, 2]);

    let totals = writer.series("train/Total loss");
    let last = &reports[2].losses;
    assert!((totals[2].1 - (last.value + last.critic + last.policy)).abs() < 1e-4);
}

#[test]
fn test_same_seed_same_run() {
    let run = |seed: u64| {
        let config = SacConfig { seed, n_episodes: 2, ..short_run_config() };
        let mut trainer = Trainer::new(config, Pendulum::new().with_max_steps(40), MemoryWriter::new()).unwrap();
        trainer.run().unwrap()
    };
    assert_eq!(run(5), run(5));
    assert_ne!(run(5)[1].reward, run(6)[1].reward);
}

#[test]
fn test_resume_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let trained = {
        let mut trainer = Trainer::new(short_run_config(), Pendulum::new().with_max_steps(40), MemoryWriter::new())
            .unwrap()
            .with_checkpoint_dir(dir.path());
        trainer.run().unwrap();
        trainer.agent().actor.clone()
    };
    let checkpoint = dir.path().join("ep2");
    assert!(checkpoint.join("q2.bin").exists());

    let config = SacConfig {
        load_path: Some(checkpoint),
        seed: 42,
        ..short_run_config()
    };
    let trainer = Trainer::new(config, Pendulum::new(), MemoryWriter::new()).unwrap();
    // Saved after episode two; the third episode kept training.
    assert_ne!(trainer.agent().actor, trained);

    let mut reference = SacAgent::new(3, array![2.0], &short_run_config()).unwrap();
    reference.load_checkpoint(dir.path().join("ep2")).unwrap();
    assert_eq!(trainer.agent().actor, reference.actor);
    assert_eq!(trainer.agent().value_target, reference.value_target);
}

#[test]
fn test_missing_checkpoint_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = SacConfig {
        load_path: Some(dir.path().join("nowhere")),
        ..short_run_config()
    };
    let result = Trainer::new(config, Pendulum::new(), MemoryWriter::new());
    assert!(matches!(result, Err(SacError::Io(_))));
}

#[test]
fn test_invalid_config_rejected_before_training() {
    let config = SacConfig { gamma: 1.5, ..short_run_config() };
    let result = Trainer::new(config, Pendulum::new(), MemoryWriter::new());
    assert!(matches!(result, Err(SacError::InvalidParameter { .. })));
}

#[test]
fn test_boxed_env_and_csv_writer() {
    let dir = tempfile::tempdir().unwrap();
    let env = make_env("Pendulum-v0").unwrap();
    let writer = TensorboardWriter::new(dir.path(), "Pendulum-v0-0").unwrap();
    let run_dir = writer.run_dir().to_path_buf();
    let config = SacConfig { n_episodes: 1, ..short_run_config() };

    let mut trainer = Trainer::new(config, env, writer).unwrap();
    trainer.run().unwrap();
    drop(trainer);

    let csv = std::fs::read_to_string(run_dir.join("scalars.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("step,tag,value,wall_time"));
    let tags: Vec<&str> = lines.filter_map(|l| l.split(',').nth(1)).collect();
    assert_eq!(
        tags,
        vec!["train/V-loss", "train/Q-loss", "train/Pi-loss", "train/Total loss", "train/steps", "eval/rewards"]
    );
}

#[test]
fn test_buffer_feeds_agent_directly() {
    let mut env = Pendulum::new();
    env.seed(1);
    let config = SacConfig { train_batch_size: 8, hidden_size: 8, ..SacConfig::default() };
    let mut agent = SacAgent::new(3, env.action_space().high.clone(), &config).unwrap();
    let mut buffer = ReplayBuffer::new(16);

    let mut state = env.reset().unwrap();
    for _ in 0..16 {
        let action = agent.act(state.view()).unwrap();
        assert!(env.action_space().contains(action.view()));
        let step = env.step(action.view()).unwrap();
        buffer.insert(Transition {
            state,
            action,
            reward: step.reward,
            next_state: step.next_state.clone(),
            done: step.done,
        });
        state = step.next_state;
    }

    let losses = agent.optimize(&buffer).unwrap();
    assert!(losses.is_finite());
    assert_ne!(losses.total(), 0.0);

    let mut sink = MemoryWriter::new();
    sink.add_scalar("train/Total loss", losses.total(), 0).unwrap();
    assert_eq!(sink.series("train/Total loss"), vec![(0, losses.total())]);
}
