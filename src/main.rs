use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use softac::config::{Device, SacConfig};
use softac::env::make_env;
use softac::error::Result;
use softac::tensorboard::{unix_secs, TensorboardWriter};
use softac::trainer::Trainer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train a Soft Actor-Critic agent", long_about = None)]
struct Args {
    /// JSON config file; missing fields use the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of training episodes
    #[arg(short, long)]
    episodes: Option<usize>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Checkpoint directory to restore before training
    #[arg(long)]
    load: Option<PathBuf>,

    /// Root directory for run metrics and checkpoints
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    device: Option<String>,

    /// Do not render evaluation episodes
    #[arg(long, default_value_t = false)]
    no_render: bool,
}

impl Args {
    fn into_config(self) -> Result<SacConfig> {
        let mut config = match &self.config {
            Some(path) => SacConfig::from_json_file(path)?,
            None => SacConfig::default(),
        };
        if let Some(episodes) = self.episodes {
            config.n_episodes = episodes;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(load) = self.load {
            config.load_path = Some(load);
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(device) = &self.device {
            config.device = device.parse::<Device>()?;
        }
        if self.no_render {
            config.render = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.into_config()?;
    let env = make_env(&config.env_id)?;
    let run_name = format!("{}-{}", config.env_id, unix_secs());
    let writer = TensorboardWriter::new(&config.log_dir, &run_name)?;
    config.to_json_file(writer.run_dir().join("config.json"))?;
    let checkpoint_dir = writer.run_dir().join("checkpoints");
    info!(run_dir = %writer.run_dir().display(), device = %config.device, "writing metrics");

    let mut trainer = Trainer::new(config, env, writer)?.with_checkpoint_dir(checkpoint_dir);
    trainer.run()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
