use std::path::PathBuf;

use clap::Parser;

use pokemon_tcg_bot::{config::TrainingConfig, logging, self_play::train_agent};

#[derive(clap_derive::Parser, Debug)]
struct Args {
    /// JSON training config; command line values take precedence.
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(short, long)]
    episodes: Option<usize>,

    #[clap(short, long)]
    seed: Option<u64>,

    #[clap(long)]
    max_turns: Option<u32>,

    #[clap(long)]
    batch_size: Option<usize>,

    #[clap(long)]
    learning_rate: Option<f64>,

    #[clap(long)]
    hidden_size: Option<usize>,

    #[clap(short = 'o', long)]
    checkpoint_dir: Option<PathBuf>,

    #[clap(short, long)]
    verbose: bool,
}

impl Args {
    fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_file(path)?,
            None => TrainingConfig::default(),
        };
        if let Some(episodes) = self.episodes {
            config.episodes = episodes;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_turns) = self.max_turns {
            config.max_turns = max_turns;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(hidden_size) = self.hidden_size {
            config.hidden_size = hidden_size;
        }
        if let Some(dir) = &self.checkpoint_dir {
            config.checkpoint_dir = dir.clone();
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;
    let config = args.training_config()?;
    log::info!("{:<32}{:<32}", "episodes", config.episodes);
    log::info!("{:<32}{:<32}", "seed", config.seed);
    log::info!("{:<32}{:<32}", "checkpoint dir", config.checkpoint_dir.display());

    let start_time = std::time::Instant::now();
    let summary = train_agent(&config)?;
    log::info!(
        "won {} of {} episodes as seat A, final epsilon {:.3} (took {:?})",
        summary.wins,
        summary.episodes,
        summary.final_epsilon,
        start_time.elapsed()
    );
    Ok(())
}
