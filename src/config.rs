use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Hard ceiling on turn handoffs per match.
    pub max_turns: u32,
    pub warmup_games: usize,
    pub warmup_max_turns: u32,
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub train_every: usize,
    pub target_sync_every: usize,
    pub checkpoint_every: usize,
    pub log_every: usize,
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay: f32,
    pub hidden_size: usize,
    pub seed: u64,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            max_turns: 200,
            warmup_games: 50,
            warmup_max_turns: 50,
            replay_capacity: 100_000,
            batch_size: 32,
            train_every: 4,
            target_sync_every: 100,
            checkpoint_every: 1000,
            log_every: 100,
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_end: 0.01,
            epsilon_decay: 0.995,
            hidden_size: 128,
            seed: 0,
            checkpoint_dir: PathBuf::from("checkpoints"),
        }
    }
}

impl TrainingConfig {
    /// Missing fields fall back to their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading training config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing training config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{ "episodes": 12, "batch_size": 8 }"#).unwrap();
        assert_eq!(config.episodes, 12);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.max_turns, TrainingConfig::default().max_turns);
    }
}
