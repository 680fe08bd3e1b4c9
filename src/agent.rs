use std::path::Path;

use anyhow::Context;
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    action_encoder::ActionEncoder,
    data_model::{Action, MatchState, Player},
    observation::encode_state,
    replay_buffer::{ReplayBuffer, Transition},
    value_function::{TrainingSample, ValueFunction},
};

const AGENT_STATE_FILE: &str = "agent.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay: f32,
    pub replay_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_end: 0.01,
            epsilon_decay: 0.995,
            replay_capacity: 100_000,
        }
    }
}

/// Persisted next to the value-function records: indices are meaningless
/// without the mapping that produced them. The encoder may have outgrown the
/// value function, so its output width is stored too.
#[derive(Debug, Serialize, Deserialize)]
struct AgentState {
    epsilon: f32,
    action_count: usize,
    action_encoder: ActionEncoder,
}

/// What a value function must look like before a checkpoint can be loaded
/// into it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointShape {
    pub action_count: usize,
    pub encoder: ActionEncoder,
}

/// Epsilon-greedy, mask-aware policy over a value function.
pub struct DqnAgent<V> {
    value_function: V,
    encoder: ActionEncoder,
    replay_buffer: ReplayBuffer,
    epsilon: f32,
    config: AgentConfig,
}

impl<V: ValueFunction> DqnAgent<V> {
    pub fn new(value_function: V, encoder: ActionEncoder, config: AgentConfig) -> Self {
        Self {
            value_function,
            encoder,
            replay_buffer: ReplayBuffer::new(config.replay_capacity),
            epsilon: config.epsilon_start,
            config,
        }
    }

    pub fn encoder(&self) -> &ActionEncoder {
        &self.encoder
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }

    pub fn value_function(&self) -> &V {
        &self.value_function
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    fn random_legal_action<R: Rng + ?Sized>(&mut self, state: &MatchState, rng: &mut R) -> Action {
        self.encoder
            .valid_action_indices(state)
            .choose(rng)
            .and_then(|&index| self.encoder.decode(index))
            .unwrap_or_else(Action::end_turn)
    }

    pub fn select_action<R: Rng + ?Sized>(
        &mut self,
        state: &MatchState,
        perspective: Player,
        training: bool,
        rng: &mut R,
    ) -> Action {
        if training && rng.random::<f32>() < self.epsilon {
            return self.random_legal_action(state, rng);
        }

        let scores = self
            .value_function
            .predict(&encode_state(state, perspective));
        let mask = self.encoder.action_mask(state, scores.len());
        if !mask.iter().any(|&legal| legal) {
            return Action::end_turn();
        }
        let best = scores
            .iter()
            .zip(&mask)
            .map(|(&score, &legal)| if legal { score } else { f32::NEG_INFINITY })
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index);

        match best
            .filter(|&index| mask[index])
            .and_then(|index| self.encoder.decode(index))
        {
            Some(action) => action,
            None => {
                log::warn!("arg-max fell outside the known action space, acting randomly");
                self.random_legal_action(state, rng)
            }
        }
    }

    /// Geometric annealing toward the floor, once per episode.
    pub fn update_epsilon(&mut self) {
        if self.epsilon > self.config.epsilon_end {
            self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_end);
        }
    }

    pub fn store_transition(
        &mut self,
        before: &MatchState,
        action: &Action,
        reward: f32,
        after: &MatchState,
        done: bool,
        perspective: Player,
    ) {
        let action = self.encoder.encode(action);
        let size = self.encoder.len();
        self.replay_buffer.push(Transition {
            state: encode_state(before, perspective),
            action,
            reward,
            next_state: encode_state(after, perspective),
            done,
            action_mask: self.encoder.action_mask(before, size),
            next_action_mask: self.encoder.action_mask(after, size),
        });
    }

    /// Samples a batch and fits the value function toward
    /// `reward + gamma * max legal next score` (or `reward` when terminal).
    /// `None` until the buffer holds a full batch.
    pub fn train_step<R: Rng + ?Sized>(&mut self, batch_size: usize, rng: &mut R) -> Option<f32> {
        let width = self.value_function.action_count();
        let batch = self.replay_buffer.sample(batch_size, rng).ok()?;
        let (batch, skipped): (Vec<&Transition>, Vec<&Transition>) =
            batch.into_iter().partition(|t| t.action < width);
        if !skipped.is_empty() {
            log::debug!("skipping {} transitions outside the output width", skipped.len());
        }
        if batch.is_empty() {
            return None;
        }

        let next_states: Vec<Vec<f32>> = batch.iter().map(|t| t.next_state.clone()).collect();
        let next_scores = self.value_function.predict_target(&next_states);
        let samples: Vec<TrainingSample> = batch
            .iter()
            .zip(&next_scores)
            .map(|(transition, scores)| {
                let bootstrap = scores
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| {
                        transition
                            .next_action_mask
                            .get(*index)
                            .copied()
                            .unwrap_or(false)
                    })
                    .map(|(_, &score)| score)
                    .max_by(f32::total_cmp);
                let target = match bootstrap {
                    Some(next) if !transition.done => {
                        transition.reward + self.config.gamma * next
                    }
                    _ => transition.reward,
                };
                TrainingSample {
                    features: transition.state.clone(),
                    action: transition.action,
                    target,
                }
            })
            .collect();

        Some(self.value_function.fit(&samples))
    }

    pub fn update_target_network(&mut self) {
        self.value_function.sync_target();
    }

    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating checkpoint directory {}", dir.display()))?;
        self.value_function.save(dir)?;
        let state = AgentState {
            epsilon: self.epsilon,
            action_count: self.value_function.action_count(),
            action_encoder: self.encoder.clone(),
        };
        let path = dir.join(AGENT_STATE_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("{:<32}{:<32}", "saved agent", dir.display());
        Ok(())
    }

    pub fn load(&mut self, dir: &Path) -> anyhow::Result<()> {
        let state = read_agent_state(dir)?;
        if state.action_count != self.value_function.action_count() {
            anyhow::bail!(
                "checkpoint {} scores {} actions, value function has {}",
                dir.display(),
                state.action_count,
                self.value_function.action_count()
            );
        }
        self.value_function.load(dir)?;
        self.epsilon = state.epsilon;
        self.encoder = state.action_encoder;
        log::info!("{:<32}{:<32}", "loaded agent", dir.display());
        Ok(())
    }
}

fn read_agent_state(dir: &Path) -> anyhow::Result<AgentState> {
    let path = dir.join(AGENT_STATE_FILE);
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// A value function of this shape has to exist before [`DqnAgent::load`]
/// can restore the checkpoint in `dir`.
pub fn read_checkpoint_shape(dir: &Path) -> anyhow::Result<CheckpointShape> {
    let state = read_agent_state(dir)?;
    Ok(CheckpointShape {
        action_count: state.action_count,
        encoder: state.action_encoder,
    })
}
