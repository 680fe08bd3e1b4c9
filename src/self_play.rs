use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    action_encoder::ActionEncoder,
    agent::{AgentConfig, DqnAgent},
    card_catalog::CardCatalog,
    config::TrainingConfig,
    data_model::{Action, ActionKind, MatchState, Player},
    error::RulesError,
    game_logic::{apply_legal_action, check_win_condition, get_valid_actions, initialize_match},
    nn_bot::{NetworkConfig, TrainingBackend, build_value_function},
    observation::STATE_FEATURES,
    value_function::ValueFunction,
};

pub const WIN_REWARD: f32 = 100.0;
pub const PRIZE_REWARD: f32 = 10.0;
pub const DAMAGE_REWARD: f32 = 5.0;
const WIN_RATE_WINDOW: usize = 100;
const LEARNING_THRESHOLD: f32 = 0.55;
const IMPROVEMENT_THRESHOLD: f32 = 0.05;

/// Who plays seat B. Seat A is always the agent passed to [`play_match`].
pub enum Opponent<'a, V> {
    /// The agent plays both seats; only seat A records transitions.
    Mirror,
    Random,
    Heuristic,
    /// A second agent, recording its own transitions when training.
    Agent(&'a mut DqnAgent<V>),
}

impl<V> Opponent<'_, V> {
    pub fn reborrow(&mut self) -> Opponent<'_, V> {
        match self {
            Opponent::Mirror => Opponent::Mirror,
            Opponent::Random => Opponent::Random,
            Opponent::Heuristic => Opponent::Heuristic,
            Opponent::Agent(agent) => Opponent::Agent(&mut **agent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub max_turns: u32,
    pub training: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: Option<Player>,
    pub turns: u32,
    pub decked_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub done: bool,
    /// The turn could not be handed over because the next player's deck is
    /// empty; the match ends without a winner.
    pub decked_out: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub wins: usize,
    pub losses: Vec<f32>,
    pub final_epsilon: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningReport {
    pub trained_vs_random: f32,
    pub untrained_vs_random: f32,
    pub trained_vs_untrained: f32,
    pub learning_detected: bool,
    pub issues: Vec<String>,
}

impl From<&TrainingConfig> for AgentConfig {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            gamma: config.gamma,
            epsilon_start: config.epsilon_start,
            epsilon_end: config.epsilon_end,
            epsilon_decay: config.epsilon_decay,
            replay_capacity: config.replay_capacity,
        }
    }
}

pub fn new_match<R: Rng + ?Sized>(
    catalog: &CardCatalog,
    rng: &mut R,
) -> Result<MatchState, RulesError> {
    let deck_a = catalog.create_default_deck(rng);
    let deck_b = catalog.create_default_deck(rng);
    initialize_match(deck_a, deck_b)
}

pub fn random_action<R: Rng + ?Sized>(state: &MatchState, rng: &mut R) -> Action {
    get_valid_actions(state)
        .choose(rng)
        .copied()
        .unwrap_or_else(Action::end_turn)
}

/// Attack when possible, otherwise fill an empty active slot, otherwise
/// power up the active pokemon, otherwise end the turn.
pub fn heuristic_action(state: &MatchState) -> Action {
    let actions = get_valid_actions(state);
    let first = |wanted: fn(&Action) -> bool| actions.iter().copied().find(|a| wanted(a));
    first(|a| a.kind == ActionKind::Attack)
        .or_else(|| first(|a| a.kind == ActionKind::PlayPokemon && !a.to_bench))
        .or_else(|| first(|a| a.kind == ActionKind::AttachEnergy && a.bench_index.is_none()))
        .unwrap_or_else(Action::end_turn)
}

/// Applies one validated action and resolves the win condition. Ending the
/// turn into an empty deck is reported as a drawn terminal step instead of
/// being applied.
pub fn step(state: &mut MatchState, action: &Action) -> Result<StepOutcome, RulesError> {
    let incoming = state.current_player.opponent();
    if action.kind == ActionKind::EndTurn && state.player(incoming).deck.is_empty() {
        log::debug!("player {} cannot draw, match drawn", incoming.to_string());
        return Ok(StepOutcome {
            done: true,
            decked_out: true,
        });
    }
    apply_legal_action(state, action)?;
    let done = check_win_condition(state).is_some();
    Ok(StepOutcome {
        done,
        decked_out: false,
    })
}

/// Shaped reward for `player` comparing `state` with that player's own
/// previous observation.
pub fn calculate_reward(
    state: &MatchState,
    previous: &MatchState,
    player: Player,
    done: bool,
) -> f32 {
    if done {
        return match state.winner {
            Some(winner) if winner == player => WIN_REWARD,
            Some(_) => -WIN_REWARD,
            None => 0.0,
        };
    }
    let own = state.player(player);
    let own_before = previous.player(player);
    let opponent = state.player(player.opponent());
    let opponent_before = previous.player(player.opponent());

    let own_prizes = own_before.prizes.len().saturating_sub(own.prizes.len());
    let opponent_prizes = opponent_before
        .prizes
        .len()
        .saturating_sub(opponent.prizes.len());
    let mut reward = PRIZE_REWARD * own_prizes as f32 - PRIZE_REWARD * opponent_prizes as f32;

    if let (Some(now), Some(before)) = (&own.active, &own_before.active) {
        if now.damage < before.damage {
            reward += DAMAGE_REWARD;
        }
    }
    if let (Some(now), Some(before)) = (&opponent.active, &opponent_before.active) {
        if now.damage > before.damage {
            reward += DAMAGE_REWARD;
        }
    }
    reward
}

/// Plays one match from `state` to a win, a deck-out or the turn ceiling.
pub fn play_match<V: ValueFunction, R: Rng + ?Sized>(
    agent: &mut DqnAgent<V>,
    mut opponent: Opponent<'_, V>,
    mut state: MatchState,
    options: &MatchOptions,
    rng: &mut R,
) -> Result<MatchOutcome, RulesError> {
    let mut previous = [state.clone(), state.clone()];
    let mut turns = 0;

    while state.winner.is_none() && turns < options.max_turns {
        let player = state.current_player;
        let action = match (player, &mut opponent) {
            (Player::A, _) | (Player::B, Opponent::Mirror) => {
                agent.select_action(&state, player, options.training, rng)
            }
            (Player::B, Opponent::Random) => random_action(&state, rng),
            (Player::B, Opponent::Heuristic) => heuristic_action(&state),
            (Player::B, Opponent::Agent(other)) => {
                other.select_action(&state, player, options.training, rng)
            }
        };

        let before = state.clone();
        let outcome = step(&mut state, &action)?;
        log::debug!(
            "turn {} player {} played {action}",
            before.turn_number,
            player.to_string()
        );

        if options.training {
            let reward = calculate_reward(&state, &previous[player.as_index()], player, outcome.done);
            let recorder = match (player, &mut opponent) {
                (Player::A, _) => Some(&mut *agent),
                (Player::B, Opponent::Agent(other)) => Some(&mut **other),
                (Player::B, Opponent::Mirror | Opponent::Random | Opponent::Heuristic) => None,
            };
            if let Some(recorder) = recorder {
                recorder.store_transition(&before, &action, reward, &state, outcome.done, player);
            }
        }
        previous[player.as_index()] = before;

        if outcome.decked_out {
            return Ok(MatchOutcome {
                winner: None,
                turns,
                decked_out: true,
            });
        }
        if state.current_player != player {
            turns += 1;
        }
    }

    Ok(MatchOutcome {
        winner: state.winner,
        turns,
        decked_out: false,
    })
}

/// Encodes every legal action met during uniform-random matches, so the
/// value-function output width can be fixed up front.
pub fn build_action_space<R: Rng + ?Sized>(
    encoder: &mut ActionEncoder,
    catalog: &CardCatalog,
    games: usize,
    max_turns: u32,
    rng: &mut R,
) -> Result<(), RulesError> {
    for _ in 0..games {
        let mut state = new_match(catalog, rng)?;
        let mut turns = 0;
        while state.winner.is_none() && turns < max_turns {
            let actions = get_valid_actions(&state);
            for action in &actions {
                encoder.encode(action);
            }
            let Some(action) = actions.choose(rng) else {
                break;
            };
            let player = state.current_player;
            if step(&mut state, action)?.decked_out {
                break;
            }
            if state.current_player != player {
                turns += 1;
            }
        }
    }
    log::info!("{:<32}{:<32}", "action space size", encoder.max_actions());
    Ok(())
}

/// Runs the episode loop for an existing agent.
pub fn run_training<V: ValueFunction, R: Rng + ?Sized>(
    agent: &mut DqnAgent<V>,
    catalog: &CardCatalog,
    config: &TrainingConfig,
    rng: &mut R,
) -> anyhow::Result<TrainingSummary> {
    let options = MatchOptions {
        max_turns: config.max_turns,
        training: true,
    };
    let mut recent: VecDeque<bool> = VecDeque::with_capacity(WIN_RATE_WINDOW);
    let mut losses = Vec::new();
    let mut wins = 0;

    for episode in 0..config.episodes {
        let state = new_match(catalog, rng)?;
        let outcome = play_match(agent, Opponent::Mirror, state, &options, rng)?;
        let won = outcome.winner == Some(Player::A);
        wins += usize::from(won);
        if recent.len() == WIN_RATE_WINDOW {
            recent.pop_front();
        }
        recent.push_back(won);

        if episode % config.train_every.max(1) == 0
            && agent.replay_buffer().len() >= config.batch_size
        {
            if let Some(loss) = agent.train_step(config.batch_size, rng) {
                losses.push(loss);
            }
        }
        if episode % config.target_sync_every.max(1) == 0 {
            agent.update_target_network();
        }
        agent.update_epsilon();

        if episode % config.log_every.max(1) == 0 {
            let win_rate = recent.iter().filter(|&&w| w).count() as f32 / recent.len() as f32;
            let window = &losses[losses.len().saturating_sub(WIN_RATE_WINDOW)..];
            let average_loss = if window.is_empty() {
                0.0
            } else {
                window.iter().sum::<f32>() / window.len() as f32
            };
            log::info!(
                "episode {episode:>6}  win rate {win_rate:.2}  epsilon {:.3}  avg loss {average_loss:.4}  turns {}",
                agent.epsilon(),
                outcome.turns
            );
        }
        if config.checkpoint_every > 0 && episode > 0 && episode % config.checkpoint_every == 0 {
            agent.save(&config.checkpoint_dir)?;
        }
    }
    agent.save(&config.checkpoint_dir)?;

    Ok(TrainingSummary {
        episodes: config.episodes,
        wins,
        losses,
        final_epsilon: agent.epsilon(),
    })
}

pub fn network_config(config: &TrainingConfig, action_count: usize) -> NetworkConfig {
    NetworkConfig {
        state_dim: STATE_FEATURES,
        hidden_size: config.hidden_size,
        action_count,
        learning_rate: config.learning_rate,
    }
}

/// A freshly initialized burn-backed agent over `encoder`'s vocabulary,
/// scoring `action_count` indices. Every agent built here has the same
/// concrete type, so trained and untrained agents can face each other.
pub fn burn_agent(
    config: &TrainingConfig,
    encoder: ActionEncoder,
    action_count: usize,
) -> DqnAgent<impl ValueFunction + use<>> {
    let network = network_config(config, action_count);
    let value_function = build_value_function::<TrainingBackend>(network, Default::default());
    DqnAgent::new(value_function, encoder, AgentConfig::from(config))
}

/// Warm-up, build a fresh burn-backed agent, train and checkpoint it.
pub fn train_agent(config: &TrainingConfig) -> anyhow::Result<TrainingSummary> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let catalog = CardCatalog::standard();
    let mut encoder = ActionEncoder::new();
    build_action_space(
        &mut encoder,
        &catalog,
        config.warmup_games,
        config.warmup_max_turns,
        &mut rng,
    )?;
    let action_count = encoder.max_actions();
    let mut agent = burn_agent(config, encoder, action_count);
    let summary = run_training(&mut agent, &catalog, config, &mut rng)?;
    log::info!(
        "training complete: {} wins in {} episodes, checkpoint at {}",
        summary.wins,
        summary.episodes,
        config.checkpoint_dir.display()
    );
    Ok(summary)
}

/// Win rate of seat A over non-training matches.
pub fn evaluate_agent<V: ValueFunction, R: Rng + ?Sized>(
    agent: &mut DqnAgent<V>,
    mut opponent: Opponent<'_, V>,
    games: usize,
    catalog: &CardCatalog,
    max_turns: u32,
    rng: &mut R,
) -> Result<f32, RulesError> {
    if games == 0 {
        return Ok(0.0);
    }
    let options = MatchOptions {
        max_turns,
        training: false,
    };
    let mut wins = 0;
    for _ in 0..games {
        let state = new_match(catalog, rng)?;
        let outcome = play_match(agent, opponent.reborrow(), state, &options, rng)?;
        if outcome.winner == Some(Player::A) {
            wins += 1;
        }
    }
    Ok(wins as f32 / games as f32)
}

/// Compares a trained agent with an untrained one, both acting greedily.
pub fn validate_learning<V: ValueFunction, R: Rng + ?Sized>(
    trained: &mut DqnAgent<V>,
    untrained: &mut DqnAgent<V>,
    games: usize,
    catalog: &CardCatalog,
    max_turns: u32,
    rng: &mut R,
) -> Result<LearningReport, RulesError> {
    trained.set_epsilon(0.0);
    untrained.set_epsilon(0.0);
    let trained_vs_random =
        evaluate_agent(trained, Opponent::Random, games, catalog, max_turns, rng)?;
    let untrained_vs_random =
        evaluate_agent(untrained, Opponent::Random, games, catalog, max_turns, rng)?;
    let trained_vs_untrained = evaluate_agent(
        trained,
        Opponent::Agent(untrained),
        games,
        catalog,
        max_turns,
        rng,
    )?;

    let mut issues = Vec::new();
    if trained_vs_random <= LEARNING_THRESHOLD {
        issues.push(format!(
            "trained agent win rate against random ({:.0}%) is not significantly above random",
            trained_vs_random * 100.0
        ));
    }
    if trained_vs_untrained <= LEARNING_THRESHOLD {
        issues.push(format!(
            "trained agent does not consistently beat the untrained agent ({:.0}%)",
            trained_vs_untrained * 100.0
        ));
    }
    if trained_vs_random <= untrained_vs_random + IMPROVEMENT_THRESHOLD {
        issues.push(format!(
            "improvement over the untrained agent ({:.0}%) is minimal",
            (trained_vs_random - untrained_vs_random) * 100.0
        ));
    }
    Ok(LearningReport {
        trained_vs_random,
        untrained_vs_random,
        trained_vs_untrained,
        learning_detected: issues.len() < 3,
        issues,
    })
}
