use std::sync::Arc;

use crate::{
    data_model::{
        Action, ActionKind, BENCH_CAPACITY, Card, ENERGY_ATTACHMENTS_PER_TURN, EnergyKind,
        HAND_SIZE, MatchState, PRIZE_COUNT, Player, PlayerState, PokemonCard, PokemonInPlay,
    },
    error::RulesError,
};

const DISABLING_STATUSES: [&str; 2] = ["asleep", "paralyzed"];

pub fn initialize_match(deck_a: Vec<Card>, deck_b: Vec<Card>) -> Result<MatchState, RulesError> {
    Ok(MatchState {
        players: [setup_player(deck_a)?, setup_player(deck_b)?],
        current_player: Player::A,
        turn_number: 1,
        winner: None,
    })
}

fn setup_player(mut deck: Vec<Card>) -> Result<PlayerState, RulesError> {
    if deck.len() < HAND_SIZE {
        return Err(RulesError::DeckTooSmall {
            required: HAND_SIZE,
            actual: deck.len(),
        });
    }
    let hand: Vec<Card> = (0..HAND_SIZE).filter_map(|_| deck.pop()).collect();
    let prizes: Vec<Card> = (0..PRIZE_COUNT).filter_map(|_| deck.pop()).collect();
    Ok(PlayerState {
        hand,
        prizes,
        ..PlayerState::new(deck)
    })
}

pub fn draw_card(state: &mut MatchState, player: Player) -> Result<(), RulesError> {
    let player_state = state.player_mut(player);
    let card = player_state.deck.pop().ok_or(RulesError::EmptyDeck)?;
    player_state.hand.push(card);
    Ok(())
}

fn card_at(player_state: &PlayerState, hand_index: usize) -> Result<&Card, RulesError> {
    player_state
        .hand
        .get(hand_index)
        .ok_or(RulesError::InvalidIndex {
            index: hand_index,
            len: player_state.hand.len(),
        })
}

pub fn play_pokemon(
    state: &mut MatchState,
    player: Player,
    hand_index: usize,
    to_bench: bool,
) -> Result<(), RulesError> {
    let player_state = state.player_mut(player);
    let card: Arc<PokemonCard> = card_at(player_state, hand_index)?
        .as_pokemon()
        .cloned()
        .ok_or(RulesError::WrongCardType(hand_index))?;
    if player_state.pokemon_played_this_turn {
        return Err(RulesError::AlreadyPlayedThisTurn);
    }
    if to_bench {
        if player_state.bench.len() >= BENCH_CAPACITY {
            return Err(RulesError::BenchFull);
        }
        player_state.bench.push(PokemonInPlay::new(card));
    } else {
        if player_state.active.is_some() {
            return Err(RulesError::SlotOccupied);
        }
        player_state.active = Some(PokemonInPlay::new(card));
    }
    player_state.hand.remove(hand_index);
    player_state.pokemon_played_this_turn = true;
    player_state.has_fielded_pokemon = true;
    Ok(())
}

/// Attaches to the active pokemon when `bench_index` is `None`.
pub fn attach_energy(
    state: &mut MatchState,
    player: Player,
    hand_index: usize,
    bench_index: Option<usize>,
) -> Result<(), RulesError> {
    let player_state = state.player_mut(player);
    let energy = card_at(player_state, hand_index)?
        .as_energy()
        .ok_or(RulesError::WrongCardType(hand_index))?;
    if player_state.energy_attached_this_turn >= ENERGY_ATTACHMENTS_PER_TURN {
        return Err(RulesError::AlreadyAttachedThisTurn);
    }
    let bench_len = player_state.bench.len();
    let target = match bench_index {
        None => player_state.active.as_mut().ok_or(RulesError::NoTarget)?,
        Some(index) => player_state
            .bench
            .get_mut(index)
            .ok_or(RulesError::InvalidIndex {
                index,
                len: bench_len,
            })?,
    };
    target.attached_energy.push(energy);
    player_state.hand.remove(hand_index);
    player_state.energy_attached_this_turn += 1;
    Ok(())
}

/// Satisfiability check of the attack cost against attached energy. Typed
/// requirements consume the first matching unit in cost order; every
/// colorless requirement then needs one leftover unit of any kind.
pub fn can_attack(pokemon: &PokemonInPlay) -> bool {
    if pokemon
        .status
        .as_deref()
        .is_some_and(|status| DISABLING_STATUSES.contains(&status))
    {
        return false;
    }
    let mut available: Vec<EnergyKind> = pokemon
        .attached_energy
        .iter()
        .map(|energy| energy.kind)
        .collect();
    let mut colorless_required = 0;
    for required in &pokemon.card.attack_cost {
        if *required == EnergyKind::Colorless {
            colorless_required += 1;
            continue;
        }
        match available.iter().position(|kind| kind == required) {
            Some(position) => {
                available.remove(position);
            }
            None => return false,
        }
    }
    available.len() >= colorless_required
}

pub fn attack(state: &mut MatchState, attacking_player: Player) -> Result<(), RulesError> {
    let attacker = state
        .player(attacking_player)
        .active
        .as_ref()
        .ok_or(RulesError::NoActivePokemon)?;
    if state.player(attacking_player.opponent()).active.is_none() {
        return Err(RulesError::OpponentHasNoActivePokemon);
    }
    if !can_attack(attacker) {
        return Err(RulesError::CannotAttack);
    }
    let damage = attacker.card.attack_damage;
    let knocked_out = state
        .player(attacking_player.opponent())
        .active
        .as_ref()
        .is_some_and(|defender| defender.damage + damage >= defender.card.max_hit_points);
    if knocked_out && state.player(attacking_player).prizes.is_empty() {
        return Err(RulesError::NoPrizesRemaining);
    }

    let defender = state.player_mut(attacking_player.opponent());
    if let Some(active) = defender.active.as_mut() {
        active.damage += damage;
    }
    if knocked_out {
        if let Some(fainted) = defender.active.take() {
            defender.discard.push(Card::Pokemon(fainted.card));
            defender
                .discard
                .extend(fainted.attached_energy.into_iter().map(Card::Energy));
        }
        take_prize(state, attacking_player)?;
    }
    Ok(())
}

/// Moves the attacker's top prize into its hand; an emptied prize pile wins.
pub fn take_prize(state: &mut MatchState, player: Player) -> Result<(), RulesError> {
    let player_state = state.player_mut(player);
    let prize = player_state
        .prizes
        .pop()
        .ok_or(RulesError::NoPrizesRemaining)?;
    player_state.hand.push(prize);
    if player_state.prizes.is_empty() {
        state.winner = Some(player);
    }
    Ok(())
}

/// Hands the turn over and draws for the incoming player. Fails without
/// touching the state when the incoming player's deck is empty.
pub fn end_turn(state: &mut MatchState) -> Result<(), RulesError> {
    let incoming = state.current_player.opponent();
    if state.player(incoming).deck.is_empty() {
        return Err(RulesError::EmptyDeck);
    }
    let outgoing = state.current_player;
    state.player_mut(outgoing).reset_turn_flags();
    state.current_player = incoming;
    state.turn_number += 1;
    draw_card(state, incoming)
}

pub fn check_win_condition(state: &mut MatchState) -> Option<Player> {
    if state.winner.is_some() {
        return state.winner;
    }
    let winner = Player::iter()
        .find(|&player| state.player(player).prizes.is_empty())
        .or_else(|| {
            Player::iter()
                .find(|&player| state.player(player).is_wiped_out())
                .map(|player| player.opponent())
        });
    state.winner = winner;
    winner
}

/// Legal actions for the current player, in a fixed order: end turn, then
/// per hand card (bench targets in bench order), then attack. Attack is only
/// offered against a defending active pokemon. A finished match has none.
pub fn get_valid_actions(state: &MatchState) -> Vec<Action> {
    if state.is_over() {
        return Vec::new();
    }
    let player_state = state.current_player_state();
    let mut actions = vec![Action::end_turn()];

    for (hand_index, card) in player_state.hand.iter().enumerate() {
        match card {
            Card::Pokemon(_) => {
                if player_state.pokemon_played_this_turn {
                    continue;
                }
                if player_state.active.is_none() {
                    actions.push(Action::play_pokemon(hand_index, false));
                }
                if player_state.bench.len() < BENCH_CAPACITY {
                    actions.push(Action::play_pokemon(hand_index, true));
                }
            }
            Card::Energy(_) => {
                if player_state.energy_attached_this_turn >= ENERGY_ATTACHMENTS_PER_TURN {
                    continue;
                }
                if player_state.active.is_some() {
                    actions.push(Action::attach_energy(hand_index, None));
                }
                actions.extend(
                    (0..player_state.bench.len())
                        .map(|bench_index| Action::attach_energy(hand_index, Some(bench_index))),
                );
            }
            Card::Trainer(_) => {}
        }
    }

    let has_target = state.opponent_player_state().active.is_some();
    if has_target && player_state.active.as_ref().is_some_and(can_attack) {
        actions.push(Action::attack());
    }
    actions
}

pub fn is_action_legal(state: &MatchState, action: &Action) -> bool {
    get_valid_actions(state).contains(action)
}

/// Only the fields an action kind reads may be set. A missing hand index is
/// reported separately as `MissingHandIndex`.
fn has_kind_shape(action: &Action) -> bool {
    match action.kind {
        ActionKind::PlayPokemon => action.bench_index.is_none(),
        ActionKind::AttachEnergy => !action.to_bench,
        ActionKind::DrawCard | ActionKind::Attack | ActionKind::EndTurn | ActionKind::Pass => {
            action.hand_index.is_none() && action.bench_index.is_none() && !action.to_bench
        }
    }
}

/// Executes `action` for the current player.
pub fn apply_action(state: &mut MatchState, action: &Action) -> Result<(), RulesError> {
    if state.is_over() {
        return Err(RulesError::GameOver);
    }
    if !has_kind_shape(action) {
        return Err(RulesError::IllegalAction(*action));
    }
    let player = state.current_player;
    match action.kind {
        ActionKind::DrawCard => draw_card(state, player),
        ActionKind::PlayPokemon => play_pokemon(
            state,
            player,
            action.hand_index.ok_or(RulesError::MissingHandIndex)?,
            action.to_bench,
        ),
        ActionKind::AttachEnergy => attach_energy(
            state,
            player,
            action.hand_index.ok_or(RulesError::MissingHandIndex)?,
            action.bench_index,
        ),
        ActionKind::Attack => attack(state, player),
        ActionKind::EndTurn => end_turn(state),
        ActionKind::Pass => Ok(()),
    }
}

/// Like [`apply_action`], but refuses anything outside [`get_valid_actions`].
pub fn apply_legal_action(state: &mut MatchState, action: &Action) -> Result<(), RulesError> {
    if state.is_over() {
        return Err(RulesError::GameOver);
    }
    if !is_action_legal(state, action) {
        return Err(RulesError::IllegalAction(*action));
    }
    apply_action(state, action)
}
