use serde::Serialize;

use crate::data_model::{
    BENCH_CAPACITY, ENERGY_KIND_COUNT, EnergyKind, MatchState, PRIZE_COUNT, Player, PokemonInPlay,
};

/// Length of the vector produced by [`encode_state`].
pub const STATE_FEATURES: usize = 10 + OWN_ACTIVE_FEATURES + BENCH_CAPACITY * BENCH_SLOT_FEATURES
    + OPPONENT_ACTIVE_FEATURES;
const OWN_ACTIVE_FEATURES: usize = 5 + 2 * ENERGY_KIND_COUNT;
const BENCH_SLOT_FEATURES: usize = 4;
const OPPONENT_ACTIVE_FEATURES: usize = 4 + ENERGY_KIND_COUNT;

const PILE_SCALE: f32 = 60.0;
const TURN_SCALE: f32 = 100.0;
const ENERGY_SCALE: f32 = 10.0;
const DAMAGE_SCALE: f32 = 100.0;

/// Full detail of a pokemon its owner can see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PokemonView {
    pub name: String,
    pub max_hit_points: u32,
    pub current_hit_points: u32,
    pub damage: u32,
    pub energy_kinds: Vec<EnergyKind>,
    pub attached_energy: Vec<EnergyKind>,
    pub attack_cost: Vec<EnergyKind>,
    pub attack_damage: u32,
    pub status: Option<String>,
}

/// What a player can see of the opposing active pokemon: energy is counted,
/// not itemised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentPokemonView {
    pub name: String,
    pub max_hit_points: u32,
    pub current_hit_points: u32,
    pub damage: u32,
    pub energy_kinds: Vec<EnergyKind>,
    pub attached_energy_count: usize,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub current_player: Player,
    pub turn_number: u32,
    pub hand_size: usize,
    pub deck_size: usize,
    pub prizes_remaining: usize,
    pub discard_size: usize,
    pub active: Option<PokemonView>,
    pub bench: Vec<PokemonView>,
    pub opponent_hand_size: usize,
    pub opponent_deck_size: usize,
    pub opponent_prizes_remaining: usize,
    pub opponent_active: Option<OpponentPokemonView>,
    pub opponent_bench_size: usize,
    pub winner: Option<Player>,
}

impl From<&PokemonInPlay> for PokemonView {
    fn from(pokemon: &PokemonInPlay) -> Self {
        Self {
            name: pokemon.card.name.clone(),
            max_hit_points: pokemon.card.max_hit_points,
            current_hit_points: pokemon.current_hit_points(),
            damage: pokemon.damage,
            energy_kinds: pokemon.card.energy_kinds.clone(),
            attached_energy: pokemon.attached_energy.iter().map(|e| e.kind).collect(),
            attack_cost: pokemon.card.attack_cost.clone(),
            attack_damage: pokemon.card.attack_damage,
            status: pokemon.status.clone(),
        }
    }
}

impl From<&PokemonInPlay> for OpponentPokemonView {
    fn from(pokemon: &PokemonInPlay) -> Self {
        Self {
            name: pokemon.card.name.clone(),
            max_hit_points: pokemon.card.max_hit_points,
            current_hit_points: pokemon.current_hit_points(),
            damage: pokemon.damage,
            energy_kinds: pokemon.card.energy_kinds.clone(),
            attached_energy_count: pokemon.attached_energy.len(),
            status: pokemon.status.clone(),
        }
    }
}

pub fn observe(state: &MatchState, perspective: Player) -> Observation {
    let own = state.player(perspective);
    let opponent = state.player(perspective.opponent());
    Observation {
        current_player: state.current_player,
        turn_number: state.turn_number,
        hand_size: own.hand.len(),
        deck_size: own.deck.len(),
        prizes_remaining: own.prizes.len(),
        discard_size: own.discard.len(),
        active: own.active.as_ref().map(PokemonView::from),
        bench: own.bench.iter().map(PokemonView::from).collect(),
        opponent_hand_size: opponent.hand.len(),
        opponent_deck_size: opponent.deck.len(),
        opponent_prizes_remaining: opponent.prizes.len(),
        opponent_active: opponent.active.as_ref().map(OpponentPokemonView::from),
        opponent_bench_size: opponent.bench.len(),
        winner: state.winner,
    }
}

fn ratio(numerator: u32, denominator: u32) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

fn histogram(kinds: &[EnergyKind], one_hot: bool) -> [f32; ENERGY_KIND_COUNT] {
    let mut counts = [0.0; ENERGY_KIND_COUNT];
    for kind in kinds {
        let slot = &mut counts[kind.as_index()];
        *slot = if one_hot { 1.0 } else { *slot + 1.0 };
    }
    counts
}

/// Fixed-length numeric encoding of the observation for `perspective`.
pub fn encode_state(state: &MatchState, perspective: Player) -> Vec<f32> {
    let observation = observe(state, perspective);
    let mut features = Vec::with_capacity(STATE_FEATURES);

    features.push(if observation.current_player == perspective { 1.0 } else { 0.0 });
    features.push(observation.turn_number as f32 / TURN_SCALE);
    features.push(observation.hand_size as f32 / PILE_SCALE);
    features.push(observation.deck_size as f32 / PILE_SCALE);
    features.push(observation.prizes_remaining as f32 / PRIZE_COUNT as f32);
    features.push(observation.discard_size as f32 / PILE_SCALE);
    features.push(observation.opponent_hand_size as f32 / PILE_SCALE);
    features.push(observation.opponent_deck_size as f32 / PILE_SCALE);
    features.push(observation.opponent_prizes_remaining as f32 / PRIZE_COUNT as f32);
    features.push(observation.opponent_bench_size as f32 / BENCH_CAPACITY as f32);

    match &observation.active {
        Some(active) => {
            features.push(1.0);
            features.push(ratio(active.current_hit_points, active.max_hit_points));
            features.push(ratio(active.damage, active.max_hit_points));
            features.push(active.attached_energy.len() as f32 / ENERGY_SCALE);
            features.push(active.attack_damage as f32 / DAMAGE_SCALE);
            features.extend(histogram(&active.energy_kinds, true));
            features.extend(histogram(&active.attack_cost, false));
        }
        None => features.extend([0.0; OWN_ACTIVE_FEATURES]),
    }

    for slot in 0..BENCH_CAPACITY {
        match observation.bench.get(slot) {
            Some(pokemon) => {
                features.push(1.0);
                features.push(ratio(pokemon.current_hit_points, pokemon.max_hit_points));
                features.push(ratio(pokemon.damage, pokemon.max_hit_points));
                features.push(pokemon.attached_energy.len() as f32 / ENERGY_SCALE);
            }
            None => features.extend([0.0; BENCH_SLOT_FEATURES]),
        }
    }

    match &observation.opponent_active {
        Some(active) => {
            features.push(1.0);
            features.push(ratio(active.current_hit_points, active.max_hit_points));
            features.push(ratio(active.damage, active.max_hit_points));
            features.push(active.attached_energy_count as f32 / ENERGY_SCALE);
            features.extend(histogram(&active.energy_kinds, true));
        }
        None => features.extend([0.0; OPPONENT_ACTIVE_FEATURES]),
    }

    features
}
