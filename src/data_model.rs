use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const PLAYER_COUNT: usize = 2;
pub const HAND_SIZE: usize = 7;
pub const PRIZE_COUNT: usize = 6;
pub const BENCH_CAPACITY: usize = 5;
pub const ENERGY_ATTACHMENTS_PER_TURN: u32 = 1;
pub const ENERGY_KIND_COUNT: usize = 9;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnergyKind {
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Fighting,
    Dark,
    Steel,
    /// Wildcard on the cost side only.
    Colorless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonCard {
    pub name: String,
    pub max_hit_points: u32,
    pub energy_kinds: Vec<EnergyKind>,
    pub attack_cost: Vec<EnergyKind>,
    pub attack_damage: u32,
    pub retreat_cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyCard {
    pub kind: EnergyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerCard {
    pub name: String,
    pub effect: String,
}

/// A playable card. Pokemon and trainer definitions are shared between
/// decks, hands and the catalog; none of them is ever mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Card {
    Pokemon(Arc<PokemonCard>),
    Energy(EnergyCard),
    Trainer(Arc<TrainerCard>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonInPlay {
    pub card: Arc<PokemonCard>,
    pub damage: u32,
    pub attached_energy: Vec<EnergyCard>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    /// The top of the deck is the end of the vector.
    pub deck: Vec<Card>,
    pub hand: Vec<Card>,
    pub active: Option<PokemonInPlay>,
    pub bench: Vec<PokemonInPlay>,
    pub prizes: Vec<Card>,
    pub discard: Vec<Card>,
    pub energy_attached_this_turn: u32,
    pub pokemon_played_this_turn: bool,
    /// Set once the player has put any pokemon into play this match.
    pub has_fielded_pokemon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    A = 0,
    B = 1,
}

/// Cloning a `MatchState` yields a fully independent snapshot: every mutable
/// part is owned, only immutable card definitions are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub players: [PlayerState; PLAYER_COUNT],
    pub current_player: Player,
    pub turn_number: u32,
    pub winner: Option<Player>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ActionKind {
    DrawCard,
    PlayPokemon,
    AttachEnergy,
    Attack,
    EndTurn,
    Pass,
}

/// Structural action descriptor. Equality over all fields is what the action
/// encoder keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub hand_index: Option<usize>,
    pub bench_index: Option<usize>,
    pub to_bench: bool,
}

impl EnergyKind {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn as_index(self) -> usize {
        self as usize
    }
}

impl Card {
    pub fn as_pokemon(&self) -> Option<&Arc<PokemonCard>> {
        match self {
            Card::Pokemon(pokemon) => Some(pokemon),
            Card::Energy(_) | Card::Trainer(_) => None,
        }
    }

    pub fn as_energy(&self) -> Option<EnergyCard> {
        match self {
            Card::Energy(energy) => Some(*energy),
            Card::Pokemon(_) | Card::Trainer(_) => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Card::Pokemon(pokemon) => pokemon.name.clone(),
            Card::Energy(energy) => format!("{} energy", energy.kind),
            Card::Trainer(trainer) => trainer.name.clone(),
        }
    }
}

impl PokemonInPlay {
    pub fn new(card: Arc<PokemonCard>) -> Self {
        Self {
            card,
            damage: 0,
            attached_energy: Vec::new(),
            status: None,
        }
    }

    pub fn is_knocked_out(&self) -> bool {
        self.damage >= self.card.max_hit_points
    }

    pub fn current_hit_points(&self) -> u32 {
        self.card.max_hit_points.saturating_sub(self.damage)
    }
}

impl PlayerState {
    pub fn new(deck: Vec<Card>) -> Self {
        Self {
            deck,
            hand: Vec::new(),
            active: None,
            bench: Vec::new(),
            prizes: Vec::new(),
            discard: Vec::new(),
            energy_attached_this_turn: 0,
            pokemon_played_this_turn: false,
            has_fielded_pokemon: false,
        }
    }

    pub fn reset_turn_flags(&mut self) {
        self.energy_attached_this_turn = 0;
        self.pokemon_played_this_turn = false;
    }

    pub fn has_pokemon_in_play(&self) -> bool {
        self.active.is_some() || !self.bench.is_empty()
    }

    /// Lost all pokemon after having fielded at least one.
    pub fn is_wiped_out(&self) -> bool {
        self.has_fielded_pokemon && !self.has_pokemon_in_play()
    }
}

impl MatchState {
    pub fn player(&self, player: Player) -> &PlayerState {
        &self.players[player.as_index()]
    }

    pub fn player_mut(&mut self, player: Player) -> &mut PlayerState {
        &mut self.players[player.as_index()]
    }

    pub fn current_player_state(&self) -> &PlayerState {
        self.player(self.current_player)
    }

    pub fn opponent_player_state(&self) -> &PlayerState {
        self.player(self.current_player.opponent())
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }
}

impl Player {
    pub fn iter() -> impl Iterator<Item = Self> {
        [Player::A, Player::B].into_iter()
    }

    pub fn opponent(&self) -> Player {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn to_string(self) -> &'static str {
        match self {
            Player::A => "A",
            Player::B => "B",
        }
    }
}

impl Action {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            hand_index: None,
            bench_index: None,
            to_bench: false,
        }
    }

    pub fn draw_card() -> Self {
        Self::new(ActionKind::DrawCard)
    }

    pub fn end_turn() -> Self {
        Self::new(ActionKind::EndTurn)
    }

    pub fn attack() -> Self {
        Self::new(ActionKind::Attack)
    }

    pub fn pass() -> Self {
        Self::new(ActionKind::Pass)
    }

    pub fn play_pokemon(hand_index: usize, to_bench: bool) -> Self {
        Self {
            hand_index: Some(hand_index),
            to_bench,
            ..Self::new(ActionKind::PlayPokemon)
        }
    }

    /// Targets the active pokemon when `bench_index` is `None`.
    pub fn attach_energy(hand_index: usize, bench_index: Option<usize>) -> Self {
        Self {
            hand_index: Some(hand_index),
            bench_index,
            ..Self::new(ActionKind::AttachEnergy)
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hand_index) = self.hand_index {
            write!(f, " hand={hand_index}")?;
        }
        if let Some(bench_index) = self.bench_index {
            write!(f, " bench={bench_index}")?;
        }
        if self.to_bench {
            write!(f, " to_bench")?;
        }
        Ok(())
    }
}
