use std::sync::Arc;

use rand::{Rng, seq::IndexedRandom, seq::SliceRandom};

use crate::data_model::{Card, EnergyCard, EnergyKind, PokemonCard, TrainerCard};

pub const DEFAULT_POKEMON_COUNT: usize = 20;
pub const DEFAULT_ENERGY_COUNT: usize = 20;
pub const DEFAULT_TRAINER_COUNT: usize = 20;

/// The immutable card pool decks are drawn from.
#[derive(Debug, Clone)]
pub struct CardCatalog {
    pub pokemon: Vec<Arc<PokemonCard>>,
    pub trainers: Vec<Arc<TrainerCard>>,
    pub energy: Vec<EnergyCard>,
}

fn pokemon(
    name: &str,
    max_hit_points: u32,
    energy_kind: EnergyKind,
    attack_cost: &[EnergyKind],
    attack_damage: u32,
) -> Arc<PokemonCard> {
    Arc::new(PokemonCard {
        name: name.to_string(),
        max_hit_points,
        energy_kinds: vec![energy_kind],
        attack_cost: attack_cost.to_vec(),
        attack_damage,
        retreat_cost: 1,
    })
}

fn trainer(name: &str, effect: &str) -> Arc<TrainerCard> {
    Arc::new(TrainerCard {
        name: name.to_string(),
        effect: effect.to_string(),
    })
}

impl CardCatalog {
    pub fn standard() -> Self {
        use EnergyKind::*;
        Self {
            pokemon: vec![
                pokemon("Pikachu", 60, Electric, &[Electric, Colorless], 30),
                pokemon("Charmander", 50, Fire, &[Fire], 20),
                pokemon("Squirtle", 50, Water, &[Water], 20),
                pokemon("Bulbasaur", 50, Grass, &[Grass], 20),
                pokemon("Raichu", 80, Electric, &[Electric, Electric], 50),
            ],
            trainers: vec![
                trainer("Potion", "Heal 20 damage"),
                trainer("Switch", "Switch active Pokemon"),
                trainer("Professor", "Draw 3 cards"),
            ],
            energy: EnergyKind::iter().map(|kind| EnergyCard { kind }).collect(),
        }
    }

    /// Draws each section uniformly from its pool, then shuffles the deck.
    pub fn create_deck<R: Rng + ?Sized>(
        &self,
        pokemon_count: usize,
        energy_count: usize,
        trainer_count: usize,
        rng: &mut R,
    ) -> Vec<Card> {
        let mut deck = Vec::with_capacity(pokemon_count + energy_count + trainer_count);
        deck.extend(
            (0..pokemon_count)
                .filter_map(|_| self.pokemon.choose(rng))
                .map(|card| Card::Pokemon(Arc::clone(card))),
        );
        deck.extend(
            (0..energy_count)
                .filter_map(|_| self.energy.choose(rng))
                .map(|card| Card::Energy(*card)),
        );
        deck.extend(
            (0..trainer_count)
                .filter_map(|_| self.trainers.choose(rng))
                .map(|card| Card::Trainer(Arc::clone(card))),
        );
        deck.shuffle(rng);
        deck
    }

    pub fn create_default_deck<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Card> {
        self.create_deck(
            DEFAULT_POKEMON_COUNT,
            DEFAULT_ENERGY_COUNT,
            DEFAULT_TRAINER_COUNT,
            rng,
        )
    }
}
