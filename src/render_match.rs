use crate::{
    data_model::{Card, EnergyKind, MatchState, Player},
    observation::{OpponentPokemonView, PokemonView, observe},
};

fn energy_list(kinds: &[EnergyKind]) -> String {
    if kinds.is_empty() {
        return "-".to_string();
    }
    kinds
        .iter()
        .map(EnergyKind::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_pokemon(pokemon: &PokemonView) -> String {
    format!(
        "{} {}/{} hp  energy [{}]  attack {} for [{}]",
        pokemon.name,
        pokemon.current_hit_points,
        pokemon.max_hit_points,
        energy_list(&pokemon.attached_energy),
        pokemon.attack_damage,
        energy_list(&pokemon.attack_cost),
    )
}

fn render_opponent_pokemon(pokemon: &OpponentPokemonView) -> String {
    format!(
        "{} {}/{} hp  {} energy attached",
        pokemon.name,
        pokemon.current_hit_points,
        pokemon.max_hit_points,
        pokemon.attached_energy_count,
    )
}

fn render_card(card: &Card) -> String {
    match card {
        Card::Pokemon(pokemon) => format!("{} ({} hp)", pokemon.name, pokemon.max_hit_points),
        Card::Energy(energy) => format!("{} energy", energy.kind),
        Card::Trainer(trainer) => trainer.name.clone(),
    }
}

/// What `perspective` can see, as a few lines of text: the opponent's side
/// first, then the player's own side and hand.
pub fn render_match(state: &MatchState, perspective: Player) -> String {
    let view = observe(state, perspective);
    let mut lines = vec![format!(
        "┌── turn {} ── {} to move",
        view.turn_number,
        view.current_player.to_string()
    )];
    lines.push(format!(
        "│ opponent  hand {}  deck {}  prizes {}  bench {}",
        view.opponent_hand_size,
        view.opponent_deck_size,
        view.opponent_prizes_remaining,
        view.opponent_bench_size
    ));
    lines.push(format!(
        "│   active  {}",
        view.opponent_active
            .as_ref()
            .map_or("-".to_string(), render_opponent_pokemon)
    ));
    lines.push(format!(
        "│ {:<9} hand {}  deck {}  prizes {}  discard {}",
        perspective.to_string(),
        view.hand_size,
        view.deck_size,
        view.prizes_remaining,
        view.discard_size
    ));
    lines.push(format!(
        "│   active  {}",
        view.active.as_ref().map_or("-".to_string(), render_pokemon)
    ));
    for (index, pokemon) in view.bench.iter().enumerate() {
        lines.push(format!("│   bench {index} {}", render_pokemon(pokemon)));
    }
    for (index, card) in state.player(perspective).hand.iter().enumerate() {
        lines.push(format!("│   hand {index}  {}", render_card(card)));
    }
    lines.push("└──".to_string());
    lines.join("\n")
}
