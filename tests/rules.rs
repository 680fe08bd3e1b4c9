use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

use pokemon_tcg_bot::{
    card_catalog::CardCatalog,
    data_model::{
        Action, ActionKind, Card, EnergyCard, EnergyKind, HAND_SIZE, MatchState, PRIZE_COUNT,
        Player, PokemonCard, PokemonInPlay,
    },
    error::RulesError,
    game_logic::{apply_action, apply_legal_action, get_valid_actions, initialize_match},
    self_play::{new_match, step},
};

fn candidate_actions(state: &MatchState) -> Vec<Action> {
    let player = state.current_player_state();
    let mut candidates = vec![Action::attack()];
    for hand_index in 0..player.hand.len() + 2 {
        candidates.push(Action::play_pokemon(hand_index, false));
        candidates.push(Action::play_pokemon(hand_index, true));
        candidates.push(Action::attach_energy(hand_index, None));
        for bench_index in 0..player.bench.len() + 2 {
            candidates.push(Action::attach_energy(hand_index, Some(bench_index)));
        }
    }
    // fields the action kind does not read
    for base in [
        Action::end_turn(),
        Action::attack(),
        Action::draw_card(),
        Action::pass(),
    ] {
        candidates.push(Action {
            hand_index: Some(42),
            ..base
        });
        candidates.push(Action {
            to_bench: true,
            bench_index: Some(3),
            ..base
        });
    }
    for hand_index in 0..player.hand.len() {
        candidates.push(Action {
            bench_index: Some(0),
            ..Action::play_pokemon(hand_index, true)
        });
        candidates.push(Action {
            to_bench: true,
            ..Action::attach_energy(hand_index, None)
        });
    }
    candidates
}

/// Random playouts, checking every reachable state along the way.
fn for_each_reachable_state(mut check: impl FnMut(&MatchState)) {
    let catalog = CardCatalog::standard();
    for seed in 0..12 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = new_match(&catalog, &mut rng).unwrap();
        for _ in 0..300 {
            if state.winner.is_some() {
                break;
            }
            check(&state);
            let actions = get_valid_actions(&state);
            let action = *actions.choose(&mut rng).unwrap();
            if step(&mut state, &action).unwrap().decked_out {
                break;
            }
        }
    }
}

#[test]
fn initialization_deals_seven_and_six() {
    let catalog = CardCatalog::standard();
    let mut rng = StdRng::seed_from_u64(1);
    for (pokemon, energy, trainers) in [(3, 3, 1), (5, 5, 3), (20, 20, 20), (1, 30, 0)] {
        let deck_a = catalog.create_deck(pokemon, energy, trainers, &mut rng);
        let deck_b = catalog.create_deck(energy, pokemon, trainers, &mut rng);
        let size = pokemon + energy + trainers;
        let state = initialize_match(deck_a, deck_b).unwrap();
        for player in Player::iter() {
            let player_state = state.player(player);
            assert_eq!(player_state.hand.len(), HAND_SIZE);
            assert_eq!(player_state.prizes.len(), PRIZE_COUNT.min(size - HAND_SIZE));
            assert_eq!(player_state.deck.len(), size - HAND_SIZE - player_state.prizes.len());
        }
        assert_eq!(state.current_player, Player::A);
        assert_eq!(state.turn_number, 1);
        assert_eq!(state.winner, None);
    }
}

#[test]
fn initialization_rejects_short_decks() {
    let catalog = CardCatalog::standard();
    let mut rng = StdRng::seed_from_u64(2);
    let short = catalog.create_deck(2, 2, 2, &mut rng);
    let full = catalog.create_default_deck(&mut rng);
    assert_eq!(
        initialize_match(full, short),
        Err(RulesError::DeckTooSmall {
            required: HAND_SIZE,
            actual: 6
        })
    );
}

#[test]
fn finished_match_offers_nothing() {
    let mut state = new_match(&CardCatalog::standard(), &mut StdRng::seed_from_u64(3)).unwrap();
    state.winner = Some(Player::B);
    assert!(get_valid_actions(&state).is_empty());
    assert_eq!(
        apply_action(&mut state, &Action::end_turn()),
        Err(RulesError::GameOver)
    );
}

#[test]
fn every_listed_action_applies() {
    for_each_reachable_state(|state| {
        let incoming_deck_empty = state.player(state.current_player.opponent()).deck.is_empty();
        for action in get_valid_actions(state) {
            let mut next = state.clone();
            let result = apply_action(&mut next, &action);
            if action.kind == ActionKind::EndTurn && incoming_deck_empty {
                assert_eq!(result, Err(RulesError::EmptyDeck));
                assert_eq!(&next, state);
            } else {
                assert_eq!(result, Ok(()), "{action} failed");
            }
        }
    });
}

#[test]
fn unlisted_actions_fail_without_side_effects() {
    for_each_reachable_state(|state| {
        let valid = get_valid_actions(state);
        for candidate in candidate_actions(state) {
            if valid.contains(&candidate) {
                continue;
            }
            let mut next = state.clone();
            assert!(apply_action(&mut next, &candidate).is_err(), "{candidate} succeeded");
            assert_eq!(&next, state);
            assert_eq!(
                apply_legal_action(&mut next, &candidate),
                Err(RulesError::IllegalAction(candidate))
            );
        }
    });
}

#[test]
fn play_then_attack_knocks_out_and_takes_one_prize() {
    let striker = Arc::new(PokemonCard {
        name: "Striker".to_string(),
        max_hit_points: 70,
        energy_kinds: vec![EnergyKind::Fighting],
        attack_cost: vec![],
        attack_damage: 40,
        retreat_cost: 1,
    });
    let defender = Arc::new(PokemonCard {
        name: "Target".to_string(),
        max_hit_points: 40,
        energy_kinds: vec![EnergyKind::Water],
        attack_cost: vec![EnergyKind::Water],
        attack_damage: 10,
        retreat_cost: 1,
    });
    let energy = Card::Energy(EnergyCard {
        kind: EnergyKind::Fighting,
    });
    // The top of the deck is its end: the striker is drawn first.
    let mut deck_a = vec![energy; 19];
    deck_a.push(Card::Pokemon(striker));
    let deck_b = vec![Card::Pokemon(defender.clone()); 20];

    let mut state = initialize_match(deck_a, deck_b).unwrap();
    state.player_mut(Player::B).active = Some(PokemonInPlay::new(defender));
    assert!(matches!(state.player(Player::A).hand[0], Card::Pokemon(_)));

    apply_legal_action(&mut state, &Action::play_pokemon(0, false)).unwrap();
    apply_legal_action(&mut state, &Action::attack()).unwrap();

    let attacker = state.player(Player::A);
    let defender = state.player(Player::B);
    assert!(defender.active.is_none());
    assert!(matches!(defender.discard.as_slice(), [Card::Pokemon(_)]));
    assert_eq!(attacker.prizes.len(), PRIZE_COUNT - 1);
    assert_eq!(attacker.hand.len(), HAND_SIZE);
    assert_eq!(defender.prizes.len(), PRIZE_COUNT);
    assert_eq!(state.winner, None);
}
