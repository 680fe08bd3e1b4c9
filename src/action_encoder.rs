use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{data_model::Action, data_model::MatchState, game_logic::get_valid_actions};

/// Growing bijection between structural actions and dense indices.
///
/// Indices are handed out in order of first observation, so a mapping is only
/// meaningful next to the value function trained with it. `encode` mutates;
/// share it across threads behind a lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionEncoder {
    actions: Vec<Action>,
    indices: HashMap<Action, usize>,
}

impl ActionEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, action: &Action) -> usize {
        if let Some(&index) = self.indices.get(action) {
            return index;
        }
        let index = self.actions.len();
        self.actions.push(*action);
        self.indices.insert(*action, index);
        log::debug!("encoded new action {action} as {index}");
        index
    }

    /// `None` for indices not observed yet.
    pub fn decode(&self, index: usize) -> Option<Action> {
        self.actions.get(index).copied()
    }

    pub fn index_of(&self, action: &Action) -> Option<usize> {
        self.indices.get(action).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Never below one, so an output layer always has a slot.
    pub fn max_actions(&self) -> usize {
        self.actions.len().max(1)
    }

    pub fn action_mask(&self, state: &MatchState, size: usize) -> Vec<bool> {
        let valid = get_valid_actions(state);
        (0..size)
            .map(|index| {
                self.actions
                    .get(index)
                    .is_some_and(|action| valid.contains(action))
            })
            .collect()
    }

    /// Encodes every currently legal action, in enumeration order.
    pub fn valid_action_indices(&mut self, state: &MatchState) -> Vec<usize> {
        get_valid_actions(state)
            .iter()
            .map(|action| self.encode(action))
            .collect()
    }
}

impl TryFrom<Vec<Action>> for ActionEncoder {
    type Error = String;

    fn try_from(actions: Vec<Action>) -> Result<Self, Self::Error> {
        let mut encoder = ActionEncoder::new();
        for action in &actions {
            if encoder.index_of(action).is_some() {
                return Err(format!("duplicate action {action} in encoder mapping"));
            }
            encoder.encode(action);
        }
        Ok(encoder)
    }
}

impl From<ActionEncoder> for Vec<Action> {
    fn from(encoder: ActionEncoder) -> Self {
        encoder.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        card_catalog::CardCatalog,
        game_logic::{get_valid_actions, initialize_match},
    };
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::Mutex;

    fn sample_actions() -> Vec<Action> {
        vec![
            Action::end_turn(),
            Action::play_pokemon(0, false),
            Action::play_pokemon(0, true),
            Action::attach_energy(2, None),
            Action::attach_energy(2, Some(1)),
            Action::attack(),
        ]
    }

    #[test]
    fn encode_decode_is_a_bijection() {
        let mut encoder = ActionEncoder::new();
        let actions = sample_actions();
        let indices: Vec<usize> = actions.iter().map(|a| encoder.encode(a)).collect();
        assert_eq!(indices, (0..actions.len()).collect::<Vec<_>>());
        for (action, index) in actions.iter().zip(&indices) {
            assert_eq!(encoder.decode(*index), Some(*action));
            assert_eq!(encoder.encode(action), *index);
        }
        assert_eq!(encoder.len(), actions.len());
        assert_eq!(encoder.decode(actions.len()), None);
    }

    #[test]
    fn assignment_depends_on_observation_order() {
        let mut forward = ActionEncoder::new();
        let mut backward = ActionEncoder::new();
        for action in sample_actions() {
            forward.encode(&action);
        }
        for action in sample_actions().iter().rev() {
            backward.encode(action);
        }
        assert_ne!(
            forward.index_of(&Action::end_turn()),
            backward.index_of(&Action::end_turn())
        );
    }

    #[test]
    fn max_actions_has_a_floor_of_one() {
        let mut encoder = ActionEncoder::new();
        assert_eq!(encoder.max_actions(), 1);
        encoder.encode(&Action::end_turn());
        encoder.encode(&Action::attack());
        assert_eq!(encoder.max_actions(), 2);
    }

    #[test]
    fn mask_marks_known_legal_indices_only() {
        let catalog = CardCatalog::standard();
        let mut rng = StdRng::seed_from_u64(5);
        let state = initialize_match(
            catalog.create_default_deck(&mut rng),
            catalog.create_default_deck(&mut rng),
        )
        .unwrap();

        let mut encoder = ActionEncoder::new();
        for action in sample_actions() {
            encoder.encode(&action);
        }
        let size = encoder.len() + 4;
        let mask = encoder.action_mask(&state, size);
        let valid = get_valid_actions(&state);
        assert_eq!(mask.len(), size);
        for (index, legal) in mask.iter().enumerate() {
            let expected = index < encoder.len()
                && encoder.decode(index).is_some_and(|a| valid.contains(&a));
            assert_eq!(*legal, expected);
        }
        assert!(mask[0]);
        assert!(mask[encoder.len()..].iter().all(|m| !m));
    }

    #[test]
    fn mapping_survives_serialization() {
        let mut encoder = ActionEncoder::new();
        for action in sample_actions() {
            encoder.encode(&action);
        }
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: ActionEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);
        assert_eq!(restored.index_of(&Action::attack()), Some(5));
    }

    #[test]
    fn duplicate_mapping_is_rejected() {
        let json = serde_json::to_string(&vec![Action::end_turn(), Action::end_turn()]).unwrap();
        assert!(serde_json::from_str::<ActionEncoder>(&json).is_err());
    }

    #[test]
    fn locked_encoder_assigns_unique_indices_across_threads() {
        let encoder = Mutex::new(ActionEncoder::new());
        std::thread::scope(|scope| {
            for hand_index in 0..4 {
                let encoder = &encoder;
                scope.spawn(move || {
                    for action in [Action::end_turn(), Action::play_pokemon(hand_index, true)] {
                        encoder.lock().unwrap().encode(&action);
                    }
                });
            }
        });
        let encoder = encoder.into_inner().unwrap();
        assert_eq!(encoder.len(), 5);
        for index in 0..encoder.len() {
            let action = encoder.decode(index).unwrap();
            assert_eq!(encoder.index_of(&action), Some(index));
        }
    }
}
