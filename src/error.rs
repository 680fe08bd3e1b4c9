use thiserror::Error;

use crate::data_model::Action;

/// Precondition violations raised by the rules engine.
///
/// These signal that the caller offered an illegal action; the engine never
/// applies an operation partially before returning one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("cannot draw from an empty deck")]
    EmptyDeck,
    #[error("deck must hold at least {required} cards, got {actual}")]
    DeckTooSmall { required: usize, actual: usize },
    #[error("index {index} out of bounds (len {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("active slot is already occupied")]
    SlotOccupied,
    #[error("bench is full")]
    BenchFull,
    #[error("a pokemon was already played this turn")]
    AlreadyPlayedThisTurn,
    #[error("energy was already attached this turn")]
    AlreadyAttachedThisTurn,
    #[error("card at hand index {0} has the wrong type")]
    WrongCardType(usize),
    #[error("no pokemon to attach energy to")]
    NoTarget,
    #[error("no active pokemon")]
    NoActivePokemon,
    #[error("opponent has no active pokemon")]
    OpponentHasNoActivePokemon,
    #[error("active pokemon cannot attack")]
    CannotAttack,
    #[error("no prizes remaining")]
    NoPrizesRemaining,
    #[error("the match is already over")]
    GameOver,
    #[error("action requires a hand index")]
    MissingHandIndex,
    #[error("illegal action in the current state: {0:?}")]
    IllegalAction(Action),
}
