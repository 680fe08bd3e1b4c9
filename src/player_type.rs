use std::fmt::Display;

/// Who controls a seat in a CLI match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap_derive::ValueEnum)]
pub enum PlayerType {
    Human,
    /// The trained agent from the checkpoint directory, acting greedily.
    Agent,
    Heuristic,
    Random,
}

impl Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerType::Human => write!(f, "human"),
            PlayerType::Agent => write!(f, "agent"),
            PlayerType::Heuristic => write!(f, "heuristic"),
            PlayerType::Random => write!(f, "random"),
        }
    }
}
