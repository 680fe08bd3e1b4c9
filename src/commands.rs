use std::io::{self, Write};

use crate::{
    data_model::{Action, MatchState},
    game_logic::get_valid_actions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(Action),
    /// Let the seat's fallback policy choose this action.
    Auto,
    Help,
    Quit,
}

pub fn parse_command(input: &str, actions: &[Action]) -> Option<Command> {
    match input {
        "auto" | "a" => Some(Command::Auto),
        "help" | "h" | "?" => Some(Command::Help),
        "quit" | "q" => Some(Command::Quit),
        "end" | "e" => actions.first().copied().map(Command::Play),
        _ => input
            .parse::<usize>()
            .ok()
            .and_then(|index| actions.get(index))
            .copied()
            .map(Command::Play),
    }
}

/// Prompts until the input names a legal action, `auto` or `quit`.
pub fn get_human_command(state: &MatchState) -> anyhow::Result<Command> {
    let actions = get_valid_actions(state);
    for (index, action) in actions.iter().enumerate() {
        println!("  {index}: {action}");
    }
    loop {
        print!("choose an action: ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(Command::Quit);
        }
        match parse_command(input.trim(), &actions) {
            Some(Command::Help) => {
                println!("number: play that action, e: end turn, a: auto, q: quit")
            }
            Some(command) => return Ok(command),
            None => println!("Invalid choice."),
        }
    }
}
