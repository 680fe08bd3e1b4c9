use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};

use pokemon_tcg_bot::{
    agent::read_checkpoint_shape,
    card_catalog::CardCatalog,
    commands::{Command, get_human_command},
    config::TrainingConfig,
    data_model::Player,
    logging,
    observation::observe,
    player_type::PlayerType,
    render_match::render_match,
    self_play::{
        Opponent, burn_agent, evaluate_agent, heuristic_action, new_match, random_action, step,
        validate_learning,
    },
};

#[derive(clap_derive::Parser, Debug)]
struct Args {
    /// Training config the checkpoint was produced with.
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(short = 'o', long)]
    checkpoint_dir: Option<PathBuf>,

    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    #[clap(short, long, default_value_t = 200)]
    max_turns: u32,

    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Mode,
}

#[derive(clap_derive::Subcommand, Debug)]
enum Mode {
    /// Play or watch a single match.
    Play {
        #[clap(short = 'a', long, default_value_t = PlayerType::Human)]
        player_a: PlayerType,

        #[clap(short = 'b', long, default_value_t = PlayerType::Agent)]
        player_b: PlayerType,

        /// Print each observation as JSON instead of text.
        #[clap(long)]
        json: bool,
    },
    /// Win rate of the trained agent against a scripted opponent.
    Evaluate {
        #[clap(short, long, default_value_t = 100)]
        games: usize,

        #[clap(long, default_value_t = PlayerType::Random)]
        opponent: PlayerType,
    },
    /// Compare the trained agent with an untrained one.
    Validate {
        #[clap(short, long, default_value_t = 100)]
        games: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;
    let mut config = match &args.config {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(dir) = &args.checkpoint_dir {
        config.checkpoint_dir = dir.clone();
    }
    let mut rng = StdRng::seed_from_u64(args.seed);
    let catalog = CardCatalog::standard();

    match args.command {
        Mode::Play {
            player_a,
            player_b,
            json,
        } => {
            let mut agent = if player_a == PlayerType::Agent || player_b == PlayerType::Agent {
                let shape = read_checkpoint_shape(&config.checkpoint_dir)?;
                let mut agent = burn_agent(&config, shape.encoder, shape.action_count);
                agent.load(&config.checkpoint_dir)?;
                agent.set_epsilon(0.0);
                Some(agent)
            } else {
                None
            };
            let player_type = |p: Player| match p {
                Player::A => player_a,
                Player::B => player_b,
            };

            let mut state = new_match(&catalog, &mut rng)?;
            let mut turns = 0;
            while state.winner.is_none() && turns < args.max_turns {
                let player = state.current_player;
                if json {
                    println!("{}", serde_json::to_string_pretty(&observe(&state, player))?);
                } else {
                    println!("{}", render_match(&state, player));
                }

                let mut agent_action = || match agent.as_mut() {
                    Some(agent) => agent.select_action(&state, player, false, &mut rng),
                    None => heuristic_action(&state),
                };
                let action = match player_type(player) {
                    PlayerType::Human => match get_human_command(&state)? {
                        Command::Play(action) => action,
                        Command::Auto => agent_action(),
                        Command::Help | Command::Quit => return Ok(()),
                    },
                    PlayerType::Agent => agent_action(),
                    PlayerType::Heuristic => heuristic_action(&state),
                    PlayerType::Random => random_action(&state, &mut rng),
                };
                println!("{} ({}) plays {action}", player.to_string(), player_type(player));

                if step(&mut state, &action)?.decked_out {
                    println!("{} cannot draw, the match is a draw", player.opponent().to_string());
                    return Ok(());
                }
                if state.current_player != player {
                    turns += 1;
                }
            }
            match state.winner {
                Some(winner) => println!("{} wins after {turns} turns", winner.to_string()),
                None => println!("no winner after {turns} turns"),
            }
        }
        Mode::Evaluate { games, opponent } => {
            let shape = read_checkpoint_shape(&config.checkpoint_dir)?;
            let mut agent = burn_agent(&config, shape.encoder, shape.action_count);
            agent.load(&config.checkpoint_dir)?;
            agent.set_epsilon(0.0);
            let opponent = match opponent {
                PlayerType::Random => Opponent::Random,
                PlayerType::Heuristic => Opponent::Heuristic,
                PlayerType::Agent => Opponent::Mirror,
                PlayerType::Human => anyhow::bail!("evaluation needs a scripted opponent"),
            };
            let win_rate =
                evaluate_agent(&mut agent, opponent, games, &catalog, args.max_turns, &mut rng)?;
            println!("win rate over {games} games: {:.1}%", win_rate * 100.0);
        }
        Mode::Validate { games } => {
            let shape = read_checkpoint_shape(&config.checkpoint_dir)
                .context("validation needs a trained checkpoint")?;
            let mut trained = burn_agent(&config, shape.encoder.clone(), shape.action_count);
            trained.load(&config.checkpoint_dir)?;
            let mut untrained = burn_agent(&config, shape.encoder, shape.action_count);
            let report = validate_learning(
                &mut trained,
                &mut untrained,
                games,
                &catalog,
                args.max_turns,
                &mut rng,
            )?;
            println!("trained vs random:    {:.1}%", report.trained_vs_random * 100.0);
            println!("untrained vs random:  {:.1}%", report.untrained_vs_random * 100.0);
            println!("trained vs untrained: {:.1}%", report.trained_vs_untrained * 100.0);
            for issue in &report.issues {
                println!("  - {issue}");
            }
            if report.learning_detected {
                println!("learning detected");
            } else {
                println!("no evidence of learning");
            }
        }
    }
    Ok(())
}
