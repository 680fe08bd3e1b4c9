use rand::{SeedableRng, rngs::StdRng};

use pokemon_tcg_bot::{
    agent::read_checkpoint_shape,
    card_catalog::CardCatalog,
    config::TrainingConfig,
    data_model::Action,
    self_play::{Opponent, burn_agent, evaluate_agent, train_agent, validate_learning},
};

fn small_config(name: &str) -> TrainingConfig {
    TrainingConfig {
        episodes: 4,
        max_turns: 30,
        warmup_games: 3,
        warmup_max_turns: 20,
        batch_size: 8,
        train_every: 1,
        target_sync_every: 2,
        checkpoint_every: 2,
        log_every: 1,
        hidden_size: 16,
        seed: 7,
        checkpoint_dir: std::env::temp_dir()
            .join(format!("pokemon-tcg-bot-{name}-{}", std::process::id())),
        ..TrainingConfig::default()
    }
}

#[test]
fn trains_checkpoints_and_restores() {
    let config = small_config("train");
    let summary = train_agent(&config).unwrap();
    assert_eq!(summary.episodes, 4);
    assert!(summary.final_epsilon < config.epsilon_start);

    let shape = read_checkpoint_shape(&config.checkpoint_dir).unwrap();
    assert_eq!(shape.encoder.index_of(&Action::end_turn()), Some(0));
    assert!(shape.action_count <= shape.encoder.max_actions());

    let mut agent = burn_agent(&config, shape.encoder, shape.action_count);
    agent.load(&config.checkpoint_dir).unwrap();
    assert_eq!(agent.epsilon(), summary.final_epsilon);

    let mut rng = StdRng::seed_from_u64(1);
    let win_rate = evaluate_agent(
        &mut agent,
        Opponent::Heuristic,
        2,
        &CardCatalog::standard(),
        30,
        &mut rng,
    )
    .unwrap();
    assert!((0.0..=1.0).contains(&win_rate));
    std::fs::remove_dir_all(&config.checkpoint_dir).ok();
}

#[test]
fn validation_reports_every_comparison() {
    let config = small_config("validate");
    train_agent(&config).unwrap();
    let shape = read_checkpoint_shape(&config.checkpoint_dir).unwrap();
    let mut trained = burn_agent(&config, shape.encoder.clone(), shape.action_count);
    trained.load(&config.checkpoint_dir).unwrap();
    let mut untrained = burn_agent(&config, shape.encoder, shape.action_count);

    let mut rng = StdRng::seed_from_u64(2);
    let report = validate_learning(
        &mut trained,
        &mut untrained,
        2,
        &CardCatalog::standard(),
        30,
        &mut rng,
    )
    .unwrap();
    for rate in [
        report.trained_vs_random,
        report.untrained_vs_random,
        report.trained_vs_untrained,
    ] {
        assert!((0.0..=1.0).contains(&rate));
    }
    assert_eq!(report.learning_detected, report.issues.len() < 3);
    assert_eq!(trained.epsilon(), 0.0);
    std::fs::remove_dir_all(&config.checkpoint_dir).ok();
}
