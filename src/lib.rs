pub mod action_encoder;
pub mod agent;
pub mod card_catalog;
pub mod commands;
pub mod config;
pub mod data_model;
pub mod error;
pub mod game_logic;
pub mod logging;
pub mod nn_bot;
pub mod observation;
pub mod player_type;
pub mod render_match;
pub mod replay_buffer;
pub mod self_play;
pub mod value_function;
