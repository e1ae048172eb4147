pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod interaction;
pub mod npc;
pub mod player;
pub mod registry;
pub mod rng;
pub mod save;
pub mod scene;
pub mod session;
pub mod shop;
pub mod sleeping_cot;
pub mod state_machine;
pub mod store;
pub mod time_affected;
pub mod time_data;
pub mod types;
