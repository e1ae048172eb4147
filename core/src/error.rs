use crate::time_data::TimeData;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid time: day {day}, {hour}:{minute:02}")]
    InvalidTime { day: u32, hour: u32, minute: u32 },

    #[error("Negative elapsed time: {later} is earlier than {earlier}")]
    NegativeElapsed { later: TimeData, earlier: TimeData },

    #[error("Entity '{unique_id}' is already registered")]
    AlreadyRegistered { unique_id: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Save slot '{slot}' not found")]
    SlotNotFound { slot: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GameResult<T> = Result<T, GameError>;
