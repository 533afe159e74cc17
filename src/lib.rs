//! Water Quest - a timed grid-tapping water collection minigame
//!
//! Core modules:
//! - `round`: Deterministic round engine (state machine, scoring, spawn timing)
//! - `best_score`: Best-score persistence
//! - `settings`: Player preferences (difficulty, theme, sound)
//! - `audio`: Procedural sound effects (web only)

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod best_score;
pub mod round;
pub mod settings;

pub use best_score::BestScore;
pub use round::{RoundEngine, RoundEvent, RoundPhase, RoundState, Token, TokenKind};
pub use settings::{Difficulty, Settings, Theme};

/// Game configuration constants
pub mod consts {
    /// Score needed to win a round
    pub const GOAL: u32 = 20;
    /// Round length in seconds
    pub const ROUND_TIME: u32 = 60;
    /// Lives at round start
    pub const START_LIVES: u8 = 3;

    /// Number of grid slots a token can spawn in (3x3)
    pub const GRID_SLOTS: usize = 9;

    /// Probability a spawned token is a pollutant
    pub const POLLUTANT_CHANCE: f64 = 0.25;
    /// Score lost when a clean token expires untapped
    pub const MISS_PENALTY: u32 = 1;
    /// Score lost on tapping a pollutant
    pub const POLLUTANT_PENALTY: u32 = 3;

    /// Pre-round countdown cadence (per step)
    pub const COUNTDOWN_STEP_MS: u64 = 700;
    /// Round timer cadence
    pub const TIMER_TICK_MS: u64 = 1000;
}
