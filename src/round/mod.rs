//! Deterministic round engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Virtual clock driven by the host via `advance()`
//! - Seeded RNG only
//! - Stable task firing order (by deadline, then task priority)
//! - No rendering or platform dependencies

pub mod engine;
pub mod events;
pub mod messages;
pub mod schedule;
pub mod state;

pub use engine::RoundEngine;
pub use events::RoundEvent;
pub use messages::{COUNTDOWN_STEPS, LOSE_MESSAGES, MILESTONES, Milestone, WIN_MESSAGES};
pub use schedule::{Scheduler, Task, TaskKind};
pub use state::{RoundPhase, RoundState, Token, TokenKind};
