//! Events emitted by the engine for the presentation layer
//!
//! The engine accumulates events as commands and scheduled tasks mutate the
//! round; the host drains them once per frame and mirrors them into whatever
//! it renders. The engine never calls out.

use super::state::TokenKind;

/// One engine-to-presentation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// A pre-round countdown step ("3", "2", "1", "Go!")
    CountdownStep { label: &'static str },
    /// Countdown finished, gameplay is live
    RoundStarted,
    /// A token appeared in a grid slot
    TokenSpawned {
        id: u32,
        kind: TokenKind,
        slot: usize,
    },
    /// The live token was tapped. Deltas are what was actually applied
    /// after flooring at zero.
    TokenHit {
        kind: TokenKind,
        score_delta: i32,
        lives_delta: i32,
    },
    /// A clean token expired untapped
    TokenMissed { score_delta: i32 },
    /// A score threshold was crossed for the first time this round
    MilestoneReached {
        threshold: u32,
        message: &'static str,
    },
    /// HUD values changed
    HudChanged {
        score: u32,
        lives: u8,
        streak: u32,
        time_left: u32,
    },
    /// The round is over
    RoundEnded {
        win: bool,
        final_score: u32,
        message: &'static str,
        new_best: bool,
    },
}
