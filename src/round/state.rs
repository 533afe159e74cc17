//! Round state and core types
//!
//! A fresh `RoundState` is created at every round start; the best score is
//! the only value that survives across rounds and it lives on the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::settings::Difficulty;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round in progress, waiting for start
    Idle,
    /// Pre-round countdown is running
    Counting,
    /// Active gameplay
    Running,
    /// Round finished, summary shown
    Ended,
}

/// What a spawned token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Clean water can - tap to collect
    Clean,
    /// Pollutant can - tapping costs score and a life
    Dirty,
}

/// A single spawned tappable target
///
/// At most one token is live at any instant. The id is issued by the engine
/// and passed back by the presentation layer on tap; the engine never looks
/// at anything rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: u32,
    pub kind: TokenKind,
    /// Grid slot index, 0..GRID_SLOTS
    pub slot: usize,
    /// True once tapped or expired
    pub resolved: bool,
}

/// Mutable state of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    pub score: u32,
    pub lives: u8,
    /// Consecutive clean hits; resets on any miss or dirty hit
    pub streak: u32,
    /// Seconds remaining, counts down only while Running
    pub time_left: u32,
    pub phase: RoundPhase,
    /// Milestone thresholds already announced this round
    pub fired_milestones: HashSet<u32>,
    /// Spawn cadence in ms, frozen from the difficulty at round start
    pub spawn_ms: u64,
    /// The live token, if any
    pub token: Option<Token>,
    /// Next token id to issue
    next_id: u32,
}

impl RoundState {
    /// Fresh state for a new round at the given difficulty
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            score: 0,
            lives: START_LIVES,
            streak: 0,
            time_left: ROUND_TIME,
            phase: RoundPhase::Idle,
            fired_milestones: HashSet::new(),
            spawn_ms: difficulty.spawn_interval_ms(),
            token: None,
            next_id: 1,
        }
    }

    /// Issue a new token id
    pub fn next_token_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The live unresolved token, if any
    pub fn unresolved_token(&self) -> Option<&Token> {
        self.token.as_ref().filter(|t| !t.resolved)
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(Difficulty::default())
    }
}
