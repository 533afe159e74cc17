//! Cancellable task scheduling for the round drivers
//!
//! Every task carries the generation it was scheduled under. The engine
//! bumps its generation on each phase transition (start, reset, round end)
//! and clears the queue, so a stale deadline can never mutate a round it
//! was not scheduled for even if it slips through.

/// What a due task does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Advance the pre-round countdown to the given step index
    CountdownStep { step: usize },
    /// Resolve the token with this id as expired, if still live
    TokenExpiry { token_id: u32 },
    /// Decrement the round clock by one second
    TimerTick,
    /// Replace the live token with a fresh spawn
    SpawnTick,
}

impl TaskKind {
    /// Firing order for tasks sharing a deadline. Expiry settles the
    /// outstanding token before the timer can end the round, and before a
    /// new spawn supersedes it.
    fn priority(self) -> u8 {
        match self {
            TaskKind::TokenExpiry { .. } => 0,
            TaskKind::TimerTick => 1,
            TaskKind::SpawnTick => 2,
            TaskKind::CountdownStep { .. } => 3,
        }
    }
}

/// A scheduled one-shot task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub kind: TaskKind,
    /// Virtual-clock deadline in ms
    pub due_ms: u64,
    /// Engine generation this task belongs to
    pub generation: u64,
}

/// Pending tasks for one engine
///
/// The queue stays tiny (countdown + timer + spawn + one expiry), so a
/// plain vector with a linear scan beats a heap here.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TaskKind, due_ms: u64, generation: u64) {
        self.tasks.push(Task {
            kind,
            due_ms,
            generation,
        });
    }

    /// Remove the pending expiry for a token (after a tap resolves it)
    pub fn cancel_expiry(&mut self, token_id: u32) {
        self.tasks
            .retain(|t| t.kind != TaskKind::TokenExpiry { token_id });
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pop the next task due at or before `now_ms`, earliest deadline
    /// first, ties broken by task priority.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Task> {
        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.kind.priority()))
            .map(|(i, _)| i)?;
        Some(self.tasks.swap_remove(idx))
    }
}
