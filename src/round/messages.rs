//! Message pools and countdown labels

use crate::consts::GOAL;

/// Pre-round countdown, one label per step
pub const COUNTDOWN_STEPS: [&str; 4] = ["3", "2", "1", "Go!"];

pub const WIN_MESSAGES: &[&str] = &[
    "You hit the milestone. Clean water FTW!",
    "Goal reached. Imagine the impact.",
    "Clutch round. Keep that flow going.",
];

pub const LOSE_MESSAGES: &[&str] = &[
    "So close. Try again for the milestone.",
    "Not quite there. One more round.",
    "Missed the goal, but progress matters.",
];

/// A score threshold with its pool of announcement messages
#[derive(Debug, Clone, Copy)]
pub struct Milestone {
    pub score: u32,
    pub msgs: &'static [&'static str],
}

/// Thresholds in ascending order; each fires at most once per round
pub const MILESTONES: [Milestone; 4] = [
    Milestone {
        score: 5,
        msgs: &["Milestone 5: you're warmed up.", "Nice rhythm at 5."],
    },
    Milestone {
        score: 10,
        msgs: &["Halfway there!", "Milestone 10: keep the flow going."],
    },
    Milestone {
        score: 15,
        msgs: &["15 reached. Almost there.", "Strong streak into 15."],
    },
    Milestone {
        score: GOAL,
        msgs: &[
            "Goal reached! Campus perk preview unlocked.",
            "Goal met. Clean water momentum.",
        ],
    },
];
