//! Run loop state
//!
//! Tracks how many turns a run has taken against its budget.

/// State of the round-robin loop
#[derive(Debug, Clone)]
pub struct RunState {
    /// Completed turns (0-indexed count)
    pub turn: usize,
    /// Maximum allowed turns
    pub max_turns: usize,
}

impl RunState {
    pub fn new(max_turns: usize) -> Self {
        Self { turn: 0, max_turns }
    }

    /// Whether another turn may start
    pub fn has_budget(&self) -> bool {
        self.turn < self.max_turns
    }

    /// Index of the participant that speaks this turn
    pub fn speaker(&self, participants: usize) -> usize {
        self.turn % participants
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }
}
