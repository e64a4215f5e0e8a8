//! Conversation history — the ordered, bounded turn sequence replayed to
//! the model on every request.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::dispatch::{ToolCallRequest, ToolRecord};

/// One atomic unit of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// Text the user typed.
    User { text: String },
    /// Final text the model replied with.
    ModelText { text: String },
    /// A batch of tool calls the model requested in one reply.
    ToolCalls { calls: Vec<ToolCallRequest> },
    /// The outcomes for one tool-call batch, in request order.
    ToolResults { records: Vec<ToolRecord> },
}

pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Bounded turn history. Once the cap is exceeded the oldest turns are
/// evicted from the front, preserving recency. Owned and mutated by the
/// orchestrator only; the UI reads and clears it through orchestrator
/// accessors.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    cap: usize,
}

impl ConversationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Append a turn, evicting from the front if the cap is exceeded.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Ordered view over the retained turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Drop all turns (explicit user reset).
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
