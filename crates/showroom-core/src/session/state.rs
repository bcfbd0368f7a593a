use super::message::Turn;
use std::collections::VecDeque;
use uuid::Uuid;

/// Whether an item is the implicit subject of follow-up messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Idle,
    Focused,
}

/// Conversation state for one connection.
///
/// Focus and the busy flag are orthogonal: a session can be focused while a
/// reply is streaming. At most one turn is in flight at a time; history keeps
/// only complete user/model pairs, oldest evicted first.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    history: VecDeque<Turn>,
    max_turn_pairs: usize,
    busy: bool,
    focus: FocusState,
}

impl Session {
    pub fn new(max_turn_pairs: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: VecDeque::new(),
            max_turn_pairs,
            busy: false,
            focus: FocusState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> FocusState {
        self.focus
    }

    pub fn is_focused(&self) -> bool {
        self.focus == FocusState::Focused
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn focus(&mut self) {
        self.focus = FocusState::Focused;
    }

    pub fn clear_focus(&mut self) {
        self.focus = FocusState::Idle;
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Admits a new turn. Returns a snapshot of the history to send to the
    /// backend, or `None` if a turn is already in flight.
    pub fn try_begin_turn(&mut self) -> Option<Vec<Turn>> {
        if self.busy {
            return None;
        }
        self.busy = true;
        Some(self.history.iter().cloned().collect())
    }

    /// Finishes the in-flight turn.
    ///
    /// The pair is recorded only when the reply is non-empty, so every stored
    /// user turn has a matching model turn.
    pub fn complete_turn(&mut self, user_text: &str, reply: Option<&str>) {
        self.busy = false;

        let Some(reply) = reply.filter(|reply| !reply.is_empty()) else {
            return;
        };

        self.history.push_back(Turn::user(user_text));
        self.history.push_back(Turn::model(reply));

        let limit = self.max_turn_pairs * 2;
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}
