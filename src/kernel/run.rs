use uuid::Uuid;

use super::cancel::StopSignal;

/// State of one autonomous pass. Lives from `start()` until the loop exits.
#[derive(Debug)]
pub struct ConversationRun {
    pub id: Uuid,
    /// Authoritative value from the last turn response.
    pub turn_number: u32,
    pub stop: StopSignal,
    pending_choice: Option<String>,
}

impl ConversationRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turn_number: 0,
            stop: StopSignal::new(),
            pending_choice: None,
        }
    }

    pub fn set_pending_choice(&mut self, choice: String) {
        self.pending_choice = Some(choice);
    }

    /// Hands the pending choice to exactly one request.
    pub fn take_pending_choice(&mut self) -> Option<String> {
        self.pending_choice.take()
    }
}

impl Default for ConversationRun {
    fn default() -> Self {
        Self::new()
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    /// A backend call failed; the fallback message was appended.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_choice_is_consumed_once() {
        let mut run = ConversationRun::new();
        run.set_pending_choice("2".to_string());
        assert_eq!(run.take_pending_choice().as_deref(), Some("2"));
        assert_eq!(run.take_pending_choice(), None);
    }
}
