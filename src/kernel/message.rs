use serde::{Deserialize, Serialize};

use super::segment::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Scammer,
    /// Jeanne, voiced by the backend.
    Persona,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub segments: Option<Vec<Segment>>,
}

/// Append-only conversation history. Insertion order is chronological order.
///
/// Ids come from a counter owned by the log and keep increasing across
/// `reset`, so a renderer never sees an id twice.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>, segments: Option<Vec<Segment>>) -> Message {
        self.next_id += 1;
        let message = Message {
            id: self.next_id,
            speaker,
            text: text.into(),
            segments,
        };
        self.entries.push(message.clone());
        message
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.clone()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_survive_reset() {
        let mut log = MessageLog::new();
        let first = log.append(Speaker::Scammer, "Bonjour madame", None);
        let second = log.append(Speaker::Persona, "Allô?", Some(vec![Segment::text("Allô?")]));
        assert_eq!((first.id, second.id), (1, 2));

        log.reset();
        assert!(log.is_empty());

        let third = log.append(Speaker::Scammer, "C'est la banque", None);
        assert_eq!(third.id, 3);
        assert_eq!(log.snapshot(), vec![third]);
    }
}
