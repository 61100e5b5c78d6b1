use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only question/answer history for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_turn(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        sources: Vec<SourceRef>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            sources,
            asked_at: Utc::now(),
        }
    }
}

/// A retrieved chunk cited by an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_index: usize,
    pub page: Option<usize>,
    pub score: f32,
    pub excerpt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_append_in_order() {
        let mut conversation = Conversation::new();
        conversation.add_turn(ConversationTurn::new("q1", "a1", vec![]));
        conversation.add_turn(ConversationTurn::new("q2", "a2", vec![]));

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.turns[0].question, "q1");
        assert_eq!(conversation.last_turn().map(|t| t.answer.as_str()), Some("a2"));
    }
}
