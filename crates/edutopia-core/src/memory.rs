//! Conversation memory with LLM summarization of older turns
//!
//! Recent turns are kept verbatim. Once the estimated token count exceeds the
//! configured budget, the oldest turns are folded into a running summary.

use serde::Serialize;
use std::collections::VecDeque;

/// One user/assistant exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    fn render(&self) -> String {
        format!("Human: {}\nAI: {}", self.user, self.assistant)
    }
}

/// Rough token estimate (about four characters per token)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    summary: String,
    max_token_limit: usize,
}

impl ConversationMemory {
    pub fn new(max_token_limit: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            summary: String::new(),
            max_token_limit,
        }
    }

    /// Rebuild memory from comma-joined user and assistant histories.
    ///
    /// Entries are paired by position; if one side is longer, its extra
    /// entries are paired with an empty message.
    pub fn from_history(user_history: &str, ai_history: &str, max_token_limit: usize) -> Self {
        let users = split_history(user_history);
        let ais = split_history(ai_history);
        let mut memory = Self::new(max_token_limit);

        for i in 0..users.len().max(ais.len()) {
            memory.push(
                users.get(i).cloned().unwrap_or_default(),
                ais.get(i).cloned().unwrap_or_default(),
            );
        }
        memory
    }

    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push_back(Turn {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.summary.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.summary.clear();
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.summary)
            + self
                .turns
                .iter()
                .map(|t| estimate_tokens(&t.user) + estimate_tokens(&t.assistant))
                .sum::<usize>()
    }

    pub fn needs_pruning(&self) -> bool {
        self.estimated_tokens() > self.max_token_limit
    }

    /// Detach the oldest turns until the buffer fits the budget.
    ///
    /// The most recent turn is always kept verbatim.
    pub fn take_overflow(&mut self) -> Vec<Turn> {
        let mut pruned = Vec::new();
        while self.needs_pruning() && self.turns.len() > 1 {
            if let Some(turn) = self.turns.pop_front() {
                pruned.push(turn);
            }
        }
        pruned
    }

    /// Prompt asking the LLM to fold `turns` into the running summary
    pub fn summary_prompt(&self, turns: &[Turn]) -> String {
        let new_lines = turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Progressively summarize the lines of conversation provided, adding onto the \
             previous summary returning a new summary.\n\n\
             Current summary:\n{}\n\nNew lines of conversation:\n{}\n\nNew summary:",
            self.summary, new_lines
        )
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// Put detached turns back in front of the buffer
    pub fn restore(&mut self, turns: Vec<Turn>) {
        for turn in turns.into_iter().rev() {
            self.turns.push_front(turn);
        }
    }

    /// Render memory as prompt context
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.summary.is_empty() {
            out.push_str("Summary of earlier conversation:\n");
            out.push_str(&self.summary);
            out.push_str("\n\n");
        }
        let lines: Vec<String> = self.turns.iter().map(Turn::render).collect();
        out.push_str(&lines.join("\n"));
        out.trim_end().to_string()
    }
}

fn split_history(history: &str) -> Vec<String> {
    if history.trim().is_empty() {
        return Vec::new();
    }
    history.split(',').map(|s| s.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_history_pairs_positionally() {
        let memory = ConversationMemory::from_history("hi, what is chess", "hello, a game", 1000);
        let turns: Vec<_> = memory.turns().cloned().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].user, "hi");
        assert_eq!(turns[0].assistant, "hello");
        assert_eq!(turns[1].user, "what is chess");
        assert_eq!(turns[1].assistant, "a game");
    }

    #[test]
    fn test_from_history_uneven_sides() {
        let memory = ConversationMemory::from_history("a,b,c", "x", 1000);
        let turns: Vec<_> = memory.turns().cloned().collect();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].user, "c");
        assert_eq!(turns[2].assistant, "");
    }

    #[test]
    fn test_empty_history_is_empty() {
        let memory = ConversationMemory::from_history("", "  ", 1000);
        assert!(memory.is_empty());
        assert_eq!(memory.render(), "");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_take_overflow_keeps_latest_turn() {
        let mut memory = ConversationMemory::new(10);
        memory.push("first question ".repeat(5), "first answer ".repeat(5));
        memory.push("second question", "second answer");
        assert!(memory.needs_pruning());

        let folded = memory.take_overflow();
        assert_eq!(folded.len(), 1);
        assert_eq!(memory.len(), 1);

        let prompt = memory.summary_prompt(&folded);
        assert!(prompt.starts_with("Progressively summarize"));
        assert!(prompt.contains("Human: first question"));

        memory.set_summary("They talked about chess.");
        assert!(memory.render().starts_with("Summary of earlier conversation:\nThey talked about chess."));
        assert!(memory.render().contains("Human: second question"));
    }

    #[test]
    fn test_restore_puts_turns_back_in_order() {
        let mut memory = ConversationMemory::new(1);
        memory.push("a", "1");
        memory.push("b", "2");
        memory.push("c", "3");

        let folded = memory.take_overflow();
        assert_eq!(folded.len(), 2);
        memory.restore(folded);

        let users: Vec<_> = memory.turns().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_take_overflow_noop_under_budget() {
        let mut memory = ConversationMemory::new(1000);
        memory.push("hi", "hello");
        assert!(memory.take_overflow().is_empty());
        assert_eq!(memory.summary(), "");
    }
}
