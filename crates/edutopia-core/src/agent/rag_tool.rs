//! Retrieval-augmented answering with a built-in knowledge fallback

use crate::config::RagConfig;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::llm::{self, LLMClient};
use serde::Serialize;
use std::sync::Arc;

/// Answer the LLM gives when the retrieved context is not enough
pub const UNKNOWN_SENTINEL: &str = "I don't know based on the provided context";

const FALLBACK_BANNER: &str = "RAG System Response: I don't know based on the provided context.\n\n\
     Falling back to built-in knowledge:\n\
     ----------------------------------------\n";

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub text: String,
    /// Whether the answer came from the no-retrieval fallback
    pub fell_back: bool,
    /// Retrieved chunks scoring above the relevance threshold
    pub relevant_chunks: usize,
}

pub struct RagTool {
    client: Arc<dyn LLMClient>,
    config: RagConfig,
}

impl RagTool {
    pub fn new(client: Arc<dyn LLMClient>, config: RagConfig) -> Self {
        Self { client, config }
    }

    /// Answer from the knowledge base, folding any failure into the answer text
    pub async fn run(&self, knowledge: &KnowledgeBase, memory: &str, query: &str) -> RagAnswer {
        match self.answer(knowledge, memory, query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("RAG processing failed: {}", e);
                RagAnswer {
                    text: format!("Error in RAG processing: {}", e),
                    fell_back: false,
                    relevant_chunks: 0,
                }
            }
        }
    }

    pub async fn answer(
        &self,
        knowledge: &KnowledgeBase,
        memory: &str,
        query: &str,
    ) -> Result<RagAnswer> {
        let hits = knowledge.search(query, self.config.top_k).await?;
        let relevant_chunks = hits
            .iter()
            .filter(|hit| hit.score > self.config.relevance_threshold)
            .count();
        tracing::debug!(
            "Retrieved {} chunks, {} above relevance threshold",
            hits.len(),
            relevant_chunks
        );

        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let answer = llm::complete(
            self.client.as_ref(),
            grounded_prompt(&context, memory, query),
        )
        .await?;

        if !is_unknown(&answer) {
            return Ok(RagAnswer {
                text: answer,
                fell_back: false,
                relevant_chunks,
            });
        }

        tracing::info!("No relevant information in context, falling back to model knowledge");
        let fallback = llm::complete(self.client.as_ref(), fallback_prompt(query)).await?;
        Ok(RagAnswer {
            text: format!("{}{}", FALLBACK_BANNER, fallback),
            fell_back: true,
            relevant_chunks,
        })
    }
}

fn is_unknown(answer: &str) -> bool {
    answer.replace('\u{2019}', "'").contains(UNKNOWN_SENTINEL)
}

fn grounded_prompt(context: &str, memory: &str, query: &str) -> String {
    let history = if memory.is_empty() {
        String::new()
    } else {
        format!("Conversation so far:\n{}\n\n", memory)
    };
    format!(
        "You are a helpful assistant. Answer the question **ONLY** using the provided context.\n\
         If the context does not contain relevant information, respond with:\n\
         \"{}.\"\n\n\
         {}Context:\n{}\n\nQuestion: {}",
        UNKNOWN_SENTINEL, history, context, query
    )
}

fn fallback_prompt(query: &str) -> String {
    format!(
        "You are a knowledgeable assistant. Please provide a detailed and accurate answer to this query:\n\n\
         {}\n\n\
         Requirements:\n\
         1. Provide accurate information\n\
         2. Include technical details where relevant\n\
         3. Structure the response in clear paragraphs\n\
         4. Focus on providing factual information",
        query
    )
}

/// Topic of a question request: the lowercased input without the command words
pub fn extract_topic(input: &str) -> String {
    input
        .to_lowercase()
        .replace("generate", "")
        .replace("questions", "")
        .replace("about", "")
        .replace("the history of", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_topic() {
        assert_eq!(
            extract_topic("Generate questions about the history of Game Design"),
            "game design"
        );
        assert_eq!(
            extract_topic("generate 5 questions about chess"),
            "5   chess"
        );
        assert_eq!(extract_topic("generate questions about chess"), "chess");
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_unknown("I don't know based on the provided context."));
        assert!(is_unknown("Sorry, I don\u{2019}t know based on the provided context"));
        assert!(!is_unknown("Chess is a board game."));
    }

    #[test]
    fn test_grounded_prompt_includes_history_only_when_present() {
        let with = grounded_prompt("ctx", "Human: hi\nAI: hello", "q");
        assert!(with.contains("Conversation so far:\nHuman: hi"));
        let without = grounded_prompt("ctx", "", "q");
        assert!(!without.contains("Conversation so far"));
        assert!(without.ends_with("Context:\nctx\n\nQuestion: q"));
    }
}
