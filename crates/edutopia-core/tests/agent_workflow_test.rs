//! Chat agent workflow against a scripted LLM
//!
//! Covers:
//! 1. Routing between retrieval answers and question generation
//! 2. Falling back to model knowledge when the context has no answer
//! 3. Reloading a context discards the previous index and memory
//! 4. Conversation memory folding into a summary

use async_trait::async_trait;
use edutopia_core::config::{MemoryConfig, RagConfig};
use edutopia_core::llm::{ChatMessage, Embedder, LLMClient};
use edutopia_core::{Agent, EdutopiaError, Result, SessionContext};
use std::sync::{Arc, Mutex};

const QUESTIONS_JSON: &str = r#"{"yes_no": [{"question": "Do rooks move straight?", "answer": "Yes"}], "true_false": [{"question": "Bishops change color."}], "wh_questions": [{"question": "Which piece jumps?"}], "mcq": [{"question": "Which piece is most valuable?", "options": ["A) Queen", "B) King"], "answer": "B) King"}]}"#;

/// Scripted LLM that records every prompt it receives
#[derive(Default)]
struct RecordingLlm {
    prompts: Mutex<Vec<String>>,
    /// Topics the grounded prompt answers as unknown
    unknown: Vec<&'static str>,
    broken_questions: bool,
}

impl RecordingLlm {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for RecordingLlm {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());

        if prompt.contains("question generator") {
            return Ok(if self.broken_questions {
                "Sorry, I cannot produce questions today.".to_string()
            } else {
                format!("```json\n{}\n```", QUESTIONS_JSON)
            });
        }
        if prompt.contains("Progressively summarize") {
            return Ok("The user has been asking about chess.".to_string());
        }
        if prompt.contains("Answer the question **ONLY**") {
            let question = prompt.rsplit("Question: ").next().unwrap_or("");
            if self.unknown.iter().any(|topic| question.contains(topic)) {
                return Ok("I don't know based on the provided context.".to_string());
            }
            return Ok(format!("Grounded answer to: {}", question));
        }
        if prompt.contains("knowledgeable assistant") {
            return Ok("General knowledge answer.".to_string());
        }
        if prompt.starts_with("Provide a detailed overview of") {
            return Ok("Overview from model knowledge.".to_string());
        }
        Err(EdutopiaError::Llm(format!("unexpected prompt: {}", prompt)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed(t)).collect())
    }

    fn embedding_dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "recording"
    }

    fn embedding_model(&self) -> &str {
        "recording-embed"
    }
}

fn embed(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    vec![
        lower.matches("chess").count() as f32,
        lower.matches("volcano").count() as f32,
        1.0,
    ]
}

struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed(t)).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

fn agent_with(llm: Arc<RecordingLlm>, memory: MemoryConfig) -> Agent {
    let session = Arc::new(SessionContext::new(
        Arc::new(KeywordEmbedder),
        RagConfig::default(),
        memory,
    ));
    Agent::new(llm, session)
}

#[tokio::test]
async fn test_query_before_context_is_rejected() {
    let llm = Arc::new(RecordingLlm::default());
    let agent = agent_with(llm.clone(), MemoryConfig::default());

    let answer = agent.process_query("what is chess?").await;
    assert_eq!(
        answer,
        "Error: Application not initialized. Please load a context first."
    );
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_retrieval_answer_uses_context() {
    let llm = Arc::new(RecordingLlm::default());
    let agent = agent_with(llm.clone(), MemoryConfig::default());
    agent
        .session()
        .load("Chess is played on an eight by eight board.", "", "")
        .await
        .unwrap();

    let reply = agent.respond("how big is a chess board?").await;
    assert_eq!(reply.answer, "Grounded answer to: how big is a chess board?");
    assert!(reply.questions.is_none());
    assert!(reply.thoughts.contains("I'll use the RAG tool"));

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Chess is played on an eight by eight board."));
}

#[tokio::test]
async fn test_unknown_answer_falls_back_to_model_knowledge() {
    let llm = Arc::new(RecordingLlm {
        unknown: vec!["volcano"],
        ..Default::default()
    });
    let agent = agent_with(llm.clone(), MemoryConfig::default());
    agent.session().load("Chess openings.", "", "").await.unwrap();

    let answer = agent.process_query("why does a volcano erupt?").await;
    assert!(answer.starts_with("RAG System Response: I don't know based on the provided context.\n\n"));
    assert!(answer.contains("Falling back to built-in knowledge:"));
    assert!(answer.ends_with("General knowledge answer."));

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("why does a volcano erupt?"));
    assert!(!prompts[1].contains("Chess openings."));
}

#[tokio::test]
async fn test_question_route_formats_generated_questions() {
    let llm = Arc::new(RecordingLlm::default());
    let agent = agent_with(llm.clone(), MemoryConfig::default());
    agent
        .session()
        .load("Chess pieces: rooks, bishops, knights, the queen and the king.", "", "")
        .await
        .unwrap();

    let reply = agent.respond("Generate questions about chess").await;
    assert!(reply.answer.starts_with("Here are the generated questions:\n\nYes/No Questions:\n"));
    assert!(reply.answer.contains("- Do rooks move straight? (Answer: Yes)"));
    assert!(reply.answer.contains("  Answer: B) King\n"));
    let set = reply.questions.expect("parsed question set");
    assert_eq!(set.len(), 4);

    let prompts = llm.prompts();
    assert!(prompts[0].ends_with("Question: provide detailed information about chess"));
    assert!(prompts[1].contains("Grounded answer to: provide detailed information about chess"));
    assert!(prompts[1].contains("Generate 5 questions about chess"));
}

#[tokio::test]
async fn test_question_route_uses_overview_when_context_lacks_topic() {
    let llm = Arc::new(RecordingLlm {
        unknown: vec!["volcano"],
        ..Default::default()
    });
    let agent = agent_with(llm.clone(), MemoryConfig::default());
    agent.session().load("Chess openings.", "", "").await.unwrap();

    let reply = agent.respond("generate questions about volcanoes").await;
    assert!(reply.thoughts.contains("Using LLM knowledge"));
    assert!(reply.answer.starts_with("Here are the generated questions:"));

    let prompts = llm.prompts();
    assert!(prompts
        .iter()
        .any(|p| p.starts_with("Provide a detailed overview of volcanoes.")));
    let generation = prompts.last().unwrap();
    assert!(generation.contains("Overview from model knowledge."));
}

#[tokio::test]
async fn test_unparseable_questions_become_error_answer() {
    let llm = Arc::new(RecordingLlm {
        broken_questions: true,
        ..Default::default()
    });
    let agent = agent_with(llm, MemoryConfig::default());
    agent.session().load("Chess openings.", "", "").await.unwrap();

    let reply = agent.respond("generate questions about chess").await;
    assert!(reply.answer.starts_with("Error in question generation: "));
    assert!(reply.questions.is_none());
}

#[tokio::test]
async fn test_reload_discards_previous_context_and_memory() {
    let llm = Arc::new(RecordingLlm::default());
    let agent = agent_with(llm.clone(), MemoryConfig::default());
    let session = agent.session().clone();

    session.load("Chess openings.", "earlier question", "earlier answer").await.unwrap();
    agent.process_query("tell me about chess").await;
    assert_eq!(session.memory().lock().await.len(), 2);

    session.load("Volcanoes erupt when magma rises.", "", "").await.unwrap();
    assert!(session.memory().lock().await.is_empty());

    agent.process_query("what about the volcano?").await;
    let last = llm.prompts().pop().unwrap();
    assert!(last.contains("Volcanoes erupt when magma rises."));
    assert!(!last.contains("Chess openings."));
    assert!(!last.contains("earlier question"));
}

#[tokio::test]
async fn test_long_conversation_is_summarized() {
    let llm = Arc::new(RecordingLlm::default());
    let agent = agent_with(llm.clone(), MemoryConfig { max_token_limit: 20 });
    agent.session().load("Chess openings.", "", "").await.unwrap();

    for i in 0..4 {
        agent
            .process_query(&format!("question number {} about chess openings", i))
            .await;
    }

    {
        let memory = agent.session().memory().lock().await;
        assert_eq!(memory.summary(), "The user has been asking about chess.");
        assert!(memory.len() >= 1);
    }

    agent.process_query("and one more about chess").await;
    let prompts = llm.prompts();
    let grounded = prompts
        .iter()
        .rev()
        .find(|p| p.contains("Answer the question **ONLY**"))
        .unwrap();
    assert!(grounded.contains("Summary of earlier conversation:\nThe user has been asking about chess."));
}
