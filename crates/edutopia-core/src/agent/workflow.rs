//! Query workflow execution

use super::rag_tool::{extract_topic, RagTool};
use super::state::{AgentState, Node, Route, Step, ToolUsed};
use crate::error::{EdutopiaError, Result};
use crate::knowledge::{KnowledgeBase, SessionContext};
use crate::llm::{self, LLMClient};
use crate::questions::{format_questions, QuestionGenerator, QuestionSet};
use serde::Serialize;
use std::sync::Arc;

/// Returned when a query arrives before any context has been loaded
pub const NOT_INITIALIZED: &str =
    "Error: Application not initialized. Please load a context first.";

/// Upper bound on node executions for one query
const MAX_STEPS: usize = 8;

/// Outcome of one query
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub answer: String,
    pub thoughts: String,
    /// Parsed questions when the generation branch succeeded
    pub questions: Option<QuestionSet>,
}

impl Reply {
    /// Reasoning trail followed by the answer
    pub fn transcript(&self) -> String {
        if self.thoughts.is_empty() {
            return self.answer.clone();
        }
        format!("{}\n\nFinal Answer:\n{}", self.thoughts, self.answer)
    }
}

/// Chat agent over the session knowledge base
pub struct Agent {
    client: Arc<dyn LLMClient>,
    session: Arc<SessionContext>,
    rag: RagTool,
    questions: QuestionGenerator,
}

impl Agent {
    pub fn new(client: Arc<dyn LLMClient>, session: Arc<SessionContext>) -> Self {
        let rag = RagTool::new(client.clone(), session.rag_config().clone());
        let questions = QuestionGenerator::new(client.clone());
        Self {
            client,
            session,
            rag,
            questions,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Answer a query and record the exchange in conversation memory
    pub async fn process_query(&self, query: &str) -> String {
        self.respond(query).await.answer
    }

    /// Like [`Agent::process_query`], keeping the reasoning trail and any
    /// generated question set
    pub async fn respond(&self, query: &str) -> Reply {
        let Some(knowledge) = self.session.snapshot().await else {
            return Reply {
                answer: NOT_INITIALIZED.to_string(),
                thoughts: String::new(),
                questions: None,
            };
        };

        tracing::info!("Processing query: '{}'", query);
        let reply = match self.run(query, &knowledge).await {
            Ok(state) => {
                let questions = match state.current_step {
                    Step::Completed if state.tool_used == ToolUsed::Questions => {
                        QuestionSet::from_json(&state.questions).ok()
                    }
                    _ => None,
                };
                Reply {
                    answer: state.final_answer,
                    thoughts: state.thoughts,
                    questions,
                }
            }
            Err(e) => {
                tracing::error!("Query processing failed: {}", e);
                Reply {
                    answer: format!("Error processing query: {}", e),
                    thoughts: String::new(),
                    questions: None,
                }
            }
        };

        self.session
            .record_exchange(query, &reply.answer, self.client.as_ref())
            .await;
        reply
    }

    /// Run the workflow graph against a knowledge base snapshot
    pub async fn run(&self, query: &str, knowledge: &KnowledgeBase) -> Result<AgentState> {
        let memory = self.session.rendered_memory().await;
        let mut state = AgentState::new(query);
        let mut node = Node::Plan;

        for _ in 0..MAX_STEPS {
            tracing::debug!(?node, "Running workflow node");
            match node {
                Node::Plan => plan(&mut state),
                Node::Router => {}
                Node::RagQuery => self.rag_query(&mut state, knowledge, &memory).await,
                Node::GenerateQuestions => {
                    self.generate_questions(&mut state, knowledge, &memory)
                        .await
                }
                Node::FormatAnswer => format_answer(&mut state),
                Node::Done => return Ok(state),
            }
            node = node.transition(&state);
        }

        Err(EdutopiaError::Other(anyhow::anyhow!(
            "workflow did not finish within {} steps",
            MAX_STEPS
        )))
    }

    async fn rag_query(&self, state: &mut AgentState, knowledge: &KnowledgeBase, memory: &str) {
        state.think("Executing RAG query to find relevant information...");
        state.tool_used = ToolUsed::Rag;
        let answer = self.rag.run(knowledge, memory, &state.input).await;
        state.think("Received answer from RAG system. Processing response...");
        state.final_answer = answer.text;
        state.current_step = Step::Completed;
    }

    async fn generate_questions(
        &self,
        state: &mut AgentState,
        knowledge: &KnowledgeBase,
        memory: &str,
    ) {
        state.think("Preparing to generate questions...");
        state.tool_used = ToolUsed::Questions;
        let topic = extract_topic(&state.input);

        state.think(format!("Checking RAG system for information about {}...", topic));
        let answer = self
            .rag
            .run(
                knowledge,
                memory,
                &format!("provide detailed information about {}", topic),
            )
            .await;

        let base_text = if answer.fell_back {
            state.think("No relevant information found in RAG. Using LLM knowledge...");
            match llm::complete(self.client.as_ref(), overview_prompt(&topic)).await {
                Ok(text) => text,
                Err(e) => {
                    state.think(format!("Error occurred while generating questions: {}", e));
                    state.fail(format!("Error generating questions: {}", e));
                    return;
                }
            }
        } else {
            state.think("Using information from RAG system.");
            answer.text
        };

        state.think("Using Question Generator tool to create structured questions...");
        let input = format!("{} ### Generate 5 questions about {}", base_text, topic);
        match self.questions.generate(&input).await {
            Ok(json) => {
                state.think("Questions generated successfully. Moving to formatting step...");
                state.questions = json;
                state.current_step = Step::QuestionsGenerated;
            }
            Err(e) => {
                tracing::error!("Question generation failed: {}", e);
                state.think(format!("Error occurred while generating questions: {}", e));
                state.fail(format!("Error in question generation: {}", e));
            }
        }
    }
}

fn plan(state: &mut AgentState) {
    let route = Route::classify(&state.input);
    match route {
        Route::GenerateQuestions => {
            let topic = extract_topic(&state.input);
            state.think(format!(
                "I need to generate questions about {}. I'll use the Question Generator tool to create structured questions.",
                topic
            ));
            state.current_step = Step::PlannedQuestions;
        }
        Route::RagQuery => {
            let thought = format!(
                "This is a query about '{}'. I'll use the RAG tool to get a comprehensive answer.",
                state.input
            );
            state.think(thought);
            state.current_step = Step::PlannedRag;
        }
    }
    state.route = Some(route);
}

fn format_answer(state: &mut AgentState) {
    if state.tool_used != ToolUsed::Questions || state.current_step == Step::Error {
        return;
    }

    state.think("Formatting the generated questions into a readable structure...");
    match QuestionSet::from_json(&state.questions) {
        Ok(set) => {
            state.final_answer = format_questions(&set);
            state.current_step = Step::Completed;
            state.think("Questions formatted successfully. Preparing final output...");
        }
        Err(e) => {
            state.think(format!("Error occurred while formatting questions: {}", e));
            state.fail(format!("Error formatting questions: {}", e));
        }
    }
}

fn overview_prompt(topic: &str) -> String {
    format!(
        "Provide a detailed overview of {}. Include key facts, concepts, and important information. \
         Focus on accuracy and comprehensiveness while being concise. \
         Include both historical and current information where relevant.",
        topic
    )
}
