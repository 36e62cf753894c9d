//! Session-wide knowledge base and conversation memory
//!
//! A knowledge base is built from one context string and is immutable once
//! built. Reloading builds the replacement first and then swaps it in, so a
//! query in flight keeps the snapshot it started with.

use crate::config::{MemoryConfig, RagConfig};
use crate::error::{EdutopiaError, Result};
use crate::index::{chunk_text, ScoredChunk, VectorIndex};
use crate::llm::{self, Embedder, LLMClient};
use crate::memory::ConversationMemory;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Indexed context for retrieval
pub struct KnowledgeBase {
    index: VectorIndex,
    source_len: usize,
    loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Chunk and embed a context string
    pub async fn build(context: &str, rag: &RagConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if context.trim().is_empty() {
            return Err(EdutopiaError::InvalidInput(
                "Context must not be empty".to_string(),
            ));
        }

        let chunks = chunk_text(context, rag.chunk_size, rag.chunk_overlap);
        let index = VectorIndex::build(chunks, embedder).await?;

        Ok(Self {
            index,
            source_len: context.chars().count(),
            loaded_at: Utc::now(),
        })
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.index.similarity_search_with_score(query, k).await
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Length of the source context in characters
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Knowledge base and memory shared by all chat requests
pub struct SessionContext {
    knowledge: RwLock<Option<Arc<KnowledgeBase>>>,
    memory: Mutex<ConversationMemory>,
    /// Bumped whenever the memory is replaced wholesale
    memory_generation: AtomicU64,
    /// Held while a summarization is in flight
    summarizing: Mutex<()>,
    embedder: Arc<dyn Embedder>,
    rag: RagConfig,
    memory_config: MemoryConfig,
}

impl SessionContext {
    pub fn new(embedder: Arc<dyn Embedder>, rag: RagConfig, memory_config: MemoryConfig) -> Self {
        let memory = ConversationMemory::new(memory_config.max_token_limit);
        Self {
            knowledge: RwLock::new(None),
            memory: Mutex::new(memory),
            memory_generation: AtomicU64::new(0),
            summarizing: Mutex::new(()),
            embedder,
            rag,
            memory_config,
        }
    }

    pub fn rag_config(&self) -> &RagConfig {
        &self.rag
    }

    /// Replace the knowledge base and conversation memory.
    ///
    /// Returns the number of chunks indexed. On failure the previous session
    /// stays in place.
    pub async fn load(&self, context: &str, user_history: &str, ai_history: &str) -> Result<usize> {
        let knowledge = KnowledgeBase::build(context, &self.rag, self.embedder.clone()).await?;
        let chunks = knowledge.chunk_count();
        let memory = ConversationMemory::from_history(
            user_history,
            ai_history,
            self.memory_config.max_token_limit,
        );

        {
            let mut slot = self.knowledge.write().await;
            let mut current = self.memory.lock().await;
            *slot = Some(Arc::new(knowledge));
            *current = memory;
            self.memory_generation.fetch_add(1, Ordering::SeqCst);
        }

        tracing::info!(
            "Loaded context: {} chars, {} chunks",
            context.chars().count(),
            chunks
        );
        Ok(chunks)
    }

    /// Current knowledge base, if one has been loaded
    pub async fn snapshot(&self) -> Option<Arc<KnowledgeBase>> {
        self.knowledge.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.knowledge.read().await.is_some()
    }

    pub fn memory(&self) -> &Mutex<ConversationMemory> {
        &self.memory
    }

    /// Memory rendered for a prompt
    pub async fn rendered_memory(&self) -> String {
        self.memory.lock().await.render()
    }

    /// Append an exchange and fold old turns if over budget.
    ///
    /// The memory lock is released while the LLM summarizes, so concurrent
    /// queries can still read memory. Only one summarization runs at a time;
    /// others skip folding until the next exchange. A failed summarization
    /// keeps the turns verbatim.
    pub async fn record_exchange(&self, user: &str, assistant: &str, llm: &dyn LLMClient) {
        let (turns, prompt, generation, _summarizing) = {
            let mut memory = self.memory.lock().await;
            memory.push(user, assistant);
            if !memory.needs_pruning() {
                return;
            }
            let Ok(summarizing) = self.summarizing.try_lock() else {
                tracing::debug!("Summarization already running, deferring memory fold");
                return;
            };
            let turns = memory.take_overflow();
            if turns.is_empty() {
                return;
            }
            let prompt = memory.summary_prompt(&turns);
            let generation = self.memory_generation.load(Ordering::SeqCst);
            (turns, prompt, generation, summarizing)
        };

        let result = llm::complete(llm, prompt).await;

        let mut memory = self.memory.lock().await;
        if self.memory_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Memory replaced during summarization, dropping summary");
            return;
        }
        match result {
            Ok(summary) => {
                memory.set_summary(summary.trim());
                tracing::debug!("Folded {} turns into conversation summary", turns.len());
            }
            Err(e) => {
                tracing::warn!("Failed to summarize conversation memory: {}", e);
                memory.restore(turns);
            }
        }
    }

    /// Replace only the conversation memory, keeping the knowledge base
    pub async fn replace_history(&self, user_history: &str, ai_history: &str) -> Result<()> {
        if !self.is_loaded().await {
            return Err(EdutopiaError::NotInitialized(
                "load a context before saving a conversation".to_string(),
            ));
        }
        let memory = ConversationMemory::from_history(
            user_history,
            ai_history,
            self.memory_config.max_token_limit,
        );
        let mut current = self.memory.lock().await;
        *current = memory;
        self.memory_generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
