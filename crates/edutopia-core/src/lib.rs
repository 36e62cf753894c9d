//! Edutopia Core Library
//!
//! Core functionality for the Edutopia learning assistant services.
//!
//! # Features
//! - Retrieval-augmented chat over a loaded context, with conversation memory
//! - Structured quiz question generation with JSON repair
//! - YouTube transcript analysis and summarization
//! - Diagram extraction from lecture videos with perceptual-hash dedup
//! - OCR for PDF, image, DOCX and PPTX documents

pub mod agent;
mod command;
pub mod config;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod llm;
mod markup;
pub mod memory;
pub mod ocr;
pub mod questions;
pub mod transcript;
pub mod vision;

pub use agent::{Agent, AgentState, RagAnswer, RagTool, Reply, Route};
pub use config::{Config, LLMServiceConfig, OcrConfig, RagConfig, VideoConfig};
pub use error::{EdutopiaError, Error, Result};
pub use index::{chunk_text, Chunk, ScoredChunk, VectorIndex};
pub use knowledge::{KnowledgeBase, SessionContext};
pub use llm::{ChatMessage, Embedder, HttpEmbedder, LLMClient, MetricsSnapshot, OpenAiCompatClient};
pub use memory::ConversationMemory;
pub use ocr::{DocumentKind, OcrOutput, OcrPipeline};
pub use questions::{QuestionGenerator, QuestionKind, QuestionSet};
pub use transcript::{youtube_video_id, Summarizer, TranscriptAnalyzer, YouTubeTranscriptFetcher};
pub use vision::{DiagramExtractor, DetectedObject, JobRegistry, JobStatus};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "edutopia";
