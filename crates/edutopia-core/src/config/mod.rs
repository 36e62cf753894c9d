//! Configuration management

use crate::error::{EdutopiaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Chunking and retrieval settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Video diagram extraction settings
    #[serde(default)]
    pub video: VideoConfig,

    /// Document OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the OpenAI-compatible chat service (Groq by default)
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions (will be auto-detected if not specified)
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature for chat completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Copy of this configuration with a different sampling temperature.
    ///
    /// Transcript analysis and summaries run deterministic (temperature 0)
    /// while chat keeps the configured value.
    pub fn with_temperature(&self, temperature: f32) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("EDUTOPIA_LLM_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("EDUTOPIA_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("EDUTOPIA_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("EDUTOPIA_LLM_API_KEY")
                .or_else(|_| std::env::var("GROQ_API_KEY"))
                .ok(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("EDUTOPIA_LLM_MODEL").unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("EDUTOPIA_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-mpnet-base-v2".to_string())
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout() -> u64 {
    120
}

/// Chunking and retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Score above which a retrieved chunk counts as relevant
    pub relevance_threshold: f32,
    /// Chunks stuffed into a summary prompt
    pub summary_top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            relevance_threshold: 0.7,
            summary_top_k: 4,
        }
    }
}

/// Conversation memory parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Token budget before older turns are folded into the summary
    pub max_token_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_token_limit: 1000,
        }
    }
}

/// Video diagram extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Seconds between sampled frames
    pub frame_interval_secs: u32,
    /// Sampled frames are resized to this width, keeping aspect ratio
    pub frame_width: u32,
    pub confidence_threshold: f32,
    /// Detections narrower AND shorter than this are skipped
    pub min_resolution: u32,
    /// Minimum crop area after the margin is applied
    pub min_area: u32,
    /// Pixels added around each detection before cropping
    pub margin: u32,
    /// Crops closer than this Hamming distance to a saved crop of the same class are dropped
    pub hash_threshold: u32,
    /// Classes that are never saved
    pub skip_classes: Vec<String>,
    /// Object detection service endpoint
    pub detector_url: String,
    /// Optional image classification endpoint applied to saved crops
    pub classifier_url: Option<String>,
    pub ffmpeg_cmd: String,
    pub output_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    /// Finished sessions older than this are dropped from the registry
    pub session_ttl_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_interval_secs: 10,
            frame_width: 640,
            confidence_threshold: 0.0,
            min_resolution: 200,
            min_area: 0,
            margin: 40,
            hash_threshold: 9,
            skip_classes: vec!["legend".to_string()],
            detector_url: std::env::var("EDUTOPIA_DETECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:8500/detect".to_string()),
            classifier_url: std::env::var("EDUTOPIA_CLASSIFIER_URL").ok(),
            ffmpeg_cmd: "ffmpeg".to_string(),
            output_dir: PathBuf::from("uploads/detected_objects"),
            max_concurrent_jobs: 2,
            session_ttl_secs: 3600,
            download_timeout_secs: 600,
        }
    }
}

/// Document OCR parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    /// LibreOffice binary used to turn presentations into PDFs
    pub soffice_cmd: String,
    /// Rasterization resolution for PDF pages
    pub dpi: u32,
    /// Tesseract language pack
    pub language: String,
    /// Use the embedded PDF text layer instead of OCR when it has content
    pub prefer_text_layer: bool,
    /// Per-invocation limit for the external OCR and conversion tools
    pub tool_timeout_secs: u64,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: std::env::var("EDUTOPIA_TESSERACT")
                .unwrap_or_else(|_| "tesseract".to_string()),
            pdftoppm_cmd: "pdftoppm".to_string(),
            soffice_cmd: "soffice".to_string(),
            dpi: 300,
            language: "eng".to_string(),
            prefer_text_layer: false,
            tool_timeout_secs: 300,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("ocr_output"),
            allowed_extensions: ["pdf", "pptx", "png", "jpg", "jpeg", "docx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// HTTP listener settings, one port per service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub chat_port: u16,
    pub transcript_port: u16,
    pub diagrams_port: u16,
    pub ocr_port: u16,
    pub summary_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            chat_port: 5000,
            transcript_port: 5001,
            diagrams_port: 5002,
            ocr_port: 5003,
            summary_port: 5004,
        }
    }
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject settings the pipelines cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 {
            return Err(EdutopiaError::Config("rag.chunk_size must be > 0".into()));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(EdutopiaError::Config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(EdutopiaError::Config("rag.top_k must be > 0".into()));
        }
        if self.video.frame_interval_secs == 0 || self.video.frame_width == 0 {
            return Err(EdutopiaError::Config(
                "video.frame_interval_secs and video.frame_width must be > 0".into(),
            ));
        }
        if self.video.max_concurrent_jobs == 0 {
            return Err(EdutopiaError::Config(
                "video.max_concurrent_jobs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.video.hash_threshold, 9);
        assert_eq!(config.video.frame_interval_secs, 10);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
llm_service:
  url: http://localhost:8000
  model: test-model
rag:
  top_k: 3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm_service.model, "test-model");
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.server.chat_port, 5000);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(matches!(config.validate(), Err(EdutopiaError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.server.diagrams_port, 5002);
    }

    #[test]
    fn test_embeddings_url_fallback() {
        let mut llm = LLMServiceConfig::default();
        llm.url = "http://chat".into();
        llm.embedding_url = None;
        assert_eq!(llm.embeddings_url(), "http://chat");
        llm.embedding_url = Some("http://embed".into());
        assert_eq!(llm.embeddings_url(), "http://embed");
        assert_eq!(llm.with_temperature(0.0).temperature, 0.0);
    }
}
