//! Shared application state

use edutopia_core::llm::{Embedder, HttpEmbedder, LLMClient, MetricsSnapshot, OpenAiCompatClient};
use edutopia_core::transcript::{Summarizer, TranscriptAnalyzer, TranscriptSource, YouTubeTranscriptFetcher};
use edutopia_core::vision::{DiagramExtractor, JobRegistry, VideoProcessor};
use edutopia_core::{Agent, Config, OcrPipeline, Result, SessionContext};
use std::sync::Arc;
use std::time::Duration;

/// Backends the services are built from
pub struct Services {
    /// Chat and question generation, at the configured temperature
    pub chat_client: Arc<dyn LLMClient>,
    /// Transcript analysis and summaries
    pub analysis_client: Arc<dyn LLMClient>,
    pub embedder: Arc<dyn Embedder>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub processor: Arc<dyn VideoProcessor>,
    pub ocr: Arc<OcrPipeline>,
    /// Request metrics reported by `/api/health`
    pub metrics: Option<Arc<OpenAiCompatClient>>,
}

impl Services {
    /// Production backends: OpenAI-compatible LLM, YouTube captions,
    /// HTTP detection services and command-line OCR tools
    pub fn from_config(config: &Config) -> Result<Self> {
        let chat = Arc::new(OpenAiCompatClient::new(config.llm_service.clone())?);
        let analysis: Arc<dyn LLMClient> = Arc::new(OpenAiCompatClient::new(
            config.llm_service.with_temperature(0.0),
        )?);
        let chat_client: Arc<dyn LLMClient> = chat.clone();
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(chat_client.clone()));
        let transcripts = Arc::new(YouTubeTranscriptFetcher::new(Duration::from_secs(
            config.llm_service.timeout_secs,
        ))?);
        let processor = Arc::new(DiagramExtractor::from_config(&config.video)?);

        Ok(Self {
            chat_client,
            analysis_client: analysis,
            embedder,
            transcripts,
            processor,
            ocr: Arc::new(OcrPipeline::from_config(&config.ocr)),
            metrics: Some(chat),
        })
    }
}

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionContext>,
    pub agent: Arc<Agent>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub analyzer: Arc<TranscriptAnalyzer>,
    pub summarizer: Arc<Summarizer>,
    pub jobs: JobRegistry,
    pub ocr: Arc<OcrPipeline>,
    metrics: Option<Arc<OpenAiCompatClient>>,
}

impl AppState {
    pub fn new(config: Config, services: Services) -> Self {
        let session = Arc::new(SessionContext::new(
            services.embedder.clone(),
            config.rag.clone(),
            config.memory.clone(),
        ));
        let agent = Arc::new(Agent::new(services.chat_client.clone(), session.clone()));
        let analyzer = Arc::new(TranscriptAnalyzer::new(
            services.analysis_client.clone(),
            services.embedder.clone(),
            config.rag.clone(),
        ));
        let summarizer = Arc::new(Summarizer::new(
            services.analysis_client,
            services.embedder,
            config.rag.clone(),
        ));
        let jobs = JobRegistry::new(
            services.processor,
            config.video.output_dir.clone(),
            config.video.max_concurrent_jobs,
        );

        Self {
            config: Arc::new(config),
            session,
            agent,
            transcripts: services.transcripts,
            analyzer,
            summarizer,
            jobs,
            ocr: services.ocr,
            metrics: services.metrics,
        }
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let services = Services::from_config(&config)?;
        Ok(Self::new(config, services))
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|client| client.metrics())
    }
}
