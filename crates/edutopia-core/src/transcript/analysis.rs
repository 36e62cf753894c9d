//! Retrieval-based transcript analysis and summarization

use crate::config::RagConfig;
use crate::error::{EdutopiaError, Result};
use crate::knowledge::KnowledgeBase;
use crate::llm::{self, Embedder, LLMClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

const KEY_POINTS_QUERY: &str = "What are the main points and key concepts discussed in this video?";
const ANALYSIS_REQUEST: &str = "Please provide a detailed analysis of the video content.";

/// Transcript chunk retrieved for the analysis
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub content: String,
    /// Cosine similarity to the key points query
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub analysis: String,
    pub relevant_sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub summary: String,
    /// Seconds spent producing the summary
    pub response_time: f64,
}

/// Produces a structured analysis of a video transcript
pub struct TranscriptAnalyzer {
    client: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    config: RagConfig,
}

impl TranscriptAnalyzer {
    pub fn new(client: Arc<dyn LLMClient>, embedder: Arc<dyn Embedder>, config: RagConfig) -> Self {
        Self {
            client,
            embedder,
            config,
        }
    }

    pub async fn analyze(&self, transcript: &str) -> Result<Analysis> {
        let knowledge = KnowledgeBase::build(transcript, &self.config, self.embedder.clone())
            .await
            .map_err(empty_transcript)?;
        tracing::info!("Indexed transcript into {} chunks", knowledge.chunk_count());

        let section_hits = knowledge.search(KEY_POINTS_QUERY, self.config.top_k).await?;
        let context_hits = knowledge
            .search(ANALYSIS_REQUEST, self.config.summary_top_k)
            .await?;
        let context = context_hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let analysis =
            llm::complete(self.client.as_ref(), analysis_prompt(&context, ANALYSIS_REQUEST))
                .await?;

        Ok(Analysis {
            analysis,
            relevant_sections: section_hits
                .into_iter()
                .map(|hit| Section {
                    content: hit.text,
                    relevance_score: hit.score,
                })
                .collect(),
        })
    }
}

/// Summarizes arbitrary text by stuffing its most representative chunks
pub struct Summarizer {
    client: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    config: RagConfig,
}

impl Summarizer {
    pub fn new(client: Arc<dyn LLMClient>, embedder: Arc<dyn Embedder>, config: RagConfig) -> Self {
        Self {
            client,
            embedder,
            config,
        }
    }

    pub async fn summarize(&self, text: &str) -> Result<Summary> {
        let start = Instant::now();

        let knowledge = KnowledgeBase::build(text, &self.config, self.embedder.clone()).await?;
        let hits = knowledge.search(text, self.config.summary_top_k).await?;
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let summary = llm::complete(self.client.as_ref(), summary_prompt(&context)).await?;
        let response_time = start.elapsed().as_secs_f64();
        tracing::info!("Summarized {} chars in {:.2}s", text.len(), response_time);

        Ok(Summary {
            summary,
            response_time,
        })
    }
}

fn empty_transcript(e: EdutopiaError) -> EdutopiaError {
    match e {
        EdutopiaError::InvalidInput(_) => {
            EdutopiaError::InvalidInput("Transcript is empty".to_string())
        }
        other => other,
    }
}

fn analysis_prompt(context: &str, request: &str) -> String {
    format!(
        "Based on the video transcript provided in the context, please provide a comprehensive analysis including:
1. Main Topics:
   - List and explain the key subjects covered
   - Identify the primary themes and concepts

2. Key Points and Takeaways:
   - Summarize the most important information
   - Highlight crucial insights and findings

3. Technical Details:
   - List any specific techniques, methods, or tools mentioned
   - Explain any step-by-step processes described

4. Practical Applications:
   - Identify real-world applications discussed
   - Note any examples or case studies mentioned

Please structure your response clearly and provide specific examples from the transcript where relevant.

<context>
{context}
</context>

Question: {request}"
    )
}

fn summary_prompt(context: &str) -> String {
    format!(
        "Summarize the following document concisely while preserving key details:\n<document>\n{}\n<document>",
        context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "flat"
        }
    }

    #[derive(Default)]
    struct CapturingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMClient for CapturingLlm {
        async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok("An analysis.".to_string())
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn embedding_dimensions(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "capturing"
        }
        fn embedding_model(&self) -> &str {
            "capturing"
        }
    }

    #[tokio::test]
    async fn test_analysis_context_uses_summary_top_k() {
        let transcript = (0..8)
            .map(|i| format!("Segment {} covers cells.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let config = RagConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            ..RagConfig::default()
        };
        assert_eq!((config.top_k, config.summary_top_k), (5, 4));

        let llm = Arc::new(CapturingLlm::default());
        let analyzer = TranscriptAnalyzer::new(llm.clone(), Arc::new(FlatEmbedder), config);
        let analysis = analyzer.analyze(&transcript).await.unwrap();

        assert_eq!(analysis.analysis, "An analysis.");
        assert_eq!(analysis.relevant_sections.len(), 5);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let context = prompts[0]
            .split("<context>")
            .nth(1)
            .and_then(|rest| rest.split("</context>").next())
            .unwrap();
        assert_eq!(context.matches("Segment ").count(), 4);
    }

    #[test]
    fn test_analysis_prompt_sections() {
        let prompt = analysis_prompt("the transcript", ANALYSIS_REQUEST);
        for heading in [
            "1. Main Topics:",
            "2. Key Points and Takeaways:",
            "3. Technical Details:",
            "4. Practical Applications:",
        ] {
            assert!(prompt.contains(heading), "missing {}", heading);
        }
        assert!(prompt.contains("<context>\nthe transcript\n</context>"));
        assert!(prompt.ends_with("Question: Please provide a detailed analysis of the video content."));
    }

    #[test]
    fn test_summary_prompt() {
        assert_eq!(
            summary_prompt("doc"),
            "Summarize the following document concisely while preserving key details:\n<document>\ndoc\n<document>"
        );
    }
}
