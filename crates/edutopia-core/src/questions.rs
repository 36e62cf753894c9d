//! Structured quiz question generation
//!
//! The LLM is asked for a strict JSON object with four question arrays.
//! Responses wrapped in prose are repaired by extracting the outermost
//! brace-delimited span.

use crate::error::{EdutopiaError, Result};
use crate::llm::{self, LLMClient};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;

/// Requirements used when the input carries no `###` section
pub const DEFAULT_REQUEST: &str = "Generate 5 y/n questions with answers and 5 t/f without answers \
     and 5 wh questions without answers and 5 mcq with answers";

lazy_static! {
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)(\{.*\})").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YesNoQuestion {
    pub question: String,
    pub answer: String,
}

/// Question without an answer (true/false statements and WH questions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementQuestion {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(default)]
    pub yes_no: Vec<YesNoQuestion>,
    #[serde(default)]
    pub true_false: Vec<StatementQuestion>,
    #[serde(default)]
    pub wh_questions: Vec<StatementQuestion>,
    #[serde(default)]
    pub mcq: Vec<MultipleChoiceQuestion>,
}

impl QuestionSet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.yes_no.len() + self.true_false.len() + self.wh_questions.len() + self.mcq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Question family requested through the HTTP `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    All,
    Mcq,
    YesNo,
    TrueFalse,
}

impl QuestionKind {
    /// Parse the `type` field; unknown values mean all kinds
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("mcq") => QuestionKind::Mcq,
            Some("yes_no") => QuestionKind::YesNo,
            Some("true_false") => QuestionKind::TrueFalse,
            _ => QuestionKind::All,
        }
    }

    /// Requirements line for direct generation of this family
    pub fn request(self) -> &'static str {
        match self {
            QuestionKind::All => DEFAULT_REQUEST,
            QuestionKind::Mcq => "Generate 5 mcq with answers",
            QuestionKind::YesNo => "Generate 5 y/n questions with answers",
            QuestionKind::TrueFalse => "Generate 5 t/f questions without answers",
        }
    }
}

/// Build the routed query for a question request
pub fn question_query(text: &str, kind: QuestionKind) -> String {
    match kind {
        QuestionKind::YesNo => format!("generate y/n questions about {}", text),
        QuestionKind::TrueFalse => format!("generate t/f questions about {}", text),
        QuestionKind::Mcq | QuestionKind::All => format!("generate questions about {}", text),
    }
}

/// Split `<source> ### <requirements>` on the first separator
pub fn split_request(input: &str) -> (&str, &str) {
    match input.split_once("###") {
        Some((source, request)) => (source.trim(), request.trim()),
        None => (input.trim(), DEFAULT_REQUEST),
    }
}

pub fn build_prompt(source: &str, request: &str) -> String {
    format!(
        r#"You are a question generator that creates structured questions based on educational text.

Based on this text:

{source}

Generate questions as per this request:
{request}

IMPORTANT: Return ONLY a valid JSON object with this EXACT structure:
{{
  "yes_no": [
    {{"question": "Is pasta originally from Sicily?", "answer": "Yes"}},
    // 4 more yes/no questions
  ],
  "true_false": [
    {{"question": "Pasta was first recorded in the 15th century."}},
    // 4 more true/false questions
  ],
  "wh_questions": [
    {{"question": "When was pasta first recorded in Sicily?"}},
    // 4 more wh questions
  ],
  "mcq": [
    {{"question": "What is the origin of the word pasta?",
      "options": [
        "A) From Greek pastros",
        "B) From Italian for dough",
        "C) From Latin pasta",
        "D) From Arabic pastah"
      ],
      "answer": "B) From Italian for dough"}},
    // 4 more mcq questions
  ]
}}

REQUIREMENTS:
1. Return ONLY the JSON object, no other text
2. Ensure all JSON keys and values are in double quotes
3. Generate EXACTLY 5 questions of each type
4. Follow the example format exactly
5. Base all questions on the provided text only
"#
    )
}

/// Return `raw` if it is valid JSON, otherwise the outermost `{...}` span if that is
pub fn repair_json(raw: &str) -> Result<String> {
    if serde_json::from_str::<serde_json::Value>(raw).is_ok() {
        return Ok(raw.to_string());
    }

    tracing::debug!("Invalid JSON received, attempting to extract object");
    if let Some(m) = JSON_OBJECT.captures(raw).and_then(|c| c.get(1)) {
        let candidate = m.as_str();
        serde_json::from_str::<serde_json::Value>(candidate)?;
        return Ok(candidate.to_string());
    }

    Err(EdutopiaError::Parse(
        "Could not extract valid JSON from response".to_string(),
    ))
}

/// Render a question set in the chat layout
pub fn format_questions(set: &QuestionSet) -> String {
    let mut out = String::from("Here are the generated questions:\n\n");

    out.push_str("Yes/No Questions:\n");
    for q in &set.yes_no {
        let _ = writeln!(out, "- {} (Answer: {})", q.question, q.answer);
    }

    out.push_str("\nTrue/False Questions:\n");
    for q in &set.true_false {
        let _ = writeln!(out, "- {}", q.question);
    }

    out.push_str("\nWH Questions:\n");
    for q in &set.wh_questions {
        let _ = writeln!(out, "- {}", q.question);
    }

    out.push_str("\nMultiple Choice Questions:\n");
    for q in &set.mcq {
        let _ = writeln!(out, "- {}", q.question);
        for option in &q.options {
            let _ = writeln!(out, "  {}", option);
        }
        let _ = writeln!(out, "  Answer: {}", q.answer);
    }

    out
}

/// Generates question JSON from source text
pub struct QuestionGenerator {
    client: Arc<dyn LLMClient>,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Generate question JSON for `<source> ### <requirements>` input
    pub async fn generate(&self, input: &str) -> Result<String> {
        let (source, request) = split_request(input);
        if source.is_empty() {
            return Err(EdutopiaError::InvalidInput(
                "No source text to generate questions from".to_string(),
            ));
        }

        tracing::info!("Generating questions from {} chars of text", source.len());
        let response = llm::complete(self.client.as_ref(), build_prompt(source, request)).await?;
        repair_json(response.trim())
    }

    /// Generate and parse in one step
    pub async fn generate_set(&self, input: &str) -> Result<QuestionSet> {
        QuestionSet::from_json(&self.generate(input).await?)
    }
}
