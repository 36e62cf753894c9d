//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use edutopia_core::questions::QuestionKind;
use edutopia_server::Service;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edutopia")]
#[command(
    author,
    version,
    about = "Learning assistant services: chat over your notes, quizzes, video summaries, diagrams and OCR"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "EDUTOPIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run HTTP services
    Serve(ServeArgs),

    /// Ask a question about a context file
    Ask(AskArgs),

    /// Generate quiz questions from a text file
    Questions(QuestionsArgs),

    /// Summarize a text file or a YouTube video
    Summarize(SummarizeArgs),

    /// Analyze a YouTube video transcript
    Analyze(AnalyzeArgs),

    /// Extract text from a PDF, image, DOCX or PPTX file
    Ocr(OcrArgs),

    /// Extract diagrams from a local video
    Diagrams(DiagramsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Service to run
    #[arg(long, value_enum, default_value = "all")]
    pub service: ServiceArg,
}

#[derive(Args)]
pub struct AskArgs {
    /// Text file to answer from
    #[arg(long)]
    pub context: PathBuf,

    /// Question
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct QuestionsArgs {
    /// Source text file
    #[arg(long)]
    pub file: PathBuf,

    /// Question family
    #[arg(long = "type", value_enum, default_value = "all")]
    pub kind: QuestionTypeArg,
}

#[derive(Args)]
pub struct SummarizeArgs {
    /// Text file to summarize
    #[arg(long, conflicts_with = "video", required_unless_present = "video")]
    pub text: Option<PathBuf>,

    /// YouTube URL to summarize
    #[arg(long)]
    pub video: Option<String>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// YouTube URL
    pub url: String,
}

#[derive(Args)]
pub struct OcrArgs {
    /// Document to process
    pub file: PathBuf,

    /// Output directory (defaults to ocr.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiagramsArgs {
    /// Video file
    pub video: PathBuf,

    /// Output directory (defaults to video.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceArg {
    Chat,
    Transcript,
    Summary,
    Diagrams,
    Ocr,
    All,
}

impl ServiceArg {
    pub fn services(self) -> Vec<Service> {
        match self {
            ServiceArg::Chat => vec![Service::Chat],
            ServiceArg::Transcript => vec![Service::Transcript],
            ServiceArg::Summary => vec![Service::Summary],
            ServiceArg::Diagrams => vec![Service::Diagrams],
            ServiceArg::Ocr => vec![Service::Ocr],
            ServiceArg::All => Service::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuestionTypeArg {
    All,
    Mcq,
    YesNo,
    TrueFalse,
}

impl From<QuestionTypeArg> for QuestionKind {
    fn from(arg: QuestionTypeArg) -> Self {
        match arg {
            QuestionTypeArg::All => QuestionKind::All,
            QuestionTypeArg::Mcq => QuestionKind::Mcq,
            QuestionTypeArg::YesNo => QuestionKind::YesNo,
            QuestionTypeArg::TrueFalse => QuestionKind::TrueFalse,
        }
    }
}
