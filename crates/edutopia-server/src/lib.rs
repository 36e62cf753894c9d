//! Edutopia HTTP Services
//!
//! Each service (chat, transcript analysis, summaries, diagram extraction
//! and OCR) is an axum router bound to its own port.

mod chat;
mod diagrams;
mod error;
mod ocr;
mod server;
mod state;
mod transcript;

pub use error::{ApiError, ApiResult};
pub use server::{router, run_services, serve, start_server, Service};
pub use state::{AppState, Services};
