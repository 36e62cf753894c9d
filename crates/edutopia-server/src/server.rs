//! Service routers and listeners

use crate::state::AppState;
use crate::{chat, diagrams, ocr, transcript};
use anyhow::Result;
use axum::Router;
use edutopia_core::Config;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Interval between sweeps of expired extraction sessions
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One HTTP service, each on its own port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Chat,
    Transcript,
    Summary,
    Diagrams,
    Ocr,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Chat,
        Service::Transcript,
        Service::Summary,
        Service::Diagrams,
        Service::Ocr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Service::Chat => "chat",
            Service::Transcript => "transcript",
            Service::Summary => "summary",
            Service::Diagrams => "diagrams",
            Service::Ocr => "ocr",
        }
    }

    pub fn port(self, config: &Config) -> u16 {
        let server = &config.server;
        match self {
            Service::Chat => server.chat_port,
            Service::Transcript => server.transcript_port,
            Service::Summary => server.summary_port,
            Service::Diagrams => server.diagrams_port,
            Service::Ocr => server.ocr_port,
        }
    }
}

/// Router for one service with tracing and permissive CORS
pub fn router(service: Service, state: AppState) -> Router {
    let routes = match service {
        Service::Chat => chat::router(state),
        Service::Transcript => transcript::analysis_router(state),
        Service::Summary => transcript::summary_router(state),
        Service::Diagrams => diagrams::router(state),
        Service::Ocr => ocr::router(state),
    };
    routes
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve one service on an already bound listener until shutdown
pub async fn serve(
    service: Service,
    state: AppState,
    listener: TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!(
        "{} service listening on http://{}",
        service.name(),
        listener.local_addr()?
    );
    axum::serve(listener, router(service, state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Start the given services from configuration and run until Ctrl-C
pub async fn start_server(config: Config, services: &[Service]) -> Result<()> {
    let state = AppState::from_config(config)?;
    run_services(state, services).await
}

/// Bind and run services sharing one state
pub async fn run_services(state: AppState, services: &[Service]) -> Result<()> {
    let shutdown = tokio_util::sync::CancellationToken::new();

    let mut listeners = Vec::with_capacity(services.len());
    for &service in services {
        let addr = format!("{}:{}", state.config.server.host, service.port(&state.config));
        let listener = TcpListener::bind(&addr).await?;
        listeners.push((service, listener));
    }

    if services.contains(&Service::Diagrams) {
        spawn_sweeper(state.clone(), shutdown.clone());
    }

    let servers = listeners.into_iter().map(|(service, listener)| {
        let token = shutdown.clone();
        serve(service, state.clone(), listener, async move {
            token.cancelled().await
        })
    });

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutting down");
        signal.cancel();
    });

    let result = futures::future::try_join_all(servers).await;
    shutdown.cancel();
    state.jobs.cancel_all();
    result.map(|_| ())
}

/// Periodically drop finished extraction sessions older than the TTL
fn spawn_sweeper(state: AppState, shutdown: tokio_util::sync::CancellationToken) {
    let ttl = Duration::from_secs(state.config.video.session_ttl_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    state.jobs.sweep_expired(ttl);
                }
            }
        }
    });
}
