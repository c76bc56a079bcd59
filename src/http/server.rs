//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the webhook, health, and metrics handlers
//! - Wire up middleware (tracing, body limits, timeouts, request IDs)
//! - Bind the listener, plain TCP or mutual TLS
//! - Spawn background maintenance (rate-window cleanup, dedup pruning)
//! - Apply whitelist updates pushed by the config watcher

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::net::tls::{self, TlsError};
use crate::observability::metrics;
use crate::pipeline::AdmissionPipeline;
use crate::security::ip_filter::{IpWhitelist, WhitelistError};
use crate::security::rate_limit::{self, MemoryStore, RateLimiter};
use crate::security::signature::{SignatureError, SignatureVerifier};
use crate::webhook::WebhookProcessor;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("whitelist: {0}")]
    Whitelist(#[from] WhitelistError),

    #[error("signature key: {0}")]
    Signature(#[from] SignatureError),

    #[error("tls: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub processor: Arc<WebhookProcessor>,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// HTTP server for the webhook gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    pipeline: Arc<AdmissionPipeline>,
    rate_store: Arc<MemoryStore>,
    processor: Arc<WebhookProcessor>,
}

impl HttpServer {
    /// Create a new server: parse the whitelist, load the bank key, and
    /// assemble the admission pipeline behind the router.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let whitelist = IpWhitelist::parse(&config.security.allowed_ips)?;
        let whitelist = Arc::new(ArcSwap::from_pointee(whitelist));

        let rate_store = Arc::new(MemoryStore::new(
            config.security.rate_limit_window_secs,
            config.security.rate_limit_requests,
            config.security.rate_limit_retention_secs,
        ));
        let limiter = RateLimiter::new(rate_store.clone());

        let verifier = Arc::new(SignatureVerifier::from_pem_file(
            config.security.bank_public_key_path.as_ref(),
        )?);

        let processor = Arc::new(WebhookProcessor::new());
        let pipeline = Arc::new(AdmissionPipeline::new(
            whitelist,
            limiter,
            verifier,
            processor.clone(),
        ));

        let metrics_handle = if config.observability.metrics_enabled {
            metrics::install()
        } else {
            None
        };

        let state = AppState {
            pipeline: pipeline.clone(),
            processor: processor.clone(),
            metrics_handle,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pipeline,
            rate_store,
            processor,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/webhook/bank-notification", post(webhook_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on the given listener until the shutdown channel fires.
    ///
    /// `config_updates` carries validated reloads from the config watcher;
    /// only the whitelist is applied at runtime.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_background(config_updates);

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run with mutual TLS on the configured bind address.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let tls = self
            .config
            .listener
            .tls
            .as_ref()
            .expect("run_tls requires a [listener.tls] section");
        let rustls_config = tls::load_mtls_config(
            tls.cert_path.as_ref(),
            tls.key_path.as_ref(),
            tls.client_ca_path.as_ref(),
        )?;

        tracing::info!(address = %addr, "HTTPS server starting (mutual TLS)");

        self.spawn_background(config_updates);

        let handle = axum_server::Handle::new();
        let drain_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_background(&self, mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>) {
        tokio::spawn(rate_limit::run_cleanup(
            self.rate_store.clone(),
            Duration::from_secs(self.config.security.rate_limit_cleanup_interval_secs),
        ));

        let processor = Arc::downgrade(&self.processor);
        let retention = self.config.webhook.dedup_retention_secs;
        let interval = Duration::from_secs(self.config.webhook.dedup_cleanup_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(processor) = processor.upgrade() else {
                    break;
                };
                let pruned = processor.prune(retention, rate_limit::unix_now());
                if pruned > 0 {
                    tracing::debug!(pruned, "Dedup entries pruned");
                }
            }
        });

        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match IpWhitelist::parse(&config.security.allowed_ips) {
                    Ok(whitelist) => pipeline.swap_whitelist(whitelist),
                    Err(err) => {
                        tracing::warn!(error = %err, "Reloaded whitelist rejected, keeping current snapshot");
                    }
                }
            }
        });
    }
}

/// Main webhook handler: the pipeline does all admission work, the handler
/// only bridges extractors and records the outcome.
async fn webhook_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = state.pipeline.handle(&body, addr.ip(), &headers);
    metrics::record_request(result.status.as_u16(), start);
    result.into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "webhook": state.processor.stats(),
    }))
    .into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled\n").into_response(),
    }
}
