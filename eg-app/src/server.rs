//! EnGrade server assembly: config, stores, model client, router, lifecycle.

use crate::auth::AuthKeys;
use crate::config::AppConfig;
use crate::routes;
use anyhow::Result;
use axum::Extension;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::Response;
use eg_llm::{GeminiClient, ModelClient};
use eg_store::{Db, SentenceStore, SubmissionStore, UserStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Process-wide service handles, built once at startup and passed by
/// reference into every request handler. No hidden singletons; tests build
/// their own with fakes.
pub struct AppState {
    pub cfg: AppConfig,
    pub model: ModelClient,
    pub submissions: SubmissionStore,
    pub sentences: SentenceStore,
    pub users: UserStore,
    pub auth: AuthKeys,
}

impl AppState {
    pub fn new(cfg: AppConfig, model: ModelClient, db: Db) -> Self {
        let auth = AuthKeys::new(&cfg.auth.token_secret, cfg.auth.token_ttl_seconds);
        Self {
            cfg,
            model,
            submissions: SubmissionStore::new(db.clone()),
            sentences: SentenceStore::new(db.clone()),
            users: UserStore::new(db),
            auth,
        }
    }
}

pub async fn doctor(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = AppConfig::load(config_path).await?;
    let db = Db::new(&cfg.storage.db_path);
    db.init().await?;
    tracing::info!(
        bind_addr = %cfg.server.bind_addr,
        model = %cfg.llm.model,
        db_path = %cfg.storage.db_path,
        translation_group_size = cfg.translation.group_size,
        "config ok"
    );
    Ok(())
}

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = AppConfig::load(config_path).await?;
    let addr: SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr {:?}: {e}", cfg.server.bind_addr))?;
    tracing::info!(
        bind_addr = %addr,
        model = %cfg.llm.model,
        db_path = %cfg.storage.db_path,
        http_timeout_seconds = cfg.server.http_timeout_seconds,
        http_max_in_flight = cfg.server.http_max_in_flight,
        question_limit = cfg.questions.limit,
        fresh_offset_min = cfg.questions.fresh_offset_min,
        fresh_offset_max = cfg.questions.fresh_offset_max,
        translation_max_batch = cfg.translation.max_batch,
        translation_group_size = cfg.translation.group_size,
        "server configuration loaded"
    );
    let listener = preflight_bind_listener(addr).await?;

    let db = Db::new(&cfg.storage.db_path);
    db.init().await?;

    let backend = GeminiClient::new(&cfg.llm.gemini_api_key).with_model(&cfg.llm.model);
    let model = ModelClient::new(Arc::new(backend)).with_group_size(cfg.translation.group_size);

    let state = Arc::new(AppState::new(cfg.clone(), model, db));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id_from_headers(request.headers())
            )
        })
        .on_response(
            |response: &Response, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "http request completed"
                );
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    error_class = %error,
                    latency_ms = latency.as_millis() as u64,
                    "http request failed"
                );
            },
        );

    let app = routes::router()
        .layer(Extension(state))
        .layer(GlobalConcurrencyLimitLayer::new(cfg.server.http_max_in_flight))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(cfg.server.http_timeout_seconds),
        ))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    tracing::info!(%addr, "engrade serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("http server shutdown completed");

    Ok(())
}

async fn preflight_bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("preflight bind failed for {addr}: {e}"))?;
    tracing::info!(%addr, "preflight bind check passed");
    Ok(listener)
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "missing".to_string())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler; falling back to ctrl_c only");
                if let Err(ctrlc_err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %ctrlc_err, "failed to await ctrl-c signal");
                }
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received ctrl-c; beginning graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::warn!("received SIGTERM; beginning graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to await ctrl-c signal");
        } else {
            tracing::warn!("received ctrl-c; beginning graceful shutdown");
        }
    }
}
