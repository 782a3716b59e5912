//! HTTP API server.

mod auth;
mod handlers;
mod response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use anyhow::Context;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
pub use response::ApiError;
pub use response::ApiResponse;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::settings::Protocol;
use crate::settings::ServerSettings;

const BIND_ATTEMPTS: u32 = 5;
const BIND_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Shared application state
pub struct AppState {
    engine: Arc<Engine>,
    token: Option<String>,
    started: SystemTime,
    version: &'static str,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, token: Option<String>) -> Self {
        Self {
            engine,
            token: token.filter(|t| !t.is_empty()),
            started: SystemTime::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/uptime", get(handlers::uptime))
        .route(
            "/run/command/:command_id",
            get(handlers::run_command).post(handlers::run_command),
        )
        .route(
            "/run/scenario/:scenario_id",
            get(handlers::run_scenario).post(handlers::run_scenario),
        )
        .route(
            "/run/control/:control_id/:item_id",
            get(handlers::run_control).post(handlers::run_control),
        )
        .route("/run/intent", post(handlers::run_intent))
        .route("/controls", get(handlers::controls))
        .route("/device/state", get(handlers::device_state))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, retrying a few times while the address is unavailable.
async fn bind_with_retry(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt < BIND_ATTEMPTS => {
                tracing::warn!(
                    "Failed to bind {} (attempt {}/{}): {}, retrying in {:?}",
                    addr,
                    attempt,
                    BIND_ATTEMPTS,
                    e,
                    BIND_RETRY_DELAY
                );
                tokio::time::sleep(BIND_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Start the HTTP API server
///
/// Serves plain HTTP or HTTPS depending on the settings and runs until the
/// shutdown signal fires.
pub async fn serve(
    engine: Arc<Engine>,
    settings: ServerSettings,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    settings.validate()?;

    let state = Arc::new(AppState::new(engine, settings.token.clone()));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.listen, settings.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", settings.listen, settings.port))?;
    let listener = bind_with_retry(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    match settings.protocol {
        Protocol::Http => {
            tracing::info!("Starting HTTP API server on {}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                    tracing::info!("HTTP API server shutting down gracefully");
                })
                .await?;
        }
        Protocol::Https => serve_tls(listener, app, &settings, shutdown_rx).await?,
    }

    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(
    listener: TcpListener,
    app: Router,
    settings: &ServerSettings,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let (cert, key) = settings
        .tls_cert
        .as_ref()
        .zip(settings.tls_key.as_ref())
        .ok_or(crate::settings::SettingsError::MissingTls)?;
    let config = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {}", cert.display()))?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_rx.await.ok();
        tracing::info!("HTTPS API server shutting down gracefully");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    tracing::info!("Starting HTTPS API server on {}", listener.local_addr()?);
    axum_server::from_tcp_rustls(listener.into_std()?, config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(
    _listener: TcpListener,
    _app: Router,
    _settings: &ServerSettings,
    _shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    anyhow::bail!("blasterd was built without TLS support, rebuild with the `tls` feature")
}
