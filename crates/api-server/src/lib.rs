//! HTTP surface for the capital gains tax simulator.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tax_simulator::{TaxError, TaxSimulator};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod request_id;
pub mod security_headers;
pub mod tax_routes;

use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub simulator: Arc<TaxSimulator>,
    pub enable_hsts: bool,
}

impl AppState {
    pub fn new(simulator: TaxSimulator) -> Self {
        Self {
            simulator: Arc::new(simulator),
            enable_hsts: false,
        }
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(message) => write!(f, "{}", message),
            AppError::Internal(err) => write!(f, "{}", err),
        }
    }
}

impl From<TaxError> for AppError {
    fn from(err: TaxError) -> Self {
        if err.is_client_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.into())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(message) => {
                tracing::warn!("Rejected request: {}", message);
                StatusCode::BAD_REQUEST
            }
            AppError::Internal(err) => {
                tracing::error!("Request failed: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Turns a handler panic into the standard 500 envelope.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unexpected internal error".to_string()
    };
    tracing::error!("Handler panicked: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(message)),
    )
        .into_response()
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .merge(tax_routes::tax_routes());
    with_layers(routes, state, config)
}

/// Wraps routes in the body limit, panic handler, headers, request id, tracing and CORS.
pub fn with_layers(routes: Router<AppState>, state: AppState, config: &ServerConfig) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    routes
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers::security_headers_middleware,
        ))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(trace_layer)
        .layer(cors_layer(config))
        .with_state(state)
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("api_server=info,tax_simulator=info,tower_http=info")
        })
    };

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let rules = config.load_rules()?;
    tracing::info!(
        "Loaded {} tax jurisdictions ({})",
        rules.len(),
        rules.codes().collect::<Vec<_>>().join(", ")
    );
    if let Some(path) = &config.tax_rules_path {
        tracing::info!("Tax rules overridden from {}", path.display());
    }

    let state = AppState {
        simulator: Arc::new(TaxSimulator::new(rules)),
        enable_hsts: config.enable_hsts,
    };
    let app = build_router(state, &config);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Tax simulator API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down.");
    Ok(())
}
