//! recall-api - HTTP API server for recall

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recall_core::{defaults, StudyConfig, TiktokenTokenizer};
use recall_db::{Database, PoolConfig};
use recall_study::{StudyService, StudyStore};

use handlers::{concepts, notes, quizzes};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = recall_core::new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    service: StudyService,
    /// None when running without PostgreSQL (tests).
    db: Option<Database>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Notes
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/:id", get(notes::get_note).delete(notes::delete_note))
        .route("/notes/:id/process", post(notes::process_note))
        // Concepts
        .route("/concepts", get(concepts::list_concepts))
        .route("/concepts/:id", get(concepts::get_concept))
        .route("/concepts/:id/review", post(concepts::review_concept))
        // Quizzes
        .route("/quizzes", get(quizzes::list_quizzes).post(quizzes::create_quiz))
        .route("/quizzes/:id", get(quizzes::get_quiz))
        .route("/quizzes/:id/submit", post(quizzes::submit_quiz))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recall_api=debug,recall_study=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("recall-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/recall".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| defaults::SERVER_HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    // A malformed step ladder refuses to start rather than scheduling wrongly.
    let config = StudyConfig::from_env()?;
    info!(
        chunk_tokens = config.chunk_tokens,
        retry_max_attempts = config.retry.max_attempts,
        grading_concurrency = config.grading_concurrency,
        max_interval_days = config.scheduler.maximum_interval_days,
        "Study configuration loaded"
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;
    info!("Database connected and migrated");

    let backend = recall_inference::backend_from_env()?;
    match backend.health_check().await {
        Ok(true) => info!(model = backend.model_name(), "Completion backend available"),
        _ => warn!(
            model = backend.model_name(),
            "Completion backend not reachable, requests needing it will fail"
        ),
    }

    let tokenizer = Arc::new(TiktokenTokenizer::cl100k()?);
    let service = StudyService::new(StudyStore::from_database(&db), backend, tokenizer, &config);
    let state = AppState {
        service,
        db: Some(db),
    };

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) if db.ping().await => "ok",
        Some(_) => "unavailable",
        None => "disabled",
    };
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "backend": {
            "model": state.service.model_name(),
            "healthy": state.service.backend_healthy().await,
        },
    }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// The completion backend failed or kept answering out of contract.
    BadGateway(String),
    Internal(recall_core::Error),
}

impl From<recall_core::Error> for ApiError {
    fn from(err: recall_core::Error) -> Self {
        use recall_core::Error;

        match err {
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            e @ (Error::InvalidInput(_)
            | Error::InvalidMode(_)
            | Error::InvalidRating(_)
            | Error::ResponseCountMismatch { .. }) => ApiError::BadRequest(e.to_string()),
            e @ (Error::AlreadyCompleted(_) | Error::ConcurrencyRace(_)) => {
                ApiError::Conflict(e.to_string())
            }
            e @ (Error::Validation(_) | Error::Inference(_)) => ApiError::BadGateway(e.to_string()),
            e => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => {
                warn!(error = %msg, "Completion backend error");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::Internal(err) => {
                error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
