// Server module
// Single-page web UI and JSON API over the recommender


use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::AnirecError;
use crate::pipeline::AppContext;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON error envelope with a status code derived from the failure kind
struct ApiError(AnirecError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AnirecError::Data(_) => StatusCode::BAD_REQUEST,
            AnirecError::TooMuchContext { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AnirecError::Embedding(_) | AnirecError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Request failed ({}): {}", status, self.0);
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AnirecError> for ApiError {
    fn from(error: AnirecError) -> Self {
        Self(error)
    }
}

/// Build the application router
#[inline]
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/recommend", post(recommend))
        .with_state(context)
}

/// Bind and serve until interrupted
#[inline]
pub async fn serve(context: Arc<AppContext>, host: &str, port: u16) -> Result<(), AnirecError> {
    let app = router(context);
    let address = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        documents: context.document_count(),
    })
}

async fn recommend(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let query = request.query.trim();

    // Reject blank queries before any model call
    if query.is_empty() {
        return Err(ApiError(AnirecError::Data(
            "Query must not be empty".to_string(),
        )));
    }

    let answer = context.recommend(query).await?;
    Ok(Json(RecommendResponse { answer }))
}
