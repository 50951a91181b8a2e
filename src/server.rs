//! JSON HTTP API.
//!
//! Exposes the post operations to the listing page, the detail page, the
//! add-post form, and the search box.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/posts` | Create a post, returns `{ "id": ... }` |
//! | `GET`  | `/api/posts` | All posts, oldest first |
//! | `GET`  | `/api/posts/{id}` | One post, or `null` if unknown |
//! | `GET`  | `/api/posts/{id}/similar` | Up to N similar posts by the same user |
//! | `GET`  | `/api/posts/{id}/detail` | `{ post, similar }`, or `null` if unknown |
//! | `POST` | `/api/posts/search` | Semantic search: `{ "query": ... }` |
//! | `POST` | `/api/posts/similar` | Similar posts for ad-hoc content |
//! | `GET`  | `/api/listing?q=` | Listing page: all posts, or search results |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Missing required field: title" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `upstream` (502), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use postboard_core::models::{NewPost, PostView};
use postboard_core::posts::{Listing, PostDetail, SimilarQuery};
use postboard_core::PostError;

use crate::config::Config;
use crate::posts::Backends;

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let backends = Backends::open(config).await?;
    let app = router(backends);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        provider = %config.embedding.provider,
        "postboard server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the API router over the given backends.
pub fn router(backends: Backends) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/posts", post(handle_create).get(handle_list))
        .route("/api/posts/search", post(handle_search))
        .route("/api/posts/similar", post(handle_similar_by_content))
        .route("/api/posts/{id}", get(handle_get))
        .route("/api/posts/{id}/similar", get(handle_similar_by_id))
        .route("/api/posts/{id}/detail", get(handle_detail))
        .route("/api/listing", get(handle_listing))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(backends)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<PostError>() {
            Some(e) if e.is_validation() => {
                AppError::new(StatusCode::BAD_REQUEST, "bad_request", err.to_string())
            }
            Some(PostError::EmbeddingsDisabled) => AppError::new(
                StatusCode::BAD_REQUEST,
                "embeddings_disabled",
                err.to_string(),
            ),
            Some(PostError::Provider(_)) | Some(PostError::InvalidDimension { .. }) => {
                error!(error = %err, "embedding provider failure");
                AppError::new(StatusCode::BAD_GATEWAY, "upstream", err.to_string())
            }
            _ => {
                error!(error = ?err, "request failed");
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    err.to_string(),
                )
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(
            StatusCode::BAD_REQUEST,
            "bad_request",
            rejection.body_text(),
        )
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

async fn handle_create(
    State(backends): State<Backends>,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(post) = body?;
    let id = backends.create_post(post).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn handle_list(State(backends): State<Backends>) -> Result<Json<Vec<PostView>>, AppError> {
    Ok(Json(backends.list_posts().await?))
}

/// Unknown IDs answer `200 null`, not 404.
async fn handle_get(
    State(backends): State<Backends>,
    Path(id): Path<String>,
) -> Result<Json<Option<PostView>>, AppError> {
    Ok(Json(backends.get_post(&id).await?))
}

async fn handle_similar_by_id(
    State(backends): State<Backends>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PostView>>, AppError> {
    Ok(Json(backends.similar_posts_by_id(&id).await?))
}

async fn handle_detail(
    State(backends): State<Backends>,
    Path(id): Path<String>,
) -> Result<Json<Option<PostDetail>>, AppError> {
    Ok(Json(backends.post_detail(&id).await?))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
}

async fn handle_search(
    State(backends): State<Backends>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let Json(req) = body?;
    Ok(Json(backends.search_posts(&req.query).await?))
}

async fn handle_similar_by_content(
    State(backends): State<Backends>,
    body: Result<Json<SimilarQuery>, JsonRejection>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let Json(query) = body?;
    Ok(Json(backends.similar_posts(query).await?))
}

#[derive(Debug, Deserialize)]
struct ListingParams {
    q: Option<String>,
}

async fn handle_listing(
    State(backends): State<Backends>,
    Query(params): Query<ListingParams>,
) -> Result<Json<Listing>, AppError> {
    Ok(Json(backends.listing(params.q.as_deref()).await?))
}
