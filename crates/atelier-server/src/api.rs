//! HTTP API for the Atelier node.

use std::path::Path;
use std::sync::Arc;

use atelier_core::{Error, ImageId, IterationCounter, VoteLedger};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Shared state for request handlers.
#[derive(Debug)]
pub struct AppState {
    /// The live iteration counter, advanced by the cycle driver.
    pub counter: Arc<IterationCounter>,
    /// Votes for the current iteration.
    pub ledger: Arc<VoteLedger>,
}

/// Build the API router.
///
/// Image files are served straight off the published directory; everything
/// is CORS-open because the voting frontend lives on another origin.
pub fn build_router(state: Arc<AppState>, images_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/iteration", get(get_iteration))
        .route("/vote", post(submit_vote))
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Wire shape of `GET /iteration`. The number is string-typed for the
/// benefit of the frontend.
#[derive(Debug, Serialize)]
struct IterationMessage {
    iteration: String,
}

async fn get_iteration(State(state): State<Arc<AppState>>) -> Json<IterationMessage> {
    Json(IterationMessage {
        iteration: state.counter.get().to_string(),
    })
}

/// Wire shape of `POST /vote`.
///
/// `iteration` is what the client believes the current iteration is. It is
/// accepted without validation - see `submit_vote`.
#[derive(Debug, Deserialize)]
struct VoteMessage {
    user_address: String,
    iteration: i64,
    images: Vec<ImageId>,
}

/// Accept one user's vote for the named images.
///
/// The body is read raw and parsed explicitly so a malformed payload gets a
/// 400 with our own message and the ledger stays untouched.
async fn submit_vote(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let vote: VoteMessage = serde_json::from_str(&body).map_err(|e| {
        let err = Error::MalformedRequest(e.to_string());
        tracing::warn!(content = %body, "{err}");
        (StatusCode::BAD_REQUEST, err.to_string())
    })?;

    // The claimed iteration is not validated against the live counter; a
    // stale or future claim is still recorded. Kept observable in the logs.
    let current = state.counter.get();
    if vote.iteration != current as i64 {
        tracing::debug!(
            claimed = vote.iteration,
            current,
            user = %vote.user_address,
            "vote claims a different iteration"
        );
    }

    state
        .ledger
        .record_votes(&vote.user_address, &vote.images)
        .map_err(|e| {
            tracing::warn!("{e}");
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    Ok(StatusCode::OK)
}
