use crate::{error::AppError, server::Server};
use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    password: String,
}

/// Create the password submission and digest lookup routes
pub fn create_hash_routes() -> Router<Server> {
    Router::new()
        .route("/", post(submit_password))
        .route("/:key", get(fetch_digest))
}

/// `POST /hash` — allocate a key for the password and schedule its digest.
///
/// Responds as soon as the key is allocated; the digest becomes fetchable
/// after the configured delay.
async fn submit_password(
    State(server): State<Server>,
    Form(form): Form<SubmitForm>,
) -> Result<impl IntoResponse, AppError> {
    if form.password.is_empty() {
        return Err(AppError::Validation("missing password".to_string()));
    }

    let key = server.store.submit(&form.password);
    debug!("Accepted password, assigned key {}", key);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/hash/{}", key))],
        Json(json!({ "key": key })),
    ))
}

/// `GET /hash/{key}` — 404 until the deferred computation lands.
async fn fetch_digest(
    State(server): State<Server>,
    Path(key): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    match server.store.fetch(key).await {
        Some(hash) => Ok(Json(json!({ "hash": hash }))),
        None => Err(AppError::NotFound(format!("no digest for key {}", key))),
    }
}
