use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::ResourceHandler;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResult {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResult {
    pub success: bool,
}

/// Routes for one resource kind, mounted at /v1/{kind}
pub fn resource_routes(handler: ResourceHandler) -> Router {
    let kind = handler.schema().kind;

    Router::new()
        .route(&format!("/v1/{}", kind), get(list).post(create))
        .route(
            &format!("/v1/{}/:id", kind),
            get(show).patch(update).delete(remove),
        )
        .with_state(handler)
}

/// GET /v1/{kind} - list the caller's resources
async fn list(
    State(handler): State<ResourceHandler>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(handler.list(&user.subject).await?))
}

/// GET /v1/{kind}/:id - one resource
async fn show(
    State(handler): State<ResourceHandler>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(handler.get(&user.subject, &id).await?))
}

/// POST /v1/{kind} - create and return the new id
async fn create(
    State(handler): State<ResourceHandler>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateResult>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;
    let id = handler.create(&user.subject, &body).await?;
    Ok(Json(CreateResult { id: id.to_string() }))
}

/// PATCH /v1/{kind}/:id - partial update
async fn update(
    State(handler): State<ResourceHandler>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessResult>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;
    handler.update(&user.subject, &id, &body).await?;
    Ok(Json(SuccessResult { success: true }))
}

/// DELETE /v1/{kind}/:id
async fn remove(
    State(handler): State<ResourceHandler>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResult>, ApiError> {
    handler.delete(&user.subject, &id).await?;
    Ok(Json(SuccessResult { success: true }))
}
