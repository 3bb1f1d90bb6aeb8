//! Money-source CRUD endpoints, owner scoped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::db::SourceRepository;
use crate::models::{Source, SourceFields};
use crate::server::{ApiError, ApiResult, AppState, AuthUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/", post(create))
        .route("/{id}", get(get_one))
        .route("/{id}", put(update))
        .route("/{id}", delete(remove))
}

async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Source>>> {
    let repo = SourceRepository::new(state.pool.clone());
    Ok(Json(repo.list(user.user_id).await?))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Source>> {
    let repo = SourceRepository::new(state.pool.clone());
    let source = repo
        .get_by_id(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source not found: {id}")))?;
    Ok(Json(source))
}

async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(fields): Json<SourceFields>,
) -> ApiResult<(StatusCode, Json<Source>)> {
    let repo = SourceRepository::new(state.pool.clone());
    let source = repo.create(user.user_id, Uuid::new_v4(), &fields).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(fields): Json<SourceFields>,
) -> ApiResult<Json<Source>> {
    let repo = SourceRepository::new(state.pool.clone());
    match repo.update(user.user_id, id, &fields).await {
        Ok(source) => Ok(Json(source)),
        Err(sqlx::Error::RowNotFound) => Err(ApiError::NotFound(format!("source not found: {id}"))),
        Err(e) => Err(e.into()),
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = SourceRepository::new(state.pool.clone());
    if repo.get_by_id(user.user_id, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("source not found: {id}")));
    }
    repo.delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
