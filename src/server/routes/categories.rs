//! Category CRUD endpoints, owner scoped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::db::CategoryRepository;
use crate::models::{Category, CategoryFields};
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
) -> ApiResult<Json<Vec<Category>>> {
    let repo = CategoryRepository::new(state.pool.clone());
    Ok(Json(repo.list(user.user_id).await?))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let repo = CategoryRepository::new(state.pool.clone());
    let category = repo
        .get_by_id(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category not found: {id}")))?;
    Ok(Json(category))
}

async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(fields): Json<CategoryFields>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let repo = CategoryRepository::new(state.pool.clone());
    let category = repo.create(user.user_id, Uuid::new_v4(), &fields).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(fields): Json<CategoryFields>,
) -> ApiResult<Json<Category>> {
    let repo = CategoryRepository::new(state.pool.clone());
    match repo.update(user.user_id, id, &fields).await {
        Ok(category) => Ok(Json(category)),
        Err(sqlx::Error::RowNotFound) => {
            Err(ApiError::NotFound(format!("category not found: {id}")))
        }
        Err(e) => Err(e.into()),
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = CategoryRepository::new(state.pool.clone());
    if repo.get_by_id(user.user_id, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("category not found: {id}")));
    }
    repo.delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
