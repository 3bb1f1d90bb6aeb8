//! Sync endpoints: status, pull, push.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::{ApiError, ApiResult, AppState, AuthUser};
use crate::sync::{ChangeSet, PushError, SyncError, SyncResults, SyncService, SyncStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(push))
        .route("/sync/status", get(status))
        .route("/sync/changes", get(changes))
}

async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SyncStatus>> {
    let service = SyncService::new(state.pool.clone());
    Ok(Json(service.status(user.user_id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangesQuery {
    last_sync: DateTime<Utc>,
}

async fn changes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ChangesQuery>,
) -> ApiResult<Json<ChangeSet>> {
    let service = SyncService::new(state.pool.clone());
    Ok(Json(service.changes(user.user_id, query.last_sync).await?))
}

/// Identifies the record a failed push stopped at.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailedRecord {
    entity_type: String,
    id: Uuid,
}

/// Push failure body: the batch aborted at `failed`, with everything
/// applied before it counted in `results`. The whole batch can be
/// resubmitted once the offending record is fixed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushFailure {
    success: bool,
    results: SyncResults,
    failed: FailedRecord,
    message: String,
}

async fn push(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(batch): Json<ChangeSet>,
) -> Response {
    let service = SyncService::new(state.pool.clone());

    match service.push(user.user_id, &batch).await {
        Ok(response) => Json(response).into_response(),
        Err(PushError::Reconcile(e)) => {
            let status = match &e.cause {
                SyncError::Validation { .. } => StatusCode::BAD_REQUEST,
                SyncError::NotFound | SyncError::Referential(_) => StatusCode::CONFLICT,
                SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = PushFailure {
                success: false,
                results: e.partial,
                failed: FailedRecord {
                    entity_type: e.kind.as_str().to_string(),
                    id: e.id,
                },
                message: e.to_string(),
            };
            (status, Json(body)).into_response()
        }
        Err(PushError::Status(e)) => ApiError::from(e).into_response(),
    }
}
