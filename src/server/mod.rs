//! HTTP server: bearer-token middleware and the route tree.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Authenticated user info, added to request extensions after auth.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Authentication middleware
async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(_) => {
            return ApiError::Unauthorized("Authorization header must use Bearer scheme")
                .into_response();
        }
        None => {
            return ApiError::Unauthorized("Authorization header required").into_response();
        }
    };

    match state.sessions.authenticate(token) {
        Some(user_id) => {
            request.extensions_mut().insert(AuthUser { user_id });
            next.run(request).await
        }
        None => ApiError::Unauthorized("invalid or expired token").into_response(),
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .merge(routes::health::router())
        .nest("/auth", routes::auth::router());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", axum::routing::post(routes::auth::logout))
        .nest("/categories", routes::categories::router())
        .nest("/sources", routes::sources::router())
        .nest("/transactions", routes::transactions::router())
        .nest("/budgets", routes::budgets::router())
        .merge(routes::sync::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
