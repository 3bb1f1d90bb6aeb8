//! Phone-number authentication endpoints.
//!
//! The request endpoints never reveal whether a phone number is registered:
//! both always answer 200 with the same message, and the purpose of the
//! issued code is chosen by what the number actually is, not by which
//! endpoint was called. In dev mode the code is returned in the response
//! body instead of being delivered over SMS.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{OtpError, OtpPurpose};
use crate::db::UserRepository;
use crate::models::User;
use crate::server::{ApiError, ApiResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request-registration-otp", post(request_otp))
        .route("/request-login-otp", post(request_otp))
        .route("/register", post(register))
        .route("/verify-login-otp", post(verify_login))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestOtpBody {
    phone_number: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestOtpResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    phone_number: String,
    name: String,
    otp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyLoginBody {
    phone_number: String,
    otp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    access_token: String,
    user: User,
}

/// Issues a code for the phone number. The purpose follows the number's
/// actual state so neither endpoint leaks whether it is registered.
async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpBody>,
) -> ApiResult<Json<RequestOtpResponse>> {
    let users = UserRepository::new(state.pool.clone());
    let purpose = match users.find_by_phone(&body.phone_number).await? {
        Some(_) => OtpPurpose::Login,
        None => OtpPurpose::Register,
    };

    let code = state
        .otp
        .issue(&body.phone_number, purpose)
        .map_err(otp_error)?;

    if state.dev_mode {
        tracing::info!(phone = %body.phone_number, code = %code, "issued verification code");
    }

    Ok(Json(RequestOtpResponse {
        message: "verification code sent",
        otp: state.dev_mode.then_some(code),
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<Json<AuthResponse>> {
    state
        .otp
        .verify(&body.phone_number, &body.otp, OtpPurpose::Register)
        .map_err(otp_error)?;

    // The UNIQUE constraint on phone_number is the only duplicate check; a
    // racing registration loses here with a database error, not after a
    // separate lookup that another request could slip past.
    let users = UserRepository::new(state.pool.clone());
    let user = match users.create(&body.phone_number, &body.name).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(db)) if db.message().contains("UNIQUE constraint failed") => {
            return Err(ApiError::Conflict(
                "phone number already registered".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    let access_token = state.sessions.issue(user.id);
    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(AuthResponse { access_token, user }))
}

async fn verify_login(
    State(state): State<AppState>,
    Json(body): Json<VerifyLoginBody>,
) -> ApiResult<Json<AuthResponse>> {
    state
        .otp
        .verify(&body.phone_number, &body.otp, OtpPurpose::Login)
        .map_err(otp_error)?;

    let users = UserRepository::new(state.pool.clone());
    let user = users
        .find_by_phone(&body.phone_number)
        .await?
        .ok_or_else(|| ApiError::NotFound("no account for this phone number".to_string()))?;

    let access_token = state.sessions.issue(user.id);
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse { access_token, user }))
}

/// Revokes the presented token. Mounted behind the auth middleware, so an
/// invalid token never reaches this handler.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if let Some(token) = token {
        state.sessions.revoke(token);
    }
    StatusCode::NO_CONTENT
}

fn otp_error(e: OtpError) -> ApiError {
    match e {
        OtpError::Blocked { retry_after } => ApiError::RateLimited(format!(
            "too many attempts, retry in {}s",
            retry_after.as_secs()
        )),
        // Everything else is the same answer so a caller cannot probe state
        OtpError::NotFound | OtpError::Expired | OtpError::Mismatch | OtpError::WrongPurpose => {
            ApiError::Unauthorized("invalid or expired verification code")
        }
    }
}
