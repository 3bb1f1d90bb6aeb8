//! Shared application state for the HTTP server.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{OtpStore, SessionStore};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub otp: Arc<OtpStore>,
    pub sessions: Arc<SessionStore>,
    /// When set, OTP request responses include the code instead of sending
    /// it over SMS. Never enable outside local development.
    pub dev_mode: bool,
}

impl AppState {
    pub fn new(pool: SqlitePool, dev_mode: bool) -> Self {
        Self {
            pool,
            otp: Arc::new(OtpStore::new()),
            sessions: Arc::new(SessionStore::default()),
            dev_mode,
        }
    }
}
