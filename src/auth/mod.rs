//! Phone-number authentication: one-time codes plus bearer sessions.

mod otp;
mod sessions;

pub use otp::{OtpError, OtpPurpose, OtpStore};
pub use sessions::SessionStore;
