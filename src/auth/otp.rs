//! One-time codes for phone-number login and registration.
//!
//! Codes are stored in memory and expire after a fixed window. A code is
//! consumed on successful verification and on expiry, but a wrong guess
//! leaves it in place and counts against the phone number; too many wrong
//! guesses block the number for a cooldown period.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// What the code was issued for. A login code cannot complete a
/// registration and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Login,
    Register,
}

/// A pending code for one phone number.
#[derive(Debug, Clone)]
struct OtpData {
    code: String,
    purpose: OtpPurpose,
    expires_at: Instant,
}

/// Wrong-guess tracking for one phone number.
#[derive(Debug, Clone)]
struct AttemptData {
    failures: u32,
    blocked_until: Option<Instant>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum OtpError {
    /// Too many wrong guesses; try again after the given duration.
    Blocked { retry_after: Duration },
    /// No code is pending for this phone number.
    NotFound,
    /// The code existed but its window has passed (the code is consumed).
    Expired,
    /// The submitted code does not match.
    Mismatch,
    /// The code exists but was issued for the other flow.
    WrongPurpose,
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpError::Blocked { retry_after } => {
                write!(f, "too many attempts, retry in {}s", retry_after.as_secs())
            }
            OtpError::NotFound => write!(f, "no verification code pending"),
            OtpError::Expired => write!(f, "verification code expired"),
            OtpError::Mismatch => write!(f, "verification code does not match"),
            OtpError::WrongPurpose => write!(f, "verification code issued for a different flow"),
        }
    }
}

impl std::error::Error for OtpError {}

/// In-memory one-time-code store with expiry and attempt limiting.
///
/// Thread-safe via internal RwLocks.
#[derive(Debug)]
pub struct OtpStore {
    codes: RwLock<HashMap<String, OtpData>>,
    attempts: RwLock<HashMap<String, AttemptData>>,
    expiry: Duration,
    max_failures: u32,
    block_duration: Duration,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::with_limits(Duration::from_secs(3 * 60), 5, Duration::from_secs(15 * 60))
    }

    pub fn with_limits(expiry: Duration, max_failures: u32, block_duration: Duration) -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
            expiry,
            max_failures,
            block_duration,
        }
    }

    /// Issues a fresh 6-digit code for the phone number, replacing any
    /// pending one. Fails only while the number is blocked.
    pub fn issue(&self, phone: &str, purpose: OtpPurpose) -> Result<String, OtpError> {
        self.check_blocked(phone)?;

        let code = generate_code();
        let data = OtpData {
            code: code.clone(),
            purpose,
            expires_at: Instant::now() + self.expiry,
        };

        let mut codes = self.codes.write().unwrap();
        codes.insert(phone.to_string(), data);

        Ok(code)
    }

    /// Checks a submitted code. Success consumes the code and clears the
    /// number's failure count. Expiry also consumes the code; a mismatch
    /// or wrong purpose leaves it pending but counts as a failure.
    pub fn verify(&self, phone: &str, code: &str, purpose: OtpPurpose) -> Result<(), OtpError> {
        self.check_blocked(phone)?;

        let mut codes = self.codes.write().unwrap();
        let data = match codes.get(phone) {
            Some(data) => data.clone(),
            None => return Err(OtpError::NotFound),
        };

        if Instant::now() > data.expires_at {
            codes.remove(phone);
            return Err(OtpError::Expired);
        }

        if data.code != code {
            drop(codes);
            self.record_failure(phone);
            return Err(OtpError::Mismatch);
        }

        if data.purpose != purpose {
            drop(codes);
            self.record_failure(phone);
            return Err(OtpError::WrongPurpose);
        }

        codes.remove(phone);
        self.attempts.write().unwrap().remove(phone);
        Ok(())
    }

    fn check_blocked(&self, phone: &str) -> Result<(), OtpError> {
        let attempts = self.attempts.read().unwrap();
        if let Some(data) = attempts.get(phone) {
            if let Some(until) = data.blocked_until {
                let now = Instant::now();
                if now < until {
                    return Err(OtpError::Blocked {
                        retry_after: until - now,
                    });
                }
            }
        }
        Ok(())
    }

    fn record_failure(&self, phone: &str) {
        let mut attempts = self.attempts.write().unwrap();
        let data = attempts.entry(phone.to_string()).or_insert(AttemptData {
            failures: 0,
            blocked_until: None,
        });

        // A lapsed block starts a fresh count
        if let Some(until) = data.blocked_until {
            if Instant::now() >= until {
                data.failures = 0;
                data.blocked_until = None;
            }
        }

        data.failures += 1;
        if data.failures >= self.max_failures {
            data.blocked_until = Some(Instant::now() + self.block_duration);
            tracing::warn!(phone = %phone, failures = data.failures, "phone number blocked");
        }
    }

    /// Removes expired codes and lapsed blocks.
    ///
    /// Returns the number of codes removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();

        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, data| data.expires_at > now);
        let removed = before - codes.len();
        drop(codes);

        let mut attempts = self.attempts.write().unwrap();
        attempts.retain(|_, data| match data.blocked_until {
            Some(until) => until > now,
            None => data.failures > 0,
        });

        removed
    }

    #[cfg(test)]
    fn pending_code(&self, phone: &str) -> Option<String> {
        self.codes.read().unwrap().get(phone).map(|d| d.code.clone())
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a 6-digit numeric code, zero-padded.
fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_issue_and_verify() {
        let store = OtpStore::new();

        let code = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        store
            .verify("+15550001111", &code, OtpPurpose::Login)
            .unwrap();
    }

    #[test]
    fn test_code_is_single_use() {
        let store = OtpStore::new();

        let code = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        store
            .verify("+15550001111", &code, OtpPurpose::Login)
            .unwrap();

        let result = store.verify("+15550001111", &code, OtpPurpose::Login);
        assert_eq!(result, Err(OtpError::NotFound));
    }

    #[test]
    fn test_reissue_replaces_pending_code() {
        let store = OtpStore::new();

        let first = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        let second = store.issue("+15550001111", OtpPurpose::Login).unwrap();

        assert_eq!(store.pending_code("+15550001111"), Some(second.clone()));
        if first != second {
            assert_eq!(
                store.verify("+15550001111", &first, OtpPurpose::Login),
                Err(OtpError::Mismatch)
            );
        }
        store
            .verify("+15550001111", &second, OtpPurpose::Login)
            .unwrap();
    }

    #[test]
    fn test_expired_code_is_consumed() {
        let store =
            OtpStore::with_limits(Duration::from_secs(0), 5, Duration::from_secs(15 * 60));

        let code = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        thread::sleep(Duration::from_millis(10));

        assert_eq!(
            store.verify("+15550001111", &code, OtpPurpose::Login),
            Err(OtpError::Expired)
        );
        // Consumed: a retry sees no pending code
        assert_eq!(
            store.verify("+15550001111", &code, OtpPurpose::Login),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_wrong_purpose_rejected() {
        let store = OtpStore::new();

        let code = store.issue("+15550001111", OtpPurpose::Register).unwrap();
        assert_eq!(
            store.verify("+15550001111", &code, OtpPurpose::Login),
            Err(OtpError::WrongPurpose)
        );
        // Code survives the wrong-purpose attempt
        store
            .verify("+15550001111", &code, OtpPurpose::Register)
            .unwrap();
    }

    #[test]
    fn test_too_many_failures_blocks() {
        let store = OtpStore::with_limits(
            Duration::from_secs(3 * 60),
            3,
            Duration::from_secs(15 * 60),
        );

        let code = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        for _ in 0..3 {
            let _ = store.verify("+15550001111", "000000x", OtpPurpose::Login);
        }

        // Blocked even with the right code
        match store.verify("+15550001111", &code, OtpPurpose::Login) {
            Err(OtpError::Blocked { retry_after }) => {
                assert!(retry_after <= Duration::from_secs(15 * 60));
            }
            other => panic!("expected block, got {other:?}"),
        }

        // Issuing is blocked too
        assert!(matches!(
            store.issue("+15550001111", OtpPurpose::Login),
            Err(OtpError::Blocked { .. })
        ));
    }

    #[test]
    fn test_block_scoped_to_phone_number() {
        let store = OtpStore::with_limits(
            Duration::from_secs(3 * 60),
            1,
            Duration::from_secs(15 * 60),
        );

        store.issue("+15550001111", OtpPurpose::Login).unwrap();
        let _ = store.verify("+15550001111", "wrong!", OtpPurpose::Login);

        // Other numbers are unaffected
        let code = store.issue("+15550002222", OtpPurpose::Login).unwrap();
        store
            .verify("+15550002222", &code, OtpPurpose::Login)
            .unwrap();
    }

    #[test]
    fn test_success_clears_failure_count() {
        let store = OtpStore::with_limits(
            Duration::from_secs(3 * 60),
            2,
            Duration::from_secs(15 * 60),
        );

        let code = store.issue("+15550001111", OtpPurpose::Login).unwrap();
        let _ = store.verify("+15550001111", "wrong!", OtpPurpose::Login);
        store
            .verify("+15550001111", &code, OtpPurpose::Login)
            .unwrap();

        // One more failure on a fresh code should not block
        store.issue("+15550001111", OtpPurpose::Login).unwrap();
        assert_eq!(
            store.verify("+15550001111", "wrong!", OtpPurpose::Login),
            Err(OtpError::Mismatch)
        );
    }

    #[test]
    fn test_cleanup_expired() {
        let store =
            OtpStore::with_limits(Duration::from_secs(0), 5, Duration::from_secs(15 * 60));

        store.issue("+15550001111", OtpPurpose::Login).unwrap();
        store.issue("+15550002222", OtpPurpose::Login).unwrap();
        thread::sleep(Duration::from_millis(10));

        assert_eq!(store.cleanup_expired(), 2);
    }
}
