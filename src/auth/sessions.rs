//! Bearer-token sessions for the HTTP API.
//!
//! Tokens are opaque: 32 random bytes, base64url encoded, handed to the
//! client once. Only a SHA-256 hash is kept server-side, so a leaked
//! store dump cannot be replayed as credentials.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionData {
    user_id: Uuid,
    expires_at: Instant,
}

/// In-memory session store keyed by token hash.
///
/// Thread-safe via internal RwLock.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store whose sessions live for the given number of days.
    pub fn new(ttl_days: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_days * 24 * 60 * 60),
        }
    }

    /// Issues a fresh token for the user and returns it.
    ///
    /// The returned string is the only copy of the token; the store keeps
    /// its hash.
    pub fn issue(&self, user_id: Uuid) -> String {
        let token = generate_token();
        let data = SessionData {
            user_id,
            expires_at: Instant::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(hash_token(&token), data);

        token
    }

    /// Resolves a presented token to its user, if the session is live.
    pub fn authenticate(&self, token: &str) -> Option<Uuid> {
        let sessions = self.sessions.read().unwrap();
        let data = sessions.get(&hash_token(token))?;

        if Instant::now() > data.expires_at {
            return None;
        }

        Some(data.user_id)
    }

    /// Revokes a token (logout). Unknown tokens are a no-op.
    pub fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(&hash_token(token));
    }

    /// Removes all expired sessions.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, data| data.expires_at > now);
        before - sessions.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Generates a secure random token.
///
/// Returns 32 random bytes encoded as base64url (no padding).
fn generate_token() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_issue_returns_unique_tokens() {
        let store = SessionStore::new(30);
        let user = Uuid::new_v4();

        let token1 = store.issue(user);
        let token2 = store.issue(user);

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43); // 32 bytes base64url = 43 chars
    }

    #[test]
    fn test_authenticate_valid_token() {
        let store = SessionStore::new(30);
        let user = Uuid::new_v4();

        let token = store.issue(user);
        assert_eq!(store.authenticate(&token), Some(user));
    }

    #[test]
    fn test_authenticate_unknown_token() {
        let store = SessionStore::new(30);
        assert_eq!(store.authenticate("nonexistent-token"), None);
    }

    #[test]
    fn test_store_holds_hash_not_token() {
        let store = SessionStore::new(30);
        let token = store.issue(Uuid::new_v4());

        let sessions = store.sessions.read().unwrap();
        assert!(!sessions.contains_key(&token));
        assert!(sessions.contains_key(&hash_token(&token)));
    }

    #[test]
    fn test_revoke() {
        let store = SessionStore::new(30);
        let user = Uuid::new_v4();

        let token = store.issue(user);
        store.revoke(&token);
        assert_eq!(store.authenticate(&token), None);
    }

    #[test]
    fn test_expired_session_rejected() {
        let store = SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(0),
        };

        let token = store.issue(Uuid::new_v4());
        thread::sleep(Duration::from_millis(10));
        assert_eq!(store.authenticate(&token), None);
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(0),
        };
        store.issue(Uuid::new_v4());
        store.issue(Uuid::new_v4());
        thread::sleep(Duration::from_millis(10));

        assert_eq!(store.len(), 2);
        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.len(), 0);
    }
}
