//! Bearer-token sessions
//!
//! Tokens are 16 random bytes in hex. Sessions live in memory only, so a
//! server restart signs everyone out.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::Identity;
use crate::utils::lock_mutex_recover;

/// How often expired sessions are swept
const PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(600);

/// Default session lifetime (30 days)
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    max_age: Duration,
}

impl SessionRegistry {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Open a session for an identity
    pub fn create(&self, identity: Identity) -> Session {
        let now = Utc::now();
        let session = Session {
            token: generate_session_token(),
            identity,
            created_at: now,
            expires_at: now + self.max_age,
        };
        lock_mutex_recover(&self.sessions).insert(session.token.clone(), session.clone());
        log::debug!("Opened session for user {}", session.identity.user_id);
        session
    }

    /// The session behind a token, if it exists and has not expired
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let mut sessions = lock_mutex_recover(&self.sessions);
        let session = sessions.get(token)?;
        if session.is_expired(Utc::now()) {
            log::debug!("Session for user {} expired", session.identity.user_id);
            sessions.remove(token);
            return None;
        }
        Some(session.clone())
    }

    pub fn revoke(&self, token: &str) -> bool {
        lock_mutex_recover(&self.sessions).remove(token).is_some()
    }

    /// Drop every expired session
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = lock_mutex_recover(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    /// Sweep expired sessions in the background
    pub fn start_purge_task(registry: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = registry.purge_expired();
                if purged > 0 {
                    log::info!("Purged {} expired sessions", purged);
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_MAX_AGE_SECS))
    }
}

/// Generate a secure random session token
pub fn generate_session_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(&bytes)
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: &[u8]) -> String {
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: "u1".into(),
            email: "dana@example.com".into(),
            name: None,
        }
    }

    #[test]
    fn test_generate_session_token() {
        let token = generate_session_token();
        assert_eq!(token.len(), 32); // 16 bytes = 32 hex chars
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex::encode(&[0x00, 0xff, 0xab]), "00ffab");
    }

    #[test]
    fn test_resolve_and_revoke() {
        let registry = SessionRegistry::default();
        let session = registry.create(identity());
        assert_eq!(
            registry.resolve(&session.token).unwrap().identity.user_id,
            "u1"
        );
        assert!(registry.resolve("unknown").is_none());

        assert!(registry.revoke(&session.token));
        assert!(registry.resolve(&session.token).is_none());
        assert!(!registry.revoke(&session.token));
    }

    #[test]
    fn test_expired_sessions_resolve_to_nothing() {
        let registry = SessionRegistry::new(Duration::seconds(0));
        let session = registry.create(identity());
        assert!(registry.resolve(&session.token).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let registry = SessionRegistry::new(Duration::seconds(-1));
        registry.create(identity());
        registry.create(identity());
        assert_eq!(registry.purge_expired(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_max_age_is_thirty_days() {
        assert_eq!(SessionRegistry::default().max_age(), Duration::days(30));
    }
}
