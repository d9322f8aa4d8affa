use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::principal::Principal;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

fn gen_token() -> String {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Server-held session state: opaque token -> principal, with TTL expiry.
/// All entries are owned by the instance, so concurrent requests share one
/// manager through cheap clones and nothing leaks across processes or tests.
#[derive(Clone)]
pub struct SessionManager {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(60 * 60))
    }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn issue(&self, principal: Principal) -> Session {
        let now = Instant::now();
        let sess = Session {
            token: gen_token(),
            principal,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.write().insert(sess.token.clone(), sess.clone());
        debug!("session issued for {} ttl_secs={}", sess.principal, self.ttl.as_secs());
        sess
    }

    /// Resolve a token to its principal. Expired entries are dropped here;
    /// the credential verifier is never consulted again.
    pub fn lookup(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        let mut drop_key = false;
        let out = {
            let map = self.sessions.read();
            match map.get(token) {
                Some(sess) if sess.expires_at > now => Some(sess.principal.clone()),
                Some(_) => { drop_key = true; None }
                None => None,
            }
        };
        if drop_key {
            self.sessions.write().remove(token);
        }
        out
    }

    pub fn destroy(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }
}
