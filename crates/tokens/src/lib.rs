//! HMAC-bound, single-use approval tokens.
//!
//! Token format: `v1.<timestamp>.<nonce>.<signature>` where `timestamp`
//! is unix seconds, `nonce` is 16 hex characters, and `signature` is
//! lowercase-hex HMAC-SHA256 over `"<timestamp>:<nonce>:<payload>"`.
//!
//! Verification and consumption are one atomic operation: a token that
//! verifies is recorded as spent before the caller sees `true`, so a
//! replayed token can never approve twice.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";
const NONCE_LEN: usize = 16;

/// Signs approval tokens and consumes them exactly once.
pub struct TokenManager {
    secret: Vec<u8>,
    /// `"<nonce>:<timestamp>"` → token timestamp, for pruning.
    consumed: Mutex<HashMap<String, i64>>,
}

impl TokenManager {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            consumed: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a token binding `payload` with a fresh timestamp and nonce.
    pub fn sign(&self, payload: &str) -> String {
        self.sign_at(payload, chrono::Utc::now().timestamp())
    }

    fn sign_at(&self, payload: &str, ts: i64) -> String {
        let nonce = fresh_nonce();
        let sig = self.signature(ts, &nonce, payload);
        format!("{TOKEN_VERSION}.{ts}.{nonce}.{sig}")
    }

    /// Verify a token against `payload` and, on success, atomically
    /// record it as spent. Returns `true` iff the version matches, the
    /// timestamp is within `[now - max_age, now]`, the signature matches
    /// (constant-time), and the `(nonce, timestamp)` pair has never been
    /// consumed before. Any failure leaves no side effect.
    pub fn verify_and_consume(&self, token: &str, payload: &str, max_age_secs: i64) -> bool {
        self.verify_and_consume_at(token, payload, max_age_secs, chrono::Utc::now().timestamp())
    }

    fn verify_and_consume_at(
        &self,
        token: &str,
        payload: &str,
        max_age_secs: i64,
        now: i64,
    ) -> bool {
        let Some((ts, nonce, sig)) = parse_token(token) else {
            return false;
        };

        // Freshness window: age 0..=max_age, no future-dated tokens.
        if ts > now || now - ts > max_age_secs {
            return false;
        }

        // Constant-time signature comparison.
        let expected = self.signature(ts, nonce, payload);
        if expected.as_bytes().ct_eq(sig.as_bytes()).unwrap_u8() != 1 {
            return false;
        }

        // Check-and-insert under one lock so two concurrent presentations
        // of the same token cannot both succeed.
        let key = format!("{nonce}:{ts}");
        let mut consumed = self.consumed.lock();
        consumed.retain(|_, t| *t + max_age_secs >= now);
        if consumed.contains_key(&key) {
            return false;
        }
        consumed.insert(key, ts);
        true
    }

    fn signature(&self, ts: i64, nonce: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts any key length");
        mac.update(format!("{ts}:{nonce}:{payload}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Number of unexpired consumed entries (for monitoring).
    pub fn consumed_count(&self) -> usize {
        self.consumed.lock().len()
    }
}

/// 64 bits of entropy as 16 lowercase hex characters.
fn fresh_nonce() -> String {
    let hex32 = uuid::Uuid::new_v4().as_simple().to_string();
    hex32[..NONCE_LEN].to_owned()
}

/// Split a token into `(timestamp, nonce, signature)`; `None` on any
/// structural problem.
fn parse_token(token: &str) -> Option<(i64, &str, &str)> {
    let mut parts = token.split('.');
    let version = parts.next()?;
    let ts_raw = parts.next()?;
    let nonce = parts.next()?;
    let sig = parts.next()?;
    if parts.next().is_some() || version != TOKEN_VERSION {
        return None;
    }
    if nonce.len() != NONCE_LEN
        || !nonce.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    {
        return None;
    }
    if sig.len() != 64 {
        return None;
    }
    let ts: i64 = ts_raw.parse().ok()?;
    Some((ts, nonce, sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "thread-1:user-1:abcdef";

    fn manager() -> TokenManager {
        TokenManager::new("test-secret")
    }

    #[test]
    fn sign_then_consume_succeeds_once() {
        let mgr = manager();
        let token = mgr.sign(PAYLOAD);
        assert!(mgr.verify_and_consume(&token, PAYLOAD, 300));
        // Replay.
        assert!(!mgr.verify_and_consume(&token, PAYLOAD, 300));
    }

    #[test]
    fn token_has_documented_shape() {
        let mgr = manager();
        let token = mgr.sign(PAYLOAD);
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "v1");
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3].len(), 64);
    }

    #[test]
    fn payload_mutation_fails() {
        let mgr = manager();
        let token = mgr.sign(PAYLOAD);
        assert!(!mgr.verify_and_consume(&token, "thread-2:user-1:abcdef", 300));
        // The failed attempt must not have consumed the token.
        assert!(mgr.verify_and_consume(&token, PAYLOAD, 300));
    }

    #[test]
    fn token_mutation_fails() {
        let mgr = manager();
        let token = mgr.sign(PAYLOAD);
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(!mgr.verify_and_consume(&tampered, PAYLOAD, 300));
    }

    #[test]
    fn wrong_secret_fails() {
        let token = manager().sign(PAYLOAD);
        let other = TokenManager::new("other-secret");
        assert!(!other.verify_and_consume(&token, PAYLOAD, 300));
    }

    #[test]
    fn age_boundary_is_inclusive() {
        let mgr = manager();
        let token = mgr.sign_at(PAYLOAD, 1_000);
        // Age exactly 300 s: valid.
        assert!(mgr.verify_and_consume_at(&token, PAYLOAD, 300, 1_300));

        let token = mgr.sign_at(PAYLOAD, 1_000);
        // Age 301 s: expired.
        assert!(!mgr.verify_and_consume_at(&token, PAYLOAD, 300, 1_301));
    }

    #[test]
    fn future_dated_token_fails() {
        let mgr = manager();
        let token = mgr.sign_at(PAYLOAD, 2_000);
        assert!(!mgr.verify_and_consume_at(&token, PAYLOAD, 300, 1_000));
    }

    #[test]
    fn malformed_tokens_fail() {
        let mgr = manager();
        for bad in [
            "",
            "v1.100.abc",
            "v2.100.0123456789abcdef.aa",
            "v1.notanumber.0123456789abcdef.aa",
            "v1.100.UPPERCASEHEX0000.aa",
            "v1.100.0123456789abcdef.aa.extra",
        ] {
            assert!(!mgr.verify_and_consume(bad, PAYLOAD, 300), "accepted: {bad}");
        }
    }

    #[test]
    fn consumed_set_prunes_expired_entries() {
        let mgr = manager();
        let token = mgr.sign_at(PAYLOAD, 1_000);
        assert!(mgr.verify_and_consume_at(&token, PAYLOAD, 300, 1_100));
        assert_eq!(mgr.consumed_count(), 1);

        // A consumption far in the future prunes the stale entry.
        let later = mgr.sign_at(PAYLOAD, 10_000);
        assert!(mgr.verify_and_consume_at(&later, PAYLOAD, 300, 10_100));
        assert_eq!(mgr.consumed_count(), 1);
    }

    #[test]
    fn nonces_are_unique() {
        let mgr = manager();
        let a = mgr.sign(PAYLOAD);
        let b = mgr.sign(PAYLOAD);
        assert_ne!(a, b);
    }
}
