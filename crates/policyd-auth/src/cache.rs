// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time- and size-bounded memo of recently verified credentials.
//!
//! One instance is shared by every verification strategy. Entries are keyed
//! by a SHA-256 digest of the scheme and raw credential so plaintext secrets
//! are never retained.
//!
//! - Entries older than the TTL are treated as absent and removed on lookup.
//! - When an insert takes the cache past its capacity the oldest-inserted
//!   entry is evicted (FIFO). Lookups do not refresh an entry's position.
//! - An entry whose identity carries an [`EXPIRY_EXTENSION`] timestamp is
//!   also treated as absent once that timestamp has passed, so a cached
//!   bearer token never outlives the token itself.
//! - Entries are never updated in place: inserting a key that is already
//!   live keeps the existing entry.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;

use policyd_core::{Credential, Identity};

/// Identity extension holding a hard expiry as seconds since the Unix epoch.
pub const EXPIRY_EXTENSION: &str = "exp";

struct CacheEntry {
    identity: Identity,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl CacheState {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// Shared verification cache.
pub struct VerificationCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl VerificationCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_live(&self, entry: &CacheEntry, now: Instant, unix_now: i64) -> bool {
        if now.duration_since(entry.inserted_at) >= self.ttl {
            return false;
        }
        match entry
            .identity
            .extension(EXPIRY_EXTENSION)
            .and_then(|exp| exp.parse::<i64>().ok())
        {
            Some(exp) => exp >= unix_now,
            None => true,
        }
    }

    /// Return the cached identity for `key`, if present and not expired.
    pub async fn lookup(&self, key: &str) -> Option<Identity> {
        let now = Instant::now();
        let unix_now = chrono::Utc::now().timestamp();
        let mut state = self.state.lock().await;

        let live = state.entries.get(key).map(|e| self.is_live(e, now, unix_now))?;
        if live {
            state.entries.get(key).map(|e| e.identity.clone())
        } else {
            state.remove(key);
            None
        }
    }

    /// Cache `identity` under `key`, evicting the oldest entries past capacity.
    pub async fn insert(&self, key: String, identity: Identity) {
        let now = Instant::now();
        let unix_now = chrono::Utc::now().timestamp();
        let mut state = self.state.lock().await;

        if let Some(existing) = state.entries.get(&key) {
            if self.is_live(existing, now, unix_now) {
                return;
            }
            state.remove(&key);
        }

        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                identity,
                inserted_at: now,
            },
        );

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let unix_now = chrono::Utc::now().timestamp();
        let mut state = self.state.lock().await;

        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| self.is_live(entry, now, unix_now));
        let CacheState { entries, order } = &mut *state;
        order.retain(|k| entries.contains_key(k));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for VerificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Derive the cache key for a credential: hex SHA-256 over the scheme tag
/// and the length-prefixed raw credential material.
pub fn cache_key(credential: &Credential) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.scheme().to_string().as_bytes());
    match credential {
        Credential::UsernamePassword { username, password } => {
            hasher.update((username.len() as u64).to_be_bytes());
            hasher.update(username.as_bytes());
            hasher.update(password.expose_secret().as_bytes());
        }
        Credential::BearerToken(token) => {
            hasher.update(token.expose_secret().as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn identity(subject: &str) -> Identity {
        Identity::new(subject)
    }

    #[tokio::test]
    async fn lookup_returns_inserted_identity() {
        let cache = VerificationCache::new(Duration::from_secs(600), 8);
        cache.insert("k".into(), identity("operator")).await;
        assert_eq!(cache.lookup("k").await, Some(identity("operator")));
        assert_eq!(cache.lookup("missing").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = VerificationCache::new(Duration::from_secs(600), 8);
        cache.insert("k".into(), identity("operator")).await;

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.lookup("k").await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.lookup("k").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn oldest_entry_is_evicted_first() {
        let cache = VerificationCache::new(Duration::from_secs(600), 2);
        cache.insert("a".into(), identity("a")).await;
        cache.insert("b".into(), identity("b")).await;
        // Lookups do not change eviction order.
        assert!(cache.lookup("a").await.is_some());
        cache.insert("c".into(), identity("c")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.lookup("a").await.is_none());
        assert!(cache.lookup("b").await.is_some());
        assert!(cache.lookup("c").await.is_some());
    }

    #[tokio::test]
    async fn reinsert_keeps_existing_entry() {
        let cache = VerificationCache::new(Duration::from_secs(600), 2);
        cache.insert("a".into(), identity("first")).await;
        cache.insert("a".into(), identity("second")).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.lookup("a").await, Some(identity("first")));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_key_can_be_reinserted_without_stale_order() {
        let cache = VerificationCache::new(Duration::from_secs(10), 2);
        cache.insert("a".into(), identity("old")).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert("a".into(), identity("new")).await;
        cache.insert("b".into(), identity("b")).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.lookup("a").await, Some(identity("new")));
    }

    #[tokio::test]
    async fn identity_past_its_expiry_is_absent() {
        let cache = VerificationCache::new(Duration::from_secs(600), 8);
        let past = (chrono::Utc::now().timestamp() - 5).to_string();
        let future = (chrono::Utc::now().timestamp() + 300).to_string();
        cache
            .insert(
                "expired".into(),
                identity("op").with_extension(EXPIRY_EXTENSION, past),
            )
            .await;
        cache
            .insert(
                "valid".into(),
                identity("op").with_extension(EXPIRY_EXTENSION, future),
            )
            .await;

        assert!(cache.lookup("expired").await.is_none());
        assert!(cache.lookup("valid").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired_entries() {
        let cache = VerificationCache::new(Duration::from_secs(10), 8);
        cache.insert("old".into(), identity("old")).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.insert("young".into(), identity("young")).await;
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.lookup("young").await.is_some());
    }

    #[test]
    fn cache_key_separates_schemes_and_hides_material() {
        let basic = Credential::UsernamePassword {
            username: "op".into(),
            password: SecretString::from("secret".to_string()),
        };
        let bearer = Credential::BearerToken(SecretString::from("opsecret".to_string()));

        let basic_key = cache_key(&basic);
        assert_eq!(basic_key.len(), 64);
        assert!(!basic_key.contains("secret"));
        assert_ne!(basic_key, cache_key(&bearer));
        assert_eq!(basic_key, cache_key(&basic));
    }

    #[test]
    fn cache_key_is_unambiguous_across_username_boundary() {
        let a = Credential::UsernamePassword {
            username: "ab".into(),
            password: SecretString::from("c".to_string()),
        };
        let b = Credential::UsernamePassword {
            username: "a".into(),
            password: SecretString::from("bc".to_string()),
        };
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(VerificationCache::new(Duration::from_secs(1), 0).capacity(), 1);
    }
}
