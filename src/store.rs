use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory store mapping record keys to computed password digests.
///
/// `submit` allocates the next key immediately and schedules the digest
/// computation on a background task after a fixed delay; until that task
/// finishes, the key looks identical to one that was never submitted.
#[derive(Clone)]
pub struct HashStore {
    digests: Arc<RwLock<HashMap<u64, String>>>,
    next_key: Arc<AtomicU64>,
    pending: Arc<AtomicU64>,
    delay: Duration,
}

impl HashStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            digests: Arc::new(RwLock::new(HashMap::new())),
            next_key: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(AtomicU64::new(0)),
            delay,
        }
    }

    /// Allocate a key for `password` and schedule its digest computation.
    ///
    /// Returns without waiting for the delay. Keys start at 1 and are
    /// assigned densely in submission order.
    pub fn submit(&self, password: &str) -> u64 {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.fetch_add(1, Ordering::SeqCst);

        let password = password.to_string();
        let digests = self.digests.clone();
        let pending = self.pending.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let started = std::time::Instant::now();
            let digest = encode_digest(&password);
            crate::metrics::track_digest_computed(started.elapsed());

            // The lock covers only the insert, not the hash computation.
            digests.write().await.insert(key, digest);
            pending.fetch_sub(1, Ordering::SeqCst);
            debug!("Digest for key {} is available", key);
        });

        key
    }

    /// Look up the digest for `key`. Returns `None` both for keys that
    /// were never submitted and for keys whose computation has not yet
    /// completed; callers poll until the digest appears.
    pub async fn fetch(&self, key: u64) -> Option<String> {
        self.digests.read().await.get(&key).cloned()
    }

    /// Number of digest computations still in flight.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }
}

/// SHA-512 digest of the password bytes, base64-encoded with the standard
/// padded alphabet.
pub fn encode_digest(password: &str) -> String {
    STANDARD.encode(Sha512::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANGRY_MONKEY_DIGEST: &str =
        "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q==";

    #[test]
    fn test_encode_digest_known_vector() {
        assert_eq!(encode_digest("angryMonkey"), ANGRY_MONKEY_DIGEST);
    }

    #[test]
    fn test_encode_digest_empty_input() {
        // SHA-512 of the empty byte sequence; the store must not crash on
        // empty input even though the boundary rejects it.
        assert_eq!(
            encode_digest(""),
            "z4PhNX7vuL3xVChQ1m2AB9Yg5AULVxXcg/SpIdNs6c5H0NE8XYXysP+DGNKHfuwvY7kxvUdBeoGlODJ6+SfaPg=="
        );
    }

    #[tokio::test]
    async fn test_keys_are_sequential_from_one() {
        let store = HashStore::new(Duration::from_millis(10));
        assert_eq!(store.submit("a"), 1);
        assert_eq!(store.submit("b"), 2);
        assert_eq!(store.submit("c"), 3);
    }

    #[tokio::test]
    async fn test_fetch_unknown_key() {
        let store = HashStore::new(Duration::from_millis(10));
        assert_eq!(store.fetch(42).await, None);
    }

    #[tokio::test]
    async fn test_digest_available_after_delay() {
        let store = HashStore::new(Duration::from_millis(100));
        let key = store.submit("angryMonkey");

        // Not computed yet: indistinguishable from an unknown key.
        assert_eq!(store.fetch(key).await, None);
        assert_eq!(store.pending(), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(store.fetch(key).await, Some(ANGRY_MONKEY_DIGEST.to_string()));
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_submits_yield_dense_keys() {
        let store = HashStore::new(Duration::from_millis(10));

        let mut handles = Vec::new();
        for i in 0..64u64 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.submit(&format!("pw-{}", i)) },
            ));
        }

        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap());
        }
        keys.sort_unstable();

        let expected: Vec<u64> = (1..=64).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_completion_order_is_independent_of_submission_order() {
        let store = HashStore::new(Duration::from_millis(50));
        let first = store.submit("first");
        let second = store.submit("second");

        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(store.fetch(first).await, Some(encode_digest("first")));
        assert_eq!(store.fetch(second).await, Some(encode_digest("second")));
    }
}
