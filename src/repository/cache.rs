use hugye_proto::packet::question::QueryType;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    /// Lifetime of an entry in milliseconds, extended on every hit
    #[serde(default = "Config::default_ttl")]
    ttl: u64,
    /// Number of entries kept before the closest to expiry gets evicted
    #[serde(default = "Config::default_size")]
    size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Self::default_ttl(),
            size: Self::default_size(),
        }
    }
}

impl Config {
    pub fn default_ttl() -> u64 {
        60_000
    }

    pub fn default_size() -> usize {
        10_000
    }
}

impl Config {
    pub fn build(self) -> MemoryCacheService {
        MemoryCacheService::new(Duration::from_millis(self.ttl), self.size)
    }
}

#[async_trait::async_trait]
pub trait CacheService: Send + Sync {
    /// Look up a stored response. A hit slides the entry's expiry forward.
    async fn request(&self, qname: &str, qtype: QueryType) -> Option<Vec<u8>>;
    /// Store or refresh the response for a question.
    async fn persist(&self, qname: &str, qtype: QueryType, response: &[u8]);
}

#[derive(Debug)]
struct CacheEntry {
    response: Vec<u8>,
    expires_at: Instant,
}

/// Response cache keyed by `(qname, qtype)`. Expired entries are removed
/// lazily when their key is read again; when the map is full the entry
/// closest to expiry makes room.
///
/// DNS record TTLs inside the answers are not interpreted, the configured
/// lifetime applies to every entry.
pub struct MemoryCacheService {
    ttl: Duration,
    size: usize,
    entries: Mutex<HashMap<(String, QueryType), CacheEntry>>,
}

impl MemoryCacheService {
    fn new(ttl: Duration, size: usize) -> Self {
        Self {
            ttl,
            size,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl CacheService for MemoryCacheService {
    async fn request(&self, qname: &str, qtype: QueryType) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap();
        let key = (qname.to_string(), qtype);
        let now = Instant::now();
        if let Some(entry) = entries.get_mut(&key) {
            if now < entry.expires_at {
                tracing::debug!("cache hit for {qtype} {qname}");
                entry.expires_at = now + self.ttl;
                return Some(entry.response.clone());
            }
            tracing::debug!("cache entry for {qtype} {qname} expired");
            entries.remove(&key);
        }
        None
    }

    async fn persist(&self, qname: &str, qtype: QueryType, response: &[u8]) {
        let mut entries = self.entries.lock().unwrap();
        let key = (qname.to_string(), qtype);
        let expires_at = Instant::now() + self.ttl;
        if let Some(entry) = entries.get_mut(&key) {
            entry.response = response.to_vec();
            entry.expires_at = expires_at;
            return;
        }
        if entries.len() >= self.size {
            let evicted = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = evicted {
                tracing::debug!("evicting {} {} from cache", key.1, key.0);
                entries.remove(&key);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                response: response.to_vec(),
                expires_at,
            },
        );
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockCacheService {
    inner: Mutex<HashMap<(String, QueryType), Vec<u8>>>,
}

#[cfg(test)]
impl MockCacheService {
    pub fn with_response<N: Into<String>>(
        self,
        qname: N,
        qtype: QueryType,
        response: Vec<u8>,
    ) -> Self {
        self.inner
            .lock()
            .unwrap()
            .insert((qname.into(), qtype), response);
        self
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl CacheService for MockCacheService {
    async fn request(&self, qname: &str, qtype: QueryType) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .get(&(qname.to_string(), qtype))
            .cloned()
    }

    async fn persist(&self, qname: &str, qtype: QueryType, response: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .insert((qname.to_string(), qtype), response.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheEntry, CacheService, MemoryCacheService};
    use hugye_proto::packet::question::QueryType;
    use std::time::{Duration, Instant};

    fn service(ttl: Duration, size: usize) -> MemoryCacheService {
        MemoryCacheService::new(ttl, size)
    }

    #[tokio::test]
    async fn should_return_persisted_response() {
        let srv = service(Duration::from_secs(60), 10);
        srv.persist("perdu.com", QueryType::A, &[1, 2, 3]).await;
        let found = srv.request("perdu.com", QueryType::A).await;
        assert_eq!(found, Some(vec![1, 2, 3]));
        // a different type of the same name is a different key
        assert!(srv.request("perdu.com", QueryType::AAAA).await.is_none());
    }

    #[tokio::test]
    async fn should_remove_expired_entry_on_read() {
        let srv = service(Duration::from_secs(60), 10);
        srv.entries.lock().unwrap().insert(
            ("perdu.com".to_string(), QueryType::A),
            CacheEntry {
                response: vec![1],
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(srv.request("perdu.com", QueryType::A).await.is_none());
        // should flush
        assert!(srv.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_slide_expiry_on_hit() {
        let srv = service(Duration::from_secs(60), 10);
        srv.entries.lock().unwrap().insert(
            ("perdu.com".to_string(), QueryType::A),
            CacheEntry {
                response: vec![1],
                expires_at: Instant::now() + Duration::from_secs(1),
            },
        );
        assert!(srv.request("perdu.com", QueryType::A).await.is_some());
        let entries = srv.entries.lock().unwrap();
        let entry = entries
            .get(&("perdu.com".to_string(), QueryType::A))
            .unwrap();
        assert!(entry.expires_at > Instant::now() + Duration::from_secs(30));
    }

    #[tokio::test]
    async fn should_replace_existing_entry() {
        let srv = service(Duration::from_secs(60), 10);
        srv.persist("perdu.com", QueryType::A, &[1]).await;
        srv.persist("perdu.com", QueryType::A, &[2]).await;
        assert_eq!(
            srv.request("perdu.com", QueryType::A).await,
            Some(vec![2])
        );
        assert_eq!(srv.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_evict_entry_closest_to_expiry_when_full() {
        let srv = service(Duration::from_secs(60), 2);
        srv.persist("first.com", QueryType::A, &[1]).await;
        srv.entries
            .lock()
            .unwrap()
            .get_mut(&("first.com".to_string(), QueryType::A))
            .unwrap()
            .expires_at = Instant::now() + Duration::from_secs(1);
        srv.persist("second.com", QueryType::A, &[2]).await;
        srv.persist("third.com", QueryType::A, &[3]).await;

        let entries = srv.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key(&("first.com".to_string(), QueryType::A)));
        assert!(entries.contains_key(&("second.com".to_string(), QueryType::A)));
        assert!(entries.contains_key(&("third.com".to_string(), QueryType::A)));
    }
}
