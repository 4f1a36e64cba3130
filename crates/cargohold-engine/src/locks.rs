//! The per-path reader/writer lock registry.
//!
//! Every filesystem mutation acquires a write lock on the normalized
//! absolute path; reads acquire read locks. Entries are reference-counted
//! and reclaimed by a periodic sweep of idle, unheld locks rather than
//! living for the life of the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, trace};

/// Default timeout for ordinary operation-level lock acquisition.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used for the short-lived multipart upload metadata contention path.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// How long an entry with zero holders must sit idle before the sweeper
/// reclaims it.
const IDLE_THRESHOLD: Duration = Duration::from_secs(600);

/// How often the sweeper scans the registry.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// A lock acquisition failed to complete within its timeout.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("lock acquisition timed out")]
pub struct LockTimeout;

#[derive(Debug)]
struct LockEntry {
    rw: Arc<RwLock<()>>,
    ref_count: AtomicUsize,
    last_access_millis: AtomicI64,
}

impl LockEntry {
    fn new() -> Self {
        Self { rw: Arc::new(RwLock::new(())), ref_count: AtomicUsize::new(0), last_access_millis: AtomicI64::new(now_millis()) }
    }

    fn touch(&self) {
        self.last_access_millis.store(now_millis(), Ordering::Relaxed);
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A held read lock. Releases on drop.
#[derive(Debug)]
pub struct ReadGuard {
    _guard: OwnedRwLockReadGuard<()>,
    registry: Arc<RegistryInner>,
    key: PathBuf,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// A held write lock. Releases on drop.
#[derive(Debug)]
pub struct WriteGuard {
    _guard: OwnedRwLockWriteGuard<()>,
    registry: Arc<RegistryInner>,
    key: PathBuf,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

#[derive(Debug)]
struct RegistryInner {
    entries: DashMap<PathBuf, Arc<LockEntry>>,
}

impl RegistryInner {
    fn acquire_entry(&self, key: &Path) -> Arc<LockEntry> {
        loop {
            let entry = self.entries.entry(key.to_path_buf()).or_insert_with(|| Arc::new(LockEntry::new())).clone();

            let previous = entry.ref_count.fetch_add(1, Ordering::SeqCst);
            if previous == usize::MAX {
                // Being reclaimed concurrently; back off and retry with a fresh entry.
                entry.ref_count.fetch_sub(1, Ordering::SeqCst);
                continue;
            }
            entry.touch();
            return entry;
        }
    }

    fn release(&self, key: &Path) {
        if let Some(entry) = self.entries.get(key) {
            entry.ref_count.fetch_sub(1, Ordering::SeqCst);
            entry.touch();
        }
    }

    /// Remove entries with no holders that have been idle past [`IDLE_THRESHOLD`].
    fn sweep(&self) {
        let cutoff = now_millis() - i64::try_from(IDLE_THRESHOLD.as_millis()).unwrap_or(i64::MAX);
        let stale: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|e| e.ref_count.load(Ordering::SeqCst) == 0 && e.last_access_millis.load(Ordering::Relaxed) < cutoff)
            .map(|e| e.key().clone())
            .collect();

        for key in stale {
            // Double-check under the map's own entry lock: another task may
            // have raced to acquire between the scan and the removal.
            let still_idle = self.entries.get(&key).is_some_and(|e| e.ref_count.load(Ordering::SeqCst) == 0);
            if still_idle {
                self.entries.remove(&key);
                trace!(path = %key.display(), "evicted idle path lock");
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The process-wide path lock registry.
#[derive(Debug, Clone)]
pub struct LockRegistry {
    inner: Arc<RegistryInner>,
}

impl LockRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(RegistryInner { entries: DashMap::new() }) }
    }

    /// Acquire a read lock on `path` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LockTimeout`] if the lock is not acquired within `timeout`.
    pub async fn acquire_read(&self, path: &Path, timeout: Duration) -> Result<ReadGuard, LockTimeout> {
        let key = normalize(path);
        let entry = self.inner.acquire_entry(&key);
        match tokio::time::timeout(timeout, entry.rw.clone().read_owned()).await {
            Ok(guard) => Ok(ReadGuard { _guard: guard, registry: self.inner.clone(), key }),
            Err(_) => {
                self.inner.release(&key);
                Err(LockTimeout)
            }
        }
    }

    /// Acquire a write lock on `path` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LockTimeout`] if the lock is not acquired within `timeout`.
    pub async fn acquire_write(&self, path: &Path, timeout: Duration) -> Result<WriteGuard, LockTimeout> {
        let key = normalize(path);
        let entry = self.inner.acquire_entry(&key);
        match tokio::time::timeout(timeout, entry.rw.clone().write_owned()).await {
            Ok(guard) => Ok(WriteGuard { _guard: guard, registry: self.inner.clone(), key }),
            Err(_) => {
                self.inner.release(&key);
                Err(LockTimeout)
            }
        }
    }

    /// Run `f` while holding a write lock on `path`, releasing on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`LockTimeout`] if the lock is not acquired in time.
    pub async fn do_write<F, Fut, T>(&self, path: &Path, timeout: Duration, f: F) -> Result<T, LockTimeout>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.acquire_write(path, timeout).await?;
        Ok(f().await)
    }

    /// Run `f` while holding a read lock on `path`, releasing on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`LockTimeout`] if the lock is not acquired in time.
    pub async fn do_read<F, Fut, T>(&self, path: &Path, timeout: Duration, f: F) -> Result<T, LockTimeout>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.acquire_read(path, timeout).await?;
        Ok(f().await)
    }

    /// Run one sweep pass, evicting idle, unheld entries.
    pub fn sweep(&self) {
        debug!(entries = self.inner.len(), "sweeping path lock registry");
        self.inner.sweep();
    }

    /// Number of tracked paths (held or idle, pre-sweep).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the registry currently tracks no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_should_serialize_writers_on_same_path() {
        let registry = LockRegistry::new();
        let path = Path::new("/bucket/key");

        let guard = registry.acquire_write(path, DEFAULT_TIMEOUT).await.unwrap();
        let second = registry.acquire_write(path, Duration::from_millis(50)).await;
        assert!(second.is_err());
        drop(guard);

        assert!(registry.acquire_write(path, DEFAULT_TIMEOUT).await.is_ok());
    }

    #[tokio::test]
    async fn test_should_allow_concurrent_readers() {
        let registry = LockRegistry::new();
        let path = Path::new("/bucket/key");

        let r1 = registry.acquire_read(path, DEFAULT_TIMEOUT).await.unwrap();
        let r2 = registry.acquire_read(path, DEFAULT_TIMEOUT).await.unwrap();
        drop(r1);
        drop(r2);
    }

    #[tokio::test]
    async fn test_should_isolate_distinct_paths() {
        let registry = LockRegistry::new();
        let a = registry.acquire_write(Path::new("/a"), DEFAULT_TIMEOUT).await.unwrap();
        let b = registry.acquire_write(Path::new("/b"), DEFAULT_TIMEOUT).await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_do_write_releases_on_panic_safe_path() {
        let registry = LockRegistry::new();
        let path = Path::new("/bucket/key");
        let result = registry.do_write(path, DEFAULT_TIMEOUT, || async { 42 }).await.unwrap();
        assert_eq!(result, 42);
        assert!(registry.acquire_write(path, DEFAULT_TIMEOUT).await.is_ok());
    }

    #[tokio::test]
    async fn test_should_normalize_case_for_same_lock() {
        let registry = LockRegistry::new();
        let guard = registry.acquire_write(Path::new("/Bucket/Key"), DEFAULT_TIMEOUT).await.unwrap();
        let second = registry.acquire_write(Path::new("/bucket/key"), Duration::from_millis(50)).await;
        assert!(second.is_err());
        drop(guard);
    }

    #[test]
    fn test_sweep_evicts_idle_unheld_entries() {
        let registry = LockRegistry::new();
        registry.inner.entries.insert(PathBuf::from("/stale"), Arc::new(LockEntry { rw: Arc::new(RwLock::new(())), ref_count: AtomicUsize::new(0), last_access_millis: AtomicI64::new(0) }));
        assert_eq!(registry.len(), 1);
        registry.sweep();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_sweep_keeps_recently_touched_entries() {
        let registry = LockRegistry::new();
        registry.inner.entries.insert(PathBuf::from("/fresh"), Arc::new(LockEntry::new()));
        registry.sweep();
        assert_eq!(registry.len(), 1);
    }
}
