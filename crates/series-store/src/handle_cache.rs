//! Process-wide cache of open, memory-mapped column files.
//!
//! Entries are reference-counted: readers hold an `Arc` to the mapped file, so
//! eviction or staleness never invalidates an in-flight read. A shard that was
//! rewritten (new inode or mtime) is detected on the next acquire and
//! reopened; the superseded mapping stays alive until its last reader drops.

use crate::error::Result;
use lru::LruCache;
use om_file::ColumnFile;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Bounded retry count for a file vanishing between stat and open, which a
/// concurrent rewrite-and-rename can cause.
const OPEN_RETRIES: usize = 3;

/// Default capacity of the process-wide cache.
const DEFAULT_CAPACITY: usize = 512;

struct CachedHandle {
    file: Arc<ColumnFile>,
    ino: u64,
    mtime_seconds: i64,
}

/// Statistics about the handle cache.
#[derive(Debug, Clone, Default)]
pub struct HandleCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub stale_reopens: u64,
    pub entries: usize,
}

/// LRU cache of open column files keyed by absolute path, with staleness
/// detection via `(inode, mtime)`.
pub struct FileHandleCache {
    inner: Mutex<LruCache<PathBuf, CachedHandle>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    stale_reopens: AtomicU64,
}

impl FileHandleCache {
    /// Create a cache holding at most `capacity` open files.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            stale_reopens: AtomicU64::new(0),
        }
    }

    /// The process-wide cache instance.
    pub fn global() -> Arc<FileHandleCache> {
        static GLOBAL: OnceLock<Arc<FileHandleCache>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(FileHandleCache::new(DEFAULT_CAPACITY)))
            .clone()
    }

    /// Acquire a shared handle for `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist (a gap, not an error).
    /// A handle whose inode or mtime no longer matches the file on disk is
    /// replaced. Opens that race a concurrent rename are retried up to
    /// [`OPEN_RETRIES`] times.
    pub fn acquire(&self, path: &Path) -> Result<Option<Arc<ColumnFile>>> {
        let mut last_error = None;
        for _ in 0..OPEN_RETRIES {
            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let ino = metadata.ino();
            let mtime_seconds = metadata.mtime();

            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(entry) = inner.get(path) {
                    if entry.ino == ino && entry.mtime_seconds == mtime_seconds {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(Some(entry.file.clone()));
                    }
                    // Superseded inode: drop our reference, readers holding
                    // the old Arc are unaffected.
                    inner.pop(path);
                    self.stale_reopens.fetch_add(1, Ordering::Relaxed);
                    debug!(path = %path.display(), "stale column file handle reopened");
                }
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            match ColumnFile::open(path) {
                Ok(file) => {
                    let file = Arc::new(file);
                    let mut inner = self.inner.lock().unwrap();
                    if inner
                        .push(
                            path.to_path_buf(),
                            CachedHandle {
                                file: file.clone(),
                                ino,
                                mtime_seconds,
                            },
                        )
                        .is_some_and(|(evicted_path, _)| evicted_path != path)
                    {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(Some(file));
                }
                Err(e) if e.is_retryable_after_rename() => {
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_error.expect("retry loop ran at least once").into())
    }

    /// Drop the cached handle for `path`, if any.
    pub fn invalidate(&self, path: &Path) {
        self.inner.lock().unwrap().pop(path);
    }

    pub fn stats(&self) -> HandleCacheStats {
        HandleCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            stale_reopens: self.stale_reopens.load(Ordering::Relaxed),
            entries: self.inner.lock().unwrap().len(),
        }
    }
}
