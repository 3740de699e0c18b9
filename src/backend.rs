//! Pluggable file backends.
//!
//! A [`Storage`](crate::Storage) never touches the file system itself. It
//! goes through a [`FileBackend`], which reads and writes whole JSON
//! documents and tells subscribers whenever a file changes. Implement the
//! trait to put storages on top of something else (a virtual file system,
//! an editor buffer, ...).

use crate::error::Result;
use crate::persist::{atomic_write, load};
use crate::serializer::{JsonSerializer, Serializer};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Change callback. Receives the path that changed, or `None` when the
/// source can't tell which file it was.
pub type ChangeListener = Arc<dyn Fn(Option<&Path>) + Send + Sync>;

/// Handle returned by [`FileBackend::subscribe`]; pass it back to
/// [`FileBackend::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What a backing file abstraction must provide.
///
/// Implementations are shared between every storage pointing at the same
/// files, so all methods take `&self`.
pub trait FileBackend: Send + Sync {
    /// Read the document at `path`, or `default` if there is none.
    fn read_json(&self, path: &Path, default: Value) -> Result<Value>;

    /// Replace the document at `path` and notify subscribers with
    /// `Some(path)` once the write succeeded.
    fn write_json(&self, path: &Path, value: &Value) -> Result<()>;

    /// Register a change listener.
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;

    /// Drop a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

// ---- Listeners ---------------------------------------------------------------

/// Subscriber registry shared by the bundled backends.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, ChangeListener)>>,
}

impl Listeners {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` and return its id.
    pub fn add(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, listener));
        tracing::debug!(id = id.0, "change listener subscribed");
        id
    }

    /// Remove the listener registered under `id`. Returns `false` when no
    /// such listener was registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|(entry, _)| *entry != id);
            entries.len() < before
        };
        if removed {
            tracing::debug!(id = id.0, "change listener released");
        }
        removed
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener with `path`. The registry lock is released first,
    /// so listeners may subscribe or unsubscribe.
    pub fn notify(&self, path: Option<&Path>) {
        let snapshot: Vec<ChangeListener> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(path);
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

// ---- DiskBackend -------------------------------------------------------------

/// Real files on disk. Writes go through a temp file and a rename.
#[derive(Debug, Default)]
pub struct DiskBackend {
    serializer: JsonSerializer,
    listeners: Listeners,
}

impl DiskBackend {
    /// Backend writing two-space indented JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with a custom serializer (indent width, compact output).
    pub fn with_serializer(serializer: JsonSerializer) -> Self {
        Self {
            serializer,
            listeners: Listeners::new(),
        }
    }

    /// Tell subscribers that `path` changed behind our back, e.g. from a file
    /// watcher. `None` means "something changed".
    pub fn notify(&self, path: Option<&Path>) {
        self.listeners.notify(path);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl FileBackend for DiskBackend {
    fn read_json(&self, path: &Path, default: Value) -> Result<Value> {
        tracing::debug!(path = %path.display(), "reading document from disk");
        load(path, &self.serializer, default)
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<()> {
        let bytes = self.serializer.serialize(value)?;
        atomic_write(path, &bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "document written");
        self.listeners.notify(Some(path));
        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}

// ---- MemoryBackend -----------------------------------------------------------

/// In-process file table. Handy for embedding and tests: nothing touches the
/// disk, but notifications behave exactly like [`DiskBackend`]'s.
#[derive(Default)]
pub struct MemoryBackend {
    files: shardmap::ShardMap<PathBuf, Value>,
    listeners: Listeners,
    reads: AtomicU64,
}

impl MemoryBackend {
    /// Empty file table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document stored at `path`, if any.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Value> {
        self.files
            .get(&path.as_ref().to_path_buf())
            .map(|doc| (*doc).clone())
    }

    /// Overwrite `path` without notifying anyone, like an external process
    /// editing the file.
    pub fn put_silently(&self, path: impl AsRef<Path>, doc: Value) {
        self.files.insert(path.as_ref().to_path_buf(), doc);
    }

    /// Tell subscribers that `path` changed.
    pub fn notify(&self, path: Option<&Path>) {
        self.listeners.notify(path);
    }

    /// How many times [`read_json`](FileBackend::read_json) was called.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl FileBackend for MemoryBackend {
    fn read_json(&self, path: &Path, default: Value) -> Result<Value> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .files
            .get(&path.to_path_buf())
            .map(|doc| (*doc).clone())
            .unwrap_or(default))
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<()> {
        self.files.insert(path.to_path_buf(), value.clone());
        self.listeners.notify(Some(path));
        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("files", &self.files.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
