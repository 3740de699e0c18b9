//! Core storage type and its builder.

use crate::backend::{ChangeListener, FileBackend, SubscriptionId};
use crate::error::{Error, Result};
use crate::facade::Facade;
use crate::json_utils::{deep_merge, fill_defaults, get_path, set_path, sort_keys};
use crate::options::{Addressing, StorageOptions};
use crate::path;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One namespace of a JSON settings file.
///
/// Several storages can share a file: each one reads and writes only the
/// sub-object its locator points at, and every write re-reads the file first
/// so siblings are never clobbered. Reads are served from an in-memory copy
/// of the document that is dropped whenever the backend reports a change to
/// this file.
///
/// ```rust
/// use json_storage::{MemoryBackend, Storage};
/// use std::sync::Arc;
///
/// let backend = Arc::new(MemoryBackend::new());
/// let app = Storage::with_name(backend.clone(), ".app-rc.json", "app", false).unwrap();
/// app.set("theme", "dark").unwrap();
/// assert_eq!(app.get("theme").unwrap(), Some("dark".into()));
/// ```
pub struct Storage {
    backend: Arc<dyn FileBackend>,
    path: PathBuf,
    locator: Locator,
    options: StorageOptions,
    cache: Arc<Mutex<Cache>>,
    subscription: Option<SubscriptionId>,
    existed: bool,
}

impl Storage {
    /// Root storage over the whole document at `path`, default options.
    pub fn open(backend: Arc<dyn FileBackend>, path: impl AsRef<Path>) -> Result<Self> {
        Self::builder(backend, path).build()
    }

    /// Storage over the `name` namespace of `path`. `options` accepts a
    /// [`StorageOptions`] or a lone `bool` meaning `lodash_path`.
    pub fn with_name(
        backend: Arc<dyn FileBackend>,
        path: impl AsRef<Path>,
        name: impl Into<String>,
        options: impl Into<StorageOptions>,
    ) -> Result<Self> {
        Self::builder(backend, path)
            .name(name)
            .options(options)
            .build()
    }

    /// Start configuring a new storage. Call [`.build()`](StorageBuilder::build)
    /// when ready.
    pub fn builder(backend: Arc<dyn FileBackend>, path: impl AsRef<Path>) -> StorageBuilder {
        StorageBuilder::new(backend, path)
    }

    // ---- reads ----

    /// Value stored under `key` in this namespace. `key` is never split.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.with_view(|view| view.and_then(|m| m.get(key)).cloned())
    }

    /// Value at a dot/bracket `path` inside this namespace. Missing levels
    /// give `None`.
    pub fn get_path(&self, path: &str) -> Result<Option<Value>> {
        let segments = path::parse(path)?;
        self.with_view(|view| {
            let (first, rest) = segments.split_first()?;
            get_path(view?.get(first)?, rest).cloned()
        })
    }

    /// Independent copy of the whole namespace.
    pub fn get_all(&self) -> Result<Map<String, Value>> {
        self.view()
    }

    /// `true` if `key` holds a value (including `null`).
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Keys of this namespace, in document order.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_view(|view| view.map(|m| m.keys().cloned().collect()).unwrap_or_default())
    }

    /// Snapshot of all key-value pairs.
    pub fn iter(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.view()?.into_iter().collect())
    }

    /// Number of keys in the namespace.
    pub fn len(&self) -> Result<usize> {
        self.with_view(|view| view.map_or(0, Map::len))
    }

    /// `true` when the namespace has no keys.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether the namespace already held something when this storage was
    /// built.
    #[must_use]
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Namespace locator, `None` for a root storage.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.locator.name()
    }

    /// Options this storage was built with.
    #[must_use]
    pub fn options(&self) -> StorageOptions {
        self.options
    }

    // ---- writes ----

    /// Store `value` under `key` and persist. Returns the JSON that was
    /// written.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<Value> {
        let value = to_json(value)?;
        self.update(|view| {
            view.insert(key.to_string(), value.clone());
            Ok(())
        })?;
        Ok(value)
    }

    /// Shallow-merge every entry of `entries` into the namespace and persist.
    /// Later keys overwrite earlier ones. Returns the entries written.
    pub fn extend<T: Serialize>(&self, entries: T) -> Result<Map<String, Value>> {
        let entries = to_object(entries, "extend")?;
        self.update(|view| {
            for (key, value) in &entries {
                view.insert(key.clone(), value.clone());
            }
            Ok(())
        })?;
        Ok(entries)
    }

    /// Store `value` at a nested `path`, creating intermediate levels.
    pub fn set_path<T: Serialize>(&self, path: &str, value: T) -> Result<Value> {
        let value = to_json(value)?;
        let segments = path::parse(path)?;
        if segments.is_empty() {
            return Err(Error::InvalidPath("empty path".to_string()));
        }
        self.update(|view| {
            let mut tree = Value::Object(std::mem::take(view));
            let result = set_path(&mut tree, &segments, value.clone());
            if let Value::Object(map) = tree {
                *view = map;
            }
            result
        })?;
        Ok(value)
    }

    /// Remove `key` and persist. Returns the old value, if any.
    pub fn delete(&self, key: &str) -> Result<Option<Value>> {
        let (prev, _) = self.update(|view| Ok(view.shift_remove(key)))?;
        Ok(prev)
    }

    /// Fill in keys that are missing from the namespace. Existing keys win.
    /// Returns the whole namespace as written.
    pub fn defaults<T: Serialize>(&self, defaults: T) -> Result<Map<String, Value>> {
        let defaults = to_object(defaults, "defaults")?;
        let (_, written) = self.update(|view| {
            fill_defaults(view, defaults);
            Ok(())
        })?;
        Ok(written)
    }

    /// Deep-merge `source` into the namespace; `source` wins on conflicts at
    /// every depth. Returns the whole namespace as written.
    pub fn merge<T: Serialize>(&self, source: T) -> Result<Map<String, Value>> {
        let source = to_object(source, "merge")?;
        let (_, written) = self.update(|view| {
            let mut tree = Value::Object(std::mem::take(view));
            deep_merge(&mut tree, Value::Object(source));
            if let Value::Object(map) = tree {
                *view = map;
            }
            Ok(())
        })?;
        Ok(written)
    }

    /// Write the current namespace back unchanged (re-sorting it if
    /// `sorted` is on).
    pub fn save(&self) -> Result<()> {
        self.update(|_| Ok(())).map(|_| ())
    }

    // ---- cache ----

    /// Forget the in-memory document; the next read goes to the backend.
    pub fn invalidate(&self) {
        if self.cache.lock().clear() {
            tracing::debug!(path = %self.path.display(), "cache invalidated");
        }
    }

    // ---- facade / children ----

    /// Property-style view forwarding to this storage.
    pub fn facade(&self) -> Facade<'_> {
        Facade::new(self)
    }

    /// Storage for `relative` below this namespace, on the same file and
    /// backend. Children always use nested-path addressing and default
    /// options otherwise.
    pub fn create_storage(&self, relative: &str) -> Result<Storage> {
        let name = path::join(self.locator.name(), relative);
        Storage::builder(Arc::clone(&self.backend), &self.path)
            .name(name)
            .lodash_path(true)
            .build()
    }

    // ---- internal ----

    fn load_fresh(&self) -> Result<Value> {
        let doc = self
            .backend
            .read_json(&self.path, Value::Object(Map::new()))?;
        if doc.is_object() {
            Ok(doc)
        } else {
            tracing::warn!(
                path = %self.path.display(),
                "document is not a JSON object, treating it as empty"
            );
            Ok(Value::Object(Map::new()))
        }
    }

    /// Run `f` against the namespace of the cached (or freshly loaded)
    /// document. The cache lock is never held across a backend call.
    fn with_view<R>(&self, f: impl FnOnce(Option<&Map<String, Value>>) -> R) -> Result<R> {
        let seen = {
            let cache = self.cache.lock();
            if let Some(doc) = cache.doc.as_ref() {
                tracing::trace!(path = %self.path.display(), "cache hit");
                return Ok(f(self.locator.resolve(doc)));
            }
            cache.generation
        };
        let doc = self.load_fresh()?;
        let out = f(self.locator.resolve(&doc));
        if !self.options.disable_cache {
            let mut cache = self.cache.lock();
            if cache.generation == seen {
                cache.doc = Some(doc);
            } else {
                tracing::debug!(
                    path = %self.path.display(),
                    "document changed while loading, not caching it"
                );
            }
        }
        Ok(out)
    }

    fn view(&self) -> Result<Map<String, Value>> {
        self.with_view(|view| view.cloned().unwrap_or_default())
    }

    fn update<R>(
        &self,
        mutate: impl FnOnce(&mut Map<String, Value>) -> Result<R>,
    ) -> Result<(R, Map<String, Value>)> {
        let mut view = self.view()?;
        let out = mutate(&mut view)?;
        let written = self.persist(view)?;
        Ok((out, written))
    }

    /// Splice `view` into a fresh copy of the document and write it.
    fn persist(&self, view: Map<String, Value>) -> Result<Map<String, Value>> {
        let view = if self.options.sorted {
            match sort_keys(Value::Object(view)) {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        } else {
            view
        };

        let mut doc = self.load_fresh()?;
        self.locator.splice(&mut doc, Value::Object(view.clone()))?;
        tracing::debug!(
            path = %self.path.display(),
            namespace = self.locator.name().unwrap_or("<root>"),
            keys = view.len(),
            "persisting namespace"
        );
        self.backend.write_json(&self.path, &doc)?;
        self.invalidate();
        Ok(view)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.backend.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.path)
            .field("name", &self.locator.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidValueType(e.to_string()))
}

fn to_object<T: Serialize>(value: T, op: &str) -> Result<Map<String, Value>> {
    match to_json(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidArgumentType(format!(
            "{op} expects an object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Where the namespace lives inside the document.
#[derive(Debug, Clone)]
enum Locator {
    Root,
    Key(String),
    Path { raw: String, segments: Vec<String> },
}

impl Locator {
    fn new(name: Option<String>, addressing: Addressing) -> Result<Self> {
        match (name, addressing) {
            (None, _) => Ok(Locator::Root),
            (Some(name), Addressing::Flat) => Ok(Locator::Key(name)),
            (Some(raw), Addressing::Path) => {
                let segments = path::parse(&raw)?;
                if segments.is_empty() {
                    return Err(Error::InvalidPath("empty namespace path".to_string()));
                }
                Ok(Locator::Path { raw, segments })
            }
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Locator::Root => None,
            Locator::Key(name) => Some(name),
            Locator::Path { raw, .. } => Some(raw),
        }
    }

    /// The namespace object inside `doc`; `None` when absent or not an
    /// object.
    fn resolve<'doc>(&self, doc: &'doc Value) -> Option<&'doc Map<String, Value>> {
        let target = match self {
            Locator::Root => Some(doc),
            Locator::Key(name) => doc.get(name.as_str()),
            Locator::Path { segments, .. } => get_path(doc, segments),
        };
        target.and_then(Value::as_object)
    }

    fn splice(&self, doc: &mut Value, view: Value) -> Result<()> {
        match self {
            Locator::Root => {
                *doc = view;
                Ok(())
            }
            Locator::Key(name) => {
                if let Value::Object(map) = doc {
                    map.insert(name.clone(), view);
                } else {
                    let mut map = Map::new();
                    map.insert(name.clone(), view);
                    *doc = Value::Object(map);
                }
                Ok(())
            }
            Locator::Path { segments, .. } => set_path(doc, segments, view),
        }
    }
}

/// The cached document plus a counter bumped on every invalidation, so a load
/// that raced with a change notification is not cached.
#[derive(Default)]
struct Cache {
    doc: Option<Value>,
    generation: u64,
}

impl Cache {
    /// Drop the document and start a new generation. Returns whether a
    /// document was held.
    fn clear(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        self.doc.take().is_some()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`Storage`].
///
/// ```rust
/// use json_storage::{MemoryBackend, Storage};
/// use std::sync::Arc;
///
/// let store = Storage::builder(Arc::new(MemoryBackend::new()), "settings.json")
///     .name("editor.fonts")
///     .lodash_path(true)
///     .sorted(true)
///     .build()
///     .unwrap();
/// assert_eq!(store.name(), Some("editor.fonts"));
/// ```
pub struct StorageBuilder {
    backend: Arc<dyn FileBackend>,
    path: PathBuf,
    name: Option<String>,
    options: StorageOptions,
}

impl StorageBuilder {
    fn new(backend: Arc<dyn FileBackend>, path: impl AsRef<Path>) -> Self {
        Self {
            backend,
            path: path.as_ref().to_path_buf(),
            name: None,
            options: StorageOptions::default(),
        }
    }

    /// Namespace locator (default: whole document).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace all options at once. A `bool` is shorthand for `lodash_path`.
    pub fn options(mut self, options: impl Into<StorageOptions>) -> Self {
        self.options = options.into();
        self
    }

    /// Resolve the locator as a nested path.
    pub fn lodash_path(mut self, yes: bool) -> Self {
        self.options.lodash_path = yes;
        self
    }

    /// Never keep the document in memory.
    pub fn disable_cache(mut self, yes: bool) -> Self {
        self.options.disable_cache = yes;
        self
    }

    /// Ignore change notifications from the backend.
    pub fn disable_cache_by_file(mut self, yes: bool) -> Self {
        self.options.disable_cache_by_file = yes;
        self
    }

    /// Deep-sort keys before every write.
    pub fn sorted(mut self, yes: bool) -> Self {
        self.options.sorted = yes;
        self
    }

    /// Subscribe to the backend and load the namespace once.
    pub fn build(self) -> Result<Storage> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::MissingPath);
        }
        let locator = Locator::new(self.name, self.options.addressing())?;
        let cache = Arc::new(Mutex::new(Cache::default()));

        let subscription = if self.options.disable_cache || self.options.disable_cache_by_file {
            None
        } else {
            let cache = Arc::clone(&cache);
            let own = self.path.clone();
            let listener: ChangeListener = Arc::new(move |changed: Option<&Path>| {
                if changed.map_or(true, |p| p == own.as_path())
                    && cache.lock().clear()
                {
                    tracing::debug!(path = %own.display(), "cache invalidated by change notification");
                }
            });
            Some(self.backend.subscribe(listener))
        };

        let mut storage = Storage {
            backend: self.backend,
            path: self.path,
            locator,
            options: self.options,
            cache,
            subscription,
            existed: false,
        };
        storage.existed = !storage.is_empty()?;
        Ok(storage)
    }
}

impl std::fmt::Debug for StorageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBuilder")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
