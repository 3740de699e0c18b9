//! Namespaced, cached, file-backed JSON settings storage.
//!
//! A [`Storage`] owns one namespace of a JSON document: the whole file, a
//! top-level key, or a nested path. Any number of storages can share a file;
//! writes always re-read the file before merging so they never drop a
//! sibling's data, and reads come from a cache that the [`FileBackend`]
//! invalidates whenever the file changes.
//!
//! ```rust
//! use json_storage::{DiskBackend, Storage};
//! use std::sync::Arc;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let path = dir.path().join(".tool-rc.json");
//! let backend = Arc::new(DiskBackend::new());
//! let config = Storage::with_name(backend.clone(), &path, "config", false).unwrap();
//! config.set("name", "demo").unwrap();
//!
//! let plugins = config.create_storage("plugins").unwrap();
//! plugins.set_path("lint.enabled", true).unwrap();
//!
//! assert_eq!(config.get_path("plugins.lint.enabled").unwrap(), Some(true.into()));
//! ```
//!
//! **Single-process only.** Storages in one process stay coherent through the
//! shared backend; other processes writing the same file can race. There is
//! no file locking.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod facade;
pub mod json_utils;
pub mod options;
pub mod path;
pub mod persist;
pub mod serializer;
pub mod storage;

pub use backend::{ChangeListener, DiskBackend, FileBackend, MemoryBackend, SubscriptionId};
pub use error::{Error, Result};
pub use facade::Facade;
pub use options::{Addressing, StorageOptions};
pub use storage::{Storage, StorageBuilder};
