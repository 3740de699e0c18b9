//! Storage configuration.

use serde::{Deserialize, Serialize};

/// How a namespace locator is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Addressing {
    /// The locator is one top-level property name, dots and all.
    #[default]
    Flat,
    /// The locator is a dot/bracket path through nested mappings.
    Path,
}

/// Knobs recognised by [`Storage`](crate::Storage). All default to off.
///
/// Deserializes from either spelling, so a host tool can embed it in its own
/// config file:
///
/// ```
/// use json_storage::StorageOptions;
///
/// let opts: StorageOptions =
///     serde_json::from_str(r#"{"lodashPath": true, "sorted": true}"#).unwrap();
/// assert!(opts.lodash_path && opts.sorted);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Resolve the namespace locator as a nested path.
    #[serde(alias = "lodashPath")]
    pub lodash_path: bool,
    /// Never keep the document in memory between operations.
    #[serde(alias = "disableCache")]
    pub disable_cache: bool,
    /// Ignore change notifications; the cache is then only dropped by
    /// explicit invalidation or by this storage's own writes.
    #[serde(alias = "disableCacheByFile")]
    pub disable_cache_by_file: bool,
    /// Deep-sort mapping keys of the namespace value before every write.
    pub sorted: bool,
}

impl StorageOptions {
    /// Addressing strategy selected by these options.
    pub fn addressing(&self) -> Addressing {
        if self.lodash_path {
            Addressing::Path
        } else {
            Addressing::Flat
        }
    }
}

/// A lone boolean is shorthand for `lodash_path`.
impl From<bool> for StorageOptions {
    fn from(lodash_path: bool) -> Self {
        Self {
            lodash_path,
            ..Self::default()
        }
    }
}

impl From<Addressing> for StorageOptions {
    fn from(addressing: Addressing) -> Self {
        Self::from(addressing == Addressing::Path)
    }
}
