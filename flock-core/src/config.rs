//! # flock configuration
//!
//! A minimal string key/value store with dotted keys, in the same spirit as
//! an `app.set()` / `app.get()` API. Components never read the environment
//! themselves: they take a `FlockConfigSnapshot` and pull typed values out
//! of it.
//!
//! ```rust
//! use flock_core::FlockConfig;
//!
//! let mut config = FlockConfig::new();
//! config.set("upload.max_bytes.team-photos", "307200");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("upload.max_bytes.team-photos"), Some(307200));
//! ```
//!
//! ## Environment overrides
//! `load_env("FLOCK__")` maps `FLOCK__BLOB__PUBLIC_BASE_URL=https://cdn.example`
//! to the key `blob.public_base_url`.

use std::collections::HashMap;

use crate::errors::{FlockError, FlockResult};

#[derive(Debug, Default)]
pub struct FlockConfig {
    values: HashMap<String, String>,
}

impl FlockConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Layer every `prefix`-ed environment variable on top of the current values.
    /// Returns how many keys were set.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_pairs(prefix, std::env::vars())
    }

    fn load_pairs<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                self.values.insert(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    pub fn snapshot(&self) -> FlockConfigSnapshot {
        FlockConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable view of the configuration handed to components.
#[derive(Debug, Clone, Default)]
pub struct FlockConfigSnapshot {
    map: HashMap<String, String>,
}

impl FlockConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// A value that must be present.
    pub fn require(&self, key: &str) -> FlockResult<&str> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| FlockError::configuration(format!("missing config key '{key}'")))
    }

    /// All `(suffix, value)` pairs whose key starts with `prefix.`.
    pub fn section(&self, prefix: &str) -> Vec<(String, String)> {
        let dotted = format!("{prefix}.");
        let mut entries: Vec<(String, String)> = self
            .map
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&dotted).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        entries.sort();
        entries
    }
}
