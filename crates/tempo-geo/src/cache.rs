//! Flat-file geocoding cache.
//!
//! One JSON object per line: `{"input": <key>, "output": <value>}`. The file
//! is read once when the cache is built and rewritten in full on every save,
//! keeping only the most recently inserted `capacity` entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::types::CacheError;

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Deserialize)]
struct CacheLine {
    input: String,
    output: Value,
}

#[derive(Debug, Serialize)]
struct CacheLineRef<'a> {
    input: &'a str,
    output: &'a Value,
}

/// Insertion-ordered key/value store backed by a JSONL file.
#[derive(Debug)]
pub struct GeoCache {
    cache_path: PathBuf,
    capacity: usize,
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl GeoCache {
    /// Create an empty cache that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            cache_path: path.into(),
            capacity,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Load the cache file. A missing file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, CacheError> {
        let mut cache = Self::new(path, capacity);
        if !cache.cache_path.exists() {
            return Ok(cache);
        }

        let contents = fs::read_to_string(&cache.cache_path).map_err(|source| CacheError::Read {
            path: cache.cache_path.clone(),
            source,
        })?;

        for (n, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: CacheLine =
                serde_json::from_str(line).map_err(|source| CacheError::Parse {
                    path: cache.cache_path.clone(),
                    line: n + 1,
                    source,
                })?;
            cache.upsert(entry.input, entry.output);
        }

        tracing::debug!(
            "Loaded {} geocoding cache entries from {}",
            cache.entries.len(),
            cache.cache_path.display()
        );
        Ok(cache)
    }

    /// Load the cache file, falling back to an empty cache on any error.
    pub fn load_or_empty(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        match Self::load(&path, capacity) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("Ignoring unusable geocoding cache: {}", e);
                Self::new(path, capacity)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert a new entry. Existing keys are left untouched; returns whether
    /// the entry was added.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    // Later lines in the file win but keep the first line's position.
    fn upsert(&mut self, key: String, value: Value) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Rewrite the cache file with the most recent `capacity` entries.
    pub fn save(&self) -> Result<(), CacheError> {
        let write_err = |source: std::io::Error| CacheError::Write {
            path: self.cache_path.clone(),
            source,
        };

        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let file = File::create(&self.cache_path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);

        let start = self.entries.len().saturating_sub(self.capacity);
        for (key, value) in &self.entries[start..] {
            let line = serde_json::to_string(&CacheLineRef {
                input: key,
                output: value,
            })?;
            writer.write_all(line.as_bytes()).map_err(write_err)?;
            writer.write_all(b"\n").map_err(write_err)?;
        }
        writer.flush().map_err(write_err)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}
