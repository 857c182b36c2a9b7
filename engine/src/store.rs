use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

/// Minimal persistent key-value surface: best score, day stamps and the
/// like. Writes are best-effort — a failing `save` must never disturb
/// gameplay, so implementations deal with their own errors.
pub trait KeyValueStore {
    fn get_i64(&self, key: &str, default: i64) -> i64;
    fn set_i64(&mut self, key: &str, value: i64);
    fn get_string(&self, key: &str, default: &str) -> String;
    fn set_string(&mut self, key: &str, value: &str);
    fn save(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    ints: HashMap<String, i64>,
    #[serde(default)]
    strings: HashMap<String, String>,
}

/// In-memory store for tests and hosts that persist through other means.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    doc: Document,
    saves: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls observed; lets tests assert flush points.
    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl KeyValueStore for MemoryStore {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.doc.ints.get(key).copied().unwrap_or(default)
    }

    fn set_i64(&mut self, key: &str, value: i64) {
        self.doc.ints.insert(key.to_string(), value);
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.doc
            .strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.doc.strings.insert(key.to_string(), value.to_string());
    }

    fn save(&mut self) {
        self.saves += 1;
    }
}

/// Store backed by a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: Document,
}

impl JsonFileStore {
    /// Resolves the save path from `MERGEDROP_STORE_PATH`, else the XDG
    /// config directory, else the working directory.
    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("MERGEDROP_STORE_PATH") {
            return Self::at(PathBuf::from(explicit));
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("mergedrop");
        path.push("save.json");
        Self::at(path)
    }

    pub fn at(path: PathBuf) -> Self {
        let doc = Self::load_document(&path);
        Self { path, doc }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load_document(path: &PathBuf) -> Document {
        let Ok(bytes) = fs::read(path) else {
            return Document::default();
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    fn write_document(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.doc.ints.get(key).copied().unwrap_or(default)
    }

    fn set_i64(&mut self, key: &str, value: i64) {
        self.doc.ints.insert(key.to_string(), value);
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.doc
            .strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.doc.strings.insert(key.to_string(), value.to_string());
    }

    fn save(&mut self) {
        if let Err(err) = self.write_document() {
            warn!("store save to {:?} failed: {err}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_and_overwrites() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_i64("bestScore", 0), 0);
        assert_eq!(store.get_string("day", "none"), "none");

        store.set_i64("bestScore", 1200);
        store.set_i64("bestScore", 3400);
        store.set_string("day", "20260806");
        assert_eq!(store.get_i64("bestScore", 0), 3400);
        assert_eq!(store.get_string("day", "none"), "20260806");

        store.save();
        store.save();
        assert_eq!(store.saves(), 2);
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let mut path = std::env::temp_dir();
        path.push(format!("mergedrop-store-test-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::at(path.clone());
        store.set_i64("totalGames", 7);
        store.set_string("challengeDate", "20260806");
        store.save();

        let reopened = JsonFileStore::at(path.clone());
        assert_eq!(reopened.get_i64("totalGames", 0), 7);
        assert_eq!(reopened.get_string("challengeDate", ""), "20260806");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_tolerates_missing_or_corrupt_files() {
        let mut path = std::env::temp_dir();
        path.push(format!("mergedrop-store-corrupt-{}.json", std::process::id()));
        fs::write(&path, b"not json at all").expect("write corrupt file");

        let store = JsonFileStore::at(path.clone());
        assert_eq!(store.get_i64("anything", 42), 42);

        let _ = fs::remove_file(&path);
    }
}
