//! Persisted per-folder cache of content hash and song duration
//!
//! The backing file is a single JSON object keyed by folder path. Each record
//! is decoded on its own so one corrupt record never costs the whole cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "sha1", default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(rename = "songDuration", default, skip_serializing_if = "Option::is_none")]
    pub song_duration: Option<f32>,
}

impl CacheEntry {
    /// Cached duration, if it is positive, finite and was recorded for `hash`.
    ///
    /// Entries written before hashes were recorded carry no hash; their
    /// duration is trusted as-is.
    pub fn usable_duration(&self, hash: &str) -> Option<f32> {
        if let Some(recorded) = &self.hash {
            if recorded != hash {
                return None;
            }
        }
        self.song_duration
            .filter(|duration| duration.is_finite() && *duration > 0.0)
    }
}

/// In-memory view of the cache file.
///
/// Not synchronized: the scanner owns it behind a mutex.
#[derive(Debug, Default)]
pub struct CacheStore {
    file: PathBuf,
    entries: HashMap<PathBuf, CacheEntry>,
}

impl CacheStore {
    /// Empty store that will persist to `file`
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            entries: HashMap::new(),
        }
    }

    /// Read the cache file. Missing or unreadable files yield an empty store.
    pub fn load<P: AsRef<Path>>(file: P) -> Self {
        let mut store = Self::new(file);

        let contents = match fs::read_to_string(&store.file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %store.file.display(), "No song cache yet");
                return store;
            }
            Err(e) => {
                tracing::error!(path = %store.file.display(), error = %e, "Failed to read song cache");
                return store;
            }
        };

        let document: Map<String, Value> = match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(path = %store.file.display(), error = %e, "Song cache is corrupted, starting empty");
                return store;
            }
        };

        for (path, record) in document {
            match serde_json::from_value::<CacheEntry>(record) {
                Ok(entry) => {
                    store.entries.insert(PathBuf::from(path), entry);
                }
                Err(e) => {
                    tracing::warn!(%path, error = %e, "Skipping malformed cache record");
                }
            }
        }

        tracing::info!(entries = store.entries.len(), "Loaded song cache");
        store
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    pub fn put(&mut self, path: &Path, entry: CacheEntry) {
        self.entries.insert(path.to_path_buf(), entry);
    }

    /// Drop every entry whose path is not in `known_paths`, then write the
    /// store to disk. Write failures are logged and otherwise ignored.
    pub fn flush(&mut self, known_paths: &[PathBuf]) {
        let known: HashSet<&Path> = known_paths.iter().map(PathBuf::as_path).collect();
        let before = self.entries.len();
        self.entries.retain(|path, _| known.contains(path.as_path()));
        let pruned = before - self.entries.len();

        match self.write() {
            Ok(()) => tracing::info!(
                entries = self.entries.len(),
                pruned,
                path = %self.file.display(),
                "Saved song cache"
            ),
            Err(e) => tracing::error!(path = %self.file.display(), error = %e, "Failed to save song cache"),
        }
    }

    fn write(&self) -> std::io::Result<()> {
        let mut document = Map::new();
        for (path, entry) in &self.entries {
            let record = serde_json::to_value(entry).map_err(std::io::Error::other)?;
            document.insert(path.to_string_lossy().into_owned(), record);
        }
        let contents = serde_json::to_vec(&document).map_err(std::io::Error::other)?;

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(hash: &str, duration: f32) -> CacheEntry {
        CacheEntry {
            hash: Some(hash.to_string()),
            song_duration: Some(duration),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::load(temp_dir.path().join("cache.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_garbage_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache.json");
        fs::write(&file, b"\x00\x01 definitely not json").unwrap();

        let store = CacheStore::load(&file);
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache.json");
        fs::write(
            &file,
            r#"{
                "/songs/good": {"sha1": "ABC", "songDuration": 12.5},
                "/songs/bad": {"sha1": 42},
                "/songs/worse": "nope",
                "/songs/legacy": {"songDuration": 3.0}
            }"#,
        )
        .unwrap();

        let store = CacheStore::load(&file);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(Path::new("/songs/good")), Some(&entry("ABC", 12.5)));
        assert_eq!(
            store.get(Path::new("/songs/legacy")).unwrap().song_duration,
            Some(3.0)
        );
        assert!(store.get(Path::new("/songs/bad")).is_none());
    }

    #[test]
    fn test_flush_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("nested").join("cache.json");
        let keep_a = PathBuf::from("/songs/a");
        let keep_b = PathBuf::from("/songs/b");
        let gone = PathBuf::from("/songs/deleted");

        let mut store = CacheStore::new(&file);
        store.put(&keep_a, entry("AAA", 61.0));
        store.put(&keep_b, entry("BBB", 95.25));
        store.put(&gone, entry("CCC", 10.0));
        store.flush(&[keep_a.clone(), keep_b.clone()]);

        assert_eq!(store.len(), 2);
        let reloaded = CacheStore::load(&file);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(&keep_a), Some(&entry("AAA", 61.0)));
        assert_eq!(reloaded.get(&keep_b), Some(&entry("BBB", 95.25)));
        assert!(reloaded.get(&gone).is_none());
        assert!(!file.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_usable_duration() {
        assert_eq!(entry("ABC", 12.0).usable_duration("ABC"), Some(12.0));
        assert_eq!(entry("ABC", 12.0).usable_duration("DEF"), None);
        assert_eq!(entry("ABC", 0.0).usable_duration("ABC"), None);
        assert_eq!(entry("ABC", f32::INFINITY).usable_duration("ABC"), None);
        assert_eq!(entry("ABC", f32::NAN).usable_duration("ABC"), None);

        let legacy = CacheEntry {
            hash: None,
            song_duration: Some(7.5),
        };
        assert_eq!(legacy.usable_duration("anything"), Some(7.5));
        assert_eq!(CacheEntry::default().usable_duration("ABC"), None);
    }
}
