//! Content identity of a song folder

use crate::descriptor::Descriptor;
use crate::error::HashError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Upper-case hex digest identifying a song's content
pub type ContentHash = String;

/// Hash the raw descriptor bytes followed by every referenced beatmap file,
/// in declaration order.
pub fn compute(descriptor: &Descriptor, folder: &Path) -> Result<ContentHash, HashError> {
    let mut hasher = Sha256::new();

    hasher.update(read(&descriptor.source)?);
    for file_name in &descriptor.beatmap_filenames {
        hasher.update(read(&folder.join(file_name))?);
    }

    Ok(hex::encode_upper(hasher.finalize()))
}

fn read(path: &Path) -> Result<Vec<u8>, HashError> {
    fs::read(path).map_err(|source| HashError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor;
    use tempfile::TempDir;

    const INFO: &str = r#"{"_songName": "Song", "_difficultyBeatmapSets": [
        {"_beatmapCharacteristicName": "Standard", "_difficultyBeatmaps": [
            {"_difficulty": "Easy", "_beatmapFilename": "Easy.dat"},
            {"_difficulty": "Expert", "_beatmapFilename": "Expert.dat"}
        ]}
    ]}"#;

    fn song_folder() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("info.dat"), INFO).unwrap();
        fs::write(temp_dir.path().join("Easy.dat"), b"easy notes").unwrap();
        fs::write(temp_dir.path().join("Expert.dat"), b"expert notes").unwrap();
        temp_dir
    }

    fn hash_of(folder: &Path) -> Result<ContentHash, HashError> {
        let descriptor = descriptor::parse(folder).unwrap();
        compute(&descriptor, folder)
    }

    #[test]
    fn test_hash_is_deterministic() {
        let folder = song_folder();
        let first = hash_of(folder.path()).unwrap();
        let second = hash_of(folder.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identical_content_in_different_folders() {
        let a = song_folder();
        let b = song_folder();
        assert_eq!(hash_of(a.path()).unwrap(), hash_of(b.path()).unwrap());
    }

    #[test]
    fn test_beatmap_change_changes_hash() {
        let folder = song_folder();
        let before = hash_of(folder.path()).unwrap();

        fs::write(folder.path().join("Expert.dat"), b"expert notez").unwrap();
        let after = hash_of(folder.path()).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_descriptor_change_changes_hash() {
        let folder = song_folder();
        let before = hash_of(folder.path()).unwrap();

        fs::write(folder.path().join("info.dat"), INFO.replace("Song", "Song!")).unwrap();
        let after = hash_of(folder.path()).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_beatmap_fails() {
        let folder = song_folder();
        fs::remove_file(folder.path().join("Easy.dat")).unwrap();

        let err = hash_of(folder.path()).unwrap_err();
        assert!(err.to_string().contains("Easy.dat"));
    }
}
