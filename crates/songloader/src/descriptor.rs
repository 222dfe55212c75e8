//! Song descriptor (`info.dat`) parsing
//!
//! Only the fields the loader consumes are read. String fields that are
//! missing or null become empty strings, difficulty sets with a characteristic
//! we don't know are dropped.

use crate::error::DescriptorError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Accepted descriptor file names, in lookup order
pub const DESCRIPTOR_FILE_NAMES: [&str; 2] = ["info.dat", "Info.dat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    Standard,
    NoArrows,
    OneSaber,
    ThreeSixtyDegree,
    NinetyDegree,
    Legacy,
    Lightshow,
    Lawless,
}

impl Characteristic {
    pub fn serialized_name(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::NoArrows => "NoArrows",
            Self::OneSaber => "OneSaber",
            Self::ThreeSixtyDegree => "360Degree",
            Self::NinetyDegree => "90Degree",
            Self::Legacy => "Legacy",
            Self::Lightshow => "Lightshow",
            Self::Lawless => "Lawless",
        }
    }
}

impl FromStr for Characteristic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Standard" => Self::Standard,
            "NoArrows" => Self::NoArrows,
            "OneSaber" => Self::OneSaber,
            "360Degree" => Self::ThreeSixtyDegree,
            "90Degree" => Self::NinetyDegree,
            "Legacy" => Self::Legacy,
            "Lightshow" => Self::Lightshow,
            "Lawless" => Self::Lawless,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serialized_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
    ExpertPlus,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Easy" => Self::Easy,
            "Normal" => Self::Normal,
            "Hard" => Self::Hard,
            "Expert" => Self::Expert,
            "ExpertPlus" => Self::ExpertPlus,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyBeatmap {
    pub difficulty: Difficulty,
    pub beatmap_filename: String,
    pub note_jump_movement_speed: f32,
    pub note_jump_start_beat_offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultySet {
    pub characteristic: Characteristic,
    pub beatmaps: Vec<DifficultyBeatmap>,
}

/// A parsed `info.dat`.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// File the descriptor was read from
    pub source: PathBuf,
    pub song_name: String,
    pub song_sub_name: String,
    pub song_author_name: String,
    pub level_author_name: String,
    pub beats_per_minute: f32,
    pub song_time_offset: f32,
    pub shuffle: f32,
    pub shuffle_period: f32,
    pub preview_start_time: f32,
    pub preview_duration: f32,
    pub song_filename: String,
    pub cover_image_filename: String,
    pub environment_name: String,
    pub all_directions_environment_name: String,
    /// Sets with a known characteristic, in declaration order
    pub difficulty_sets: Vec<DifficultySet>,
    /// Every referenced beatmap file in declaration order, including those of
    /// dropped sets
    pub beatmap_filenames: Vec<String>,
    /// Last beatmap of the first declared set, whatever its characteristic.
    /// Map-derived durations are read from it.
    pub reference_beatmap_filename: Option<String>,
}

impl Descriptor {
    /// Locate and deserialize the descriptor inside `folder`.
    pub fn from_folder(folder: &Path) -> Result<Self, DescriptorError> {
        let source = locate(folder).ok_or_else(|| DescriptorError::Missing(folder.to_path_buf()))?;

        let bytes = fs::read(&source).map_err(|source_err| DescriptorError::Read {
            path: source.clone(),
            source: source_err,
        })?;

        Self::from_slice(source, &bytes)
    }

    fn from_slice(source: PathBuf, bytes: &[u8]) -> Result<Self, DescriptorError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let raw: RawInfo = serde_json::from_slice(bytes).map_err(|e| DescriptorError::Malformed {
            path: source.clone(),
            source: e,
        })?;
        Ok(raw.into_descriptor(source))
    }

    pub fn reference_beatmap_filename(&self) -> Option<&str> {
        self.reference_beatmap_filename.as_deref()
    }
}

/// Parse the descriptor of `folder`, logging and returning `None` when the
/// folder does not hold a usable one.
pub fn parse(folder: &Path) -> Option<Descriptor> {
    match Descriptor::from_folder(folder) {
        Ok(descriptor) => Some(descriptor),
        Err(e @ DescriptorError::Missing(_)) => {
            tracing::error!(error = %e, "Descriptor doesn't exist");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Can't load descriptor");
            None
        }
    }
}

fn locate(folder: &Path) -> Option<PathBuf> {
    DESCRIPTOR_FILE_NAMES
        .iter()
        .map(|name| folder.join(name))
        .find(|path| path.is_file())
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(rename = "_songName")]
    song_name: Option<String>,
    #[serde(rename = "_songSubName")]
    song_sub_name: Option<String>,
    #[serde(rename = "_songAuthorName")]
    song_author_name: Option<String>,
    #[serde(rename = "_levelAuthorName")]
    level_author_name: Option<String>,
    #[serde(rename = "_beatsPerMinute", default)]
    beats_per_minute: f32,
    #[serde(rename = "_songTimeOffset", default)]
    song_time_offset: f32,
    #[serde(rename = "_shuffle", default)]
    shuffle: f32,
    #[serde(rename = "_shufflePeriod", default)]
    shuffle_period: f32,
    #[serde(rename = "_previewStartTime", default)]
    preview_start_time: f32,
    #[serde(rename = "_previewDuration", default)]
    preview_duration: f32,
    #[serde(rename = "_songFilename")]
    song_filename: Option<String>,
    #[serde(rename = "_coverImageFilename")]
    cover_image_filename: Option<String>,
    #[serde(rename = "_environmentName")]
    environment_name: Option<String>,
    #[serde(rename = "_allDirectionsEnvironmentName")]
    all_directions_environment_name: Option<String>,
    #[serde(rename = "_difficultyBeatmapSets", default)]
    difficulty_beatmap_sets: Option<Vec<Option<RawDifficultySet>>>,
}

#[derive(Debug, Deserialize)]
struct RawDifficultySet {
    #[serde(rename = "_beatmapCharacteristicName")]
    characteristic_name: Option<String>,
    #[serde(rename = "_difficultyBeatmaps", default)]
    difficulty_beatmaps: Option<Vec<Option<RawDifficultyBeatmap>>>,
}

#[derive(Debug, Deserialize)]
struct RawDifficultyBeatmap {
    #[serde(rename = "_difficulty")]
    difficulty: Option<String>,
    #[serde(rename = "_beatmapFilename")]
    beatmap_filename: Option<String>,
    #[serde(rename = "_noteJumpMovementSpeed", default)]
    note_jump_movement_speed: f32,
    #[serde(rename = "_noteJumpStartBeatOffset", default)]
    note_jump_start_beat_offset: f32,
}

fn fix_empty(value: Option<String>, field: &str, source: &Path) -> String {
    value.unwrap_or_else(|| {
        tracing::warn!(
            field,
            path = %source.display(),
            "Fixed null string in descriptor, this shouldn't happen"
        );
        String::new()
    })
}

impl RawInfo {
    fn into_descriptor(self, source: PathBuf) -> Descriptor {
        let mut difficulty_sets = Vec::new();
        let mut beatmap_filenames = Vec::new();
        let mut reference_beatmap_filename = None;

        let raw_sets = self.difficulty_beatmap_sets.into_iter().flatten().flatten();
        for (index, raw_set) in raw_sets.enumerate() {
            let raw_beatmaps: Vec<RawDifficultyBeatmap> =
                raw_set.difficulty_beatmaps.into_iter().flatten().flatten().collect();

            if index == 0 {
                reference_beatmap_filename = raw_beatmaps
                    .last()
                    .and_then(|beatmap| beatmap.beatmap_filename.clone());
            }

            beatmap_filenames.extend(
                raw_beatmaps
                    .iter()
                    .filter_map(|beatmap| beatmap.beatmap_filename.clone()),
            );

            let name = raw_set.characteristic_name.unwrap_or_default();
            let Ok(characteristic) = name.parse::<Characteristic>() else {
                tracing::debug!(characteristic = %name, path = %source.display(), "Skipping unsupported characteristic");
                continue;
            };

            let beatmaps = raw_beatmaps
                .into_iter()
                .map(|beatmap| {
                    let name = beatmap.difficulty.unwrap_or_default();
                    let difficulty = name.parse().unwrap_or_else(|()| {
                        tracing::warn!(difficulty = %name, path = %source.display(), "Unknown difficulty, using Easy");
                        Difficulty::Easy
                    });
                    DifficultyBeatmap {
                        difficulty,
                        beatmap_filename: beatmap.beatmap_filename.unwrap_or_default(),
                        note_jump_movement_speed: beatmap.note_jump_movement_speed,
                        note_jump_start_beat_offset: beatmap.note_jump_start_beat_offset,
                    }
                })
                .collect();

            difficulty_sets.push(DifficultySet {
                characteristic,
                beatmaps,
            });
        }

        Descriptor {
            song_name: fix_empty(self.song_name, "songName", &source),
            song_sub_name: fix_empty(self.song_sub_name, "songSubName", &source),
            song_author_name: fix_empty(self.song_author_name, "songAuthorName", &source),
            level_author_name: fix_empty(self.level_author_name, "levelAuthorName", &source),
            beats_per_minute: self.beats_per_minute,
            song_time_offset: self.song_time_offset,
            shuffle: self.shuffle,
            shuffle_period: self.shuffle_period,
            preview_start_time: self.preview_start_time,
            preview_duration: self.preview_duration,
            song_filename: fix_empty(self.song_filename, "songFilename", &source),
            cover_image_filename: self.cover_image_filename.unwrap_or_default(),
            environment_name: self.environment_name.unwrap_or_default(),
            all_directions_environment_name: self.all_directions_environment_name.unwrap_or_default(),
            difficulty_sets,
            beatmap_filenames,
            reference_beatmap_filename,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INFO: &str = r#"{
        "_version": "2.0.0",
        "_songName": "Song",
        "_songSubName": "Sub",
        "_songAuthorName": "Artist",
        "_levelAuthorName": "Mapper",
        "_beatsPerMinute": 120,
        "_songTimeOffset": 0.5,
        "_shuffle": 1,
        "_shufflePeriod": 0.25,
        "_previewStartTime": 12,
        "_previewDuration": 10,
        "_songFilename": "song.ogg",
        "_coverImageFilename": "cover.jpg",
        "_environmentName": "BigMirrorEnvironment",
        "_allDirectionsEnvironmentName": "GlassDesertEnvironment",
        "_difficultyBeatmapSets": [
            {
                "_beatmapCharacteristicName": "Standard",
                "_difficultyBeatmaps": [
                    {"_difficulty": "Hard", "_beatmapFilename": "Hard.dat", "_noteJumpMovementSpeed": 10},
                    {"_difficulty": "ExpertPlus", "_beatmapFilename": "ExpertPlus.dat", "_noteJumpMovementSpeed": 18}
                ]
            },
            {
                "_beatmapCharacteristicName": "MadeUpMode",
                "_difficultyBeatmaps": [
                    {"_difficulty": "Easy", "_beatmapFilename": "MadeUp.dat"}
                ]
            },
            null
        ]
    }"#;

    fn write_folder(file_name: &str, contents: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(file_name), contents).unwrap();
        temp_dir
    }

    #[test]
    fn test_parse_full_descriptor() {
        let folder = write_folder("info.dat", INFO);
        let descriptor = parse(folder.path()).unwrap();

        assert_eq!(descriptor.song_name, "Song");
        assert_eq!(descriptor.level_author_name, "Mapper");
        assert_eq!(descriptor.beats_per_minute, 120.0);
        assert_eq!(descriptor.shuffle_period, 0.25);
        assert_eq!(descriptor.song_filename, "song.ogg");
        assert_eq!(descriptor.source, folder.path().join("info.dat"));

        assert_eq!(descriptor.difficulty_sets.len(), 1);
        let set = &descriptor.difficulty_sets[0];
        assert_eq!(set.characteristic, Characteristic::Standard);
        assert_eq!(set.beatmaps[1].difficulty, Difficulty::ExpertPlus);
        assert_eq!(set.beatmaps[1].note_jump_movement_speed, 18.0);

        assert_eq!(
            descriptor.beatmap_filenames,
            vec!["Hard.dat", "ExpertPlus.dat", "MadeUp.dat"]
        );
        assert_eq!(
            descriptor.reference_beatmap_filename(),
            Some("ExpertPlus.dat")
        );
    }

    #[test]
    fn test_capitalized_file_name_accepted() {
        let folder = write_folder("Info.dat", INFO);
        assert!(parse(folder.path()).is_some());
    }

    #[test]
    fn test_missing_descriptor() {
        let folder = TempDir::new().unwrap();
        assert!(parse(folder.path()).is_none());
        assert!(matches!(
            Descriptor::from_folder(folder.path()),
            Err(DescriptorError::Missing(_))
        ));
    }

    #[test]
    fn test_malformed_descriptor() {
        let folder = write_folder("info.dat", "{ \"_songName\": ");
        assert!(parse(folder.path()).is_none());

        let folder = write_folder("info.dat", "[1, 2, 3]");
        assert!(matches!(
            Descriptor::from_folder(folder.path()),
            Err(DescriptorError::Malformed { .. })
        ));
    }

    #[test]
    fn test_null_strings_become_empty() {
        let folder = write_folder(
            "info.dat",
            r#"{"_songName": "Song", "_songAuthorName": null, "_beatsPerMinute": 100}"#,
        );
        let descriptor = parse(folder.path()).unwrap();
        assert_eq!(descriptor.song_name, "Song");
        assert_eq!(descriptor.song_author_name, "");
        assert_eq!(descriptor.level_author_name, "");
        assert_eq!(descriptor.song_sub_name, "");
        assert!(descriptor.difficulty_sets.is_empty());
        assert!(descriptor.reference_beatmap_filename().is_none());
    }

    #[test]
    fn test_byte_order_mark_tolerated() {
        let folder = TempDir::new().unwrap();
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(INFO.as_bytes());
        fs::write(folder.path().join("info.dat"), bytes).unwrap();

        assert_eq!(parse(folder.path()).unwrap().song_name, "Song");
    }

    #[test]
    fn test_unknown_difficulty_defaults_to_easy() {
        let folder = write_folder(
            "info.dat",
            r#"{"_difficultyBeatmapSets": [{"_beatmapCharacteristicName": "OneSaber",
                "_difficultyBeatmaps": [{"_difficulty": "Impossible", "_beatmapFilename": "x.dat"}]}]}"#,
        );
        let descriptor = parse(folder.path()).unwrap();
        let set = &descriptor.difficulty_sets[0];
        assert_eq!(set.characteristic, Characteristic::OneSaber);
        assert_eq!(set.beatmaps[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_reference_beatmap_ignores_characteristic() {
        let folder = write_folder(
            "info.dat",
            r#"{"_difficultyBeatmapSets": [
                {"_beatmapCharacteristicName": "MadeUpMode",
                 "_difficultyBeatmaps": [{"_difficulty": "Easy", "_beatmapFilename": "Made.dat"}]},
                {"_beatmapCharacteristicName": "Standard",
                 "_difficultyBeatmaps": [{"_difficulty": "Expert", "_beatmapFilename": "Expert.dat"}]}
            ]}"#,
        );
        let descriptor = parse(folder.path()).unwrap();

        assert_eq!(descriptor.difficulty_sets.len(), 1);
        assert_eq!(descriptor.reference_beatmap_filename(), Some("Made.dat"));
    }

    #[test]
    fn test_characteristic_names() {
        for name in ["Standard", "NoArrows", "OneSaber", "360Degree", "90Degree", "Legacy", "Lightshow", "Lawless"] {
            let characteristic: Characteristic = name.parse().unwrap();
            assert_eq!(characteristic.to_string(), name);
        }
        assert!("standard".parse::<Characteristic>().is_err());
    }
}
