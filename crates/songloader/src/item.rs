use crate::descriptor::DifficultySet;
use std::path::PathBuf;

/// Suffix appended to the level id of songs from the WIP root
pub const WIP_SUFFIX: &str = " WIP";

/// One loaded song.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub level_id: String,
    pub hash: String,
    pub path: PathBuf,
    pub is_wip: bool,
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
    pub difficulty_sets: Vec<DifficultySet>,
    /// Playback length in seconds; 0 when it couldn't be determined
    pub song_duration: f32,
}

/// `prefix + hash`, plus [`WIP_SUFFIX`] for WIP songs
pub fn level_id(prefix: &str, hash: &str, is_wip: bool) -> String {
    let mut id = format!("{prefix}{hash}");
    if is_wip {
        id.push_str(WIP_SUFFIX);
    }
    id
}
