//! Loading of a single song folder

use crate::cache::CacheStore;
use crate::descriptor;
use crate::duration;
use crate::environment::EnvironmentRegistry;
use crate::error::LoadError;
use crate::hash;
use crate::item::{self, Item};
use crate::probe::DurationProbe;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Turns one folder into one [`Item`]. This is the unit of work handed to
/// scan workers; it does no threading of its own.
#[derive(Clone)]
pub struct ItemLoader {
    level_id_prefix: String,
    environments: Arc<EnvironmentRegistry>,
    probe: Arc<dyn DurationProbe>,
    cache: Arc<Mutex<CacheStore>>,
}

impl ItemLoader {
    pub fn new(
        level_id_prefix: impl Into<String>,
        environments: Arc<EnvironmentRegistry>,
        probe: Arc<dyn DurationProbe>,
        cache: Arc<Mutex<CacheStore>>,
    ) -> Self {
        Self {
            level_id_prefix: level_id_prefix.into(),
            environments,
            probe,
            cache,
        }
    }

    pub fn load_one(&self, folder: &Path, is_wip: bool) -> Result<Item, LoadError> {
        let descriptor =
            descriptor::parse(folder).ok_or_else(|| LoadError::NotAnItem(folder.to_path_buf()))?;
        let hash = hash::compute(&descriptor, folder)?;
        let level_id = item::level_id(&self.level_id_prefix, &hash, is_wip);

        tracing::debug!(
            level_id = %level_id,
            song_name = %descriptor.song_name,
            song_sub_name = %descriptor.song_sub_name,
            song_author_name = %descriptor.song_author_name,
            level_author_name = %descriptor.level_author_name,
            beats_per_minute = descriptor.beats_per_minute,
            song_time_offset = descriptor.song_time_offset,
            shuffle = descriptor.shuffle,
            shuffle_period = descriptor.shuffle_period,
            preview_start_time = descriptor.preview_start_time,
            preview_duration = descriptor.preview_duration,
            "Parsed level"
        );

        let environment_name = self
            .environments
            .resolve(&descriptor.environment_name, false)
            .to_string();
        let all_directions_environment_name = self
            .environments
            .resolve(&descriptor.all_directions_environment_name, true)
            .to_string();

        let song_duration = duration::resolve(
            &descriptor,
            folder,
            &hash,
            &self.cache,
            self.probe.as_ref(),
        );

        Ok(Item {
            level_id,
            hash,
            path: folder.to_path_buf(),
            is_wip,
            song_name: descriptor.song_name,
            song_sub_name: descriptor.song_sub_name,
            song_author_name: descriptor.song_author_name,
            level_author_name: descriptor.level_author_name,
            beats_per_minute: descriptor.beats_per_minute,
            song_time_offset: descriptor.song_time_offset,
            shuffle: descriptor.shuffle,
            shuffle_period: descriptor.shuffle_period,
            preview_start_time: descriptor.preview_start_time,
            preview_duration: descriptor.preview_duration,
            song_filename: descriptor.song_filename,
            cover_image_filename: descriptor.cover_image_filename,
            environment_name,
            all_directions_environment_name,
            difficulty_sets: descriptor.difficulty_sets,
            song_duration,
        })
    }
}
