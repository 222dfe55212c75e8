//! Song duration resolution: cache, then audio probe, then beatmap timing

use crate::beatmap::{BeatmapTiming, BpmTimeProcessor};
use crate::cache::{CacheEntry, CacheStore};
use crate::descriptor::Descriptor;
use crate::probe::DurationProbe;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Work out how long the song in `folder` plays, in seconds, and record it
/// in the cache along with `hash`.
///
/// The cache lock is only held for the lookup and the write back, never while
/// probing.
pub fn resolve(
    descriptor: &Descriptor,
    folder: &Path,
    hash: &str,
    cache: &Mutex<CacheStore>,
    probe: &dyn DurationProbe,
) -> f32 {
    let cached = lock(cache)
        .get(folder)
        .and_then(|entry| entry.usable_duration(hash));

    let length = match cached {
        Some(length) => length,
        None => {
            let audio = folder.join(&descriptor.song_filename);
            let probed = probe.probe(&audio).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Audio probe failed");
                0.0
            });
            if is_usable(probed) {
                probed
            } else {
                length_from_map(descriptor, folder)
            }
        }
    };

    let length = clamp(length);
    lock(cache).put(
        folder,
        CacheEntry {
            hash: Some(hash.to_string()),
            song_duration: Some(length),
        },
    );
    length
}

/// Length derived from the last beat of the reference beatmap. Any failure
/// yields 0.
pub fn length_from_map(descriptor: &Descriptor, folder: &Path) -> f32 {
    let Some(beatmap_filename) = descriptor.reference_beatmap_filename() else {
        tracing::error!(path = %folder.display(), "No difficulty to derive length from");
        return 0.0;
    };

    let path = folder.join(beatmap_filename);
    if !path.is_file() {
        tracing::error!(path = %path.display(), "Beatmap file doesn't exist");
        return 0.0;
    }

    let timing = match fs::read(&path) {
        Ok(bytes) => BeatmapTiming::from_slice(&bytes),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Can't read beatmap file");
            return 0.0;
        }
    };
    let timing = match timing {
        Ok(timing) => timing,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Beatmap file is corrupted");
            return 0.0;
        }
    };

    BpmTimeProcessor::new(descriptor.beats_per_minute, &timing.bpm_events)
        .beat_to_time(timing.highest_beat())
}

fn is_usable(length: f32) -> bool {
    length.is_finite() && length > 0.0
}

fn clamp(length: f32) -> f32 {
    if is_usable(length) {
        length
    } else {
        0.0
    }
}

fn lock(cache: &Mutex<CacheStore>) -> std::sync::MutexGuard<'_, CacheStore> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
