//! Beatmap timing data, used to derive a song's length when its audio can't
//! be probed

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BeatObject {
    #[serde(alias = "_time", default)]
    pub b: f32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BpmEvent {
    #[serde(alias = "_time", default)]
    pub b: f32,
    #[serde(alias = "_BPM", alias = "_bpm", default)]
    pub m: f32,
}

/// Timing-relevant arrays of a beatmap file. Both the v3 layout and the
/// older underscore-prefixed v2 layout are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeatmapTiming {
    #[serde(rename = "colorNotes", alias = "_notes", default)]
    pub color_notes: Vec<BeatObject>,
    #[serde(rename = "basicBeatmapEvents", alias = "_events", default)]
    pub basic_events: Vec<BeatObject>,
    #[serde(rename = "bpmEvents", alias = "_BPMChanges", default)]
    pub bpm_events: Vec<BpmEvent>,
}

impl BeatmapTiming {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        serde_json::from_slice(bytes)
    }

    /// Highest beat over the color notes, or over the basic events when the
    /// map has no notes
    pub fn highest_beat(&self) -> f32 {
        let objects = if self.color_notes.is_empty() {
            &self.basic_events
        } else {
            &self.color_notes
        };
        objects.iter().map(|object| object.b).fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BpmRegion {
    start_time: f32,
    start_beat: f32,
    bpm: f32,
}

/// Converts beats to seconds across tempo changes.
///
/// Regions are built from the events in declaration order. An event at beat
/// zero replaces the song's starting tempo.
#[derive(Debug, Clone)]
pub struct BpmTimeProcessor {
    regions: Vec<BpmRegion>,
}

impl BpmTimeProcessor {
    pub fn new(start_bpm: f32, events: &[BpmEvent]) -> Self {
        let starts_at_zero = events.first().is_some_and(|event| event.b == 0.0);
        let start_bpm = if starts_at_zero { events[0].m } else { start_bpm };

        let mut regions = vec![BpmRegion {
            start_time: 0.0,
            start_beat: 0.0,
            bpm: start_bpm,
        }];
        for event in events.iter().skip(usize::from(starts_at_zero)) {
            let previous = regions[regions.len() - 1];
            regions.push(BpmRegion {
                start_time: previous.start_time
                    + (event.b - previous.start_beat) / previous.bpm * 60.0,
                start_beat: event.b,
                bpm: event.m,
            });
        }

        Self { regions }
    }

    pub fn beat_to_time(&self, beat: f32) -> f32 {
        let mut index = 0;
        while index + 1 < self.regions.len() && self.regions[index + 1].start_beat < beat {
            index += 1;
        }
        let region = self.regions[index];
        region.start_time + (beat - region.start_beat) / region.bpm * 60.0
    }
}
