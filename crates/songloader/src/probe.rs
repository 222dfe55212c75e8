//! Audio length probing

use crate::error::ProbeError;
use lofty::AudioFile;
use std::path::Path;

/// Reads the playback length, in seconds, of an audio file.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<f32, ProbeError>;
}

impl<F> DurationProbe for F
where
    F: Fn(&Path) -> Result<f32, ProbeError> + Send + Sync,
{
    fn probe(&self, path: &Path) -> Result<f32, ProbeError> {
        self(path)
    }
}

/// Probe backed by lofty's container parsers; only headers are read, the
/// stream is never decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyProbe;

impl DurationProbe for LoftyProbe {
    fn probe(&self, path: &Path) -> Result<f32, ProbeError> {
        if !path.is_file() {
            return Err(ProbeError::NotFound(path.to_path_buf()));
        }

        let tagged_file = lofty::read_from_path(path).map_err(|e| ProbeError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(tagged_file.properties().duration().as_secs_f32())
    }
}
