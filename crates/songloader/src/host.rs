//! Interface to the application embedding the loader

use crate::catalog::PackCollection;
use std::time::Duration;

/// Hooks the loader calls into its host.
///
/// `packs_published` runs on the dispatcher thread; the others may run on any
/// thread.
pub trait Host: Send + Sync {
    /// Whether a refresh makes sense right now. Refresh requests made while
    /// this is false are ignored.
    fn can_refresh(&self) -> bool {
        true
    }

    /// The pack collection was rebuilt and should replace whatever the host
    /// is showing.
    fn packs_published(&self, _packs: &PackCollection) {}

    /// A scan finished loading `songs` songs in `elapsed`.
    fn scan_finished(&self, _songs: usize, _elapsed: Duration) {}
}

/// Host with no UI that always accepts refreshes
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessHost;

impl Host for HeadlessHost {}
