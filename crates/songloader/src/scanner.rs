//! Song library scanning, publication and deletion
//!
//! [`SongLoader`] owns the catalog. A refresh runs on its own background
//! thread, fans the folders of both content roots out to a fixed set of
//! workers and, once every worker is done, hands publication over to the
//! dispatcher thread.

use crate::cache::CacheStore;
use crate::catalog::{Catalog, Pack, PackCollection};
use crate::dispatcher::Dispatcher;
use crate::environment::EnvironmentRegistry;
use crate::events::{SubscriptionId, Subscribers};
use crate::host::Host;
use crate::item::Item;
use crate::loader::ItemLoader;
use crate::probe::DurationProbe;
use crate::settings::Settings;
use crossbeam::channel;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use walkdir::WalkDir;

type SongsLoaded = Box<dyn FnOnce(&[Arc<Item>]) + Send + 'static>;

/// Completion callback of a refresh, held outside its thread so it can still
/// be called when the thread fails to start
type PendingCompletion = Arc<Mutex<Option<SongsLoaded>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRoot {
    Custom,
    Wip,
}

/// Folders found by the current scan and how many of them have loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub total_folders: usize,
    pub completed_folders: usize,
}

/// Immediate subdirectories of `root`, sorted by name. A missing root is
/// treated as empty.
pub fn list_subfolders(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "Content root doesn't exist");
        return Vec::new();
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Catalog plus the folders loaded by the scan in progress, behind one lock
#[derive(Default)]
struct CatalogState {
    catalog: Catalog,
    loaded_paths: Vec<PathBuf>,
}

struct Packs {
    custom: Pack,
    wip: Pack,
}

struct Shared {
    settings: Settings,
    host: Arc<dyn Host>,
    loader: ItemLoader,
    cache: Arc<Mutex<CacheStore>>,
    catalog: Mutex<CatalogState>,
    packs: Mutex<Packs>,
    pack_collection: Mutex<PackCollection>,
    loaded_items: Mutex<Vec<Arc<Item>>>,
    is_loading: AtomicBool,
    has_loaded: AtomicBool,
    /// Raised when a refresh is requested mid-scan. Nothing stops on it.
    loading_cancelled: AtomicBool,
    max_folders: AtomicUsize,
    current_folder: AtomicUsize,
    dispatcher: Dispatcher,
    /// Refresh and delete threads that may still be running
    background: Mutex<Vec<JoinHandle<()>>>,
    /// Held by a refresh from its first catalog write until its cache flush
    refresh_gate: Mutex<()>,
    catalog_loaded: Subscribers<[Arc<Item>]>,
    packs_refreshed: Subscribers<PackCollection>,
    item_deleted: Subscribers<()>,
}

/// Handle to the song loader service. Cloning is cheap and every clone
/// refers to the same catalog.
#[derive(Clone)]
pub struct SongLoader {
    shared: Arc<Shared>,
}

impl SongLoader {
    /// Load the cache and start the dispatcher thread
    pub fn new(
        settings: Settings,
        host: Arc<dyn Host>,
        probe: Arc<dyn DurationProbe>,
    ) -> std::io::Result<Self> {
        Self::with_environments(settings, host, probe, EnvironmentRegistry::default())
    }

    pub fn with_environments(
        settings: Settings,
        host: Arc<dyn Host>,
        probe: Arc<dyn DurationProbe>,
        environments: EnvironmentRegistry,
    ) -> std::io::Result<Self> {
        let cache = Arc::new(Mutex::new(CacheStore::load(&settings.library.cache_file)));
        let loader = ItemLoader::new(
            settings.loader.level_id_prefix.clone(),
            Arc::new(environments),
            probe,
            Arc::clone(&cache),
        );
        let dispatcher = Dispatcher::spawn("song-dispatcher")?;

        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                host,
                loader,
                cache,
                catalog: Mutex::new(CatalogState::default()),
                packs: Mutex::new(Packs {
                    custom: Pack::custom_levels(),
                    wip: Pack::custom_wip_levels(),
                }),
                pack_collection: Mutex::new(PackCollection::default()),
                loaded_items: Mutex::new(Vec::new()),
                is_loading: AtomicBool::new(false),
                has_loaded: AtomicBool::new(false),
                loading_cancelled: AtomicBool::new(false),
                max_folders: AtomicUsize::new(0),
                current_folder: AtomicUsize::new(0),
                dispatcher,
                background: Mutex::new(Vec::new()),
                refresh_gate: Mutex::new(()),
                catalog_loaded: Subscribers::default(),
                packs_refreshed: Subscribers::default(),
                item_deleted: Subscribers::default(),
            }),
        })
    }

    /// Rescan both content roots and republish the catalog.
    ///
    /// Ignored while a scan is running or when the host refuses refreshes.
    /// Otherwise `songs_loaded` is called exactly once, on the dispatcher
    /// thread, with every loaded song. A refresh accepted while the previous
    /// one is still flushing the cache waits for that flush before scanning.
    pub fn refresh<F>(&self, full_refresh: bool, songs_loaded: F)
    where
        F: FnOnce(&[Arc<Item>]) + Send + 'static,
    {
        let shared = &self.shared;
        if shared.is_loading.load(Ordering::SeqCst) {
            shared.loading_cancelled.store(true, Ordering::SeqCst);
            tracing::debug!("Refresh already in progress, ignoring request");
            return;
        }
        if !shared.host.can_refresh() {
            tracing::debug!("Host doesn't accept refreshes right now");
            return;
        }
        if shared
            .is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            shared.loading_cancelled.store(true, Ordering::SeqCst);
            return;
        }
        shared.loading_cancelled.store(false, Ordering::SeqCst);
        shared.has_loaded.store(false, Ordering::SeqCst);
        shared.current_folder.store(0, Ordering::SeqCst);

        let pending: PendingCompletion = Arc::new(Mutex::new(Some(Box::new(songs_loaded))));
        let worker = Arc::clone(shared);
        let completion = Arc::clone(&pending);
        let spawned = thread::Builder::new()
            .name("song-refresh".to_string())
            .spawn(move || {
                let songs_loaded = lock(&completion).take();
                if let Some(songs_loaded) = songs_loaded {
                    worker.run_refresh(full_refresh, songs_loaded);
                }
            });
        match spawned {
            Ok(handle) => shared.track(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start refresh thread");
                let songs_loaded = lock(&pending).take();
                if let Some(songs_loaded) = songs_loaded {
                    shared.abandon_refresh(songs_loaded);
                }
            }
        }
    }

    /// Delete a song folder from disk and from the catalog, then notify
    /// deletion subscribers followed by `finished` on the dispatcher thread.
    pub fn delete_item<F>(&self, path: impl Into<PathBuf>, finished: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let path = path.into();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("song-delete".to_string())
            .spawn(move || shared.delete(path, Box::new(finished)));
        match spawned {
            Ok(handle) => self.shared.track(handle),
            Err(e) => tracing::error!(error = %e, "Failed to start delete thread"),
        }
    }

    /// Schedule a rebuild of the pack collection and notify pack subscribers,
    /// without rescanning
    pub fn republish_packs(&self, include_default: bool) {
        let shared = Arc::clone(&self.shared);
        self.shared
            .dispatcher
            .schedule(move || shared.refresh_level_packs(include_default));
    }

    /// Songs published by the last refresh, minus any deleted since
    pub fn loaded_items(&self) -> Vec<Arc<Item>> {
        lock(&self.shared.loaded_items).clone()
    }

    pub fn item_at(&self, path: &Path) -> Option<Arc<Item>> {
        lock(&self.shared.catalog).catalog.get(path).cloned()
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.is_loading.load(Ordering::SeqCst)
    }

    pub fn has_loaded(&self) -> bool {
        self.shared.has_loaded.load(Ordering::SeqCst)
    }

    /// Whether a refresh was requested while the current one was running.
    /// Scans in flight do not react to it.
    pub fn cancellation_requested(&self) -> bool {
        self.shared.loading_cancelled.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            total_folders: self.shared.max_folders.load(Ordering::Relaxed),
            completed_folders: self.shared.current_folder.load(Ordering::Relaxed),
        }
    }

    /// Pack collection as of the last publication
    pub fn packs(&self) -> PackCollection {
        lock(&self.shared.pack_collection).clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn on_catalog_loaded<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[Arc<Item>]) + Send + Sync + 'static,
    {
        self.shared.catalog_loaded.subscribe(callback)
    }

    pub fn remove_catalog_loaded(&self, id: SubscriptionId) -> bool {
        self.shared.catalog_loaded.unsubscribe(id)
    }

    pub fn on_packs_refreshed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PackCollection) + Send + Sync + 'static,
    {
        self.shared.packs_refreshed.subscribe(callback)
    }

    pub fn remove_packs_refreshed(&self, id: SubscriptionId) -> bool {
        self.shared.packs_refreshed.unsubscribe(id)
    }

    pub fn on_item_deleted<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.item_deleted.subscribe(move |_: &()| callback())
    }

    pub fn remove_item_deleted(&self, id: SubscriptionId) -> bool {
        self.shared.item_deleted.unsubscribe(id)
    }

    /// Wait for running refreshes and deletions (cache flush included), then
    /// stop the dispatcher. Later refreshes and deletions still update the
    /// catalog but no longer notify anyone.
    ///
    /// Called from a subscriber, only the dispatcher is stopped; background
    /// threads waiting on it are not joined.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        if !shared.dispatcher.is_current_thread() {
            let handles = std::mem::take(&mut *lock(&shared.background));
            for handle in handles {
                if handle.join().is_err() {
                    tracing::error!("Background thread panicked");
                }
            }
        }
        shared.dispatcher.shutdown();
    }
}

impl Shared {
    fn track(&self, handle: JoinHandle<()>) {
        let mut background = lock(&self.background);
        background.retain(|running| !running.is_finished());
        background.push(handle);
    }

    fn run_refresh(self: &Arc<Self>, full_refresh: bool, songs_loaded: SongsLoaded) {
        let _gate = lock(&self.refresh_gate);
        let start = Instant::now();

        {
            let mut state = lock(&self.catalog);
            state.loaded_paths.clear();
            if full_refresh {
                state.catalog.clear();
            }
        }

        let library = &self.settings.library;
        let folders: Vec<(PathBuf, ContentRoot)> = list_subfolders(&library.custom_levels)
            .into_iter()
            .map(|path| (path, ContentRoot::Custom))
            .chain(
                list_subfolders(&library.custom_wip_levels)
                    .into_iter()
                    .map(|path| (path, ContentRoot::Wip)),
            )
            .collect();
        self.max_folders.store(folders.len(), Ordering::Relaxed);

        self.scan_folders(&folders);

        let (custom_items, wip_items, loaded_paths) = {
            let mut state = lock(&self.catalog);
            (
                state.catalog.custom_items(),
                state.catalog.wip_items(),
                std::mem::take(&mut state.loaded_paths),
            )
        };
        {
            let mut packs = lock(&self.packs);
            packs.custom.set_items(custom_items.clone());
            packs.wip.set_items(wip_items.clone());
        }

        let mut loaded = custom_items;
        loaded.extend(wip_items);

        let elapsed = start.elapsed();
        tracing::info!(
            songs = loaded.len(),
            folders = folders.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Loaded songs"
        );
        self.host.scan_finished(loaded.len(), elapsed);
        *lock(&self.loaded_items) = loaded.clone();

        let (published_tx, published_rx) = channel::bounded::<()>(1);
        let shared = Arc::clone(self);
        self.dispatcher.schedule(move || {
            shared.publish(&loaded, songs_loaded);
            let _ = published_tx.send(());
        });
        if published_rx.recv().is_err() {
            tracing::error!("Publication did not complete");
            self.is_loading.store(false, Ordering::SeqCst);
        }

        lock(&self.cache).flush(&loaded_paths);
    }

    /// Return to idle after a refresh that never scanned, reporting the songs
    /// of the last publication to `songs_loaded` on the dispatcher thread
    fn abandon_refresh(&self, songs_loaded: SongsLoaded) {
        self.is_loading.store(false, Ordering::SeqCst);
        let loaded = lock(&self.loaded_items).clone();
        self.dispatcher.schedule(move || contained("songs_loaded", || songs_loaded(&loaded)));
    }

    /// Load every folder on up to `max_workers` threads. Workers claim the
    /// next folder from a shared index until none are left.
    fn scan_folders(&self, folders: &[(PathBuf, ContentRoot)]) {
        let workers = folders.len().min(self.settings.max_workers());
        let next_index = &AtomicUsize::new(0);
        let finished = &AtomicUsize::new(0);

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .filter_map(|worker| {
                    thread::Builder::new()
                        .name(format!("song-loader-{worker}"))
                        .spawn_scoped(scope, move || {
                            let _done = WorkerDone(finished);
                            self.work(folders, next_index);
                        })
                        .map_err(|e| tracing::error!(error = %e, "Failed to start loader thread"))
                        .ok()
                })
                .collect();

            while finished.load(Ordering::Acquire) < handles.len() {
                thread::yield_now();
            }
            for handle in handles {
                if handle.join().is_err() {
                    tracing::error!("Loader thread panicked");
                }
            }
        });
    }

    fn work(&self, folders: &[(PathBuf, ContentRoot)], next_index: &AtomicUsize) {
        loop {
            let index = next_index.fetch_add(1, Ordering::Relaxed);
            let Some((path, root)) = folders.get(index) else {
                break;
            };
            self.load_folder(path, *root);
        }
    }

    /// Load one folder into the catalog, reusing a previously loaded item for
    /// the same path
    fn load_folder(&self, path: &Path, root: ContentRoot) {
        tracing::info!(path = %path.display(), "Loading...");
        let start = Instant::now();
        let is_wip = root == ContentRoot::Wip;

        let existing = lock(&self.catalog).catalog.get(path).cloned();
        let item = match existing {
            Some(item) => item,
            None => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| self.loader.load_one(path, is_wip)));
                match result {
                    Ok(Ok(item)) => Arc::new(item),
                    Ok(Err(e)) => {
                        tracing::error!(path = %path.display(), error = %e, "Failed loading");
                        return;
                    }
                    Err(_) => {
                        tracing::error!(path = %path.display(), "Failed loading, loader panicked");
                        return;
                    }
                }
            }
        };

        {
            let mut state = lock(&self.catalog);
            state.catalog.insert_if_absent(path, item);
            state.loaded_paths.push(path.to_path_buf());
            self.current_folder.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!(
            path = %path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded"
        );
    }

    /// Runs on the dispatcher thread
    fn publish(&self, loaded: &[Arc<Item>], songs_loaded: SongsLoaded) {
        self.refresh_level_packs(true);

        self.is_loading.store(false, Ordering::SeqCst);
        self.has_loaded.store(true, Ordering::SeqCst);

        contained("songs_loaded", || songs_loaded(loaded));
        self.catalog_loaded.notify(loaded);
    }

    /// Runs on the dispatcher thread
    fn refresh_level_packs(&self, include_default: bool) {
        let collection = {
            let mut collection = lock(&self.pack_collection);
            collection.clear();
            if include_default {
                let mut packs = lock(&self.packs);
                packs.custom.sort();
                collection.add(packs.custom.clone());
                packs.wip.sort();
                collection.add(packs.wip.clone());
            }
            collection.clone()
        };

        self.packs_refreshed.notify(&collection);
        contained("packs_published", || self.host.packs_published(&collection));
    }

    fn delete(self: &Arc<Self>, path: PathBuf, finished: Box<dyn FnOnce() + Send + 'static>) {
        if let Err(e) = fs::remove_dir_all(&path) {
            tracing::error!(path = %path.display(), error = %e, "Failed to delete song folder");
        }
        lock(&self.catalog).catalog.remove(&path);
        lock(&self.loaded_items).retain(|item| item.path != path);
        tracing::info!(path = %path.display(), "Deleted song");

        let shared = Arc::clone(self);
        self.dispatcher.schedule(move || {
            shared.item_deleted.notify(&());
            contained("delete_finished", finished);
        });
    }
}

/// Counts a loader thread as finished however it exits
struct WorkerDone<'a>(&'a AtomicUsize);

impl Drop for WorkerDone<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

/// Run a caller-supplied callback, logging a panic instead of unwinding
fn contained(callback: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback, "Callback panicked");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::host::HeadlessHost;
    use std::time::Duration;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn write_song(folder: &Path, name: &str) {
        fs::create_dir_all(folder).unwrap();
        fs::write(
            folder.join("info.dat"),
            format!(
                r#"{{"_songName": "{name}", "_beatsPerMinute": 120, "_songFilename": "song.ogg",
                "_difficultyBeatmapSets": [{{"_beatmapCharacteristicName": "Standard",
                "_difficultyBeatmaps": [{{"_difficulty": "Expert", "_beatmapFilename": "Expert.dat"}}]}}]}}"#
            ),
        )
        .unwrap();
        fs::write(folder.join("Expert.dat"), format!(r#"{{"colorNotes": [{{"b": 10}}], "_name": "{name}"}}"#))
            .unwrap();
    }

    fn service(root: &Path) -> SongLoader {
        let probe = |_: &Path| -> Result<f32, ProbeError> { Ok(30.0) };
        SongLoader::new(Settings::rooted_at(root), Arc::new(HeadlessHost), Arc::new(probe)).unwrap()
    }

    fn refresh_and_wait(loader: &SongLoader, full_refresh: bool) -> Vec<Arc<Item>> {
        let (tx, rx) = channel::bounded(1);
        loader.refresh(full_refresh, move |items| {
            tx.send(items.to_vec()).unwrap();
        });
        rx.recv_timeout(TIMEOUT).unwrap()
    }

    #[test]
    fn test_list_subfolders() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::create_dir_all(temp_dir.path().join("a/nested")).unwrap();
        fs::write(temp_dir.path().join("file.txt"), b"x").unwrap();

        let folders = list_subfolders(temp_dir.path());
        assert_eq!(folders, vec![temp_dir.path().join("a"), temp_dir.path().join("b")]);

        assert!(list_subfolders(&temp_dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_refresh_loads_both_roots() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_song(&root.join("CustomLevels/one"), "One");
        write_song(&root.join("CustomWIPLevels/two"), "Two");
        fs::create_dir_all(root.join("CustomLevels/not-a-song")).unwrap();

        let loader = service(root);
        let items = refresh_and_wait(&loader, true);

        assert_eq!(items.len(), 2);
        let wip = items.iter().find(|item| item.is_wip).unwrap();
        assert_eq!(wip.song_name, "Two");
        assert!(wip.level_id.ends_with(" WIP"));
        assert_eq!(loader.progress(), LoadProgress { total_folders: 3, completed_folders: 2 });
        assert!(loader.has_loaded());
        assert!(!loader.is_scanning());
    }

    #[test]
    fn test_packs_published() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_song(&root.join("CustomLevels/b"), "Bravo");
        write_song(&root.join("CustomLevels/a"), "Alpha");

        let loader = service(root);
        refresh_and_wait(&loader, true);

        let packs = loader.packs();
        assert_eq!(packs.packs().len(), 2);
        let custom = packs.find("custom_levelpack_CustomLevels").unwrap();
        let names: Vec<_> = custom.items().iter().map(|i| i.song_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
        assert!(packs.find("custom_levelpack_CustomWIPLevels").unwrap().items().is_empty());
    }

    #[test]
    fn test_refresh_rejected_while_scanning() {
        let temp_dir = TempDir::new().unwrap();
        let loader = service(temp_dir.path());
        loader.shared.is_loading.store(true, Ordering::SeqCst);

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        loader.refresh(true, move |_| flag.store(true, Ordering::SeqCst));

        thread::sleep(Duration::from_millis(50));
        assert!(!called.load(Ordering::SeqCst));
        assert!(loader.cancellation_requested());
    }

    #[test]
    fn test_host_can_veto_refresh() {
        struct Busy;
        impl Host for Busy {
            fn can_refresh(&self) -> bool {
                false
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let probe = |_: &Path| -> Result<f32, ProbeError> { Ok(1.0) };
        let loader =
            SongLoader::new(Settings::rooted_at(temp_dir.path()), Arc::new(Busy), Arc::new(probe)).unwrap();

        loader.refresh(true, |_| panic!("must not run"));
        assert!(!loader.is_scanning());
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_publication() {
        let temp_dir = TempDir::new().unwrap();
        write_song(&temp_dir.path().join("CustomLevels/one"), "One");
        let loader = service(temp_dir.path());

        loader.on_packs_refreshed(|_| panic!("pack subscriber failure"));
        loader.on_catalog_loaded(|_| panic!("catalog subscriber failure"));
        let (tx, rx) = channel::bounded(1);
        loader.on_catalog_loaded(move |items| tx.send(items.len()).unwrap());

        let items = refresh_and_wait(&loader, true);

        assert_eq!(items.len(), 1);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 1);
        assert!(loader.has_loaded());
        assert!(!loader.is_scanning());
        assert_eq!(loader.packs().packs().len(), 2);
    }

    #[test]
    fn test_abandoned_refresh_still_completes() {
        let temp_dir = TempDir::new().unwrap();
        write_song(&temp_dir.path().join("CustomLevels/one"), "One");
        let loader = service(temp_dir.path());
        refresh_and_wait(&loader, true);

        loader.shared.is_loading.store(true, Ordering::SeqCst);
        let (tx, rx) = channel::bounded(1);
        loader.shared.abandon_refresh(Box::new(move |items: &[Arc<Item>]| {
            tx.send((items.len(), thread::current().name().map(str::to_string)))
                .unwrap();
        }));

        let (count, thread_name) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(count, 1);
        assert_eq!(thread_name.as_deref(), Some("song-dispatcher"));
        assert!(!loader.is_scanning());
    }

    #[test]
    fn test_republish_packs() {
        let temp_dir = TempDir::new().unwrap();
        let loader = service(temp_dir.path());
        let (tx, rx) = channel::unbounded();
        loader.on_packs_refreshed(move |packs| tx.send(packs.packs().len()).unwrap());

        loader.republish_packs(false);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 0);
        loader.republish_packs(true);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 2);
    }
}
