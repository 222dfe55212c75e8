//! Loaded songs, keyed by folder, and the packs built from them

use crate::item::Item;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The two disjoint folder -> item mappings, one per content root.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    custom: HashMap<PathBuf, Arc<Item>>,
    wip: HashMap<PathBuf, Arc<Item>>,
}

impl Catalog {
    pub fn clear(&mut self) {
        self.custom.clear();
        self.wip.clear();
    }

    /// Item previously loaded from `path`, from either root
    pub fn get(&self, path: &Path) -> Option<&Arc<Item>> {
        self.custom.get(path).or_else(|| self.wip.get(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Insert unless `path` is already present in either mapping. Returns
    /// whether the item was inserted.
    pub fn insert_if_absent(&mut self, path: &Path, item: Arc<Item>) -> bool {
        if self.contains(path) {
            return false;
        }
        let map = if item.is_wip {
            &mut self.wip
        } else {
            &mut self.custom
        };
        map.insert(path.to_path_buf(), item);
        true
    }

    /// Remove `path` from both mappings; returns the removed item if any.
    pub fn remove(&mut self, path: &Path) -> Option<Arc<Item>> {
        let custom = self.custom.remove(path);
        let wip = self.wip.remove(path);
        custom.or(wip)
    }

    pub fn custom_items(&self) -> Vec<Arc<Item>> {
        self.custom.values().cloned().collect()
    }

    pub fn wip_items(&self) -> Vec<Arc<Item>> {
        self.wip.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.custom.len() + self.wip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named, ordered view over one root's songs.
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub id: String,
    pub name: String,
    items: Vec<Arc<Item>>,
}

impl Pack {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn custom_levels() -> Self {
        Self::new("custom_levelpack_CustomLevels", "Custom Levels")
    }

    pub fn custom_wip_levels() -> Self {
        Self::new("custom_levelpack_CustomWIPLevels", "WIP Levels")
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    /// Replace the pack's contents wholesale
    pub fn set_items(&mut self, items: Vec<Arc<Item>>) {
        self.items = items;
    }

    /// Order by song name, case-insensitively, then by level id
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| {
            a.song_name
                .to_lowercase()
                .cmp(&b.song_name.to_lowercase())
                .then_with(|| a.level_id.cmp(&b.level_id))
        });
    }
}

/// Packs handed to subscribers after a refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackCollection {
    packs: Vec<Pack>,
}

impl PackCollection {
    pub fn clear(&mut self) {
        self.packs.clear();
    }

    pub fn add(&mut self, pack: Pack) {
        self.packs.push(pack);
    }

    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    pub fn find(&self, id: &str) -> Option<&Pack> {
        self.packs.iter().find(|pack| pack.id == id)
    }

    pub fn item_count(&self) -> usize {
        self.packs.iter().map(|pack| pack.items.len()).sum()
    }
}
