use crate::config::CacheConfig;
use crate::gallery::ImageDescriptor;
use crate::image_loader::{DecodedImage, ImageLoader};
use crate::navigation::{Command, NavDirection};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use tracing::debug;

/// Direction of travel between two indices, if any.
pub fn direction_between(old: usize, new: usize) -> Option<NavDirection> {
    match new.cmp(&old) {
        std::cmp::Ordering::Greater => Some(NavDirection::Next),
        std::cmp::Ordering::Less => Some(NavDirection::Prev),
        std::cmp::Ordering::Equal => None,
    }
}

/// Neighbours of `current` worth fetching. With a known direction only the
/// image ahead is returned; otherwise both sides. Indices past either end
/// are dropped.
pub fn neighbors_to_preload(current: usize, total: usize, hint: Option<NavDirection>) -> Vec<usize> {
    let prev = current.checked_sub(1);
    let next = Some(current + 1).filter(|&i| i < total);

    match hint {
        Some(NavDirection::Next) => next.into_iter().collect(),
        Some(NavDirection::Prev) => prev.into_iter().collect(),
        None => prev.into_iter().chain(next).collect(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Preloader {
    enabled: bool,
}

impl Preloader {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn plan(&self, current: usize, total: usize, hint: Option<NavDirection>) -> Vec<Command> {
        if !self.enabled {
            return Vec::new();
        }
        neighbors_to_preload(current, total, hint)
            .into_iter()
            .map(Command::Preload)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Pending,
    Ready(Arc<DecodedImage>),
    Failed(String),
}

type DecodeResult = (String, Result<DecodedImage, String>);

/// Room for the shown image and both neighbours.
pub const MIN_CACHE_ENTRIES: usize = 3;

/// Decoded images keyed by source URL, filled by fire-and-forget worker
/// threads. Results are collected on the caller's thread by [`poll`].
///
/// [`poll`]: PreloadCache::poll
pub struct PreloadCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    max_entries: usize,
    max_dimension: u32,
    /// Source on screen; never evicted.
    pinned: Option<String>,
    tx: mpsc::Sender<DecodeResult>,
    rx: mpsc::Receiver<DecodeResult>,
}

impl PreloadCache {
    pub fn new(config: &CacheConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: config.max_entries.max(MIN_CACHE_ENTRIES),
            max_dimension: config.max_dimension,
            pinned: None,
            tx,
            rx,
        }
    }

    /// Starts decoding `image` in the background unless it is already cached
    /// or in flight. Never blocks.
    pub fn request(&mut self, image: &ImageDescriptor) {
        if !image.has_source() || self.entries.contains_key(&image.source_url) {
            return;
        }

        let source = image.source_url.clone();
        debug!(source = %source, "preload requested");
        self.insert(source.clone(), CacheEntry::Pending);

        let tx = self.tx.clone();
        let max_dimension = self.max_dimension;
        thread::spawn(move || {
            let result = ImageLoader::load_for_display(&source, max_dimension).map_err(|e| e.to_string());
            // The cache may already be gone
            let _ = tx.send((source, result));
        });
    }

    /// Like [`request`](Self::request), and keeps `image` cached until
    /// another image becomes current.
    pub fn request_current(&mut self, image: &ImageDescriptor) {
        if !image.has_source() {
            return;
        }
        self.pinned = Some(image.source_url.clone());
        self.request(image);
    }

    /// Moves finished decodes into the cache; returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let mut arrived = 0;
        while let Ok((source, result)) = self.rx.try_recv() {
            // Evicted while decoding
            if !self.entries.contains_key(&source) {
                continue;
            }
            let entry = match result {
                Ok(img) => CacheEntry::Ready(Arc::new(img)),
                Err(reason) => CacheEntry::Failed(reason),
            };
            self.entries.insert(source, entry);
            arrived += 1;
        }
        arrived
    }

    pub fn get(&self, source: &str) -> Option<&CacheEntry> {
        self.entries.get(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, source: String, entry: CacheEntry) {
        while self.order.len() >= self.max_entries {
            let Some(pos) = self.order.iter().position(|s| Some(s) != self.pinned.as_ref()) else {
                break;
            };
            if let Some(oldest) = self.order.remove(pos) {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(source.clone());
        self.entries.insert(source, entry);
    }
}
