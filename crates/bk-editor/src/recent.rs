//! Recently used images.
//!
//! The editor session owns an injected store instead of reaching for
//! global browser storage, so hosts can persist it and tests can swap in
//! their own.

use bk_core::model::ImageSource;
use std::collections::VecDeque;

pub const RECENT_IMAGES_CAPACITY: usize = 12;

pub trait RecentImageStore {
    /// Record a use. The image moves to the front; the oldest entry falls
    /// off when full.
    fn push(&mut self, image: ImageSource);
    /// Most recent first.
    fn list(&self) -> Vec<ImageSource>;
    fn clear(&mut self);
}

/// In-memory bounded store, de-duplicated by URL.
#[derive(Debug, Clone)]
pub struct RingBufferStore {
    entries: VecDeque<ImageSource>,
    capacity: usize,
}

impl RingBufferStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RingBufferStore {
    fn default() -> Self {
        Self::new(RECENT_IMAGES_CAPACITY)
    }
}

impl RecentImageStore for RingBufferStore {
    fn push(&mut self, image: ImageSource) {
        self.entries.retain(|e| e.url != image.url);
        self.entries.push_front(image);
        self.entries.truncate(self.capacity);
    }

    fn list(&self) -> Vec<ImageSource> {
        self.entries.iter().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn img(n: usize) -> ImageSource {
        ImageSource {
            url: format!("https://cdn.example.com/{n}.jpg"),
            width: 640.0,
            height: 480.0,
        }
    }

    fn urls(store: &RingBufferStore) -> Vec<String> {
        store.list().into_iter().map(|i| i.url).collect()
    }

    #[test]
    fn newest_first_and_bounded() {
        let mut store = RingBufferStore::default();
        for n in 0..15 {
            store.push(img(n));
        }
        assert_eq!(store.len(), RECENT_IMAGES_CAPACITY);
        let list = urls(&store);
        assert_eq!(list[0], img(14).url);
        assert_eq!(list[11], img(3).url);
    }

    #[test]
    fn reuse_moves_to_front_without_duplicating() {
        let mut store = RingBufferStore::new(3);
        store.push(img(1));
        store.push(img(2));
        store.push(img(1));
        assert_eq!(urls(&store), vec![img(1).url, img(2).url]);
    }
}
