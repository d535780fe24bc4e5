use crate::core::geo::TileId;
use crate::prelude::HashMap;
use crate::rendering::context::{TileContext, TileState};
use crate::tiles::vector_tile::VectorTile;
use crate::traits::{CacheStats, Cacheable};
use std::cell::Cell;
use std::sync::Arc;

/// Arena of live tile contexts keyed by tile id.
///
/// Holds every tile that is shown or in flight, plus released tiles kept for
/// reuse when caching is enabled. Entries are never evicted on their own; the
/// owner removes them on release or `clear`.
#[derive(Debug)]
pub struct TileCache {
    contexts: HashMap<TileId, TileContext>,
    tile_size: u32,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl TileCache {
    pub fn new(tile_size: u32) -> Self {
        Self {
            contexts: HashMap::default(),
            tile_size,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn get(&self, id: &TileId) -> Option<&TileContext> {
        self.contexts.get(id)
    }

    pub fn get_mut(&mut self, id: &TileId) -> Option<&mut TileContext> {
        self.contexts.get_mut(id)
    }

    pub fn insert(&mut self, context: TileContext) -> Option<TileContext> {
        self.contexts.insert(context.id.clone(), context)
    }

    pub fn remove(&mut self, id: &TileId) -> Option<TileContext> {
        self.contexts.remove(id)
    }

    pub fn contains(&self, id: &TileId) -> bool {
        self.contexts.contains_key(id)
    }

    /// Entry with decoded data that can be drawn without fetching
    pub fn is_resolved(&self, id: &TileId) -> bool {
        self.contexts
            .get(id)
            .map(TileContext::is_resolved)
            .unwrap_or(false)
    }

    /// Ids in key order
    pub fn ids(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.contexts.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileContext> {
        self.contexts.values()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

impl Cacheable for TileCache {
    type Key = TileId;
    type Value = Arc<VectorTile>;

    fn get_cached(&self, key: &TileId) -> Option<Arc<VectorTile>> {
        let data = self.contexts.get(key).and_then(|context| context.vector_tile.clone());
        let counter = if data.is_some() { &self.hits } else { &self.misses };
        counter.set(counter.get() + 1);
        data
    }

    fn cache(&mut self, key: TileId, value: Arc<VectorTile>) {
        let tile_size = self.tile_size;
        let context = self.contexts.entry(key.clone()).or_insert_with(|| {
            let mut context = TileContext::new(key, tile_size, None);
            context.state = TileState::Released;
            context
        });
        context.vector_tile = Some(value);
    }

    fn invalidate(&mut self, key: &TileId) {
        self.contexts.remove(key);
    }

    fn clear_cache(&mut self) {
        self.clear();
    }

    fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            size: self.contexts.values().filter(|context| context.is_resolved()).count(),
        }
    }
}
