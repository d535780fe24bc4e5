//! Shared trait abstractions
//!
//! The tile-provider capability a host map calls into, and the caching
//! contract implemented by the tile arena.

use crate::core::geo::TileLocation;
use crate::rendering::context::TileCanvas;

/// Tile provider contract consumed by a host map.
///
/// The host asks for a tile whenever one scrolls into view and releases it
/// once it is gone. Everything else about the provider is up to the
/// implementation.
pub trait MapType {
    /// Handle the host keeps for a requested tile
    type Tile;

    /// Returns the tile for `coord` at `zoom`. Data may arrive later; the
    /// tile's canvas stays blank until then.
    fn get_tile(&mut self, coord: TileLocation, zoom: u8) -> Self::Tile;

    /// Called once the host no longer shows `tile`
    fn release_tile(&mut self, tile: &Self::Tile);

    /// Current drawing surface of `tile`
    fn tile_canvas(&self, tile: &Self::Tile) -> Option<&TileCanvas>;
}

/// Keyed store of decoded tile data. Lookups through `get_cached` are the
/// only ones that count toward the hit and miss totals.
pub trait Cacheable {
    type Key: Clone + Eq + std::hash::Hash;
    type Value: Clone;

    fn get_cached(&self, key: &Self::Key) -> Option<Self::Value>;

    /// Stores `value` under `key`, replacing what was there
    fn cache(&mut self, key: Self::Key, value: Self::Value);

    fn invalidate(&mut self, key: &Self::Key);

    /// Drops every entry
    fn clear_cache(&mut self);

    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Lookup totals and the number of entries holding data
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries with decoded data
    pub size: usize,
}
