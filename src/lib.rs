//! # maplet-mvt
//!
//! Vector tile provider for maplet-style map hosts.
//!
//! The host requests and releases tiles by coordinate and zoom. Each tile is
//! fetched, decoded into named layers of features, scaled into the tile's
//! canvas and recorded as draw commands the host replays. Pointer events are
//! resolved back to the features under the cursor, with debouncing and a
//! selection set that keeps selected features painted on top.

pub mod core;
pub mod input;
pub mod layers;
pub mod manager;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{ClickHandlerOptions, MvtSourceOptions, TileUrl},
    geo::{LatLng, Point, TileId, TileLocation},
};

pub use layers::{Feature, FeatureId, FeatureType, Layer, Style, StyleOptions};

pub use input::{FeatureInfo, MapMouseEvent, MouseEventKind, TileMouseEvent};

pub use manager::{TileHandle, TileManager};

pub use rendering::{DrawCommand, TileCanvas, TileContext, TileState};

pub use tiles::{HttpTileFetcher, JsonTileDecoder, TileDecoder, TileFetcher, VectorTile};

pub use traits::MapType;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid tile id: {0}")]
    InvalidTileId(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
