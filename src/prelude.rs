//! Prelude module for common maplet-mvt types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use maplet_mvt::prelude::*;`

pub use crate::core::{
    config::{ClickHandlerOptions, MvtSourceOptions, TileUrl},
    geo::{
        from_lat_lng_to_point, from_lat_lng_to_tile_point, from_point_to_lat_lng,
        get_tile_at_lat_lng, get_tile_bounds, get_tile_from_string, get_tile_string,
        normalize_tile, LatLng, Point, TileBounds, TileId, TileLocation,
    },
};

pub use crate::layers::{
    Feature, FeatureId, FeatureIdFn, FeatureRegistry, FeatureTile, FeatureType, FilterFn, Layer,
    Path2D, Style, StyleFn, StyleOptions,
};

pub use crate::input::{
    Debouncer, FeatureInfo, MapMouseEvent, MouseCallback, MouseEventKind, TileMouseEvent,
};

pub use crate::manager::{TileHandle, TileManager};

pub use crate::rendering::{DrawCommand, DrawFn, TileCanvas, TileContext, TileState};

pub use crate::tiles::{
    HttpTileFetcher, JsonTileDecoder, TileCache, TileDecoder, TileFetcher, TileLoader,
    TileRequest, TileSource, VectorTile, VectorTileFeature, VectorTileLayer,
};

pub use crate::traits::{CacheStats, Cacheable, MapType};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
