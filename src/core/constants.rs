//! Core constants derived from the Mapbox vector tile format and common web-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Reference tile size of the normalized world-pixel space used by the mercator helpers.
pub const WORLD_TILE_SIZE: f64 = 256.0;

/// Default extent of a vector tile layer (integer coordinate range per tile).
pub const DEFAULT_EXTENT: u32 = 4096;

/// Extra pixels around a line's stroke that still count as a hit.
pub const LINE_CLICK_TOLERANCE: f64 = 2.0;

/// Stroke width used when a style does not set one (canvas default).
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Point radius used when a style does not set one.
pub const DEFAULT_POINT_RADIUS: f64 = 3.0;

/// Sine of the latitude is clamped to this magnitude before projecting.
pub const MAX_SIN_LATITUDE: f64 = 0.9999;

/// Highest zoom level a tile location may carry.
pub const MAX_ZOOM: u8 = 30;
