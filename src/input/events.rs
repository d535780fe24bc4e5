use crate::core::geo::{LatLng, Point, TileId};
use crate::layers::feature::{Feature, FeatureId, FeatureType};
use crate::tiles::vector_tile::Properties;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which pointer interaction an event belongs to. Each kind is debounced
/// separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseEventKind {
    Click,
    Hover,
}

/// Pointer event as reported by the host map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapMouseEvent {
    pub lat_lng: LatLng,
    /// Zoom level the host was displaying when the event fired
    pub zoom: u8,
}

impl MapMouseEvent {
    pub fn new(lat_lng: LatLng, zoom: u8) -> Self {
        Self { lat_lng, zoom }
    }
}

/// Snapshot of a feature handed to mouse callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub id: FeatureId,
    pub layer: String,
    pub feature_type: FeatureType,
    pub properties: Arc<Properties>,
    pub selected: bool,
}

impl From<&Feature> for FeatureInfo {
    fn from(feature: &Feature) -> Self {
        Self {
            id: feature.id.clone(),
            layer: feature.layer.clone(),
            feature_type: feature.feature_type,
            properties: Arc::clone(&feature.properties),
            selected: feature.is_selected(),
        }
    }
}

/// Event delivered to `on_click` / `on_mouse_hover` callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct TileMouseEvent {
    pub kind: MouseEventKind,
    pub lat_lng: LatLng,
    pub zoom: u8,
    /// Tile under the cursor, if it is currently shown
    pub tile_id: Option<TileId>,
    /// Cursor position in that tile's canvas pixels
    pub tile_point: Option<Point>,
    /// Layer that was hit-tested
    pub layer: Option<String>,
    /// Hit feature, with its selection state after the click was applied
    pub feature: Option<FeatureInfo>,
}

impl TileMouseEvent {
    pub fn new(kind: MouseEventKind, event: &MapMouseEvent) -> Self {
        Self {
            kind,
            lat_lng: event.lat_lng,
            zoom: event.zoom,
            tile_id: None,
            tile_point: None,
            layer: None,
            feature: None,
        }
    }

    pub fn feature_id(&self) -> Option<&str> {
        self.feature.as_ref().map(|feature| feature.id.as_str())
    }
}

/// Caller supplied handler for dispatched mouse events
pub type MouseCallback = Box<dyn FnMut(&TileMouseEvent)>;
