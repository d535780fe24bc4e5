use crate::core::geo::{Point, TileId};
use crate::layers::feature::FeatureId;
use crate::layers::style::StyleOptions;
use crate::tiles::vector_tile::VectorTile;
use std::sync::Arc;

/// Commands recorded by a tile canvas, replayed by the host's painter
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Point {
        feature_id: FeatureId,
        center: Point,
        radius: f64,
        style: StyleOptions,
    },
    LineString {
        feature_id: FeatureId,
        paths: Vec<Vec<Point>>,
        style: StyleOptions,
    },
    Polygon {
        feature_id: FeatureId,
        rings: Vec<Vec<Point>>,
        style: StyleOptions,
    },
    /// Tile outline and id label
    DebugInfo { tile_id: TileId, size: u32 },
}

impl DrawCommand {
    pub fn feature_id(&self) -> Option<&str> {
        match self {
            DrawCommand::Point { feature_id, .. }
            | DrawCommand::LineString { feature_id, .. }
            | DrawCommand::Polygon { feature_id, .. } => Some(feature_id.as_str()),
            DrawCommand::DebugInfo { .. } => None,
        }
    }
}

/// Retained drawing surface of one tile.
///
/// Painting appends commands; clearing drops them. The host turns the queue
/// into pixels, so draw order here is paint order there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileCanvas {
    pub width: u32,
    pub height: u32,
    /// Style applied by the last `get_context2d`
    pub current_style: StyleOptions,
    drawing_queue: Vec<DrawCommand>,
}

impl TileCanvas {
    pub fn new(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            current_style: StyleOptions::default(),
            drawing_queue: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.drawing_queue.push(command);
    }

    pub fn clear(&mut self) {
        self.drawing_queue.clear();
        self.current_style = StyleOptions::default();
    }

    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    pub fn is_blank(&self) -> bool {
        self.drawing_queue.is_empty()
    }

    /// Feature ids in paint order
    pub fn painted_features(&self) -> Vec<&str> {
        self.drawing_queue
            .iter()
            .filter_map(DrawCommand::feature_id)
            .collect()
    }
}

/// Lifecycle of a requested tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Requested,
    Fetching,
    Drawn,
    /// Fetch or decode failed; the canvas stays blank until re-requested
    Failed,
    Released,
}

/// One requested tile: its canvas plus the data it is drawn from
#[derive(Debug, Clone)]
pub struct TileContext {
    pub id: TileId,
    pub canvas: TileCanvas,
    pub zoom: u8,
    pub tile_size: u32,
    /// Ancestor whose data is over-zoomed into this tile
    pub parent_id: Option<TileId>,
    pub vector_tile: Option<Arc<VectorTile>>,
    pub state: TileState,
    /// Identifies the request that currently owns this context
    pub request_key: u64,
}

impl TileContext {
    pub fn new(id: TileId, tile_size: u32, parent_id: Option<TileId>) -> Self {
        let zoom = id.location().map(|location| location.z).unwrap_or_default();
        Self {
            id,
            canvas: TileCanvas::new(tile_size),
            zoom,
            tile_size,
            parent_id,
            vector_tile: None,
            state: TileState::Requested,
            request_key: 0,
        }
    }

    /// Tile whose data is fetched for this context
    pub fn source_id(&self) -> &TileId {
        self.parent_id.as_ref().unwrap_or(&self.id)
    }

    /// Zoom levels between this tile and its data source
    pub fn over_zoom_levels(&self) -> u8 {
        self.parent_id
            .as_ref()
            .and_then(|parent| parent.location().ok())
            .map(|parent| self.zoom.saturating_sub(parent.z))
            .unwrap_or(0)
    }

    pub fn is_resolved(&self) -> bool {
        self.vector_tile.is_some()
    }
}
