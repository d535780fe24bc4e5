//! Default draw adapter
//!
//! Turns a feature's per-tile path into commands on the tile canvas. Hosts
//! can replace it per source with `custom_draw`.

use crate::core::geo::Point;
use crate::core::geometry::get_point;
use crate::layers::feature::{FeatureTile, FeatureType, Path2D};
use crate::layers::style::StyleOptions;
use crate::rendering::context::{DrawCommand, TileCanvas, TileContext};
use geo_types::Coord;
use std::sync::Arc;

/// Paints one feature tile with an already resolved style
pub type DrawFn = Arc<dyn Fn(&mut TileContext, &FeatureTile, &StyleOptions) + Send + Sync>;

pub fn default_draw_fn() -> DrawFn {
    Arc::new(draw)
}

/// Applies the set fields of `style` to the canvas and hands it back for drawing.
pub fn get_context2d<'a>(canvas: &'a mut TileCanvas, style: &StyleOptions) -> &'a mut TileCanvas {
    let current = &mut canvas.current_style;
    if let Some(fill) = &style.fill_style {
        current.fill_style = Some(fill.clone());
    }
    if let Some(stroke) = &style.stroke_style {
        current.stroke_style = Some(stroke.clone());
    }
    if let Some(width) = style.line_width {
        current.line_width = Some(width);
    }
    if let Some(radius) = style.radius {
        current.radius = Some(radius);
    }
    canvas
}

/// Scales every part of `geometry` into the canvas of `tile_context`.
pub fn build_path(tile_context: &TileContext, geometry: &[Vec<Coord<i32>>], divisor: f64) -> Path2D {
    let paths = geometry
        .iter()
        .map(|part| {
            part.iter()
                .map(|coord| get_point(*coord, tile_context, divisor))
                .collect::<Vec<Point>>()
        })
        .collect();
    Path2D::new(paths)
}

pub fn draw(tile_context: &mut TileContext, tile: &FeatureTile, style: &StyleOptions) {
    match tile.feature_type {
        FeatureType::Point => draw_point(tile_context, tile, style),
        FeatureType::LineString => draw_line_string(tile_context, tile, style),
        FeatureType::Polygon => draw_polygon(tile_context, tile, style),
        FeatureType::Unknown => {}
    }
}

pub fn draw_point(tile_context: &mut TileContext, tile: &FeatureTile, style: &StyleOptions) {
    let canvas = get_context2d(&mut tile_context.canvas, style);
    for center in tile.path.points() {
        canvas.push(DrawCommand::Point {
            feature_id: tile.feature_id.clone(),
            center: *center,
            radius: style.radius(),
            style: style.clone(),
        });
    }
}

pub fn draw_line_string(tile_context: &mut TileContext, tile: &FeatureTile, style: &StyleOptions) {
    let canvas = get_context2d(&mut tile_context.canvas, style);
    canvas.push(DrawCommand::LineString {
        feature_id: tile.feature_id.clone(),
        paths: tile.path.paths().to_vec(),
        style: style.clone(),
    });
}

pub fn draw_polygon(tile_context: &mut TileContext, tile: &FeatureTile, style: &StyleOptions) {
    let canvas = get_context2d(&mut tile_context.canvas, style);
    canvas.push(DrawCommand::Polygon {
        feature_id: tile.feature_id.clone(),
        rings: tile.path.paths().to_vec(),
        style: style.clone(),
    });
}

/// Tile outline and id, drawn underneath the features
pub fn draw_debug_info(tile_context: &mut TileContext) {
    let command = DrawCommand::DebugInfo {
        tile_id: tile_context.id.clone(),
        size: tile_context.tile_size,
    };
    tile_context.canvas.push(command);
}
