//! Hit-testing math in canvas pixel space.

use crate::core::geo::{get_tile_from_string, Point};
use crate::rendering::context::TileContext;
use geo_types::Coord;

/// Scales a tile-local integer coordinate into the canvas of `tile_context`.
///
/// For over-zoomed tiles the coordinate belongs to the ancestor tile, so after
/// scaling it is shifted by the child's offset inside that ancestor.
pub fn get_point(coords: Coord<i32>, tile_context: &TileContext, divisor: f64) -> Point {
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    let mut point = Point::new(coords.x as f64 / divisor, coords.y as f64 / divisor);

    if let Some(parent_id) = &tile_context.parent_id {
        if let (Ok(parent), Ok(current)) = (
            get_tile_from_string(parent_id.as_str()),
            tile_context.id.location(),
        ) {
            let distance = current.z.saturating_sub(parent.z);
            let scale = 1_i64 << distance;
            let size = tile_context.tile_size as f64;
            point.x -= current.x.rem_euclid(scale) as f64 * size;
            point.y -= current.y.rem_euclid(scale) as f64 * size;
        }
    }

    point
}

/// Even-odd ray casting. The ring may be open or closed; a closing vertex
/// only adds a zero-length edge that never toggles the result. Points exactly
/// on an edge get whatever the crossing test yields, which is stable for a
/// given ring but not guaranteed to be "inside".
pub fn is_point_in_polygon(point: &Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        let crosses = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Boundary inclusive.
pub fn in_circle(center_x: f64, center_y: f64, radius: f64, x: f64, y: f64) -> bool {
    let dx = x - center_x;
    let dy = y - center_y;
    dx * dx + dy * dy <= radius * radius
}

/// Minimum distance from `point` to any segment of `line`. Returns
/// `f64::INFINITY` for lines with fewer than two vertices.
pub fn get_distance_from_line(point: &Point, line: &[Point]) -> f64 {
    line.windows(2)
        .map(|segment| project_point_on_line_segment(point, &segment[0], &segment[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from `point` to its projection on the segment `r0..r1`, with the
/// projection clamped to the segment endpoints.
pub fn project_point_on_line_segment(point: &Point, r0: &Point, r1: &Point) -> f64 {
    let a = point.x - r0.x;
    let b = point.y - r0.y;
    let c = r1.x - r0.x;
    let d = r1.y - r0.y;

    let len_sq = c * c + d * d;
    let param = if len_sq != 0.0 { (a * c + b * d) / len_sq } else { -1.0 };

    let nearest = if param < 0.0 {
        *r0
    } else if param > 1.0 {
        *r1
    } else {
        Point::new(r0.x + param * c, r0.y + param * d)
    };

    point.distance_to(&nearest)
}
