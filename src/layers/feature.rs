use crate::core::geo::{Point, TileId};
use crate::core::geometry::{get_distance_from_line, in_circle, is_point_in_polygon};
use crate::layers::style::StyleOptions;
use crate::prelude::HashMap;
use crate::rendering::context::TileContext;
use crate::rendering::draw::{build_path, default_draw_fn, DrawFn};
use crate::tiles::vector_tile::{Properties, VectorTileFeature};
use crate::MapError;
use geo_types::Coord;
use std::fmt;
use std::sync::Arc;

pub type FeatureId = String;

/// Geometry type of a decoded feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Unknown,
    Point,
    LineString,
    Polygon,
}

impl FeatureType {
    /// Maps the raw MVT `GeomType` value
    pub fn from_mvt(geom_type: u32) -> Self {
        match geom_type {
            1 => FeatureType::Point,
            2 => FeatureType::LineString,
            3 => FeatureType::Polygon,
            _ => FeatureType::Unknown,
        }
    }

    /// Fewest vertices a part needs to be drawable
    fn min_part_len(&self) -> usize {
        match self {
            FeatureType::Point | FeatureType::Unknown => 1,
            FeatureType::LineString => 2,
            FeatureType::Polygon => 3,
        }
    }
}

/// Feature geometry scaled into one tile's canvas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path2D {
    paths: Vec<Vec<Point>>,
}

impl Path2D {
    pub fn new(paths: Vec<Vec<Point>>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[Vec<Point>] {
        &self.paths
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.paths.iter().flatten()
    }
}

/// Per-tile record of a feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTile {
    pub feature_id: FeatureId,
    pub feature_type: FeatureType,
    pub raw_geometry: Vec<Vec<Coord<i32>>>,
    /// Tile-local units per canvas pixel
    pub divisor: f64,
    pub path: Path2D,
}

/// Drops degenerate parts. `None` when nothing drawable is left.
pub fn sanitize_geometry(
    feature_type: FeatureType,
    geometry: &[Vec<Coord<i32>>],
) -> Option<Vec<Vec<Coord<i32>>>> {
    let min_len = feature_type.min_part_len();
    let parts: Vec<Vec<Coord<i32>>> = geometry
        .iter()
        .filter(|part| part.len() >= min_len)
        .cloned()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

/// A decoded feature, shared by every tile it was clipped into
#[derive(Clone)]
pub struct Feature {
    pub id: FeatureId,
    /// Name of the source layer
    pub layer: String,
    pub feature_type: FeatureType,
    pub properties: Arc<Properties>,
    /// Style resolved at the last draw
    pub style: StyleOptions,
    selected: bool,
    tiles: HashMap<TileId, FeatureTile>,
    draw_fn: DrawFn,
}

impl Feature {
    pub fn new(
        id: FeatureId,
        layer: impl Into<String>,
        raw: &VectorTileFeature,
        style: StyleOptions,
        selected: bool,
        custom_draw: Option<DrawFn>,
    ) -> Self {
        Self {
            id,
            layer: layer.into(),
            feature_type: FeatureType::from_mvt(raw.geom_type),
            properties: Arc::new(raw.properties.clone()),
            style,
            selected,
            tiles: HashMap::default(),
            draw_fn: custom_draw.unwrap_or_else(default_draw_fn),
        }
    }

    /// Registers this feature's geometry for one tile, replacing any previous
    /// entry for it. Degenerate geometry leaves the feature without an entry
    /// for that tile.
    pub fn add_tile_feature(
        &mut self,
        raw: &VectorTileFeature,
        extent: u32,
        tile_context: &TileContext,
    ) -> Result<(), MapError> {
        let id = tile_context.id.clone();
        let geometry = match sanitize_geometry(self.feature_type, &raw.geometry) {
            Some(geometry) => geometry,
            None => {
                self.tiles.remove(&id);
                return Err(MapError::MalformedGeometry(format!(
                    "feature {} in tile {}",
                    self.id, id
                )));
            }
        };

        let divisor = feature_divisor(extent, tile_context);
        let path = build_path(tile_context, &geometry, divisor);
        self.properties = Arc::new(raw.properties.clone());
        self.tiles.insert(
            id,
            FeatureTile {
                feature_id: self.id.clone(),
                feature_type: self.feature_type,
                raw_geometry: geometry,
                divisor,
                path,
            },
        );
        Ok(())
    }

    pub fn remove_tile(&mut self, tile_id: &TileId) -> Option<FeatureTile> {
        self.tiles.remove(tile_id)
    }

    pub fn tile(&self, tile_id: &TileId) -> Option<&FeatureTile> {
        self.tiles.get(tile_id)
    }

    /// Tiles that need repainting after a style or selection change
    pub fn tile_ids(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.tiles.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn has_tiles(&self) -> bool {
        !self.tiles.is_empty()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn set_draw_fn(&mut self, draw_fn: Option<DrawFn>) {
        self.draw_fn = draw_fn.unwrap_or_else(default_draw_fn);
    }

    /// Paints this feature into `tile_context` using the selected variant of
    /// its style when selected. Does nothing for tiles it is not part of.
    pub fn draw(&self, tile_context: &mut TileContext) {
        if let Some(tile) = self.tiles.get(&tile_context.id) {
            let style = self.style.effective(self.selected);
            (self.draw_fn)(tile_context, tile, &style);
        }
    }

    /// Geometry in canvas pixels for hit-testing
    pub fn get_paths(&self, tile_id: &TileId) -> &[Vec<Point>] {
        self.tiles
            .get(tile_id)
            .map(|tile| tile.path.paths())
            .unwrap_or(&[])
    }

    /// `tolerance` widens line strokes; points and polygons ignore it.
    pub fn is_point_in_path(&self, point: &Point, tile_id: &TileId, tolerance: f64) -> bool {
        let paths = self.get_paths(tile_id);
        let style = self.style.effective(self.selected);
        match self.feature_type {
            FeatureType::Polygon => paths.iter().any(|ring| is_point_in_polygon(point, ring)),
            FeatureType::LineString => {
                let thickness = style.line_width() / 2.0 + tolerance;
                paths
                    .iter()
                    .any(|line| get_distance_from_line(point, line) <= thickness)
            }
            FeatureType::Point => {
                let radius = style.radius();
                paths
                    .iter()
                    .flatten()
                    .any(|center| in_circle(center.x, center.y, radius, point.x, point.y))
            }
            FeatureType::Unknown => false,
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.id)
            .field("layer", &self.layer)
            .field("feature_type", &self.feature_type)
            .field("selected", &self.selected)
            .field("tiles", &self.tile_ids())
            .finish_non_exhaustive()
    }
}

/// `extent / (tile_size << over_zoom_levels)`
pub fn feature_divisor(extent: u32, tile_context: &TileContext) -> f64 {
    let magnified = tile_context.tile_size as f64 * 2_f64.powi(tile_context.over_zoom_levels() as i32);
    extent as f64 / magnified
}

/// Every live feature, keyed by source layer and then by id, so that layers
/// with overlapping id schemes never share a feature. Owned by the tile
/// manager and lent to layers while they parse and draw.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    layers: HashMap<String, HashMap<FeatureId, Feature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer: &str, id: &str) -> Option<&Feature> {
        self.layers.get(layer)?.get(id)
    }

    pub fn get_mut(&mut self, layer: &str, id: &str) -> Option<&mut Feature> {
        self.layers.get_mut(layer)?.get_mut(id)
    }

    pub fn contains(&self, layer: &str, id: &str) -> bool {
        self.get(layer, id).is_some()
    }

    /// Files the feature under its own layer, replacing one with the same id
    pub fn insert(&mut self, feature: Feature) {
        self.layers
            .entry(feature.layer.clone())
            .or_default()
            .insert(feature.id.clone(), feature);
    }

    pub fn remove(&mut self, layer: &str, id: &str) -> Option<Feature> {
        let features = self.layers.get_mut(layer)?;
        let removed = features.remove(id);
        if features.is_empty() {
            self.layers.remove(layer);
        }
        removed
    }

    /// Features carrying `id`, one per layer at most
    pub fn with_id<'a, 'b>(&'a self, id: &'b str) -> impl Iterator<Item = &'a Feature> + use<'a, 'b> {
        self.layers.values().filter_map(move |features| features.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.layers.values().flat_map(|features| features.values())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.layers.values_mut().flat_map(|features| features.values_mut())
    }

    pub fn len(&self) -> usize {
        self.layers.values().map(|features| features.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.values().all(|features| features.is_empty())
    }

    /// Drops the tile's geometry from the given features of `layer` and
    /// forgets those left without tiles, unless `keep` holds on to them.
    pub fn release_tile<'a>(
        &mut self,
        layer: &str,
        tile_id: &TileId,
        feature_ids: impl IntoIterator<Item = &'a FeatureId>,
        keep: impl Fn(&str) -> bool,
    ) {
        for id in feature_ids {
            let orphaned = match self.get_mut(layer, id) {
                Some(feature) => {
                    feature.remove_tile(tile_id);
                    !feature.has_tiles()
                }
                None => false,
            };
            if orphaned && !keep(id.as_str()) {
                self.remove(layer, id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::context::DrawCommand;

    fn coords(points: &[(i32, i32)]) -> Vec<Coord<i32>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn square_polygon() -> VectorTileFeature {
        VectorTileFeature::new(3, vec![coords(&[(0, 0), (2048, 0), (2048, 2048), (0, 2048), (0, 0)])])
            .with_property("name", "block")
    }

    #[test]
    fn test_add_tile_feature_divisor_and_path() {
        let ctx = TileContext::new(TileId::new(4, 3, 5), 256, None);
        let raw = square_polygon();
        let mut feature = Feature::new("a".into(), "buildings", &raw, StyleOptions::default(), false, None);
        feature.add_tile_feature(&raw, 4096, &ctx).unwrap();

        let tile = feature.tile(&ctx.id).unwrap();
        assert_eq!(tile.divisor, 16.0);
        assert_eq!(tile.path.paths()[0][2], Point::new(128.0, 128.0));
        assert_eq!(feature.properties.get("name").unwrap(), "block");

        // re-adding replaces rather than duplicates
        feature.add_tile_feature(&raw, 4096, &ctx).unwrap();
        assert_eq!(feature.tile_ids(), vec![ctx.id.clone()]);
    }

    #[test]
    fn test_over_zoom_divisor() {
        let base = TileContext::new(TileId::new(14, 100, 100), 256, None);
        let child = TileContext::new(TileId::new(16, 400, 400), 256, Some(TileId::new(14, 100, 100)));
        assert_eq!(feature_divisor(4096, &base) / feature_divisor(4096, &child), 4.0);
    }

    #[test]
    fn test_degenerate_geometry_is_rejected() {
        let ctx = TileContext::new(TileId::new(1, 0, 0), 256, None);
        let raw = VectorTileFeature::new(3, vec![coords(&[(0, 0), (10, 10)])]);
        let mut feature = Feature::new("bad".into(), "l", &raw, StyleOptions::default(), false, None);
        assert!(feature.add_tile_feature(&raw, 4096, &ctx).is_err());
        assert!(!feature.has_tiles());

        let line = VectorTileFeature::new(2, vec![coords(&[(5, 5)]), coords(&[(0, 0), (10, 0)])]);
        assert_eq!(sanitize_geometry(FeatureType::LineString, &line.geometry).unwrap().len(), 1);
    }

    #[test]
    fn test_hit_tests_by_type() {
        let ctx = TileContext::new(TileId::new(0, 0, 0), 256, None);
        let style = StyleOptions::new().with_line_width(4.0).with_radius(5.0);

        let raw = square_polygon();
        let mut polygon = Feature::new("p".into(), "l", &raw, style.clone(), false, None);
        polygon.add_tile_feature(&raw, 4096, &ctx).unwrap();
        assert!(polygon.is_point_in_path(&Point::new(64.0, 64.0), &ctx.id, 2.0));
        assert!(!polygon.is_point_in_path(&Point::new(200.0, 64.0), &ctx.id, 2.0));

        let raw = VectorTileFeature::new(2, vec![coords(&[(0, 1600), (4096, 1600)])]);
        let mut line = Feature::new("l".into(), "l", &raw, style.clone(), false, None);
        line.add_tile_feature(&raw, 4096, &ctx).unwrap();
        // line sits at y = 100; half width 2 + tolerance 2
        assert!(line.is_point_in_path(&Point::new(30.0, 104.0), &ctx.id, 2.0));
        assert!(!line.is_point_in_path(&Point::new(30.0, 104.5), &ctx.id, 2.0));

        let raw = VectorTileFeature::new(1, vec![coords(&[(1600, 1600)])]);
        let mut point = Feature::new("pt".into(), "l", &raw, style, false, None);
        point.add_tile_feature(&raw, 4096, &ctx).unwrap();
        assert!(point.is_point_in_path(&Point::new(103.0, 104.0), &ctx.id, 0.0));
        assert!(!point.is_point_in_path(&Point::new(103.0, 104.1), &ctx.id, 0.0));

        let raw = VectorTileFeature::new(9, vec![coords(&[(1600, 1600)])]);
        let mut unknown = Feature::new("u".into(), "l", &raw, StyleOptions::default(), false, None);
        unknown.add_tile_feature(&raw, 4096, &ctx).unwrap();
        assert!(!unknown.is_point_in_path(&Point::new(100.0, 100.0), &ctx.id, 10.0));
    }

    #[test]
    fn test_draw_uses_selected_style() {
        let mut ctx = TileContext::new(TileId::new(0, 0, 0), 256, None);
        let raw = square_polygon();
        let style = StyleOptions::new()
            .with_fill("grey")
            .with_selected(StyleOptions::new().with_fill("gold"));
        let mut feature = Feature::new("p".into(), "l", &raw, style, false, None);
        feature.add_tile_feature(&raw, 4096, &ctx).unwrap();

        feature.draw(&mut ctx);
        feature.set_selected(true);
        feature.draw(&mut ctx);

        let fills: Vec<_> = ctx
            .canvas
            .get_drawing_queue()
            .iter()
            .map(|command| match command {
                DrawCommand::Polygon { style, .. } => style.fill_style.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![Some("grey".to_string()), Some("gold".to_string())]);
    }

    #[test]
    fn test_registry_release_keeps_selected() {
        let ctx = TileContext::new(TileId::new(0, 0, 0), 256, None);
        let raw = square_polygon();
        let mut registry = FeatureRegistry::new();
        for id in ["a", "b"] {
            let mut feature = Feature::new(id.into(), "l", &raw, StyleOptions::default(), false, None);
            feature.add_tile_feature(&raw, 4096, &ctx).unwrap();
            registry.insert(feature);
        }

        let ids = vec!["a".to_string(), "b".to_string()];
        registry.release_tile("l", &ctx.id, &ids, |id| id == "b");
        assert!(!registry.contains("l", "a"));
        assert!(registry.contains("l", "b"));
        assert!(!registry.get("l", "b").unwrap().has_tiles());
    }

    #[test]
    fn test_registry_separates_layers_sharing_an_id() {
        let raw = square_polygon();
        let mut registry = FeatureRegistry::new();
        registry.insert(Feature::new("5".into(), "water", &raw, StyleOptions::default(), false, None));
        registry.insert(Feature::new("5".into(), "roads", &raw, StyleOptions::default(), false, None));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("roads", "5").unwrap().layer, "roads");
        let mut layers: Vec<&str> = registry.with_id("5").map(|feature| feature.layer.as_str()).collect();
        layers.sort();
        assert_eq!(layers, vec!["roads", "water"]);

        registry.remove("water", "5");
        assert!(!registry.contains("water", "5"));
        assert!(registry.contains("roads", "5"));
    }
}
