use crate::core::constants::LINE_CLICK_TOLERANCE;
use crate::core::geo::{Point, TileId};
use crate::layers::feature::{Feature, FeatureId, FeatureRegistry};
use crate::layers::style::{Style, StyleOptions};
use crate::prelude::{HashMap, HashSet};
use crate::rendering::context::TileContext;
use crate::rendering::draw::DrawFn;
use crate::tiles::vector_tile::{VectorTileFeature, VectorTileLayer};
use std::fmt;
use std::sync::Arc;

/// Decides whether a raw feature is instantiated for a tile
pub type FilterFn = Arc<dyn Fn(&VectorTileFeature, &TileContext) -> bool + Send + Sync>;

/// Application supplied feature id. `None` falls back to the default id.
pub type FeatureIdFn = Arc<dyn Fn(&VectorTileFeature) -> Option<String> + Send + Sync>;

/// Id used when no id function is configured or it declines a feature.
///
/// Features carrying an MVT id keep the same id in every tile they are
/// clipped into; the others are only unique within their tile.
pub fn default_feature_id(
    layer_name: &str,
    feature: &VectorTileFeature,
    tile_id: &TileId,
    index: usize,
) -> FeatureId {
    match feature.id {
        Some(id) => format!("{}:{}", layer_name, id),
        None => format!("{}:{}:{}", layer_name, tile_id, index),
    }
}

/// All features of one named source layer, tracked per tile.
///
/// Features themselves live in the [`FeatureRegistry`]; a layer only keeps
/// the ids found in each tile, in parse order.
#[derive(Clone)]
pub struct Layer {
    pub name: String,
    pub style: Style,
    pub filter: Option<FilterFn>,
    pub get_id_for_layer_feature: Option<FeatureIdFn>,
    pub custom_draw: Option<DrawFn>,
    /// Extra pixels accepted around line strokes
    pub click_tolerance: f64,
    tiles: HashMap<TileId, Vec<FeatureId>>,
}

impl Layer {
    pub fn new(name: impl Into<String>, style: Style) -> Self {
        Self {
            name: name.into(),
            style,
            filter: None,
            get_id_for_layer_feature: None,
            custom_draw: None,
            click_tolerance: LINE_CLICK_TOLERANCE,
            tiles: HashMap::default(),
        }
    }

    pub fn with_filter(mut self, filter: Option<FilterFn>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_feature_id_fn(mut self, id_fn: Option<FeatureIdFn>) -> Self {
        self.get_id_for_layer_feature = id_fn;
        self
    }

    pub fn with_custom_draw(mut self, draw: Option<DrawFn>) -> Self {
        self.custom_draw = draw;
        self
    }

    /// Raw features of `layer` that pass the filter, with their index in the
    /// layer. Single pass, evaluated lazily.
    pub fn accepted_features<'a>(
        &'a self,
        layer: &'a VectorTileLayer,
        tile_context: &'a TileContext,
    ) -> impl Iterator<Item = (usize, &'a VectorTileFeature)> + 'a {
        layer
            .features
            .iter()
            .enumerate()
            .filter(move |(_, feature)| match &self.filter {
                Some(filter) => filter(feature, tile_context),
                None => true,
            })
    }

    /// Instantiates or merges every accepted feature of `layer` for the tile
    /// and returns how many were registered. Whatever this layer held for the
    /// tile before is replaced.
    pub fn parse_vector_tile_features(
        &mut self,
        layer: &VectorTileLayer,
        tile_context: &TileContext,
        registry: &mut FeatureRegistry,
        selection: &HashSet<FeatureId>,
    ) -> usize {
        let tile_id = tile_context.id.clone();
        self.release_tile(&tile_id, registry, |id| selection.contains(id));

        let mut parsed: Vec<FeatureId> = Vec::new();
        for (index, raw) in self.accepted_features(layer, tile_context) {
            let id = self
                .get_id_for_layer_feature
                .as_ref()
                .and_then(|id_fn| id_fn(raw))
                .unwrap_or_else(|| default_feature_id(&self.name, raw, &tile_id, index));

            let mut created = None;
            let feature = match registry.get_mut(&self.name, &id) {
                Some(feature) => feature,
                None => created.insert(Feature::new(
                    id.clone(),
                    self.name.as_str(),
                    raw,
                    StyleOptions::default(),
                    selection.contains(&id),
                    self.custom_draw.clone(),
                )),
            };

            if let Err(err) = feature.add_tile_feature(raw, layer.extent, tile_context) {
                log::warn!("Skipping feature in layer {}: {}", self.name, err);
                continue;
            }
            if let Some(feature) = created {
                registry.insert(feature);
            }
            if !parsed.contains(&id) {
                parsed.push(id);
            }
        }

        let count = parsed.len();
        self.tiles.insert(tile_id, parsed);
        count
    }

    /// Paints the tile's unselected features, then the selected ones, each
    /// group in parse order. The resolved style is kept on the feature for
    /// hit-testing.
    pub fn draw_tile(&self, tile_context: &mut TileContext, registry: &mut FeatureRegistry) {
        let ids = match self.tiles.get(&tile_context.id) {
            Some(ids) => ids,
            None => return,
        };

        for selected_pass in [false, true] {
            for id in ids {
                if let Some(feature) = registry.get_mut(&self.name, id) {
                    if feature.is_selected() != selected_pass {
                        continue;
                    }
                    let style = self.get_style(feature);
                    feature.style = style;
                    feature.draw(tile_context);
                }
            }
        }
    }

    /// Static styles are cloned, dynamic ones are evaluated per call.
    pub fn get_style(&self, feature: &Feature) -> StyleOptions {
        self.style.resolve(feature, &self.name)
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn set_filter(&mut self, filter: Option<FilterFn>) {
        self.filter = filter;
    }

    /// Updates the flag of this layer's feature with `feature_id`. Returns
    /// whether the layer has such a feature.
    pub fn set_selected(&self, registry: &mut FeatureRegistry, feature_id: &str, selected: bool) -> bool {
        match registry.get_mut(&self.name, feature_id) {
            Some(feature) => {
                feature.set_selected(selected);
                true
            }
            None => false,
        }
    }

    /// Selected features of the tile are tested first, then every feature in
    /// parse order. The first hit wins.
    pub fn handle_click_event(
        &self,
        point: &Point,
        tile_id: &TileId,
        registry: &FeatureRegistry,
    ) -> Option<FeatureId> {
        let ids = self.tiles.get(tile_id)?;
        let selected = ids
            .iter()
            .filter_map(|id| registry.get(&self.name, id))
            .filter(|feature| feature.is_selected());
        let all = ids.iter().filter_map(|id| registry.get(&self.name, id));

        selected
            .chain(all)
            .find(|feature| self.handle_click_feature(feature, point, tile_id))
            .map(|feature| feature.id.clone())
    }

    pub fn handle_click_feature(&self, feature: &Feature, point: &Point, tile_id: &TileId) -> bool {
        feature.is_point_in_path(point, tile_id, self.click_tolerance)
    }

    /// Forgets the tile and drops features it alone kept alive, except those
    /// `keep` vouches for.
    pub fn release_tile(
        &mut self,
        tile_id: &TileId,
        registry: &mut FeatureRegistry,
        keep: impl Fn(&str) -> bool,
    ) {
        if let Some(ids) = self.tiles.remove(tile_id) {
            registry.release_tile(&self.name, tile_id, &ids, keep);
        }
    }

    pub fn feature_ids(&self, tile_id: &TileId) -> &[FeatureId] {
        self.tiles.get(tile_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_tile(&self, tile_id: &TileId) -> bool {
        self.tiles.contains_key(tile_id)
    }

    pub fn tile_ids(&self) -> impl Iterator<Item = &TileId> {
        self.tiles.keys()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("filter", &self.filter.is_some())
            .field("click_tolerance", &self.click_tolerance)
            .field("tiles", &self.tiles.len())
            .finish()
    }
}
