//! Tile provider orchestration
//!
//! [`TileManager`] owns every tile context, the feature registry, the
//! selection set and the per-name layers. Hosts drive it through the
//! [`MapType`] calls plus the polling hooks: fetches and debounced mouse
//! events only make progress when `process_tile_results` /
//! `process_mouse_events` (or their async counterparts) are called.

use crate::core::config::{ClickHandlerOptions, MvtSourceOptions, TileUrl};
use crate::core::constants::MAX_ZOOM;
use crate::core::geo::{
    from_lat_lng_to_tile_point, get_tile_at_lat_lng, normalize_tile, TileId, TileLocation,
};
use crate::input::debounce::Debouncer;
use crate::input::events::{FeatureInfo, MapMouseEvent, MouseCallback, MouseEventKind, TileMouseEvent};
use crate::layers::feature::{Feature, FeatureId, FeatureRegistry};
use crate::layers::layer::{FilterFn, Layer};
use crate::layers::style::Style;
use crate::prelude::HashSet;
use crate::rendering::context::{TileCanvas, TileContext, TileState};
use crate::rendering::draw::draw_debug_info;
use crate::tiles::cache::TileCache;
use crate::tiles::loader::{FetchOutcome, HttpTileFetcher, TileFetcher, TileLoader, TileRequest};
use crate::tiles::source::TileSource;
use crate::tiles::vector_tile::VectorTile;
use crate::traits::{CacheStats, Cacheable, MapType};
use instant::Instant;
use std::fmt;
use std::sync::Arc;

/// What the host holds for a requested tile
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileHandle {
    pub id: TileId,
    /// Request that produced this handle. Every `get_tile` call gets a new
    /// one, including cache hits.
    pub key: u64,
}

struct PendingMouseEvent {
    kind: MouseEventKind,
    event: MapMouseEvent,
    options: ClickHandlerOptions,
    callback: MouseCallback,
}

pub struct TileManager {
    options: MvtSourceOptions,
    tiles: TileCache,
    visible: HashSet<TileId>,
    loader: TileLoader,
    /// Registration order is draw order
    layers: Vec<Layer>,
    features: FeatureRegistry,
    selection: HashSet<FeatureId>,
    request_seq: u64,
    debouncer: Debouncer<PendingMouseEvent>,
}

impl TileManager {
    /// Fetches over HTTP, with the configured headers, and decodes JSON tiles
    pub fn new(options: MvtSourceOptions) -> Self {
        let fetcher = HttpTileFetcher::default().with_headers(options.xhr_headers.clone());
        Self::with_fetcher(options, Arc::new(fetcher))
    }

    pub fn with_fetcher(options: MvtSourceOptions, fetcher: Arc<dyn TileFetcher>) -> Self {
        let selection = options.selected_features.iter().cloned().collect();
        Self {
            tiles: TileCache::new(options.tile_size),
            visible: HashSet::default(),
            loader: TileLoader::new(fetcher),
            layers: Vec::new(),
            features: FeatureRegistry::new(),
            selection,
            request_seq: 0,
            debouncer: Debouncer::new(),
            options,
        }
    }

    pub fn options(&self) -> &MvtSourceOptions {
        &self.options
    }

    /// Used by fetches started after the call
    pub fn set_fetcher(&mut self, fetcher: Arc<dyn TileFetcher>) {
        self.loader.set_fetcher(fetcher);
    }

    // Tile lifecycle

    /// Starts showing the tile at `(coord.x, coord.y)` for `zoom`.
    ///
    /// Cached data is drawn right away. Otherwise the data is fetched, from
    /// the ancestor at `source_max_zoom` when `zoom` is beyond it, and drawn
    /// once a `process_tile_results` or `settle` call picks it up.
    pub fn get_tile(&mut self, coord: TileLocation, zoom: u8) -> TileHandle {
        let zoom = if zoom > MAX_ZOOM {
            log::warn!("zoom {} clamped to {}", zoom, MAX_ZOOM);
            MAX_ZOOM
        } else {
            zoom
        };
        let location = normalize_tile(TileLocation::new(coord.x, coord.y, zoom));
        let id = location.id();
        let key = self.next_key();
        self.visible.insert(id.clone());

        if self.options.cache && self.tiles.get_cached(&id).is_some() {
            log::debug!("tile {} served from cache", id);
            if let Some(context) = self.tiles.get_mut(&id) {
                context.request_key = key;
            }
            self.redraw_tile(&id);
            return TileHandle { id, key };
        }

        let source = match self.options.source_max_zoom {
            Some(max_zoom) if zoom > max_zoom => location.ancestor(max_zoom),
            _ => location,
        };
        let parent_id = (source != location).then(|| source.id());

        let mut context = TileContext::new(id.clone(), self.options.tile_size, parent_id.clone());
        context.request_key = key;
        context.state = TileState::Fetching;

        let ancestor_data = parent_id
            .as_ref()
            .and_then(|parent| self.tiles.get(parent))
            .and_then(|parent| parent.vector_tile.clone());
        self.tiles.insert(context);

        match ancestor_data {
            Some(data) => {
                log::debug!("tile {} over-zoomed from loaded ancestor {}", id, source.id());
                if let Some(context) = self.tiles.get_mut(&id) {
                    context.vector_tile = Some(data);
                }
                self.redraw_tile(&id);
            }
            None => {
                log::debug!("tile {} requested (data from {})", id, source.id());
                let request = TileRequest {
                    tile_id: id.clone(),
                    location: source,
                    url: self.options.url.url(source),
                };
                self.loader.start(request, key);
            }
        }

        TileHandle { id, key }
    }

    /// Stops showing a tile.
    ///
    /// Without caching the context goes away and a fetch still in flight is
    /// discarded when it lands. With caching, tiles that have data or are
    /// still fetching are kept for the next request.
    pub fn release_tile(&mut self, handle: &TileHandle) {
        if !self.visible.remove(&handle.id) {
            return;
        }

        let keep = match self.tiles.get(&handle.id) {
            Some(context) => {
                self.options.cache && (context.is_resolved() || context.state == TileState::Fetching)
            }
            None => false,
        };
        if keep {
            if let Some(context) = self.tiles.get_mut(&handle.id) {
                context.state = TileState::Released;
            }
        } else {
            self.tiles.remove(&handle.id);
        }
        self.release_tile_features(&handle.id);
        log::debug!("tile {} released (kept: {})", handle.id, keep);
    }

    /// Applies every fetch that has completed so far. Returns how many results
    /// were drawn or recorded; stale ones are not counted.
    pub fn process_tile_results(&mut self) -> usize {
        let mut applied = 0;
        for outcome in self.loader.poll_ready() {
            if self.apply_fetch_outcome(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for every fetch in flight, including ones started while waiting.
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.loader.next().await {
            if self.apply_fetch_outcome(outcome) {
                applied += 1;
            }
        }
        applied
    }

    pub fn pending_fetches(&self) -> usize {
        self.loader.in_flight()
    }

    fn apply_fetch_outcome(&mut self, outcome: FetchOutcome) -> bool {
        let FetchOutcome { tile_id, key, result } = outcome;
        let context = match self.tiles.get_mut(&tile_id) {
            Some(context) if context.request_key == key => context,
            _ => {
                log::debug!("discarding stale result for tile {}", tile_id);
                return false;
            }
        };

        let data = match result {
            Ok(data) => data,
            Err(err) => {
                log::warn!("tile {} failed to load: {}", tile_id, err);
                if self.visible.contains(&tile_id) {
                    context.state = TileState::Failed;
                    context.canvas.clear();
                } else {
                    self.tiles.remove(&tile_id);
                }
                return true;
            }
        };

        context.vector_tile = Some(Arc::clone(&data));
        let parent_id = context.parent_id.clone();
        if self.options.cache {
            if let Some(parent_id) = parent_id {
                if !self.tiles.contains(&parent_id) {
                    self.tiles.cache(parent_id, Arc::clone(&data));
                }
            }
        }

        if self.visible.contains(&tile_id) {
            self.redraw_tile(&tile_id);
        } else {
            log::debug!("tile {} resolved after release; cached without drawing", tile_id);
        }
        true
    }

    fn next_key(&mut self) -> u64 {
        self.request_seq += 1;
        self.request_seq
    }

    fn release_tile_features(&mut self, tile_id: &TileId) {
        let selection = &self.selection;
        for layer in self.layers.iter_mut() {
            layer.release_tile(tile_id, &mut self.features, |id| selection.contains(id));
        }
    }

    // Drawing

    /// Repaints every visible tile from its stored data
    pub fn redraw_all_tiles(&mut self) {
        let ids = self.visible_tile_ids();
        self.redraw_tiles(ids);
    }

    pub fn redraw_tiles(&mut self, ids: impl IntoIterator<Item = TileId>) {
        for id in ids {
            self.redraw_tile(&id);
        }
    }

    /// Clears the tile and paints it again: debug overlay first, then each
    /// visible layer in registration order. Tiles that are not visible or
    /// have no data are left alone.
    pub fn redraw_tile(&mut self, id: &TileId) {
        if !self.visible.contains(id) {
            return;
        }
        let mut context = match self.tiles.remove(id) {
            Some(context) => context,
            None => return,
        };

        if let Some(data) = context.vector_tile.clone() {
            context.canvas.clear();
            self.draw_vector_tile(&data, &mut context);
            context.state = TileState::Drawn;
        }
        self.tiles.insert(context);
    }

    /// Repaints the tile from the geometry already built for it, picking up
    /// style and selection changes without parsing the tile again.
    pub fn restyle_tile(&mut self, id: &TileId) {
        if !self.visible.contains(id) {
            return;
        }
        let mut context = match self.tiles.remove(id) {
            Some(context) => context,
            None => return,
        };

        if context.is_resolved() {
            context.canvas.clear();
            if self.options.debug {
                draw_debug_info(&mut context);
            }
            for layer in &self.layers {
                if layer.has_tile(id) && self.is_layer_visible(&layer.name) {
                    layer.draw_tile(&mut context, &mut self.features);
                }
            }
            context.state = TileState::Drawn;
        }
        self.tiles.insert(context);
    }

    /// Wipes the tile's canvas without touching its data
    pub fn clear_tile(&mut self, id: &TileId) {
        if let Some(context) = self.tiles.get_mut(id) {
            context.canvas.clear();
        }
    }

    fn draw_vector_tile(&mut self, data: &VectorTile, context: &mut TileContext) {
        if self.options.debug {
            draw_debug_info(context);
        }

        for name in data.layer_names() {
            self.ensure_layer(name);
        }

        for index in 0..self.layers.len() {
            let name = self.layers[index].name.clone();
            let source_layer = match data.layer(&name) {
                Some(source_layer) => source_layer,
                None => continue,
            };

            if !self.is_layer_visible(&name) {
                let selection = &self.selection;
                self.layers[index].release_tile(&context.id, &mut self.features, |id| {
                    selection.contains(id)
                });
                continue;
            }

            let layer = &mut self.layers[index];
            layer.parse_vector_tile_features(source_layer, context, &mut self.features, &self.selection);
            layer.draw_tile(context, &mut self.features);
        }
    }

    fn ensure_layer(&mut self, name: &str) -> usize {
        if let Some(index) = self.layers.iter().position(|layer| layer.name == name) {
            return index;
        }
        let layer = Layer::new(name, self.options.style.clone())
            .with_filter(self.options.filter.clone())
            .with_feature_id_fn(self.options.get_id_for_layer_feature.clone())
            .with_custom_draw(self.options.custom_draw.clone());
        self.layers.push(layer);
        self.layers.len() - 1
    }

    // Layer policy

    pub fn set_style(&mut self, style: impl Into<Style>, redraw_tiles: bool) {
        let style = style.into();
        for layer in self.layers.iter_mut() {
            layer.set_style(style.clone());
        }
        self.options.style = style;
        if redraw_tiles {
            for id in self.visible_tile_ids() {
                self.restyle_tile(&id);
            }
        }
    }

    pub fn set_filter(&mut self, filter: Option<FilterFn>, redraw_tiles: bool) {
        for layer in self.layers.iter_mut() {
            layer.set_filter(filter.clone());
        }
        self.options.filter = filter;
        if redraw_tiles {
            self.redraw_all_tiles();
        }
    }

    /// `None` shows every layer
    pub fn set_visible_layers(&mut self, layers: Option<Vec<String>>, redraw_tiles: bool) {
        self.options.visible_layers = layers;
        if redraw_tiles {
            self.redraw_all_tiles();
        }
    }

    /// Names of the layers drawn, in registration order when unrestricted
    pub fn visible_layers(&self) -> Vec<String> {
        match &self.options.visible_layers {
            Some(layers) => layers.clone(),
            None => self.layer_names(),
        }
    }

    /// `None` makes every layer clickable
    pub fn set_clickable_layers(&mut self, layers: Option<Vec<String>>) {
        self.options.clickable_layers = layers;
    }

    /// Points the source at a new url. Cached data from the old url is
    /// dropped; with `redraw_tiles` the visible tiles are fetched again.
    pub fn set_url(&mut self, url: impl Into<TileUrl>, redraw_tiles: bool) {
        self.options.url = url.into();

        for id in self.tiles.ids() {
            if !self.visible.contains(&id) {
                self.tiles.invalidate(&id);
            }
        }
        if !redraw_tiles {
            return;
        }

        for id in self.visible_tile_ids() {
            let location = match id.location() {
                Ok(location) => location,
                Err(err) => {
                    log::warn!("cannot refetch tile {}: {}", id, err);
                    continue;
                }
            };
            self.release_tile_features(&id);
            self.visible.remove(&id);
            self.tiles.remove(&id);
            self.get_tile(location, location.z);
        }
    }

    pub fn is_layer_visible(&self, name: &str) -> bool {
        match &self.options.visible_layers {
            Some(layers) => layers.iter().any(|layer| layer == name),
            None => true,
        }
    }

    pub fn is_layer_clickable(&self, name: &str) -> bool {
        match &self.options.clickable_layers {
            Some(layers) => layers.iter().any(|layer| layer == name),
            None => true,
        }
    }

    // Selection

    /// Replaces the selection with `ids`
    pub fn set_selected_features<S: Into<FeatureId>>(&mut self, ids: impl IntoIterator<Item = S>) {
        let ids: Vec<FeatureId> = ids.into_iter().map(Into::into).collect();
        let mut touched = self.clear_selection();
        for id in ids {
            touched.extend(self.mark_selected(&id, true));
        }
        self.redraw_touched(touched);
    }

    pub fn feature_selected(&mut self, id: &str) {
        let touched = self.mark_selected(id, true);
        self.redraw_touched(touched);
    }

    pub fn feature_deselected(&mut self, id: &str) {
        let touched = self.mark_selected(id, false);
        self.redraw_touched(touched);
    }

    pub fn deselect_all_features(&mut self) {
        let touched = self.clear_selection();
        self.redraw_touched(touched);
    }

    pub fn is_feature_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Selected ids, sorted
    pub fn selected_feature_ids(&self) -> Vec<FeatureId> {
        let mut ids: Vec<FeatureId> = self.selection.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Selected features that have been loaded, sorted by id then layer. An
    /// id shared by several layers selects the feature in each of them.
    pub fn get_selected_features(&self) -> Vec<&Feature> {
        let mut features: Vec<&Feature> = self
            .selection
            .iter()
            .flat_map(|id| self.features.with_id(id))
            .collect();
        features.sort_by(|a, b| (&a.id, &a.layer).cmp(&(&b.id, &b.layer)));
        features
    }

    pub fn get_selected_features_in_tile(&self, tile_id: &TileId) -> Vec<&Feature> {
        self.get_selected_features()
            .into_iter()
            .filter(|feature| feature.tile(tile_id).is_some())
            .collect()
    }

    /// Updates the set and the feature's flag. Returns the tiles to repaint.
    fn mark_selected(&mut self, id: &str, selected: bool) -> Vec<TileId> {
        let changed = if selected {
            self.selection.insert(id.to_string())
        } else {
            self.selection.remove(id)
        };
        if !changed {
            return Vec::new();
        }

        for layer in &self.layers {
            layer.set_selected(&mut self.features, id, selected);
        }

        let mut tiles = Vec::new();
        let layers: Vec<String> = self.features.with_id(id).map(|feature| feature.layer.clone()).collect();
        for layer in layers {
            let orphaned = match self.features.get(&layer, id) {
                Some(feature) => {
                    tiles.extend(feature.tile_ids());
                    !feature.has_tiles() && !selected
                }
                None => false,
            };
            if orphaned {
                self.features.remove(&layer, id);
            }
        }
        tiles
    }

    fn clear_selection(&mut self) -> Vec<TileId> {
        let ids: Vec<FeatureId> = self.selection.iter().cloned().collect();
        ids.iter().flat_map(|id| self.mark_selected(id, false)).collect()
    }

    fn redraw_touched(&mut self, mut tiles: Vec<TileId>) {
        tiles.sort();
        tiles.dedup();
        for id in tiles {
            self.restyle_tile(&id);
        }
    }

    // Mouse events

    pub fn on_click(
        &mut self,
        event: MapMouseEvent,
        callback: impl FnMut(&TileMouseEvent) + 'static,
        options: ClickHandlerOptions,
    ) {
        self.mouse_event(MouseEventKind::Click, event, Box::new(callback), options);
    }

    pub fn on_mouse_hover(
        &mut self,
        event: MapMouseEvent,
        callback: impl FnMut(&TileMouseEvent) + 'static,
        options: ClickHandlerOptions,
    ) {
        self.mouse_event(MouseEventKind::Hover, event, Box::new(callback), options);
    }

    /// Single entry point for both kinds. With a delay the event waits in the
    /// debouncer, replacing any earlier event of the same kind.
    fn mouse_event(
        &mut self,
        kind: MouseEventKind,
        event: MapMouseEvent,
        callback: MouseCallback,
        options: ClickHandlerOptions,
    ) {
        let delay = options.delay();
        let pending = PendingMouseEvent {
            kind,
            event,
            options,
            callback,
        };
        if let Some(ready) = self.debouncer.schedule(kind, pending, delay, Instant::now()) {
            self.dispatch_mouse_event(ready);
        }
    }

    /// Dispatches debounced events whose delay has elapsed
    pub fn process_mouse_events(&mut self) -> usize {
        let due = self.debouncer.take_due(Instant::now());
        let count = due.len();
        for pending in due {
            self.dispatch_mouse_event(pending);
        }
        count
    }

    /// Sleeps until every debounced event has been dispatched
    #[cfg(feature = "tokio-runtime")]
    pub async fn flush_mouse_events(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(deadline) = self.debouncer.next_deadline() {
            let now = Instant::now();
            if deadline > now {
                tokio::time::sleep(deadline - now).await;
            }
            dispatched += self.process_mouse_events();
        }
        dispatched
    }

    pub fn has_pending_mouse_events(&self) -> bool {
        !self.debouncer.is_empty()
    }

    /// Hit-tests the tile under the cursor layer by layer, topmost layer
    /// first, calling back once per tested layer. When no layer is tested the
    /// callback still runs once without a feature. Events over tiles that are
    /// not shown are dropped.
    fn dispatch_mouse_event(&mut self, pending: PendingMouseEvent) {
        let PendingMouseEvent {
            kind,
            event,
            options,
            mut callback,
        } = pending;
        let zoom = event.zoom.min(MAX_ZOOM);
        let tile_size = self.options.tile_size;
        let tile_id = normalize_tile(get_tile_at_lat_lng(&event.lat_lng, zoom, tile_size)).id();
        if !self.visible.contains(&tile_id) {
            log::debug!("{:?} over tile {} which is not shown", kind, tile_id);
            return;
        }

        let tile_point = from_lat_lng_to_tile_point(&event.lat_lng, zoom, tile_size);
        let mut base = TileMouseEvent::new(kind, &event);
        base.tile_id = Some(tile_id.clone());
        base.tile_point = Some(tile_point);

        let candidates: Vec<String> = self
            .layers
            .iter()
            .rev()
            .filter(|layer| layer.has_tile(&tile_id))
            .filter(|layer| self.is_layer_visible(&layer.name) && self.is_layer_clickable(&layer.name))
            .map(|layer| layer.name.clone())
            .collect();
        if candidates.is_empty() {
            callback(&base);
        }

        let mut any_hit = false;
        for name in candidates {
            let hit = self
                .layer(&name)
                .and_then(|layer| layer.handle_click_event(&tile_point, &tile_id, &self.features));

            let mut tile_event = base.clone();
            if let Some(id) = hit {
                any_hit = true;
                if options.set_selected {
                    self.apply_click_selection(&id, &options);
                }
                tile_event.feature = self.features.get(&name, &id).map(FeatureInfo::from);
            }
            tile_event.layer = Some(name);

            callback(&tile_event);
            if options.limit_to_first_visible_layer && tile_event.feature.is_some() {
                break;
            }
        }

        if !any_hit && options.set_selected && !options.multiple_selection {
            self.deselect_all_features();
        }
    }

    fn apply_click_selection(&mut self, id: &str, options: &ClickHandlerOptions) {
        if options.toggle_selection && self.is_feature_selected(id) {
            self.feature_deselected(id);
            return;
        }
        let mut touched = Vec::new();
        if !options.multiple_selection {
            let others: Vec<FeatureId> = self.selection.iter().filter(|other| *other != id).cloned().collect();
            for other in others {
                touched.extend(self.mark_selected(&other, false));
            }
        }
        touched.extend(self.mark_selected(id, true));
        self.redraw_touched(touched);
    }

    // Inspection

    pub fn tile_context(&self, id: &TileId) -> Option<&TileContext> {
        self.tiles.get(id)
    }

    pub fn tile_state(&self, id: &TileId) -> Option<TileState> {
        self.tiles.get(id).map(|context| context.state)
    }

    pub fn canvas(&self, handle: &TileHandle) -> Option<&TileCanvas> {
        self.tiles.get(&handle.id).map(|context| &context.canvas)
    }

    pub fn is_tile_visible(&self, id: &TileId) -> bool {
        self.visible.contains(id)
    }

    pub fn visible_tile_ids(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.visible.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Tiles holding decoded data
    pub fn cached_tile_ids(&self) -> Vec<TileId> {
        self.tiles
            .ids()
            .into_iter()
            .filter(|id| self.tiles.is_resolved(id))
            .collect()
    }

    pub fn feature(&self, layer: &str, id: &str) -> Option<&Feature> {
        self.features.get(layer, id)
    }

    /// Every loaded feature with `id`, sorted by layer
    pub fn features_with_id(&self, id: &str) -> Vec<&Feature> {
        let mut features: Vec<&Feature> = self.features.with_id(id).collect();
        features.sort_by(|a, b| a.layer.cmp(&b.layer));
        features
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.tiles.cache_stats()
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.name.clone()).collect()
    }
}

impl MapType for TileManager {
    type Tile = TileHandle;

    fn get_tile(&mut self, coord: TileLocation, zoom: u8) -> TileHandle {
        TileManager::get_tile(self, coord, zoom)
    }

    fn release_tile(&mut self, tile: &TileHandle) {
        TileManager::release_tile(self, tile)
    }

    fn tile_canvas(&self, tile: &TileHandle) -> Option<&TileCanvas> {
        self.canvas(tile)
    }
}

impl fmt::Debug for TileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileManager")
            .field("options", &self.options)
            .field("tiles", &self.tiles.len())
            .field("visible", &self.visible.len())
            .field("layers", &self.layer_names())
            .field("features", &self.features.len())
            .field("selection", &self.selected_feature_ids())
            .field("loader", &self.loader)
            .finish()
    }
}
