//! Configuration for a vector tile source and its mouse handlers
//!
//! Options are plain structs with `Default` impls and chainable `with_*`
//! setters, so hosts can start from defaults and override what they need.

use crate::core::constants::TILE_SIZE;
use crate::layers::feature::FeatureId;
use crate::layers::layer::{FeatureIdFn, FilterFn};
use crate::layers::style::{Style, StyleOptions};
use crate::rendering::draw::DrawFn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Builds a tile url from `(zoom, x, y)`
pub type UrlFn = Arc<dyn Fn(u8, i64, i64) -> String + Send + Sync>;

/// Where tiles are fetched from
#[derive(Clone)]
pub enum TileUrl {
    /// Template with `{z}`, `{x}` and `{y}` placeholders
    Template(String),
    Function(UrlFn),
}

impl TileUrl {
    pub fn resolve(&self, zoom: u8, x: i64, y: i64) -> String {
        match self {
            TileUrl::Template(template) => template
                .replace("{z}", &zoom.to_string())
                .replace("{x}", &x.to_string())
                .replace("{y}", &y.to_string()),
            TileUrl::Function(f) => f(zoom, x, y),
        }
    }
}

impl Default for TileUrl {
    fn default() -> Self {
        TileUrl::Template(String::new())
    }
}

impl fmt::Debug for TileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileUrl::Template(template) => f.debug_tuple("Template").field(template).finish(),
            TileUrl::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for TileUrl {
    fn from(template: &str) -> Self {
        TileUrl::Template(template.to_string())
    }
}

impl From<String> for TileUrl {
    fn from(template: String) -> Self {
        TileUrl::Template(template)
    }
}

/// Constructor options for [`crate::manager::TileManager`]
#[derive(Clone)]
pub struct MvtSourceOptions {
    pub url: TileUrl,
    /// Zoom above which ancestor tiles are over-zoomed instead of fetched
    pub source_max_zoom: Option<u8>,
    /// Draw tile outlines and ids
    pub debug: bool,
    /// Keep drawn tiles around after release
    pub cache: bool,
    pub tile_size: u32,
    /// `None` means every layer is visible
    pub visible_layers: Option<Vec<String>>,
    /// `None` means every layer is clickable
    pub clickable_layers: Option<Vec<String>>,
    pub selected_features: Vec<FeatureId>,
    pub get_id_for_layer_feature: Option<FeatureIdFn>,
    pub style: Style,
    pub filter: Option<FilterFn>,
    pub custom_draw: Option<DrawFn>,
    /// Extra headers sent with every tile request
    pub xhr_headers: Vec<(String, String)>,
}

impl Default for MvtSourceOptions {
    fn default() -> Self {
        Self {
            url: TileUrl::default(),
            source_max_zoom: None,
            debug: false,
            cache: false,
            tile_size: TILE_SIZE,
            visible_layers: None,
            clickable_layers: None,
            selected_features: Vec::new(),
            get_id_for_layer_feature: None,
            style: Style::Static(StyleOptions::default()),
            filter: None,
            custom_draw: None,
            xhr_headers: Vec::new(),
        }
    }
}

impl MvtSourceOptions {
    pub fn new(url: impl Into<TileUrl>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_source_max_zoom(mut self, zoom: u8) -> Self {
        self.source_max_zoom = Some(zoom);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_visible_layers<S: Into<String>>(mut self, layers: impl IntoIterator<Item = S>) -> Self {
        self.visible_layers = Some(layers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_clickable_layers<S: Into<String>>(
        mut self,
        layers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.clickable_layers = Some(layers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_selected_features<S: Into<String>>(
        mut self,
        ids: impl IntoIterator<Item = S>,
    ) -> Self {
        self.selected_features = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feature_id_fn(mut self, f: FeatureIdFn) -> Self {
        self.get_id_for_layer_feature = Some(f);
        self
    }

    pub fn with_style(mut self, style: impl Into<Style>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_filter(mut self, filter: FilterFn) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_custom_draw(mut self, draw: DrawFn) -> Self {
        self.custom_draw = Some(draw);
        self
    }

    pub fn with_xhr_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.xhr_headers.push((name.into(), value.into()));
        self
    }
}

impl fmt::Debug for MvtSourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvtSourceOptions")
            .field("url", &self.url)
            .field("source_max_zoom", &self.source_max_zoom)
            .field("debug", &self.debug)
            .field("cache", &self.cache)
            .field("tile_size", &self.tile_size)
            .field("visible_layers", &self.visible_layers)
            .field("clickable_layers", &self.clickable_layers)
            .field("selected_features", &self.selected_features)
            .field("style", &self.style)
            .field("xhr_headers", &self.xhr_headers)
            .finish_non_exhaustive()
    }
}

/// Behaviour of `on_click` / `on_mouse_hover`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHandlerOptions {
    /// Stop at the first layer that reports a feature
    pub limit_to_first_visible_layer: bool,
    pub multiple_selection: bool,
    /// Update the selection set from the hit
    pub set_selected: bool,
    /// With `set_selected`, clicking a selected feature deselects it
    pub toggle_selection: bool,
    /// Debounce window in milliseconds; 0 dispatches immediately
    pub delay: u64,
}

impl Default for ClickHandlerOptions {
    fn default() -> Self {
        Self {
            limit_to_first_visible_layer: false,
            multiple_selection: false,
            set_selected: false,
            toggle_selection: true,
            delay: 0,
        }
    }
}

impl ClickHandlerOptions {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = delay_ms;
        self
    }

    pub fn with_set_selected(mut self, set_selected: bool) -> Self {
        self.set_selected = set_selected;
        self
    }

    pub fn with_toggle_selection(mut self, toggle: bool) -> Self {
        self.toggle_selection = toggle;
        self
    }

    pub fn with_multiple_selection(mut self, multiple: bool) -> Self {
        self.multiple_selection = multiple;
        self
    }

    pub fn with_limit_to_first_visible_layer(mut self, limit: bool) -> Self {
        self.limit_to_first_visible_layer = limit;
        self
    }
}
