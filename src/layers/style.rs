use crate::core::constants::{DEFAULT_LINE_WIDTH, DEFAULT_POINT_RADIUS};
use crate::layers::feature::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Flat canvas style record. Unset fields fall back to the canvas defaults.
///
/// `selected` carries the variant used while a feature is selected; it is
/// layered on top of the base record, so it only needs the fields that change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    /// Fill color (any CSS color string)
    pub fill_style: Option<String>,
    /// Stroke color
    pub stroke_style: Option<String>,
    pub line_width: Option<f64>,
    /// Radius used for point features
    pub radius: Option<f64>,
    pub selected: Option<Box<StyleOptions>>,
}

impl StyleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill_style = Some(fill.into());
        self
    }

    pub fn with_stroke(mut self, stroke: impl Into<String>) -> Self {
        self.stroke_style = Some(stroke.into());
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_selected(mut self, selected: StyleOptions) -> Self {
        self.selected = Some(Box::new(selected));
        self
    }

    pub fn line_width(&self) -> f64 {
        self.line_width.unwrap_or(DEFAULT_LINE_WIDTH)
    }

    pub fn radius(&self) -> f64 {
        self.radius.unwrap_or(DEFAULT_POINT_RADIUS)
    }

    /// Style to paint with for the given selection state.
    pub fn effective(&self, selected: bool) -> StyleOptions {
        match (&self.selected, selected) {
            (Some(overlay), true) => StyleOptions {
                fill_style: overlay.fill_style.clone().or_else(|| self.fill_style.clone()),
                stroke_style: overlay
                    .stroke_style
                    .clone()
                    .or_else(|| self.stroke_style.clone()),
                line_width: overlay.line_width.or(self.line_width),
                radius: overlay.radius.or(self.radius),
                selected: None,
            },
            _ => StyleOptions {
                selected: None,
                ..self.clone()
            },
        }
    }
}

/// Data-driven style: receives the feature and its layer name
pub type StyleFn = Arc<dyn Fn(&Feature, &str) -> StyleOptions + Send + Sync>;

/// Either a fixed record or a function evaluated on every draw
#[derive(Clone)]
pub enum Style {
    Static(StyleOptions),
    Dynamic(StyleFn),
}

impl Style {
    pub fn resolve(&self, feature: &Feature, layer_name: &str) -> StyleOptions {
        match self {
            Style::Static(options) => options.clone(),
            Style::Dynamic(f) => f(feature, layer_name),
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Style::Static(StyleOptions::default())
    }
}

impl From<StyleOptions> for Style {
    fn from(options: StyleOptions) -> Self {
        Style::Static(options)
    }
}

impl From<StyleFn> for Style {
    fn from(f: StyleFn) -> Self {
        Style::Dynamic(f)
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Static(options) => f.debug_tuple("Static").field(options).finish(),
            Style::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
