pub mod feature;
pub mod layer;
pub mod style;

// Re-export the essential types
pub use feature::{Feature, FeatureId, FeatureRegistry, FeatureTile, FeatureType, Path2D};
pub use layer::{FeatureIdFn, FilterFn, Layer};
pub use style::{Style, StyleFn, StyleOptions};
