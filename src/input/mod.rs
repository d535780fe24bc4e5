pub mod debounce;
pub mod events;

// Re-export the essential types
pub use debounce::Debouncer;
pub use events::{FeatureInfo, MapMouseEvent, MouseCallback, MouseEventKind, TileMouseEvent};
