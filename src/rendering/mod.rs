pub mod context;
pub mod draw;

// Re-export main types
pub use context::{DrawCommand, TileCanvas, TileContext, TileState};
pub use draw::{default_draw_fn, get_context2d, DrawFn};
