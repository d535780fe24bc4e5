pub mod cache;
pub mod loader;
pub mod source;
pub mod vector_tile;

// Re-exports for convenience
pub use cache::TileCache;
pub use loader::{FetchOutcome, HttpTileFetcher, TileFetcher, TileLoader, TileRequest};
pub use source::TileSource;
pub use vector_tile::{JsonTileDecoder, TileDecoder, VectorTile, VectorTileFeature, VectorTileLayer};
