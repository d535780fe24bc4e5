use crate::core::config::TileUrl;
use crate::core::geo::TileLocation;

/// Anything that can produce the tile URL for a location.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `location`.
    fn url(&self, location: TileLocation) -> String;
}

impl TileSource for TileUrl {
    fn url(&self, location: TileLocation) -> String {
        self.resolve(location.z, location.x, location.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_template_and_function_urls() {
        let template = TileUrl::from("https://tiles.example.com/{z}/{x}/{y}.pbf");
        assert_eq!(
            template.url(TileLocation::new(3, 5, 4)),
            "https://tiles.example.com/4/3/5.pbf"
        );

        let function = TileUrl::Function(Arc::new(|z, x, y| format!("tile-{}-{}-{}", z, x, y)));
        assert_eq!(function.url(TileLocation::new(1, 2, 3)), "tile-3-1-2");
    }
}
