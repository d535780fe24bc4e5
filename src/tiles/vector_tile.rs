//! Decoded vector tile model
//!
//! This is the shape the fetch/decode collaborator hands back: named layers,
//! each with feature records carrying a geometry type, a property map and
//! integer tile-local geometry. Protobuf decoding itself lives outside this
//! crate; anything that can produce these structs can feed a [`TileManager`].
//!
//! [`TileManager`]: crate::manager::TileManager

use crate::core::constants::DEFAULT_EXTENT;
use crate::MapError;
use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Feature properties as decoded from the tile
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// One decoded tile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorTile {
    pub layers: Vec<VectorTileLayer>,
}

impl VectorTile {
    pub fn new(layers: Vec<VectorTileLayer>) -> Self {
        Self { layers }
    }

    pub fn layer(&self, name: &str) -> Option<&VectorTileLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }
}

fn default_extent() -> u32 {
    DEFAULT_EXTENT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorTileLayer {
    pub name: String,
    /// Size of the integer coordinate range that spans one tile
    #[serde(default = "default_extent")]
    pub extent: u32,
    #[serde(default)]
    pub features: Vec<VectorTileFeature>,
}

impl VectorTileLayer {
    pub fn new(name: impl Into<String>, extent: u32, features: Vec<VectorTileFeature>) -> Self {
        Self {
            name: name.into(),
            extent,
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorTileFeature {
    #[serde(default)]
    pub id: Option<u64>,
    /// Raw MVT geometry type: 1 point, 2 line string, 3 polygon
    #[serde(rename = "type")]
    pub geom_type: u32,
    #[serde(default)]
    pub properties: Properties,
    /// Rings (polygons), parts (lines) or point groups in tile coordinates
    #[serde(default)]
    pub geometry: Vec<Vec<Coord<i32>>>,
}

impl VectorTileFeature {
    pub fn new(geom_type: u32, geometry: Vec<Vec<Coord<i32>>>) -> Self {
        Self {
            id: None,
            geom_type,
            properties: Properties::new(),
            geometry,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

/// Turns fetched bytes into a [`VectorTile`]
pub trait TileDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> crate::Result<VectorTile>;
}

/// Decodes tiles served as JSON documents of the [`VectorTile`] shape
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTileDecoder;

impl TileDecoder for JsonTileDecoder {
    fn decode(&self, bytes: &[u8]) -> crate::Result<VectorTile> {
        let tile: VectorTile = serde_json::from_slice(bytes).map_err(MapError::Serialization)?;
        Ok(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_decoder() {
        let json = br#"{
            "layers": [{
                "name": "roads",
                "features": [{
                    "id": 7,
                    "type": 2,
                    "properties": {"kind": "primary"},
                    "geometry": [[{"x": 0, "y": 0}, {"x": 4096, "y": 4096}]]
                }]
            }]
        }"#;
        let tile = JsonTileDecoder.decode(json).unwrap();
        let roads = tile.layer("roads").unwrap();
        assert_eq!(roads.extent, DEFAULT_EXTENT);
        assert_eq!(roads.features[0].id, Some(7));
        assert_eq!(roads.features[0].property("kind").unwrap(), "primary");
        assert_eq!(roads.features[0].geometry[0][1], Coord { x: 4096, y: 4096 });
    }

    #[test]
    fn test_json_decoder_error() {
        assert!(JsonTileDecoder.decode(b"not json").is_err());
    }
}
