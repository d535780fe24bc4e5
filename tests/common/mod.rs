#![allow(dead_code)]

use async_trait::async_trait;
use geo_types::Coord;
use maplet_mvt::core::geo::from_point_to_lat_lng;
use maplet_mvt::tiles::{TileFetcher, TileRequest, VectorTile, VectorTileFeature, VectorTileLayer};
use maplet_mvt::{LatLng, MapError, Point, TileLocation};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Semaphore;

pub const URL_TEMPLATE: &str = "https://tiles.test/{z}/{x}/{y}.json";

/// In-memory tile server. Tiles not registered fail to load. When gated,
/// every fetch waits for a permit.
pub struct FixtureFetcher {
    tiles: HashMap<String, VectorTile>,
    requests: Mutex<Vec<TileRequest>>,
    gate: Option<Semaphore>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_tile(mut self, location: TileLocation, tile: VectorTile) -> Self {
        self.tiles.insert(url_for(location), tile);
        self
    }

    pub fn open_gate(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn requests(&self) -> Vec<TileRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TileFetcher for FixtureFetcher {
    async fn fetch(&self, request: &TileRequest) -> maplet_mvt::Result<VectorTile> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.tiles.get(&request.url) {
            Some(tile) => Ok(tile.clone()),
            None => Err(MapError::Fetch(format!("404 {}", request.url)).into()),
        }
    }
}

pub fn url_for(location: TileLocation) -> String {
    format!("https://tiles.test/{}/{}/{}.json", location.z, location.x, location.y)
}

fn square(from: i32, to: i32) -> Vec<Coord<i32>> {
    vec![
        Coord { x: from, y: from },
        Coord { x: to, y: from },
        Coord { x: to, y: to },
        Coord { x: from, y: to },
        Coord { x: from, y: from },
    ]
}

/// Three layers, in this order:
/// - `water`: `water:10` covers the whole tile, `water:11` spans pixels 187.5..218.75
/// - `roads`: `roads:20`, a horizontal line at pixel row 128
/// - `pois`: `pois:30`, a point at pixel (64, 64)
pub fn sample_tile() -> VectorTile {
    VectorTile::new(vec![
        VectorTileLayer::new(
            "water",
            4096,
            vec![
                VectorTileFeature::new(3, vec![square(0, 4096)])
                    .with_id(10)
                    .with_property("name", "sea"),
                VectorTileFeature::new(3, vec![square(3000, 3500)])
                    .with_id(11)
                    .with_property("name", "pond"),
            ],
        ),
        VectorTileLayer::new(
            "roads",
            4096,
            vec![VectorTileFeature::new(
                2,
                vec![vec![Coord { x: 0, y: 2048 }, Coord { x: 4096, y: 2048 }]],
            )
            .with_id(20)
            .with_property("kind", "primary")],
        ),
        VectorTileLayer::new(
            "pois",
            4096,
            vec![VectorTileFeature::new(1, vec![vec![Coord { x: 1024, y: 1024 }]])
                .with_id(30)
                .with_property("name", "lighthouse")],
        ),
    ])
}

/// Geographic position of pixel `(px, py)` inside `tile` (256 px tiles)
pub fn lat_lng_at(tile: TileLocation, px: f64, py: f64) -> LatLng {
    let scale = 2_f64.powi(tile.z as i32);
    from_point_to_lat_lng(&Point::new(
        (tile.x as f64 * 256.0 + px) / scale,
        (tile.y as f64 * 256.0 + py) / scale,
    ))
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
