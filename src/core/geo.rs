use crate::core::constants::{MAX_SIN_LATITUDE, MAX_ZOOM, WORLD_TILE_SIZE};
use crate::MapError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in world, tile or canvas pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// South-west / north-east corners of a tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileBounds {
    pub sw: LatLng,
    pub ne: LatLng,
}

impl TileBounds {
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.sw.lat
            && point.lat <= self.ne.lat
            && point.lng >= self.sw.lng
            && point.lng <= self.ne.lng
    }
}

/// Integer tile address at zoom `z`.
///
/// Coordinates are signed so that wrapped requests (negative or past the
/// edge of the world) can be represented before [`normalize_tile`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileLocation {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileLocation {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles per axis at this zoom
    pub fn tile_range(&self) -> i64 {
        1_i64 << self.z
    }

    pub fn normalize(&self) -> TileLocation {
        normalize_tile(*self)
    }

    pub fn id(&self) -> TileId {
        TileId::new(self.z, self.x, self.y)
    }

    /// Ancestor containing this tile at a lower `zoom`. Returns `self` when
    /// `zoom` is not below the current one.
    pub fn ancestor(&self, zoom: u8) -> TileLocation {
        if zoom >= self.z {
            return *self;
        }
        let distance = self.z - zoom;
        TileLocation::new(
            self.x.div_euclid(1 << distance),
            self.y.div_euclid(1 << distance),
            zoom,
        )
    }

    pub fn is_valid(&self) -> bool {
        let range = self.tile_range();
        (0..range).contains(&self.x) && (0..range).contains(&self.y)
    }
}

/// Canonical tile key in the format `zoom:x:y`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(String);

impl TileId {
    pub fn new(zoom: u8, x: i64, y: i64) -> Self {
        Self(get_tile_string(zoom, x, y))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn location(&self) -> crate::Result<TileLocation> {
        get_tile_from_string(&self.0)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TileId {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location = parse_tile_string(s)?;
        Ok(location.id())
    }
}

impl From<TileLocation> for TileId {
    fn from(location: TileLocation) -> Self {
        location.id()
    }
}

pub fn get_tile_string(zoom: u8, x: i64, y: i64) -> String {
    format!("{}:{}:{}", zoom, x, y)
}

/// Parses a `zoom:x:y` tile id.
pub fn get_tile_from_string(id: &str) -> crate::Result<TileLocation> {
    Ok(parse_tile_string(id)?)
}

fn parse_tile_string(id: &str) -> Result<TileLocation, MapError> {
    let invalid = || MapError::InvalidTileId(id.to_string());
    let mut parts = id.split(':');
    let (z, x, y) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(z), Some(x), Some(y), None) => (z, x, y),
        _ => return Err(invalid()),
    };
    let z: u8 = z.parse().map_err(|_| invalid())?;
    if z > MAX_ZOOM {
        return Err(invalid());
    }
    let x: i64 = x.parse().map_err(|_| invalid())?;
    let y: i64 = y.parse().map_err(|_| invalid())?;
    Ok(TileLocation::new(x, y, z))
}

/// Projects a coordinate into world pixels at the reference tile size
/// (`[0, 256)` on both axes).
pub fn from_lat_lng_to_point(lat_lng: &LatLng) -> Point {
    let siny = lat_lng
        .lat
        .to_radians()
        .sin()
        .clamp(-MAX_SIN_LATITUDE, MAX_SIN_LATITUDE);
    Point::new(
        WORLD_TILE_SIZE * (0.5 + lat_lng.lng / 360.0),
        WORLD_TILE_SIZE * (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI)),
    )
}

/// Inverse of [`from_lat_lng_to_point`].
pub fn from_point_to_lat_lng(point: &Point) -> LatLng {
    let lng = (point.x / WORLD_TILE_SIZE - 0.5) * 360.0;
    let merc = (0.5 - point.y / WORLD_TILE_SIZE) * 2.0 * PI;
    let lat = (2.0 * merc.exp().atan() - PI / 2.0).to_degrees();
    LatLng::new(lat, lng)
}

/// Tile containing `lat_lng` at `zoom` for tiles of `tile_size` pixels. The
/// result is not normalized.
pub fn get_tile_at_lat_lng(lat_lng: &LatLng, zoom: u8, tile_size: u32) -> TileLocation {
    let world = from_lat_lng_to_point(lat_lng);
    let scale = 2_f64.powi(zoom as i32) / tile_size as f64;
    TileLocation::new(
        (world.x * scale).floor() as i64,
        (world.y * scale).floor() as i64,
        zoom,
    )
}

/// Pixel offset of `lat_lng` inside the tile that contains it.
pub fn from_lat_lng_to_tile_point(lat_lng: &LatLng, zoom: u8, tile_size: u32) -> Point {
    let world = from_lat_lng_to_point(lat_lng);
    let pixel = world.multiply(2_f64.powi(zoom as i32));
    let tile = get_tile_at_lat_lng(lat_lng, zoom, tile_size);
    let size = tile_size as f64;
    Point::new(
        pixel.x - tile.x as f64 * size,
        pixel.y - tile.y as f64 * size,
    )
}

pub fn get_tile_bounds(tile: TileLocation) -> TileBounds {
    let tile = normalize_tile(tile);
    let span = WORLD_TILE_SIZE / tile.tile_range() as f64;
    let sw = from_point_to_lat_lng(&Point::new(
        tile.x as f64 * span,
        (tile.y + 1) as f64 * span,
    ));
    let ne = from_point_to_lat_lng(&Point::new(
        (tile.x + 1) as f64 * span,
        tile.y as f64 * span,
    ));
    TileBounds { sw, ne }
}

/// Wraps `x` and `y` into `[0, 2^z)`.
pub fn normalize_tile(tile: TileLocation) -> TileLocation {
    let range = tile.tile_range();
    TileLocation::new(tile.x.rem_euclid(range), tile.y.rem_euclid(range), tile.z)
}
