use crate::core::geo::{TileId, TileLocation};
use crate::runtime;
use crate::tiles::vector_tile::{JsonTileDecoder, TileDecoder, VectorTile};
use crate::MapError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Shared async HTTP client for tile fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("maplet-mvt/0.1.0")
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|err| {
            log::warn!("falling back to default HTTP client: {}", err);
            reqwest::Client::new()
        })
});

/// One tile to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Tile the data is drawn into
    pub tile_id: TileId,
    /// Where the data comes from; an ancestor of `tile_id` when over-zooming
    pub location: TileLocation,
    pub url: String,
}

/// Fetches and decodes the vector tile behind a request.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, request: &TileRequest) -> crate::Result<VectorTile>;
}

/// Fetches tiles over HTTP with the shared client
pub struct HttpTileFetcher {
    headers: Vec<(String, String)>,
    decoder: Arc<dyn TileDecoder>,
}

impl HttpTileFetcher {
    pub fn new(decoder: Arc<dyn TileDecoder>) -> Self {
        Self {
            headers: Vec::new(),
            decoder,
        }
    }

    /// Adds a header sent with every tile request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers<K: Into<String>, V: Into<String>>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers
            .extend(headers.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl Default for HttpTileFetcher {
    fn default() -> Self {
        Self::new(Arc::new(JsonTileDecoder))
    }
}

impl fmt::Debug for HttpTileFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTileFetcher")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, request: &TileRequest) -> crate::Result<VectorTile> {
        log::debug!("fetch tile {} from {}", request.tile_id, request.url);
        let url = request.url.clone();
        let headers = self.headers.clone();
        let decoder = Arc::clone(&self.decoder);

        runtime::run(async move {
            let mut builder = HTTP_CLIENT.get(&url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(MapError::Network)?;
            if !response.status().is_success() {
                return Err(MapError::Fetch(format!("HTTP {} for {}", response.status(), url)).into());
            }
            let bytes = response.bytes().await.map_err(MapError::Network)?;
            decoder.decode(&bytes)
        })
        .await
    }
}

/// Result of one fetch, tagged with the request that started it
#[derive(Debug)]
pub struct FetchOutcome {
    pub tile_id: TileId,
    pub key: u64,
    pub result: crate::Result<Arc<VectorTile>>,
}

/// In-flight tile fetches.
///
/// Fetches run as futures owned by the loader and only make progress when the
/// loader is polled, so completions are handed back on the caller's thread.
/// The same tile may be in flight more than once; callers tell the results
/// apart by `key`.
pub struct TileLoader {
    fetcher: Arc<dyn TileFetcher>,
    pending: FuturesUnordered<BoxFuture<'static, FetchOutcome>>,
}

impl TileLoader {
    pub fn new(fetcher: Arc<dyn TileFetcher>) -> Self {
        Self {
            fetcher,
            pending: FuturesUnordered::new(),
        }
    }

    /// Applies to fetches started after the call
    pub fn set_fetcher(&mut self, fetcher: Arc<dyn TileFetcher>) {
        self.fetcher = fetcher;
    }

    pub fn start(&mut self, request: TileRequest, key: u64) {
        let fetcher = Arc::clone(&self.fetcher);
        self.pending.push(
            async move {
                let result = fetcher.fetch(&request).await.map(Arc::new);
                FetchOutcome {
                    tile_id: request.tile_id,
                    key,
                    result,
                }
            }
            .boxed(),
        );
    }

    /// Completed fetches, without waiting for the rest
    pub fn poll_ready(&mut self) -> Vec<FetchOutcome> {
        let mut ready = Vec::new();
        while let Some(Some(outcome)) = self.pending.next().now_or_never() {
            ready.push(outcome);
        }
        ready
    }

    /// Waits for the next fetch to complete. `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<FetchOutcome> {
        self.pending.next().await
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileLoader")
            .field("in_flight", &self.pending.len())
            .finish_non_exhaustive()
    }
}
