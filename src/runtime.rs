//! Runtime support for futures that need a tokio reactor
//!
//! Tile fetches are polled from whatever context the host drives the manager
//! in. reqwest only works inside a tokio runtime, so when the caller has none
//! the future is moved onto a small runtime owned by the crate and its result
//! is awaited through the join handle.

use std::future::Future;

#[cfg(feature = "tokio-runtime")]
use crate::MapError;
#[cfg(feature = "tokio-runtime")]
use once_cell::sync::Lazy;

#[cfg(feature = "tokio-runtime")]
static FALLBACK_RUNTIME: Lazy<Option<tokio::runtime::Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("maplet-mvt-io")
        .enable_all()
        .build()
        .map_err(|err| log::warn!("cannot start fallback runtime: {}", err))
        .ok()
});

/// Whether the calling thread is inside a tokio runtime
#[cfg(feature = "tokio-runtime")]
pub fn has_ambient_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

/// Runs `future` in place when a runtime is current, otherwise on the
/// fallback runtime. Fails instead of panicking when no runtime can be had.
#[cfg(feature = "tokio-runtime")]
pub async fn run<F, T>(future: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    if has_ambient_runtime() {
        return future.await;
    }
    match FALLBACK_RUNTIME.as_ref() {
        Some(runtime) => runtime
            .spawn(future)
            .await
            .map_err(|err| MapError::Fetch(format!("fetch task failed: {}", err)))?,
        None => Err(MapError::Fetch("no async runtime available".to_string()).into()),
    }
}

/// Without tokio support the host's executor must provide the reactor.
#[cfg(not(feature = "tokio-runtime"))]
pub async fn run<F, T>(future: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    future.await
}
