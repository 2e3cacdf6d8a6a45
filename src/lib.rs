//! # maplet-petal
//!
//! Adapter that puts the Petal Maps JS SDK behind a provider-neutral map
//! service: one-shot SDK loading, coordinate normalization, canonical event
//! names and a continuously synced web-mercator viewport.
//!
//! Everything runs on a single thread. Timers go through the
//! [`Scheduler`](runtime::Scheduler) seam and the SDK is reached through the
//! dynamic [`NativeObject`](sdk::NativeObject) interface, so the service runs
//! the same against the browser SDK (feature `wasm`) and the in-memory SDK in
//! [`sdk::memory`].

pub mod core;
pub mod input;
pub mod prelude;
pub mod runtime;
pub mod sdk;
pub mod service;

#[cfg(feature = "wasm")]
pub mod web;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::MapServiceBuilder,
    config::{MapServiceConfig, ServiceTiming, StatusOptions},
    geo::{Bounds, CoordTree, GeoPoint, MercatorCoordinate, PixelPoint},
    viewport::Viewport,
};

pub use crate::input::{
    events::{MapEvent, ServiceEvent},
    handler::EventHandler,
};

pub use crate::sdk::loader::{LoaderError, SdkLoader};

pub use crate::service::{
    map::{PetalMapService, ServiceState},
    registry::BasemapRegistry,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced to the embedding engine. Everything else (missing optional
/// SDK methods, failed reads during sync) is handled locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("No container id specified")]
    MissingContainerId,

    #[error("Map container `{0}` was not found in the document")]
    ContainerNotFound(String),

    #[error(
        "Petal Maps access token is required. Please provide `token` in map config. \
         You can get an access token from Huawei Developer Console: {}",
        constants::CONSOLE_URL
    )]
    MissingCredential,

    #[error("No Petal Maps SDK source configured and no map instance supplied")]
    MissingSdkSource,

    #[error("No scheduler available; supply one with `with_scheduler`")]
    MissingScheduler,

    #[error(
        "HWMapJsSDK.HWMap constructor is not available. Please confirm that the Petal Maps SDK \
         script is reachable and that the access token is valid."
    )]
    ConstructorUnavailable,

    #[error("Failed to construct the Petal map: {0}")]
    Construction(String),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Map service is already initialized")]
    AlreadyInitialized,

    #[error("Map service has not been initialized")]
    NotInitialized,

    #[error("Map service has been destroyed")]
    Destroyed,

    #[error("Petal map did not become ready after {attempts} checks")]
    ReadyTimeout { attempts: u32 },

    #[error("Unknown basemap \"{name}\". Available: {available}")]
    UnknownBasemap { name: String, available: String },
}

/// Error type alias for convenience
pub type Error = AdapterError;

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
