//! Prelude module for common maplet-petal types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use maplet_petal::prelude::*;`

pub use crate::core::{
    builder::MapServiceBuilder,
    config::{MapServiceConfig, MapStyleConfig, ServiceTiming, StatusOptions},
    geo::{Bounds, CoordTree, GeoPoint, MercatorCoordinate, PixelPoint},
    viewport::{CameraState, Viewport},
};

pub use crate::input::{
    events::{MapEvent, ServiceEvent},
    handler::{EventEmitter, EventHandler},
};

pub use crate::sdk::{
    LoaderError, NativeListener, NativeObject, NativeObjectExt, NativeValue, SdkLoader,
    SdkSource,
};

pub use crate::service::{
    BasemapRegistry, ContainerHost, ExportFormat, PetalMapService, ServiceState,
};

pub use crate::runtime::{ManualScheduler, Retry, RetryOutcome, Scheduler};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioScheduler;

pub use crate::{AdapterError, Error as MapError, Result};

pub use std::{rc::Rc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
