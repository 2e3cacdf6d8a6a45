//! Core constants for the Petal Maps adapter.
//! Keeping them in a single place makes it easier to tweak adapter-wide magic numbers.

use std::time::Duration;

/// Center used when a coordinate cannot be recognised, `[lng, lat]` (Shanghai).
pub const DEFAULT_CENTER: [f64; 2] = [121.30654632240122, 31.25744185633306];

/// Zoom used when the config does not name one.
pub const DEFAULT_ZOOM: f64 = 5.0;

/// Petal zoom levels sit one above the engine's canonical levels.
pub const ZOOM_OFFSET: f64 = 1.0;

/// Lowest native zoom level the SDK accepts.
pub const NATIVE_MIN_ZOOM: f64 = 2.0;

/// Highest native zoom level the SDK accepts.
pub const NATIVE_MAX_ZOOM: f64 = 40.0;

/// Default size hint for the engine's simple (non-geographic) coordinate space.
pub const DEFAULT_MAP_SIZE: f64 = 10_000.0;

/// Equatorial Earth radius used by the haversine distance, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Mean Earth radius used by the normalised Mercator coordinate space, in meters.
pub const MERCATOR_EARTH_RADIUS: f64 = 6_371_008.8;

/// Engine coordinate units per unit of normalised Mercator distance.
pub const TILE_RESOLUTION: f64 = 4_194_304.0 * 2.0;

/// Tile size of the flat world projection used by the viewport.
pub const TILE_SIZE: f64 = 512.0;

/// Camera altitude in viewport heights (web-mercator convention).
pub const DEFAULT_ALTITUDE: f64 = 1.5;

/// Script URL of the Petal Maps JS SDK.
pub const SDK_SCRIPT_URL: &str = "https://mapapi.cloud.huawei.com/mapjs/v1/mapkit.js";

/// Substring identifying SDK script tags injected by the loader.
pub const SDK_SCRIPT_PATTERN: &str = "mapapi.cloud.huawei.com/mapjs";

/// Name of the SDK's global namespace object.
pub const SDK_GLOBAL: &str = "HWMapJsSDK";

/// Primary map constructor exposed on the SDK namespace.
pub const SDK_MAP_CONSTRUCTOR: &str = "HWMap";

/// Re-checks for the map constructor after the script's `onload`.
pub const SDK_READY_MAX_ATTEMPTS: u32 = 40;

/// Interval between SDK readiness checks.
pub const SDK_READY_INTERVAL: Duration = Duration::from_millis(50);

/// Interval between map readiness checks.
pub const MAP_READY_INTERVAL: Duration = Duration::from_millis(100);

/// Map readiness re-checks before giving up (one minute at the default interval).
pub const MAP_READY_MAX_ATTEMPTS: u32 = 600;

/// Demo credential shipped with the SDK samples. Usable, but warned about.
pub const DEMO_TOKEN: &str = "DQEDAD1uMZ0F69eNhmcLlqbB4w6NDtDUi4l2PlXdfoY7xVJaJrlAFg5BrUbHIPglTyNXkdksd1JkhyFzDmm6BoA5gxkGPPquJHquLw==";

/// Where developers obtain their own credential.
pub const CONSOLE_URL: &str = "https://developer.huawei.com/consumer/cn/service/josp/agc/index.html";

/// Provider name reported by `get_type`.
pub const PROVIDER_TYPE: &str = "PetalMap";
