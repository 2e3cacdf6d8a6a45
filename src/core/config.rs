//! Configuration for the map service.
//!
//! `MapServiceConfig` mirrors the option bag the visualization engine hands to
//! every map adapter (camelCase keys). Unknown keys are kept and forwarded to
//! the native map constructor untouched.

use crate::core::constants::{
    DEFAULT_CENTER, DEFAULT_MAP_SIZE, DEFAULT_ZOOM, DEMO_TOKEN, MAP_READY_INTERVAL,
    MAP_READY_MAX_ATTEMPTS,
};
use crate::prelude::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOptions {
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapServiceConfig {
    /// DOM id of the container the native map is created in
    pub id: Option<String>,
    /// Initial center as `[lng, lat]`
    pub center: Option<[f64; 2]>,
    /// Initial (canonical) zoom
    pub zoom: Option<f64>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    /// Size hint for the engine's simple coordinate space
    pub map_size: Option<f64>,
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub auth_options: Option<AuthOptions>,
    /// Canonical style name applied after construction
    pub style: Option<String>,
    /// Provider options forwarded verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Token,
    AccessToken,
    AuthOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    pub source: CredentialSource,
}

impl Credential {
    pub fn is_demo(&self) -> bool {
        self.value == DEMO_TOKEN
    }
}

impl MapServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config bound to a container id.
    pub fn with_container(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Uses the SDK's shared demo credential. Fine for local experiments only.
    pub fn with_demo_token(self) -> Self {
        self.token(DEMO_TOKEN)
    }

    pub fn center(mut self, lng: f64, lat: f64) -> Self {
        self.center = Some([lng, lat]);
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn resolved_center(&self) -> [f64; 2] {
        self.center.unwrap_or(DEFAULT_CENTER)
    }

    pub fn resolved_zoom(&self) -> f64 {
        self.zoom.unwrap_or(DEFAULT_ZOOM)
    }

    pub fn resolved_map_size(&self) -> f64 {
        self.map_size.unwrap_or(DEFAULT_MAP_SIZE)
    }

    /// Picks a credential: `token`, then `accessToken`, then `authOptions.accessToken`.
    /// Empty strings count as absent.
    pub fn resolve_credential(&self) -> Option<Credential> {
        let candidates = [
            (self.token.as_deref(), CredentialSource::Token),
            (self.access_token.as_deref(), CredentialSource::AccessToken),
            (
                self.auth_options
                    .as_ref()
                    .and_then(|auth| auth.access_token.as_deref()),
                CredentialSource::AuthOptions,
            ),
        ];

        candidates
            .into_iter()
            .find_map(|(value, source)| match value {
                Some(value) if !value.is_empty() => Some(Credential {
                    value: value.to_string(),
                    source,
                }),
                _ => None,
            })
    }
}

/// Poll timing for map readiness, in the manner of the tile loader presets.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTiming {
    pub ready_interval: Duration,
    pub ready_max_attempts: u32,
}

impl Default for ServiceTiming {
    fn default() -> Self {
        Self {
            ready_interval: MAP_READY_INTERVAL,
            ready_max_attempts: MAP_READY_MAX_ATTEMPTS,
        }
    }
}

impl ServiceTiming {
    pub fn for_testing() -> Self {
        Self {
            ready_interval: Duration::from_millis(10),
            ready_max_attempts: 5,
        }
    }
}

/// Sparse map status toggles. Absent keys are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOptions {
    pub rotate_enable: Option<bool>,
    pub zoom_enable: Option<bool>,
    pub resize_enable: Option<bool>,
    // Accepted for contract compatibility; Petal has no matching switches.
    pub drag_enable: Option<bool>,
    pub keyboard_enable: Option<bool>,
    pub double_click_zoom: Option<bool>,
    pub show_indoor_map: Option<bool>,
}

/// Canonical style name → Petal preset style id.
pub type MapStyleConfig = HashMap<&'static str, &'static str>;

pub static STYLE_CONFIG: Lazy<MapStyleConfig> = Lazy::new(|| {
    let mut styles = MapStyleConfig::default();
    styles.insert("standard", "standard");
    styles.insert("night", "night");
    styles.insert("simple", "simple");
    styles
});

/// Provider id for a style name; unknown names are assumed to already be ids.
pub fn style_value(name: &str) -> String {
    STYLE_CONFIG
        .get(name)
        .map(|value| value.to_string())
        .unwrap_or_else(|| name.to_string())
}
