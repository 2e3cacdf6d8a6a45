//! Map service builder for fluent configuration
//!
//! `MapServiceBuilder` gathers the config and the environment a service runs
//! in (SDK source, scheduler, document) and wires them into a
//! [`PetalMapService`]. Anything left unset falls back to the platform
//! default for the enabled features.

use crate::{
    core::config::{MapServiceConfig, ServiceTiming},
    runtime::Scheduler,
    sdk::{loader::SdkSource, value::NativeObject},
    service::{container::ContainerHost, map::ServiceParts, PetalMapService},
    AdapterError, Result,
};
use std::rc::Rc;

/// Builder for creating and configuring map services
pub struct MapServiceBuilder {
    config: MapServiceConfig,
    timing: ServiceTiming,
    sdk_source: Option<Rc<dyn SdkSource>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    containers: Option<Rc<dyn ContainerHost>>,
    map_instance: Option<Rc<dyn NativeObject>>,
}

impl MapServiceBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: MapServiceConfig::default(),
            timing: ServiceTiming::default(),
            sdk_source: None,
            scheduler: None,
            containers: None,
            map_instance: None,
        }
    }

    pub fn config(&self) -> &MapServiceConfig {
        &self.config
    }

    /// Replace the whole config
    pub fn with_config(mut self, config: MapServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// DOM id of the map container
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the initial center (`[lng, lat]`) and canonical zoom level
    pub fn with_center_and_zoom(mut self, center: [f64; 2], zoom: f64) -> Self {
        self.config.center = Some(center);
        self.config.zoom = Some(zoom);
        self
    }

    /// Set zoom limits (canonical levels)
    pub fn with_zoom_limits(mut self, min_zoom: Option<f64>, max_zoom: Option<f64>) -> Self {
        self.config.min_zoom = min_zoom;
        self.config.max_zoom = max_zoom;
        self
    }

    /// Canonical style name applied once the map is ready
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.config.style = Some(style.into());
        self
    }

    /// Provider option forwarded verbatim to the native constructor
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.extra.insert(key.into(), value);
        self
    }

    /// Readiness poll timing
    pub fn with_timing(mut self, timing: ServiceTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Where the SDK comes from. Defaults to the process-wide loader.
    pub fn with_sdk_source(mut self, source: Rc<dyn SdkSource>) -> Self {
        self.sdk_source = Some(source);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// The document containers are looked up and created in
    pub fn with_container_host(mut self, containers: Rc<dyn ContainerHost>) -> Self {
        self.containers = Some(containers);
        self
    }

    /// Attach to an existing native map instead of creating one. SDK loading
    /// and credential checks are skipped.
    pub fn with_map_instance(mut self, map: Rc<dyn NativeObject>) -> Self {
        self.map_instance = Some(map);
        self
    }

    /// Build the service. Nothing native happens until `init`.
    pub fn build(self) -> Result<PetalMapService> {
        let sdk_source = self.sdk_source.or_else(default_sdk_source);
        if sdk_source.is_none() && self.map_instance.is_none() {
            return Err(AdapterError::MissingSdkSource);
        }
        let scheduler = self
            .scheduler
            .or_else(default_scheduler)
            .ok_or(AdapterError::MissingScheduler)?;
        let containers = self.containers.unwrap_or_else(default_container_host);

        Ok(PetalMapService::new(ServiceParts {
            config: self.config,
            timing: self.timing,
            sdk_source,
            scheduler,
            containers,
            map_instance: self.map_instance,
        }))
    }
}

impl Default for MapServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience constructors for common setups
impl MapServiceBuilder {
    /// A map in container `id`, authenticated with `token`
    pub fn petal_map(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new().with_container_id(id).with_token(token)
    }

    /// A map on the SDK's demo credential. Logs a warning on init.
    pub fn demo_map(id: impl Into<String>) -> Self {
        Self::new().with_config(MapServiceConfig::with_container(id).with_demo_token())
    }
}

fn default_sdk_source() -> Option<Rc<dyn SdkSource>> {
    #[cfg(feature = "wasm")]
    {
        Some(Rc::new(crate::web::default_loader()) as Rc<dyn SdkSource>)
    }
    #[cfg(not(feature = "wasm"))]
    {
        crate::sdk::SdkLoader::global().map(|loader| Rc::new(loader) as Rc<dyn SdkSource>)
    }
}

fn default_scheduler() -> Option<Rc<dyn Scheduler>> {
    #[cfg(feature = "wasm")]
    {
        Some(Rc::new(crate::web::BrowserScheduler) as Rc<dyn Scheduler>)
    }
    #[cfg(all(feature = "tokio-runtime", not(feature = "wasm")))]
    {
        Some(Rc::new(crate::runtime::TokioScheduler) as Rc<dyn Scheduler>)
    }
    #[cfg(not(any(feature = "wasm", feature = "tokio-runtime")))]
    {
        None
    }
}

fn default_container_host() -> Rc<dyn ContainerHost> {
    #[cfg(feature = "wasm")]
    {
        Rc::new(crate::web::DomContainerHost)
    }
    #[cfg(not(feature = "wasm"))]
    {
        crate::sdk::memory::MemoryContainerHost::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualScheduler;
    use crate::sdk::memory::{MemoryMap, MemoryScriptHost};
    use crate::sdk::SdkLoader;
    use crate::sdk::value::NativeValue;
    use crate::ServiceState;

    #[test]
    fn test_builder_fills_config() {
        let builder = MapServiceBuilder::petal_map("map", "secret")
            .with_center_and_zoom([120.0, 30.0], 8.0)
            .with_zoom_limits(Some(2.0), None)
            .with_style("night")
            .with_option("language", serde_json::json!("en"));

        let config = builder.config();
        assert_eq!(config.id.as_deref(), Some("map"));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.resolved_center(), [120.0, 30.0]);
        assert_eq!(config.min_zoom, Some(2.0));
        assert_eq!(config.style.as_deref(), Some("night"));
        assert_eq!(config.extra.len(), 1);
    }

    #[test]
    fn test_demo_map_uses_demo_token() {
        let builder = MapServiceBuilder::demo_map("map");
        assert!(builder.config().resolve_credential().unwrap().is_demo());
    }

    #[test]
    fn test_build_without_source_or_instance_fails() {
        let result = MapServiceBuilder::petal_map("map", "secret")
            .with_scheduler(ManualScheduler::new())
            .build();
        // The thread-local default loader is never installed in this test.
        assert_eq!(result.err(), Some(AdapterError::MissingSdkSource));
    }

    #[test]
    fn test_build_with_source() {
        let scheduler = ManualScheduler::new();
        let loader = SdkLoader::new(MemoryScriptHost::new(), scheduler.clone());
        let service = MapServiceBuilder::petal_map("map", "secret")
            .with_sdk_source(Rc::new(loader))
            .with_scheduler(scheduler)
            .build()
            .unwrap();
        assert_eq!(service.state(), ServiceState::Uninitialized);
        assert_eq!(service.config().id.as_deref(), Some("map"));
    }

    #[test]
    fn test_build_with_map_instance_needs_no_source() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let service = MapServiceBuilder::new()
            .with_map_instance(map)
            .with_scheduler(ManualScheduler::new())
            .build();
        assert!(service.is_ok());
    }
}
