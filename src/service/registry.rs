//! Basemap name → map service factory.

use crate::core::builder::MapServiceBuilder;
use crate::core::config::MapServiceConfig;
use crate::core::constants::PROVIDER_TYPE;
use crate::{AdapterError, Result};

/// Creates a builder for one provider from the engine's map config.
pub type ServiceFactory = fn(MapServiceConfig) -> MapServiceBuilder;

fn petal_factory(config: MapServiceConfig) -> MapServiceBuilder {
    MapServiceBuilder::new().with_config(config)
}

/// Registered providers, looked up by the basemap name a scene asks for.
pub struct BasemapRegistry {
    entries: Vec<(&'static str, ServiceFactory)>,
}

impl Default for BasemapRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BasemapRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry with the Petal provider under `PetalMap`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PROVIDER_TYPE, petal_factory);
        registry
    }

    /// Registers `factory` under `key`, replacing an existing entry.
    pub fn register(&mut self, key: &'static str, factory: ServiceFactory) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((key, factory)),
        }
    }

    fn resolve(&self, name: &str) -> Option<(&'static str, ServiceFactory)> {
        let exact = |candidate: &str| {
            self.entries
                .iter()
                .find(|(key, _)| *key == candidate)
                .copied()
        };

        exact(name)
            .or_else(|| {
                let mut chars = name.chars();
                let capitalized: String = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                exact(&capitalized)
            })
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .copied()
            })
    }

    /// Registered key for `name`: exact match, then with the first letter
    /// capitalised, then ignoring case.
    pub fn resolve_key(&self, name: &str) -> Option<&'static str> {
        self.resolve(name).map(|(key, _)| key)
    }

    /// Registered keys, in registration order.
    pub fn available(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    /// Builder for the provider registered under `name`.
    pub fn create(&self, name: &str, config: MapServiceConfig) -> Result<MapServiceBuilder> {
        let (key, factory) = self
            .resolve(name)
            .ok_or_else(|| AdapterError::UnknownBasemap {
                name: name.to_string(),
                available: self.available().join(", "),
            })?;
        log::debug!("basemap `{name}` resolved to `{key}`");
        Ok(factory(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other_factory(config: MapServiceConfig) -> MapServiceBuilder {
        MapServiceBuilder::new().with_config(config.zoom(1.0))
    }

    #[test]
    fn test_resolution_order() {
        let registry = BasemapRegistry::with_defaults();
        assert_eq!(registry.resolve_key("PetalMap"), Some("PetalMap"));
        assert_eq!(registry.resolve_key("petalMap"), Some("PetalMap"));
        assert_eq!(registry.resolve_key("petalmap"), Some("PetalMap"));
        assert_eq!(registry.resolve_key("PETALMAP"), Some("PetalMap"));
        assert_eq!(registry.resolve_key(""), None);
    }

    #[test]
    fn test_unknown_basemap_lists_providers() {
        let mut registry = BasemapRegistry::with_defaults();
        registry.register("Other", other_factory);
        let err = registry
            .create("Mapbox", MapServiceConfig::new())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Unknown basemap \"Mapbox\". Available: PetalMap, Other"
        );
    }

    #[test]
    fn test_create_passes_config() {
        let registry = BasemapRegistry::with_defaults();
        let builder = registry
            .create("petalmap", MapServiceConfig::with_container("map"))
            .unwrap();
        assert_eq!(builder.config().id.as_deref(), Some("map"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = BasemapRegistry::new();
        registry.register("PetalMap", other_factory);
        registry.register("PetalMap", petal_factory);
        assert_eq!(registry.available(), vec!["PetalMap"]);
        let builder = registry.create("PetalMap", MapServiceConfig::new()).unwrap();
        assert_eq!(builder.config().zoom, None);
    }
}
