//! Provider-independent building blocks: constants, geometry, the viewport
//! projector, configuration and the service builder.

pub mod builder;
pub mod config;
pub mod constants;
pub mod geo;
pub mod transform;
pub mod viewport;
