//! The map service adapter and its helpers.

pub mod container;
pub mod map;
pub mod normalize;
pub mod registry;
pub mod sync;

pub use container::{ContainerHost, Element, ExportFormat};
pub use map::{CameraCallback, PetalMapService, ServiceParts, ServiceState};
pub use registry::{BasemapRegistry, ServiceFactory};
