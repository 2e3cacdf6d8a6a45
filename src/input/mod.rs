pub mod events;
pub mod handler;
pub mod translator;

// Re-export the essential types
pub use events::{is_internal, native_events, MapEvent, ServiceEvent, NATIVE_EVENTS};
pub use handler::{EventEmitter, EventHandler};
pub use translator::EventTranslator;
