use crate::core::geo::GeoPoint;
use crate::prelude::HashMap;
use crate::sdk::value::NativeValue;
use once_cell::sync::Lazy;

/// Events synthesized by the service itself rather than by the native SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceEvent {
    /// The native map answered its first camera queries
    MapLoad,
    /// A viewport sync passed size validation
    MapChange,
    /// Emitted by the rendering engine after each frame
    MapAfterFrameChange,
}

impl ServiceEvent {
    pub const ALL: [ServiceEvent; 3] = [
        ServiceEvent::MapLoad,
        ServiceEvent::MapChange,
        ServiceEvent::MapAfterFrameChange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceEvent::MapLoad => "mapload",
            ServiceEvent::MapChange => "mapchange",
            ServiceEvent::MapAfterFrameChange => "mapAfterFrameChange",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

/// Canonical event name → Petal native event names.
pub static NATIVE_EVENTS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::default();
    table.insert("mapmove", &["movestart", "moveend"]);
    table.insert(
        "camerachange",
        &["moveend", "onZoomChanged", "onHeadingChanged", "onCenterChanged"],
    );
    table.insert("zoomchange", &["onZoomChanged"]);
    table.insert("dragging", &["pointerdrag"]);
    table.insert("contextmenu", &["contextmenu"]);
    table.insert("click", &["click"]);
    table.insert("dblclick", &["dblclick"]);
    table.insert("singleclick", &["singleclick"]);
    table.insert("mousemove", &["pointermove"]);
    table.insert("pointermove", &["pointermove"]);
    table.insert("pointerdown", &["pointerdown"]);
    table.insert("pointerup", &["pointerup"]);
    table
});

/// True for names served by the internal emitter.
pub fn is_internal(name: &str) -> bool {
    ServiceEvent::from_name(name).is_some()
}

/// Native names a canonical event listens on. Unknown names are assumed to
/// already be native and pass through.
pub fn native_events(canonical: &str) -> Vec<&str> {
    match NATIVE_EVENTS.get(canonical) {
        Some(names) => names.to_vec(),
        None if canonical.is_empty() => Vec::new(),
        None => vec![canonical],
    }
}

/// An event as delivered to service-level handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEvent {
    /// Canonical name the handler was registered under
    pub kind: String,
    /// Native event that triggered delivery; `None` for service events
    pub native_type: Option<String>,
    /// Normalized position of the event
    pub lng_lat: Option<GeoPoint>,
    /// Native payload (first positional argument), with `lngLat`/`lnglat` filled in
    pub raw: NativeValue,
    /// All positional arguments as the SDK passed them
    pub args: Vec<NativeValue>,
}

impl MapEvent {
    pub fn service(event: ServiceEvent) -> Self {
        Self {
            kind: event.as_str().to_string(),
            native_type: None,
            lng_lat: None,
            raw: NativeValue::Undefined,
            args: Vec::new(),
        }
    }

    pub fn native(kind: &str, native_type: &str, lng_lat: Option<GeoPoint>, args: Vec<NativeValue>) -> Self {
        Self {
            kind: kind.to_string(),
            native_type: Some(native_type.to_string()),
            lng_lat,
            raw: args.first().cloned().unwrap_or_default(),
            args,
        }
    }

    pub fn is_service_event(&self) -> bool {
        self.native_type.is_none()
    }
}
