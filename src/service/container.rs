//! DOM scaffolding around the native map: marker and overlay layers and
//! canvas export.

use crate::sdk::value::NativeObject;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A DOM element handle.
pub type Element = Rc<dyn NativeObject>;

pub const MARKER_CONTAINER_CLASS: &str = "l7-marker-container";
pub const OVERLAY_CONTAINER_CLASS: &str = "l7-overlay-container";

const MARKER_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("zIndex", "2"),
    ("pointerEvents", "none"),
];

const OVERLAY_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("pointerEvents", "none"),
    ("zIndex", "3"),
];

/// The document the map lives in.
pub trait ContainerHost {
    /// Element with the given DOM id.
    fn get_container(&self, id: &str) -> Option<Element>;

    /// Gives a statically positioned element `position: relative`.
    fn ensure_positioned(&self, element: &Element);

    /// Appends a `div` with `class_name` and inline `style` to `parent`.
    fn create_child(&self, parent: &Element, class_name: &str, style: &[(&str, &str)]) -> Option<Element>;

    fn set_attribute(&self, element: &Element, name: &str, value: &str);

    /// Detaches `element` from its parent.
    fn remove(&self, element: &Element);

    /// `(clientWidth, clientHeight)`
    fn client_size(&self, element: &Element) -> (f64, f64);

    /// Data URL of the first `<canvas>` inside `container`.
    fn export_canvas(&self, container: &Element, mime: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ExportFormat::Jpg,
            _ => ExportFormat::Png,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
        }
    }
}

/// Marker layer stacked above the map (z-index 2). Focusable by script only.
pub fn create_marker_container(host: &dyn ContainerHost, container: &Element) -> Option<Element> {
    host.ensure_positioned(container);
    let marker = host.create_child(container, MARKER_CONTAINER_CLASS, MARKER_STYLE)?;
    host.set_attribute(&marker, "tabindex", "-1");
    Some(marker)
}

/// Overlay layer stacked above the markers (z-index 3).
pub fn create_overlay_container(host: &dyn ContainerHost, container: &Element) -> Option<Element> {
    host.ensure_positioned(container);
    host.create_child(container, OVERLAY_CONTAINER_CLASS, OVERLAY_STYLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::memory::MemoryContainerHost;

    #[test]
    fn test_marker_container_layout() {
        let host = MemoryContainerHost::new();
        let root = host.add_container("map", 100.0, 100.0);
        let handle = host.get_container("map").unwrap();

        create_marker_container(host.as_ref(), &handle).unwrap();
        let marker = &root.children_with_class(MARKER_CONTAINER_CLASS)[0];
        assert_eq!(marker.style("zIndex").as_deref(), Some("2"));
        assert_eq!(marker.style("pointerEvents").as_deref(), Some("none"));
        assert_eq!(marker.attribute("tabindex").as_deref(), Some("-1"));
        assert_eq!(root.style("position").as_deref(), Some("relative"));
    }

    #[test]
    fn test_overlay_container_layout() {
        let host = MemoryContainerHost::new();
        let root = host.add_container("map", 100.0, 100.0);
        let handle = host.get_container("map").unwrap();

        create_overlay_container(host.as_ref(), &handle).unwrap();
        let overlay = &root.children_with_class(OVERLAY_CONTAINER_CLASS)[0];
        assert_eq!(overlay.style("zIndex").as_deref(), Some("3"));
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::from_name("jpg").mime(), "image/jpeg");
        assert_eq!(ExportFormat::from_name("JPEG"), ExportFormat::Jpg);
        assert_eq!(ExportFormat::from_name("png").mime(), "image/png");
        assert_eq!(ExportFormat::from_name("webp"), ExportFormat::Png);
    }
}
