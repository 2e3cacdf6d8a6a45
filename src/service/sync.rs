//! Viewport synchronisation with the live camera.

use crate::core::constants::ZOOM_OFFSET;
use crate::core::viewport::CameraState;
use crate::input::events::ServiceEvent;
use crate::sdk::probe::GET_PITCH;
use crate::sdk::value::{coerce_number, NativeObject, NativeObjectExt, NativeValue};
use crate::service::map::{PetalMapService, ServiceState};
use crate::service::normalize::try_normalize;

/// Numeric camera read with a fallback for missing or throwing getters.
fn read_number(map: &dyn NativeObject, method: &str, fallback: f64) -> f64 {
    match map.call_optional(method, &[]) {
        Some(value) if !value.is_nullish() => coerce_number(&value),
        _ => fallback,
    }
}

impl PetalMapService {
    /// Pulls the camera from the native map into the viewport, then notifies
    /// the camera callback. Does nothing while the map has no size yet.
    ///
    /// Returns whether a sync happened.
    pub fn sync_viewport(&self) -> bool {
        if self.state() == ServiceState::Destroyed {
            return false;
        }
        let Some(map) = self.map_instance() else {
            return false;
        };
        let Some(previous) = self.viewport() else {
            return false;
        };
        let Some([width, height]) = self.read_size() else {
            return false;
        };
        if width <= 0.0 || height <= 0.0 {
            log::trace!("skipping viewport sync for a {width}x{height} map");
            return false;
        }

        self.emit(ServiceEvent::MapChange);

        let center = map
            .call_optional("getCenter", &[])
            .filter(|value| !value.is_nullish())
            .and_then(|value| try_normalize(&value))
            .unwrap_or(previous.center);
        let bearing = read_number(map.as_ref(), "getHeading", previous.bearing);
        let pitch = match GET_PITCH.invoke(map.as_ref(), &[]) {
            Some(Ok(value)) if !value.is_nullish() => coerce_number(&value),
            _ => previous.pitch,
        };
        let zoom = match map.call_optional("getZoom", &[]) {
            Some(NativeValue::Number(zoom)) if !zoom.is_nan() => zoom - ZOOM_OFFSET,
            _ => previous.zoom,
        };

        let snapshot = {
            let mut viewport = self.inner.viewport.borrow_mut();
            let Some(viewport) = viewport.as_mut() else {
                return false;
            };
            viewport.sync_with_map_camera(CameraState {
                center,
                viewport_width: width,
                viewport_height: height,
                bearing,
                pitch,
                zoom,
                camera_height: 0.0,
            });
            viewport.clone()
        };

        let callback = self.inner.camera_callback.borrow().clone();
        if let Some(callback) = callback {
            callback(&snapshot);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::core::builder::MapServiceBuilder;
    use crate::input::handler::EventHandler;
    use crate::runtime::ManualScheduler;
    use crate::sdk::memory::{MemoryContainerHost, MemoryMap};
    use crate::sdk::value::NativeValue;
    use crate::GeoPoint;
    use std::cell::Cell;
    use std::rc::Rc;

    fn service_for(map: Rc<MemoryMap>) -> crate::PetalMapService {
        let containers = MemoryContainerHost::new();
        MapServiceBuilder::new()
            .with_map_instance(map)
            .with_scheduler(ManualScheduler::new())
            .with_container_host(containers)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sync_reads_camera() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        map.jump_to(GeoPoint::new(116.4, 39.9), 11.0);
        let service = service_for(Rc::clone(&map));
        futures::executor::block_on(service.init()).unwrap();

        let viewport = service.viewport().unwrap();
        assert_eq!(viewport.center, GeoPoint::new(116.4, 39.9));
        assert_eq!(viewport.zoom, 10.0);
        assert_eq!((viewport.width, viewport.height), (800.0, 600.0));
        assert_eq!(viewport.camera_height, 0.0);
    }

    #[test]
    fn test_zero_size_skips_sync() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let service = service_for(Rc::clone(&map));
        futures::executor::block_on(service.init()).unwrap();
        let revision = service.viewport().unwrap().revision();

        let changes = Rc::new(Cell::new(0));
        let c = Rc::clone(&changes);
        service.on("mapchange", EventHandler::new(move |_| c.set(c.get() + 1)));

        map.set_size(0.0, 600.0);
        assert!(!service.sync_viewport());
        assert_eq!(service.viewport().unwrap().revision(), revision);
        assert_eq!(changes.get(), 0);

        map.set_size(1024.0, 768.0);
        assert!(service.sync_viewport());
        assert_eq!(changes.get(), 1);
        assert_eq!(service.viewport().unwrap().width, 1024.0);
    }

    #[test]
    fn test_failed_getters_keep_previous_values() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        map.jump_to(GeoPoint::new(2.0, 3.0), 6.0);
        let service = service_for(Rc::clone(&map));
        futures::executor::block_on(service.init()).unwrap();
        service.set_rotation(30.0);
        service.sync_viewport();

        for method in ["getCenter", "getHeading", "getPitch", "getTilt", "getZoom"] {
            map.disable_method(method);
        }
        map.jump_to(GeoPoint::new(50.0, 50.0), 1.0);
        assert!(service.sync_viewport());

        let viewport = service.viewport().unwrap();
        assert_eq!(viewport.center, GeoPoint::new(2.0, 3.0));
        assert_eq!(viewport.zoom, 5.0);
        assert_eq!(viewport.bearing, 30.0);
    }

    #[test]
    fn test_destroyed_service_does_not_sync() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let service = service_for(Rc::clone(&map));
        futures::executor::block_on(service.init()).unwrap();
        service.destroy();
        assert!(!service.sync_viewport());
    }
}
