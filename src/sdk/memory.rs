//! In-memory stand-ins for the Petal SDK, the document and the DOM.
//!
//! These let the service run headless: the map keeps a tiny camera model,
//! records every call made on it and lets callers fire native events by hand.
//! Capabilities can be switched off to emulate older or partial SDK builds.

use crate::core::constants::{SDK_MAP_CONSTRUCTOR, TILE_SIZE};
use crate::core::geo::GeoPoint;
use crate::prelude::HashSet;
use crate::sdk::loader::{ScriptHost, SdkHandle};
use crate::sdk::value::{
    coerce_number, NativeError, NativeListener, NativeObject, NativeResult, NativeValue,
};
use crate::service::container::{ContainerHost, Element};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

const MAP_METHODS: &[&str] = &[
    "getDiv",
    "getZoom",
    "setZoom",
    "zoomIn",
    "zoomOut",
    "getCenter",
    "setCenter",
    "panTo",
    "panBy",
    "getHeading",
    "setHeading",
    "getPitch",
    "setPitch",
    "getTilt",
    "setTilt",
    "getSize",
    "getBounds",
    "fitBounds",
    "panToBounds",
    "setFitView",
    "fromScreenLocation",
    "toScreenLocation",
    "on",
    "un",
    "off",
    "addEventListener",
    "removeEventListener",
    "onZoomChanged",
    "onCenterChanged",
    "onHeadingChanged",
    "setPresetStyleId",
    "setStyleId",
    "setStyle",
    "setPinchRotate",
    "setNavigationControl",
    "setZoomControl",
    "setZoomSlider",
    "setRotateControl",
    "setScaleControl",
    "setLocationControl",
    "setCopyrightControl",
    "resize",
];

fn lat_lng_value(point: GeoPoint) -> NativeValue {
    NativeValue::object(MemoryLatLng::new(point.lng, point.lat))
}

/// Reads a point handed in by the service: a lat/lng object or a `{lng, lat}` record.
fn read_point(value: &NativeValue) -> Option<GeoPoint> {
    if value.has_method("lng") && value.has_method("lat") {
        let lng = value.call("lng", &[]).ok()?;
        let lat = value.call("lat", &[]).ok()?;
        return Some(GeoPoint::new(coerce_number(&lng), coerce_number(&lat)));
    }
    let lng = value.field("lng")?;
    let lat = value.field("lat")?;
    Some(GeoPoint::new(coerce_number(&lng), coerce_number(&lat)))
}

fn arg(args: &[NativeValue], index: usize) -> NativeValue {
    args.get(index).cloned().unwrap_or_default()
}

/// `LatLng` value object with accessor methods, as the SDK hands out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryLatLng {
    lng: f64,
    lat: f64,
}

impl MemoryLatLng {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl NativeObject for MemoryLatLng {
    fn get(&self, _key: &str) -> Option<NativeValue> {
        None
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "lng" | "lat")
    }

    fn call(&self, name: &str, _args: &[NativeValue]) -> NativeResult<NativeValue> {
        match name {
            "lng" => Ok(self.lng.into()),
            "lat" => Ok(self.lat.into()),
            _ => Err(NativeError::Unsupported(name.to_string())),
        }
    }
}

pub struct MemoryBounds {
    south_west: NativeValue,
    north_east: NativeValue,
}

impl MemoryBounds {
    pub fn new(south_west: NativeValue, north_east: NativeValue) -> Self {
        Self {
            south_west,
            north_east,
        }
    }
}

impl NativeObject for MemoryBounds {
    fn get(&self, _key: &str) -> Option<NativeValue> {
        None
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "getSouthWest" | "getNorthEast")
    }

    fn call(&self, name: &str, _args: &[NativeValue]) -> NativeResult<NativeValue> {
        match name {
            "getSouthWest" => Ok(self.south_west.clone()),
            "getNorthEast" => Ok(self.north_east.clone()),
            _ => Err(NativeError::Unsupported(name.to_string())),
        }
    }
}

/// `HWMapUtils` namespace.
#[derive(Debug, Default)]
pub struct MemoryUtils;

impl NativeObject for MemoryUtils {
    fn get(&self, _key: &str) -> Option<NativeValue> {
        None
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "createLatLng" | "epsgToLatLng")
    }

    fn call(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        match name {
            "createLatLng" => {
                let lat = coerce_number(&arg(args, 0));
                let lng = coerce_number(&arg(args, 1));
                Ok(lat_lng_value(GeoPoint::new(lng, lat)))
            }
            // EPSG:3857 meters → degrees
            "epsgToLatLng" => {
                let coordinate = arg(args, 0);
                let items = coordinate.as_array().unwrap_or(&[]);
                let x = items.first().map(coerce_number).unwrap_or(0.0);
                let y = items.get(1).map(coerce_number).unwrap_or(0.0);
                let radius = crate::core::constants::EARTH_RADIUS;
                let lng = (x / radius).to_degrees();
                let lat = (2.0 * (y / radius).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
                Ok(lat_lng_value(GeoPoint::new(lng, lat)))
            }
            _ => Err(NativeError::Unsupported(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct MapTemplate {
    disabled: Vec<String>,
    warmup: u32,
    size: (f64, f64),
}

impl Default for MapTemplate {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            warmup: 0,
            size: (800.0, 600.0),
        }
    }
}

/// The `HWMapJsSDK` namespace.
pub struct MemorySdk {
    constructors: Vec<&'static str>,
    utils: Option<Rc<MemoryUtils>>,
    template: MapTemplate,
    maps: RefCell<Vec<Rc<MemoryMap>>>,
}

impl Default for MemorySdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySdk {
    /// Full-featured SDK: `HWMap`, `LatLng`, `HWLatLng`, `LatLngBounds` and `HWMapUtils`.
    pub fn new() -> Self {
        Self {
            constructors: vec![SDK_MAP_CONSTRUCTOR, "LatLng", "HWLatLng", "LatLngBounds"],
            utils: Some(Rc::new(MemoryUtils)),
            template: MapTemplate::default(),
            maps: RefCell::new(Vec::new()),
        }
    }

    pub fn without_constructor(mut self, name: &str) -> Self {
        self.constructors.retain(|ctor| *ctor != name);
        self
    }

    pub fn without_utils(mut self) -> Self {
        self.utils = None;
        self
    }

    /// Maps built by this SDK lack the given methods.
    pub fn without_map_methods(mut self, methods: &[&str]) -> Self {
        self.template
            .disabled
            .extend(methods.iter().map(|m| m.to_string()));
        self
    }

    /// Maps built by this SDK throw from `getZoom` for the first `calls` calls.
    pub fn map_warmup(mut self, calls: u32) -> Self {
        self.template.warmup = calls;
        self
    }

    pub fn map_size(mut self, width: f64, height: f64) -> Self {
        self.template.size = (width, height);
        self
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn maps(&self) -> Vec<Rc<MemoryMap>> {
        self.maps.borrow().clone()
    }

    pub fn last_map(&self) -> Option<Rc<MemoryMap>> {
        self.maps.borrow().last().cloned()
    }
}

impl NativeObject for MemorySdk {
    fn get(&self, key: &str) -> Option<NativeValue> {
        match key {
            "HWMapUtils" => self
                .utils
                .as_ref()
                .map(|utils| NativeValue::Object(Rc::clone(utils) as Rc<dyn NativeObject>)),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        self.constructors.contains(&name)
    }

    fn call(&self, name: &str, _args: &[NativeValue]) -> NativeResult<NativeValue> {
        Err(NativeError::Unsupported(name.to_string()))
    }

    fn construct(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        if !self.has_method(name) {
            return Err(NativeError::Unsupported(name.to_string()));
        }
        match name {
            "HWMap" => {
                let map = MemoryMap::with_template(arg(args, 0), arg(args, 1), self.template.clone());
                self.maps.borrow_mut().push(Rc::clone(&map));
                Ok(NativeValue::Object(map as Rc<dyn NativeObject>))
            }
            "LatLng" | "HWLatLng" => {
                let lat = coerce_number(&arg(args, 0));
                let lng = coerce_number(&arg(args, 1));
                Ok(lat_lng_value(GeoPoint::new(lng, lat)))
            }
            "LatLngBounds" => Ok(NativeValue::object(MemoryBounds::new(
                arg(args, 0),
                arg(args, 1),
            ))),
            _ => Err(NativeError::Unsupported(name.to_string())),
        }
    }
}

/// Camera of a [`MemoryMap`], in native units.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCamera {
    pub zoom: f64,
    pub center: GeoPoint,
    pub heading: f64,
    pub pitch: f64,
    pub width: f64,
    pub height: f64,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCall {
    pub method: String,
    pub args: Vec<NativeValue>,
}

/// An `HWMap` instance.
pub struct MemoryMap {
    container: NativeValue,
    options: NativeValue,
    camera: RefCell<MemoryCamera>,
    listeners: RefCell<Vec<(String, NativeListener)>>,
    calls: RefCell<Vec<MemoryCall>>,
    disabled: RefCell<HashSet<String>>,
    warmup: Cell<u32>,
    released: RefCell<Vec<usize>>,
}

impl MemoryMap {
    /// Map attached to `container`, configured from constructor `options`.
    pub fn new(container: NativeValue, options: NativeValue) -> Rc<Self> {
        Self::with_template(container, options, MapTemplate::default())
    }

    fn with_template(container: NativeValue, options: NativeValue, template: MapTemplate) -> Rc<Self> {
        let zoom = options
            .field("zoom")
            .and_then(|zoom| zoom.as_number())
            .unwrap_or(0.0);
        let center = options
            .field("center")
            .and_then(|center| read_point(&center))
            .unwrap_or_default();

        Rc::new(Self {
            container,
            options,
            camera: RefCell::new(MemoryCamera {
                zoom,
                center,
                heading: 0.0,
                pitch: 0.0,
                width: template.size.0,
                height: template.size.1,
                style: None,
            }),
            listeners: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            disabled: RefCell::new(template.disabled.into_iter().collect()),
            warmup: Cell::new(template.warmup),
            released: RefCell::new(Vec::new()),
        })
    }

    pub fn container(&self) -> NativeValue {
        self.container.clone()
    }

    /// Options the map was constructed with.
    pub fn options(&self) -> NativeValue {
        self.options.clone()
    }

    pub fn camera(&self) -> MemoryCamera {
        self.camera.borrow().clone()
    }

    pub fn disable_method(&self, method: &str) {
        self.disabled.borrow_mut().insert(method.to_string());
    }

    pub fn set_size(&self, width: f64, height: f64) {
        let mut camera = self.camera.borrow_mut();
        camera.width = width;
        camera.height = height;
    }

    /// Moves the camera without going through the public API or firing events.
    pub fn jump_to(&self, center: GeoPoint, zoom: f64) {
        let mut camera = self.camera.borrow_mut();
        camera.center = center;
        camera.zoom = zoom;
    }

    pub fn calls(&self) -> Vec<MemoryCall> {
        self.calls.borrow().clone()
    }

    /// Argument lists of every call to `method`, in call order.
    pub fn calls_to(&self, method: &str) -> Vec<Vec<NativeValue>> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.args.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|call| call.method == method).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Ids of listeners the service reported as released, in order.
    pub fn released_listeners(&self) -> Vec<usize> {
        self.released.borrow().clone()
    }

    /// Delivers a native event to every listener registered for it.
    pub fn fire(&self, event: &str, args: &[NativeValue]) -> usize {
        let targets: Vec<NativeListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in &targets {
            listener.invoke(args);
        }
        targets.len()
    }

    fn degrees_per_pixel(camera: &MemoryCamera) -> f64 {
        360.0 / (TILE_SIZE * 2f64.powf(camera.zoom))
    }

    fn add_listener(&self, name: &NativeValue, listener: &NativeValue) {
        if let (Some(name), Some(listener)) = (name.as_str(), listener.as_listener()) {
            self.listeners
                .borrow_mut()
                .push((name.to_string(), listener.clone()));
        }
    }

    fn remove_listener(&self, name: &NativeValue, listener: &NativeValue) {
        let (Some(name), Some(listener)) = (name.as_str(), listener.as_listener()) else {
            return;
        };
        let mut listeners = self.listeners.borrow_mut();
        if let Some(index) = listeners
            .iter()
            .position(|(n, l)| n == name && l.same(listener))
        {
            listeners.remove(index);
        }
    }

    fn update_camera(&self, event: &str, update: impl FnOnce(&mut MemoryCamera)) {
        update(&mut self.camera.borrow_mut());
        self.fire(event, &[]);
    }
}

impl NativeObject for MemoryMap {
    fn get(&self, _key: &str) -> Option<NativeValue> {
        None
    }

    fn has_method(&self, name: &str) -> bool {
        MAP_METHODS.contains(&name) && !self.disabled.borrow().contains(name)
    }

    fn call(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        if !self.has_method(name) {
            return Err(NativeError::Unsupported(name.to_string()));
        }
        self.calls.borrow_mut().push(MemoryCall {
            method: name.to_string(),
            args: args.to_vec(),
        });

        let first = arg(args, 0);
        match name {
            "getDiv" => Ok(self.container.clone()),
            "getZoom" => {
                let remaining = self.warmup.get();
                if remaining > 0 {
                    self.warmup.set(remaining - 1);
                    return Err(NativeError::thrown(name, "map is not ready"));
                }
                Ok(self.camera.borrow().zoom.into())
            }
            "setZoom" => {
                let zoom = first.as_number().unwrap_or(f64::NAN);
                self.update_camera("onZoomChanged", |camera| camera.zoom = zoom);
                Ok(NativeValue::Undefined)
            }
            "zoomIn" | "zoomOut" => {
                let step = if name == "zoomIn" { 1.0 } else { -1.0 };
                self.update_camera("onZoomChanged", |camera| camera.zoom += step);
                Ok(NativeValue::Undefined)
            }
            "getCenter" => Ok(lat_lng_value(self.camera.borrow().center)),
            "setCenter" | "panTo" => {
                if let Some(center) = read_point(&first) {
                    self.update_camera("onCenterChanged", |camera| camera.center = center);
                }
                Ok(NativeValue::Undefined)
            }
            "getHeading" => Ok(self.camera.borrow().heading.into()),
            "setHeading" => {
                let heading = coerce_number(&first);
                self.update_camera("onHeadingChanged", |camera| camera.heading = heading);
                Ok(NativeValue::Undefined)
            }
            "getPitch" | "getTilt" => Ok(self.camera.borrow().pitch.into()),
            "setPitch" | "setTilt" => {
                self.camera.borrow_mut().pitch = coerce_number(&first);
                Ok(NativeValue::Undefined)
            }
            "getSize" => {
                let camera = self.camera.borrow();
                Ok(NativeValue::Array(vec![camera.width.into(), camera.height.into()]))
            }
            "getBounds" => {
                let camera = self.camera.borrow();
                let d = Self::degrees_per_pixel(&camera);
                let (half_w, half_h) = (camera.width / 2.0 * d, camera.height / 2.0 * d);
                let c = camera.center;
                Ok(NativeValue::object(MemoryBounds::new(
                    lat_lng_value(GeoPoint::new(c.lng - half_w, c.lat - half_h)),
                    lat_lng_value(GeoPoint::new(c.lng + half_w, c.lat + half_h)),
                )))
            }
            "fromScreenLocation" => {
                let camera = self.camera.borrow();
                let d = Self::degrees_per_pixel(&camera);
                let x = first.field("x").map(|x| coerce_number(&x)).unwrap_or(0.0);
                let y = first.field("y").map(|y| coerce_number(&y)).unwrap_or(0.0);
                Ok(lat_lng_value(GeoPoint::new(
                    camera.center.lng + (x - camera.width / 2.0) * d,
                    camera.center.lat - (y - camera.height / 2.0) * d,
                )))
            }
            "toScreenLocation" => {
                let camera = self.camera.borrow();
                let d = Self::degrees_per_pixel(&camera);
                let point = read_point(&first).unwrap_or(camera.center);
                Ok(NativeValue::record([
                    ("x", (camera.width / 2.0 + (point.lng - camera.center.lng) / d).into()),
                    ("y", (camera.height / 2.0 - (point.lat - camera.center.lat) / d).into()),
                ]))
            }
            "on" | "addEventListener" => {
                self.add_listener(&first, &arg(args, 1));
                Ok(NativeValue::Undefined)
            }
            "un" | "off" | "removeEventListener" => {
                self.remove_listener(&first, &arg(args, 1));
                Ok(NativeValue::Undefined)
            }
            "onZoomChanged" | "onCenterChanged" | "onHeadingChanged" => {
                self.add_listener(&NativeValue::from(name), &first);
                Ok(NativeValue::Undefined)
            }
            "setPresetStyleId" | "setStyleId" | "setStyle" => {
                self.camera.borrow_mut().style = first.as_str().map(str::to_string);
                Ok(NativeValue::Undefined)
            }
            // recorded only
            _ => Ok(NativeValue::Undefined),
        }
    }

    fn release_listener(&self, listener: &NativeListener) {
        let id = listener.id();
        if self.listeners.borrow().iter().any(|(_, bound)| bound.id() == id) {
            log::warn!("listener {id:#x} released while still bound");
        }
        self.released.borrow_mut().push(id);
    }
}

struct MemoryScript {
    url: String,
    on_load: Option<Box<dyn FnOnce()>>,
    on_error: Option<Box<dyn FnOnce(Option<String>)>>,
}

/// A document that records script injection and lets the caller decide when
/// (and whether) scripts finish loading.
#[derive(Default)]
pub struct MemoryScriptHost {
    global: RefCell<Option<SdkHandle>>,
    scripts: RefCell<Vec<MemoryScript>>,
    injected: RefCell<Vec<String>>,
    refusal: RefCell<Option<String>>,
}

impl MemoryScriptHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Sets the SDK global, as the script does once parsed.
    pub fn publish(&self, sdk: SdkHandle) {
        *self.global.borrow_mut() = Some(sdk);
    }

    /// Every URL ever injected, including removed scripts.
    pub fn injected_urls(&self) -> Vec<String> {
        self.injected.borrow().clone()
    }

    /// Script tags currently in the document.
    pub fn script_count(&self) -> usize {
        self.scripts.borrow().len()
    }

    /// Makes the next injection fail synchronously.
    pub fn refuse_injection(&self, message: &str) {
        *self.refusal.borrow_mut() = Some(message.to_string());
    }

    /// Fires `onload` of the oldest unsettled script.
    pub fn complete_load(&self) -> bool {
        let callback = self.take_callbacks().and_then(|(on_load, _)| on_load);
        match callback {
            Some(on_load) => {
                on_load();
                true
            }
            None => false,
        }
    }

    /// Fires `onerror` of the oldest unsettled script.
    pub fn fail_load(&self, message: Option<&str>) -> bool {
        let callback = self.take_callbacks().and_then(|(_, on_error)| on_error);
        match callback {
            Some(on_error) => {
                on_error(message.map(str::to_string));
                true
            }
            None => false,
        }
    }

    #[allow(clippy::type_complexity)]
    fn take_callbacks(
        &self,
    ) -> Option<(Option<Box<dyn FnOnce()>>, Option<Box<dyn FnOnce(Option<String>)>>)> {
        let mut scripts = self.scripts.borrow_mut();
        let script = scripts
            .iter_mut()
            .find(|script| script.on_load.is_some() || script.on_error.is_some())?;
        Some((script.on_load.take(), script.on_error.take()))
    }
}

impl ScriptHost for MemoryScriptHost {
    fn sdk_global(&self) -> Option<SdkHandle> {
        self.global.borrow().clone()
    }

    fn inject_script(
        &self,
        url: &str,
        on_load: Box<dyn FnOnce()>,
        on_error: Box<dyn FnOnce(Option<String>)>,
    ) -> Result<(), String> {
        if let Some(message) = self.refusal.borrow_mut().take() {
            return Err(message);
        }
        self.injected.borrow_mut().push(url.to_string());
        self.scripts.borrow_mut().push(MemoryScript {
            url: url.to_string(),
            on_load: Some(on_load),
            on_error: Some(on_error),
        });
        Ok(())
    }

    fn remove_scripts(&self, pattern: &str) -> usize {
        let mut scripts = self.scripts.borrow_mut();
        let before = scripts.len();
        scripts.retain(|script| !script.url.contains(pattern));
        before - scripts.len()
    }

    fn delete_sdk_global(&self) {
        self.global.borrow_mut().take();
    }
}

/// A `div`.
pub struct MemoryElement {
    id: String,
    class_name: String,
    style: RefCell<BTreeMap<String, String>>,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<Rc<MemoryElement>>>,
    parent: RefCell<Weak<MemoryElement>>,
    client_size: Cell<(f64, f64)>,
    has_canvas: Cell<bool>,
}

impl MemoryElement {
    fn new(id: &str, class_name: &str) -> Rc<Self> {
        Rc::new(Self {
            id: id.to_string(),
            class_name: class_name.to_string(),
            style: RefCell::new(BTreeMap::new()),
            attributes: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            client_size: Cell::new((0.0, 0.0)),
            has_canvas: Cell::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.style.borrow().get(property).cloned()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn children(&self) -> Vec<Rc<MemoryElement>> {
        self.children.borrow().clone()
    }

    pub fn children_with_class(&self, class_name: &str) -> Vec<Rc<MemoryElement>> {
        self.children
            .borrow()
            .iter()
            .filter(|child| child.class_name == class_name)
            .cloned()
            .collect()
    }

    pub fn set_client_size(&self, width: f64, height: f64) {
        self.client_size.set((width, height));
    }

    /// Gives the element a rendered `<canvas>` child for exports.
    pub fn attach_canvas(&self) {
        self.has_canvas.set(true);
    }

    pub fn as_value(self: &Rc<Self>) -> NativeValue {
        NativeValue::Object(Rc::clone(self) as Rc<dyn NativeObject>)
    }
}

impl NativeObject for MemoryElement {
    fn get(&self, key: &str) -> Option<NativeValue> {
        match key {
            "id" => Some(self.id.as_str().into()),
            "className" => Some(self.class_name.as_str().into()),
            "clientWidth" => Some(self.client_size.get().0.into()),
            "clientHeight" => Some(self.client_size.get().1.into()),
            _ => None,
        }
    }

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call(&self, name: &str, _args: &[NativeValue]) -> NativeResult<NativeValue> {
        Err(NativeError::Unsupported(name.to_string()))
    }
}

/// A DOM with a fixed set of top-level containers.
#[derive(Default)]
pub struct MemoryContainerHost {
    elements: RefCell<Vec<Rc<MemoryElement>>>,
}

impl MemoryContainerHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers a container reachable by `id`.
    pub fn add_container(&self, id: &str, width: f64, height: f64) -> Rc<MemoryElement> {
        let element = MemoryElement::new(id, "");
        element.set_client_size(width, height);
        self.elements.borrow_mut().push(Rc::clone(&element));
        element
    }

    fn find(&self, element: &Element) -> Option<Rc<MemoryElement>> {
        let target = Rc::as_ptr(element) as *const ();
        self.elements
            .borrow()
            .iter()
            .find(|candidate| Rc::as_ptr(candidate) as *const () == target)
            .cloned()
    }
}

impl ContainerHost for MemoryContainerHost {
    fn get_container(&self, id: &str) -> Option<Element> {
        self.elements
            .borrow()
            .iter()
            .find(|element| element.id == id && element.parent.borrow().upgrade().is_none())
            .map(|element| Rc::clone(element) as Element)
    }

    fn ensure_positioned(&self, element: &Element) {
        if let Some(element) = self.find(element) {
            element
                .style
                .borrow_mut()
                .entry("position".to_string())
                .or_insert_with(|| "relative".to_string());
        }
    }

    fn create_child(&self, parent: &Element, class_name: &str, style: &[(&str, &str)]) -> Option<Element> {
        let parent = self.find(parent)?;
        let child = MemoryElement::new("", class_name);
        child.style.borrow_mut().extend(
            style
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        *child.parent.borrow_mut() = Rc::downgrade(&parent);
        parent.children.borrow_mut().push(Rc::clone(&child));
        self.elements.borrow_mut().push(Rc::clone(&child));
        Some(child as Element)
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) {
        if let Some(element) = self.find(element) {
            element
                .attributes
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
        }
    }

    fn remove(&self, element: &Element) {
        let Some(element) = self.find(element) else {
            return;
        };
        let parent = element.parent.borrow().upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, &element));
        }
        self.elements
            .borrow_mut()
            .retain(|candidate| !Rc::ptr_eq(candidate, &element));
    }

    fn client_size(&self, element: &Element) -> (f64, f64) {
        self.find(element)
            .map(|element| element.client_size.get())
            .unwrap_or((0.0, 0.0))
    }

    fn export_canvas(&self, container: &Element, mime: &str) -> Option<String> {
        let element = self.find(container)?;
        element
            .has_canvas
            .get()
            .then(|| format!("data:{mime};base64,AAAA"))
    }
}
