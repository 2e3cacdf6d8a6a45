//! The Petal map service.
//!
//! `PetalMapService` binds one live `HWMap` to the engine's map-service
//! contract. Lifecycle: `Uninitialized → Initializing → Ready → Destroyed`,
//! with no way back from `Destroyed`.
//!
//! Petal zoom levels sit [`ZOOM_OFFSET`] above the canonical levels; the
//! offset is applied on every read and every write so zoom round-trips.

use crate::core::config::{style_value, Credential, MapServiceConfig, MapStyleConfig, ServiceTiming, StatusOptions, STYLE_CONFIG};
use crate::core::constants::{
    NATIVE_MAX_ZOOM, NATIVE_MIN_ZOOM, PROVIDER_TYPE, SDK_MAP_CONSTRUCTOR, ZOOM_OFFSET,
};
use crate::core::geo::{Bounds, CoordTree, GeoPoint, MercatorCoordinate, PixelPoint};
use crate::core::transform;
use crate::core::viewport::Viewport;
use crate::input::events::{is_internal, MapEvent, ServiceEvent};
use crate::input::handler::{EventEmitter, EventHandler};
use crate::input::translator::EventTranslator;
use crate::runtime::{Retry, RetryOutcome, Scheduler};
use crate::sdk::loader::{SdkHandle, SdkSource};
use crate::sdk::probe::{
    BIND_LISTENER, BUILTIN_CONTROLS, FIT_BOUNDS, GET_PITCH, SET_PITCH, SET_STYLE, UNBIND_LISTENER,
    ZOOM_AFFORDANCES,
};
use crate::sdk::value::{coerce_number, NativeListener, NativeObject, NativeObjectExt, NativeValue};
use crate::service::container::{
    create_marker_container, create_overlay_container, ContainerHost, Element, ExportFormat,
};
use crate::service::normalize::{
    denormalize, denormalize_bounds, event_lng_lat, normalize, normalize_bounds, with_lng_lat,
};
use crate::{AdapterError, Result};
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

pub type CameraCallback = Rc<dyn Fn(&Viewport)>;

/// Native camera notifications that trigger a viewport sync.
const CAMERA_EVENTS: [&str; 2] = ["movestart", "moveend"];
const CAMERA_METHODS: [&str; 3] = ["onZoomChanged", "onCenterChanged", "onHeadingChanged"];

pub(crate) struct ServiceInner {
    pub(crate) config: MapServiceConfig,
    pub(crate) timing: ServiceTiming,
    pub(crate) sdk_source: Option<Rc<dyn SdkSource>>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
    pub(crate) containers: Rc<dyn ContainerHost>,
    pub(crate) injected_map: Option<Rc<dyn NativeObject>>,
    pub(crate) state: Cell<ServiceState>,
    pub(crate) sdk: RefCell<Option<SdkHandle>>,
    pub(crate) map: RefCell<Option<Rc<dyn NativeObject>>>,
    pub(crate) map_container: RefCell<Option<Element>>,
    pub(crate) marker_container: RefCell<Option<Element>>,
    pub(crate) overlay_container: RefCell<Option<Element>>,
    pub(crate) viewport: RefCell<Option<Viewport>>,
    pub(crate) camera_callback: RefCell<Option<CameraCallback>>,
    pub(crate) camera_handlers: RefCell<Vec<(&'static str, NativeListener)>>,
    pub(crate) sync_scheduled: Cell<bool>,
    pub(crate) emitter: EventEmitter,
    pub(crate) translator: EventTranslator,
    pub(crate) current_style: RefCell<String>,
    pub(crate) ready_waiters: RefCell<Vec<oneshot::Sender<Result<()>>>>,
    pub(crate) ready_result: RefCell<Option<Result<()>>>,
}

/// Everything a service needs from its environment.
pub struct ServiceParts {
    pub config: MapServiceConfig,
    pub timing: ServiceTiming,
    pub sdk_source: Option<Rc<dyn SdkSource>>,
    pub scheduler: Rc<dyn Scheduler>,
    pub containers: Rc<dyn ContainerHost>,
    pub map_instance: Option<Rc<dyn NativeObject>>,
}

/// Cheap to clone; clones share the same service.
#[derive(Clone)]
pub struct PetalMapService {
    pub(crate) inner: Rc<ServiceInner>,
}

fn add_zoom_offset(zoom: f64) -> f64 {
    if zoom.is_nan() {
        zoom
    } else {
        zoom + ZOOM_OFFSET
    }
}

impl PetalMapService {
    pub fn new(parts: ServiceParts) -> Self {
        Self {
            inner: Rc::new(ServiceInner {
                config: parts.config,
                timing: parts.timing,
                sdk_source: parts.sdk_source,
                scheduler: parts.scheduler,
                containers: parts.containers,
                injected_map: parts.map_instance,
                state: Cell::new(ServiceState::Uninitialized),
                sdk: RefCell::new(None),
                map: RefCell::new(None),
                map_container: RefCell::new(None),
                marker_container: RefCell::new(None),
                overlay_container: RefCell::new(None),
                viewport: RefCell::new(None),
                camera_callback: RefCell::new(None),
                camera_handlers: RefCell::new(Vec::new()),
                sync_scheduled: Cell::new(false),
                emitter: EventEmitter::new(),
                translator: EventTranslator::new(),
                current_style: RefCell::new(style_value("standard")),
                ready_waiters: RefCell::new(Vec::new()),
                ready_result: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<ServiceInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> ServiceState {
        self.inner.state.get()
    }

    pub fn config(&self) -> &MapServiceConfig {
        &self.inner.config
    }

    /// The native map, once attached.
    pub fn map_instance(&self) -> Option<Rc<dyn NativeObject>> {
        self.inner.map.borrow().clone()
    }

    /// The native map, or why there is none.
    pub fn require_map(&self) -> Result<Rc<dyn NativeObject>> {
        match (self.state(), self.map_instance()) {
            (ServiceState::Destroyed, _) => Err(AdapterError::Destroyed),
            (_, Some(map)) => Ok(map),
            (_, None) => Err(AdapterError::NotInitialized),
        }
    }

    pub(crate) fn sdk(&self) -> Option<SdkHandle> {
        self.inner.sdk.borrow().clone()
    }

    /// Snapshot of the synced viewport. `None` before `init`.
    pub fn viewport(&self) -> Option<Viewport> {
        self.inner.viewport.borrow().clone()
    }

    pub fn get_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    /// Size hint for the engine's simple coordinate space.
    pub fn map_size(&self) -> f64 {
        self.inner.config.resolved_map_size()
    }

    // ---- lifecycle ----

    /// Loads the SDK (unless a map instance was injected), constructs the
    /// native map and binds camera events. Readiness is reported later via
    /// [`PetalMapService::ready`] and the `mapload` event.
    pub async fn init(&self) -> Result<()> {
        match self.state() {
            ServiceState::Uninitialized => {}
            ServiceState::Destroyed => return Err(AdapterError::Destroyed),
            ServiceState::Initializing | ServiceState::Ready => {
                return Err(AdapterError::AlreadyInitialized)
            }
        }
        self.inner.state.set(ServiceState::Initializing);
        self.inner.ready_result.borrow_mut().take();

        match self.attach().await {
            Ok(()) => {
                self.wait_for_map_ready();
                Ok(())
            }
            Err(err) => {
                log::error!("Petal map service failed to initialize: {err}");
                if self.state() != ServiceState::Destroyed {
                    self.inner.state.set(ServiceState::Uninitialized);
                }
                self.settle_ready(Err(err.clone()));
                Err(err)
            }
        }
    }

    async fn attach(&self) -> Result<()> {
        let inner = &self.inner;
        *inner.viewport.borrow_mut() = Some(Viewport::new());

        let map = match inner.injected_map.clone() {
            Some(map) => {
                *inner.sdk.borrow_mut() = inner.sdk_source.as_ref().and_then(|source| source.current());
                let container = map
                    .call_optional("getDiv", &[])
                    .and_then(|div| div.as_object().cloned());
                *inner.map_container.borrow_mut() = container;
                map
            }
            None => self.construct_map().await?,
        };

        *inner.map.borrow_mut() = Some(map);
        self.bind_camera_events();
        self.add_marker_container();
        Ok(())
    }

    async fn construct_map(&self) -> Result<Rc<dyn NativeObject>> {
        let inner = &self.inner;
        let id = inner
            .config
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(AdapterError::MissingContainerId)?;
        let credential = inner
            .config
            .resolve_credential()
            .ok_or(AdapterError::MissingCredential)?;
        if credential.is_demo() {
            log::warn!(
                "Petal Maps: using the default demo token. For production use, get your own token \
                 from {} and provide it in the map config as `token`.",
                crate::core::constants::CONSOLE_URL
            );
        }
        let container = inner
            .containers
            .get_container(&id)
            .ok_or_else(|| AdapterError::ContainerNotFound(id.clone()))?;
        let source = inner
            .sdk_source
            .clone()
            .ok_or(AdapterError::MissingSdkSource)?;

        let sdk = source.load().await?;
        if self.state() == ServiceState::Destroyed {
            return Err(AdapterError::Destroyed);
        }
        if !sdk.has_method(SDK_MAP_CONSTRUCTOR) {
            return Err(AdapterError::ConstructorUnavailable);
        }

        let options = self.native_options(sdk.as_ref(), &credential);
        let created = sdk
            .construct(
                SDK_MAP_CONSTRUCTOR,
                &[NativeValue::Object(Rc::clone(&container)), options],
            )
            .map_err(|err| AdapterError::Construction(err.to_string()))?;
        let map = created.as_object().cloned().ok_or_else(|| {
            AdapterError::Construction("HWMap constructor did not return an object".into())
        })?;

        let div = map
            .call_optional("getDiv", &[])
            .and_then(|div| div.as_object().cloned());
        *inner.map_container.borrow_mut() = Some(div.unwrap_or(container));
        *inner.sdk.borrow_mut() = Some(sdk);
        log::info!("Petal map created in container `{id}`");
        Ok(map)
    }

    /// Constructor options: pass-through keys, offset zoom levels, an SDK
    /// lat/lng center and the resolved credential.
    fn native_options(&self, sdk: &dyn NativeObject, credential: &Credential) -> NativeValue {
        let config = &self.inner.config;
        let mut options: BTreeMap<String, NativeValue> = config
            .extra
            .iter()
            .map(|(key, value)| (key.clone(), NativeValue::from(value.clone())))
            .collect();

        options.insert(
            "zoom".into(),
            add_zoom_offset(config.resolved_zoom()).into(),
        );
        if let Some(min_zoom) = config.min_zoom {
            options.insert("minZoom".into(), add_zoom_offset(min_zoom).into());
        }
        if let Some(max_zoom) = config.max_zoom {
            options.insert("maxZoom".into(), add_zoom_offset(max_zoom).into());
        }
        options.insert(
            "center".into(),
            denormalize(Some(sdk), GeoPoint::from(config.resolved_center())),
        );
        options.insert(
            "authOptions".into(),
            NativeValue::record([("accessToken", credential.value.as_str().into())]),
        );
        NativeValue::Record(options)
    }

    fn wait_for_map_ready(&self) {
        let timing = &self.inner.timing;
        let attempts = timing.ready_max_attempts;
        let alive = Rc::downgrade(&self.inner);
        let probe = alive.clone();
        let owner = alive.clone();

        Retry::bounded(timing.ready_interval, attempts)
            .while_alive(move || {
                alive
                    .upgrade()
                    .map_or(false, |inner| inner.state.get() == ServiceState::Initializing)
            })
            .run(
                Rc::clone(&self.inner.scheduler),
                move |_| Self::from_weak(&probe).map_or(false, |service| service.map_answers()),
                move |outcome| {
                    let Some(service) = Self::from_weak(&owner) else {
                        return;
                    };
                    match outcome {
                        RetryOutcome::Done => service.on_map_ready(),
                        RetryOutcome::Exhausted => service.on_ready_timeout(attempts),
                        RetryOutcome::Cancelled => log::debug!("map readiness check stopped"),
                    }
                },
            );
    }

    /// Both camera queries answer without throwing.
    fn map_answers(&self) -> bool {
        let Some(map) = self.map_instance() else {
            return false;
        };
        let answered = |method: &str| {
            map.call(method, &[])
                .map_or(false, |value| !matches!(value, NativeValue::Undefined))
        };
        answered("getZoom") && answered("getCenter")
    }

    fn on_map_ready(&self) {
        self.inner.state.set(ServiceState::Ready);
        self.enable_interactions();
        if let Some(style) = self.inner.config.style.clone() {
            self.set_map_style(&style);
        }
        self.sync_viewport();
        log::info!("Petal map ready");
        self.emit(ServiceEvent::MapLoad);
        self.settle_ready(Ok(()));
    }

    fn on_ready_timeout(&self, attempts: u32) {
        let err = AdapterError::ReadyTimeout { attempts };
        log::error!("{err}");
        self.settle_ready(Err(err));
    }

    /// Interaction baseline: pinch rotation on, built-in controls off.
    fn enable_interactions(&self) {
        let Some(map) = self.map_instance() else {
            return;
        };
        map.call_optional("setPinchRotate", &[true.into()]);
        for control in BUILTIN_CONTROLS.available(map.as_ref()) {
            if let Err(err) = control.invoke(map.as_ref(), &[false.into()]) {
                log::debug!("{} failed: {err}", control.name());
            }
        }
    }

    /// Resolves once the native map is ready. Fails if readiness timed out or
    /// the service was destroyed first.
    pub fn ready(&self) -> LocalBoxFuture<'static, Result<()>> {
        if let Some(result) = self.inner.ready_result.borrow().clone() {
            return future::ready(result).boxed_local();
        }
        if self.state() == ServiceState::Destroyed {
            return future::ready(Err(AdapterError::Destroyed)).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        self.inner.ready_waiters.borrow_mut().push(tx);
        async move { rx.await.unwrap_or(Err(AdapterError::Destroyed)) }.boxed_local()
    }

    fn settle_ready(&self, result: Result<()>) {
        *self.inner.ready_result.borrow_mut() = Some(result.clone());
        let waiters = std::mem::take(&mut *self.inner.ready_waiters.borrow_mut());
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    /// Unbinds everything, detaches the DOM scaffolding and releases the map.
    /// Calling it again is a no-op.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.state.get() == ServiceState::Destroyed {
            return;
        }
        inner.state.set(ServiceState::Destroyed);

        let map = inner.map.borrow_mut().take();
        self.detach_camera_events(map.as_deref());
        inner.translator.clear(map.as_deref());
        inner.emitter.remove_all_listeners();
        inner.camera_callback.borrow_mut().take();

        let overlay = inner.overlay_container.borrow_mut().take();
        let marker = inner.marker_container.borrow_mut().take();
        for element in overlay.iter().chain(marker.iter()) {
            inner.containers.remove(element);
        }
        inner.map_container.borrow_mut().take();

        self.settle_ready(Err(AdapterError::Destroyed));
        log::debug!("Petal map service destroyed");
    }

    // ---- camera binding ----

    fn camera_listener(&self) -> NativeListener {
        let weak = Rc::downgrade(&self.inner);
        NativeListener::new(move |_| {
            if let Some(service) = Self::from_weak(&weak) {
                service.schedule_sync();
            }
        })
    }

    /// Syncs on the next animation frame. Bursts of native camera events
    /// within one frame collapse into a single sync.
    fn schedule_sync(&self) {
        if self.inner.sync_scheduled.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.request_animation_frame(Box::new(move || {
            if let Some(service) = Self::from_weak(&weak) {
                service.inner.sync_scheduled.set(false);
                service.sync_viewport();
            }
        }));
    }

    fn bind_camera_events(&self) {
        let Some(map) = self.map_instance() else {
            return;
        };
        let mut handlers = Vec::new();

        for event in CAMERA_EVENTS {
            let listener = self.camera_listener();
            let args = [NativeValue::from(event), NativeValue::from(listener.clone())];
            if let Some(Ok(_)) = BIND_LISTENER.invoke(map.as_ref(), &args) {
                handlers.push((event, listener));
            }
        }
        for method in CAMERA_METHODS {
            let listener = self.camera_listener();
            if map.call_optional(method, &[listener.clone().into()]).is_some() {
                handlers.push((method, listener));
            }
        }

        log::debug!("bound {} camera listeners", handlers.len());
        *self.inner.camera_handlers.borrow_mut() = handlers;
    }

    fn detach_camera_events(&self, map: Option<&dyn NativeObject>) {
        let handlers = std::mem::take(&mut *self.inner.camera_handlers.borrow_mut());
        let Some(map) = map else {
            return;
        };
        for (event, listener) in handlers {
            let args = [NativeValue::from(event), NativeValue::from(listener.clone())];
            if let Some(Ok(_)) = UNBIND_LISTENER.invoke(map, &args) {
                map.release_listener(&listener);
            }
        }
    }

    pub fn on_camera_changed(&self, callback: impl Fn(&Viewport) + 'static) {
        *self.inner.camera_callback.borrow_mut() = Some(Rc::new(callback));
    }

    // ---- events ----

    /// Registers `handler` for a canonical event. Service events go to the
    /// internal emitter; everything else is bound on the native map.
    pub fn on(&self, event_type: &str, handler: EventHandler) {
        if is_internal(event_type) {
            self.inner.emitter.on(event_type, handler);
            return;
        }
        let Some(map) = self.map_instance() else {
            log::debug!("ignoring `{event_type}` listener: no map attached");
            return;
        };
        let weak = Rc::downgrade(&self.inner);
        self.inner
            .translator
            .bind(map.as_ref(), event_type, &handler, |canonical, native| {
                let (weak, handler) = (weak.clone(), handler.clone());
                let (canonical, native) = (canonical.to_string(), native.to_string());
                NativeListener::new(move |args| {
                    if let Some(service) = Self::from_weak(&weak) {
                        handler.call(&service.translate_event(&canonical, &native, args));
                    }
                })
            });
    }

    pub fn off(&self, event_type: &str, handler: &EventHandler) {
        if is_internal(event_type) {
            self.inner.emitter.off(event_type, handler);
            return;
        }
        let map = self.map_instance();
        self.inner.translator.unbind(map.as_deref(), event_type, handler);
    }

    /// Emits a service event to listeners registered through [`PetalMapService::on`].
    pub fn emit(&self, event: ServiceEvent) -> usize {
        self.inner.emitter.emit(&MapEvent::service(event))
    }

    fn translate_event(&self, canonical: &str, native: &str, args: &[NativeValue]) -> MapEvent {
        let mut args = args.to_vec();
        let sdk = self.sdk();
        let map = self.map_instance();
        let lng_lat = args
            .first()
            .and_then(|payload| event_lng_lat(payload, sdk.as_deref(), map.as_deref()));
        if let (Some(point), Some(payload)) = (lng_lat, args.first_mut()) {
            *payload = with_lng_lat(std::mem::take(payload), point);
        }
        MapEvent::native(canonical, native, lng_lat, args)
    }

    // ---- containers ----

    fn add_marker_container(&self) {
        let Some(container) = self.get_container() else {
            return;
        };
        let marker = create_marker_container(self.inner.containers.as_ref(), &container);
        *self.inner.marker_container.borrow_mut() = marker;
    }

    /// The map's own DOM element (`getDiv`).
    pub fn get_container(&self) -> Option<Element> {
        self.map_instance()
            .and_then(|map| map.call_optional("getDiv", &[]))
            .and_then(|div| div.as_object().cloned())
    }

    /// Element the map was created in.
    pub fn get_map_container(&self) -> Option<Element> {
        self.inner.map_container.borrow().clone()
    }

    pub fn get_map_canvas_container(&self) -> Option<Element> {
        self.get_container().or_else(|| self.get_map_container())
    }

    pub fn get_marker_container(&self) -> Option<Element> {
        self.inner.marker_container.borrow().clone()
    }

    /// Overlay layer above the markers, created on first use.
    pub fn get_overlay_container(&self) -> Option<Element> {
        if let Some(overlay) = self.inner.overlay_container.borrow().clone() {
            return Some(overlay);
        }
        let container = self.get_container()?;
        let overlay = create_overlay_container(self.inner.containers.as_ref(), &container)?;
        *self.inner.overlay_container.borrow_mut() = Some(Rc::clone(&overlay));
        Some(overlay)
    }

    pub fn get_canvas_overlays(&self) -> Option<Element> {
        self.get_overlay_container()
    }

    /// Data URL of the map canvas, or an empty string when there is none.
    pub fn export_map(&self, format: ExportFormat) -> String {
        self.get_container()
            .and_then(|container| self.inner.containers.export_canvas(&container, format.mime()))
            .unwrap_or_default()
    }

    // ---- camera ----

    fn call_map(&self, method: &str, args: &[NativeValue]) -> Option<NativeValue> {
        self.map_instance()?.call_optional(method, args)
    }

    pub fn get_zoom(&self) -> f64 {
        match self.call_map("getZoom", &[]) {
            Some(NativeValue::Number(zoom)) if !zoom.is_nan() => zoom - ZOOM_OFFSET,
            _ => 0.0,
        }
    }

    /// NaN is forwarded to the SDK as is.
    pub fn set_zoom(&self, zoom: f64) {
        self.call_map("setZoom", &[add_zoom_offset(zoom).into()]);
    }

    pub fn get_min_zoom(&self) -> f64 {
        NATIVE_MIN_ZOOM - ZOOM_OFFSET
    }

    pub fn get_max_zoom(&self) -> f64 {
        NATIVE_MAX_ZOOM - ZOOM_OFFSET
    }

    pub fn zoom_in(&self) {
        self.call_map("zoomIn", &[]);
    }

    pub fn zoom_out(&self) {
        self.call_map("zoomOut", &[]);
    }

    pub fn get_center(&self) -> GeoPoint {
        normalize(self.call_map("getCenter", &[]).as_ref())
    }

    pub fn set_center(&self, center: GeoPoint) {
        let lat_lng = denormalize(self.sdk().as_deref(), center);
        self.call_map("setCenter", &[lat_lng]);
    }

    pub fn set_zoom_and_center(&self, zoom: f64, center: GeoPoint) {
        self.set_zoom(zoom);
        self.set_center(center);
    }

    pub fn pan_to(&self, center: GeoPoint) {
        let lat_lng = denormalize(self.sdk().as_deref(), center);
        self.call_map("panTo", &[lat_lng]);
    }

    pub fn pan_by(&self, x: f64, y: f64) {
        self.call_map("panBy", &[x.into(), y.into()]);
    }

    /// Pitch via `getPitch`/`getTilt`; 0 when the SDK has neither.
    pub fn get_pitch(&self) -> f64 {
        let Some(map) = self.map_instance() else {
            return 0.0;
        };
        match GET_PITCH.invoke(map.as_ref(), &[]) {
            Some(Ok(pitch)) => coerce_number(&pitch),
            _ => 0.0,
        }
    }

    pub fn set_pitch(&self, pitch: f64) {
        if let Some(map) = self.map_instance() {
            SET_PITCH.invoke(map.as_ref(), &[pitch.into()]);
        }
    }

    pub fn get_rotation(&self) -> f64 {
        self.call_map("getHeading", &[])
            .map_or(0.0, |heading| coerce_number(&heading))
    }

    pub fn set_rotation(&self, rotation: f64) {
        self.call_map("setHeading", &[rotation.into()]);
    }

    pub fn get_bounds(&self) -> Bounds {
        let center = self.get_center();
        match self.call_map("getBounds", &[]) {
            Some(bounds) => normalize_bounds(&bounds, center),
            None => Bounds::from_point(center),
        }
    }

    /// Fits the camera using the best strategy the map offers. Exactly one
    /// native call is made, or none if the map supports no strategy.
    pub fn fit_bounds(&self, bounds: Bounds, options: Option<NativeValue>) {
        let Some(map) = self.map_instance() else {
            return;
        };
        let sdk = self.sdk();
        let native_bounds = denormalize_bounds(sdk.as_deref(), &bounds);
        let options = options.unwrap_or_default();

        let Some(strategy) = FIT_BOUNDS.resolve_where(map.as_ref(), |candidate| {
            candidate.name() != "fitBounds" || native_bounds.is_some()
        }) else {
            log::debug!("map supports no bounds-fitting strategy");
            return;
        };

        let args = match strategy.name() {
            "fitBounds" => vec![native_bounds.unwrap_or_default(), options],
            "panToBounds" => {
                let flat = bounds.to_flat().iter().map(|v| NativeValue::from(*v)).collect();
                vec![NativeValue::Array(flat)]
            }
            _ => {
                let points = vec![
                    denormalize(sdk.as_deref(), bounds.south_west),
                    denormalize(sdk.as_deref(), bounds.north_east),
                ];
                vec![NativeValue::Array(points), options]
            }
        };
        if let Err(err) = strategy.invoke(map.as_ref(), &args) {
            log::debug!("{} failed: {err}", strategy.name());
        }
    }

    /// Applies the recognised toggles; unknown or unsupported ones are ignored.
    pub fn set_map_status(&self, status: &StatusOptions) {
        let Some(map) = self.map_instance() else {
            return;
        };
        if let Some(rotate) = status.rotate_enable {
            map.call_optional("setPinchRotate", &[rotate.into()]);
        }
        if let Some(zoom) = status.zoom_enable {
            for affordance in ZOOM_AFFORDANCES.available(map.as_ref()) {
                if let Err(err) = affordance.invoke(map.as_ref(), &[zoom.into()]) {
                    log::debug!("{} failed: {err}", affordance.name());
                }
            }
        }
        if status.resize_enable == Some(true) {
            map.call_optional("resize", &[]);
        }
    }

    // ---- style ----

    pub fn set_map_style(&self, name: &str) {
        let Some(map) = self.map_instance() else {
            return;
        };
        let value = style_value(name);
        if SET_STYLE.invoke(map.as_ref(), &[value.as_str().into()]).is_none() {
            log::debug!("map has no style setter, keeping `{value}` for reporting only");
        }
        *self.inner.current_style.borrow_mut() = value;
    }

    /// Provider id of the last applied style.
    pub fn get_map_style(&self) -> String {
        self.inner.current_style.borrow().clone()
    }

    pub fn get_map_style_config(&self) -> &'static MapStyleConfig {
        &STYLE_CONFIG
    }

    // ---- coordinates ----

    pub fn meter_to_coord(&self, center: GeoPoint, outer: GeoPoint) -> f64 {
        transform::meter_to_coord(center, outer)
    }

    /// Screen pixel → geographic point; the map center when the SDK cannot
    /// reverse-project.
    pub fn pixel_to_lng_lat(&self, pixel: PixelPoint) -> GeoPoint {
        let screen = NativeValue::record([("x", pixel.x.into()), ("y", pixel.y.into())]);
        match self.call_map("fromScreenLocation", &[screen]) {
            Some(lat_lng) if !lat_lng.is_nullish() => normalize(Some(&lat_lng)),
            _ => self.get_center(),
        }
    }

    /// Geographic point → screen pixel; `(0, 0)` when the SDK cannot project.
    pub fn lng_lat_to_pixel(&self, point: GeoPoint) -> PixelPoint {
        let lat_lng = denormalize(self.sdk().as_deref(), point);
        match self.call_map("toScreenLocation", &[lat_lng]) {
            Some(pixel) if !pixel.is_nullish() => PixelPoint::new(
                pixel.field("x").map_or(0.0, |x| coerce_number(&x)),
                pixel.field("y").map_or(0.0, |y| coerce_number(&y)),
            ),
            _ => PixelPoint::default(),
        }
    }

    pub fn container_to_lng_lat(&self, pixel: PixelPoint) -> GeoPoint {
        self.pixel_to_lng_lat(pixel)
    }

    pub fn lng_lat_to_container(&self, point: GeoPoint) -> PixelPoint {
        self.lng_lat_to_pixel(point)
    }

    /// `[lng, lat]` → engine world coordinate (`[x, -y]` of the flat
    /// projection). Returned unchanged before `init`.
    pub fn lng_lat_to_coord(&self, lng_lat: [f64; 2]) -> [f64; 2] {
        match self.inner.viewport.borrow().as_ref() {
            Some(viewport) => {
                let [x, y] = viewport.project_flat(lng_lat, None);
                [x, -y]
            }
            None => lng_lat,
        }
    }

    pub fn lng_lat_to_coords(&self, coords: &CoordTree) -> CoordTree {
        coords.map_points(&|point| self.lng_lat_to_coord(point))
    }

    pub fn lng_lat_to_mercator(&self, point: GeoPoint, altitude: f64) -> MercatorCoordinate {
        transform::lng_lat_to_mercator(point, altitude)
    }

    pub fn get_model_matrix(
        &self,
        point: GeoPoint,
        altitude: f64,
        rotate: [f64; 3],
        scale: [f64; 3],
        origin: MercatorCoordinate,
    ) -> [f64; 16] {
        transform::model_matrix(point, altitude, rotate, scale, origin)
    }

    // ---- size ----

    /// `[width, height]` of the map in pixels. Falls back to the container's
    /// client size when the SDK does not report one.
    pub fn get_size(&self) -> [f64; 2] {
        self.read_size().unwrap_or_else(|| self.container_size())
    }

    /// Like [`PetalMapService::get_size`], but `None` when the SDK throws.
    pub(crate) fn read_size(&self) -> Option<[f64; 2]> {
        let map = self.map_instance()?;
        if !map.has_method("getSize") {
            return Some(self.container_size());
        }
        let size = match map.call("getSize", &[]) {
            Ok(size) => size,
            Err(err) => {
                log::trace!("getSize failed: {err}");
                return None;
            }
        };

        if let Some(items) = size.as_array() {
            let dimension = |i: usize| items.get(i).map_or(0.0, coerce_number);
            return Some([dimension(0), dimension(1)]);
        }
        if size.is_object_like() {
            let dimension = |key: &str, index: &str| {
                size.field(key)
                    .filter(|value| !value.is_nullish())
                    .or_else(|| size.field(index))
                    .map_or(0.0, |value| coerce_number(&value))
            };
            let (width, height) = (dimension("width", "0"), dimension("height", "1"));
            if width != 0.0 && height != 0.0 {
                return Some([width, height]);
            }
        }
        Some(self.container_size())
    }

    fn container_size(&self) -> [f64; 2] {
        match self.get_container() {
            Some(container) => {
                let (width, height) = self.inner.containers.client_size(&container);
                [width, height]
            }
            None => [0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::MapServiceBuilder;
    use crate::runtime::ManualScheduler;
    use crate::sdk::loader::SdkLoader;
    use crate::sdk::memory::{MemoryContainerHost, MemoryMap, MemoryScriptHost, MemorySdk};
    use serde_json::json;

    struct Fixture {
        service: PetalMapService,
        sdk: Rc<MemorySdk>,
        scheduler: Rc<ManualScheduler>,
        containers: Rc<MemoryContainerHost>,
    }

    fn fixture_with(sdk: MemorySdk, config: MapServiceConfig) -> Fixture {
        let sdk = sdk.shared();
        let host = MemoryScriptHost::new();
        host.publish(sdk.clone());
        let scheduler = ManualScheduler::new();
        let containers = MemoryContainerHost::new();
        containers.add_container("map", 800.0, 600.0);
        let loader = SdkLoader::new(host, scheduler.clone());

        let service = MapServiceBuilder::new()
            .with_config(config)
            .with_sdk_source(Rc::new(loader))
            .with_scheduler(scheduler.clone())
            .with_container_host(containers.clone())
            .with_timing(ServiceTiming::for_testing())
            .build()
            .unwrap();
        Fixture {
            service,
            sdk,
            scheduler,
            containers,
        }
    }

    fn ready_fixture() -> Fixture {
        let fixture = fixture_with(
            MemorySdk::new(),
            MapServiceConfig::with_container("map").token("secret"),
        );
        futures::executor::block_on(fixture.service.init()).unwrap();
        fixture
    }

    fn map_of(fixture: &Fixture) -> Rc<MemoryMap> {
        fixture.sdk.last_map().unwrap()
    }

    #[test]
    fn test_native_options() {
        let mut config = MapServiceConfig::with_container("map")
            .token("secret")
            .center(120.0, 30.0)
            .zoom(3.0);
        config.min_zoom = Some(1.0);
        config.extra.insert("language".into(), json!("en"));
        let fixture = fixture_with(MemorySdk::new(), config);
        futures::executor::block_on(fixture.service.init()).unwrap();

        let options = map_of(&fixture).options();
        assert_eq!(options.field("zoom"), Some(4.0.into()));
        assert_eq!(options.field("minZoom"), Some(2.0.into()));
        assert_eq!(options.field("maxZoom"), None);
        assert_eq!(options.field("language"), Some("en".into()));
        assert_eq!(
            normalize(options.field("center").as_ref()),
            GeoPoint::new(120.0, 30.0)
        );
        assert_eq!(
            options.field("authOptions").and_then(|auth| auth.field("accessToken")),
            Some("secret".into())
        );
        assert!(options.field("token").is_none());
    }

    #[test]
    fn test_missing_container_id() {
        let fixture = fixture_with(MemorySdk::new(), MapServiceConfig::new().token("secret"));
        let err = futures::executor::block_on(fixture.service.init()).unwrap_err();
        assert_eq!(err, AdapterError::MissingContainerId);
        assert_eq!(err.to_string(), "No container id specified");
        assert_eq!(fixture.service.state(), ServiceState::Uninitialized);
    }

    #[test]
    fn test_missing_credential_is_actionable() {
        let fixture = fixture_with(MemorySdk::new(), MapServiceConfig::with_container("map"));
        let err = futures::executor::block_on(fixture.service.init()).unwrap_err();
        assert_eq!(err, AdapterError::MissingCredential);
        assert!(err.to_string().contains("developer.huawei.com"));
        assert!(fixture.sdk.maps().is_empty());
    }

    #[test]
    fn test_unknown_container() {
        let fixture = fixture_with(
            MemorySdk::new(),
            MapServiceConfig::with_container("elsewhere").token("secret"),
        );
        let err = futures::executor::block_on(fixture.service.init()).unwrap_err();
        assert_eq!(err, AdapterError::ContainerNotFound("elsewhere".into()));
    }

    #[test]
    fn test_require_map_follows_lifecycle() {
        let fixture = fixture_with(
            MemorySdk::new(),
            MapServiceConfig::with_container("map").token("secret"),
        );
        assert_eq!(fixture.service.require_map().err(), Some(AdapterError::NotInitialized));
        futures::executor::block_on(fixture.service.init()).unwrap();
        assert!(fixture.service.require_map().is_ok());
        fixture.service.destroy();
        assert_eq!(fixture.service.require_map().err(), Some(AdapterError::Destroyed));
    }

    #[test]
    fn test_init_twice_is_rejected() {
        let fixture = ready_fixture();
        let err = futures::executor::block_on(fixture.service.init()).unwrap_err();
        assert_eq!(err, AdapterError::AlreadyInitialized);
    }

    #[test]
    fn test_ready_applies_interaction_baseline() {
        let fixture = ready_fixture();
        assert_eq!(fixture.service.state(), ServiceState::Ready);
        let map = map_of(&fixture);
        assert_eq!(map.calls_to("setPinchRotate"), vec![vec![NativeValue::Bool(true)]]);
        for control in [
            "setNavigationControl",
            "setZoomControl",
            "setRotateControl",
            "setScaleControl",
            "setLocationControl",
            "setCopyrightControl",
        ] {
            assert_eq!(map.calls_to(control), vec![vec![NativeValue::Bool(false)]]);
        }
        let viewport = fixture.service.viewport().unwrap();
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.zoom, 5.0);
    }

    #[test]
    fn test_zoom_round_trip_with_offset() {
        let fixture = ready_fixture();
        for zoom in [0.0, 3.5, 12.0, 18.25] {
            fixture.service.set_zoom(zoom);
            assert_eq!(fixture.service.get_zoom(), zoom);
            assert_eq!(map_of(&fixture).camera().zoom, zoom + 1.0);
        }
    }

    #[test]
    fn test_nan_zoom_forwarded_and_read_as_zero() {
        let fixture = ready_fixture();
        fixture.service.set_zoom(f64::NAN);
        assert!(map_of(&fixture).camera().zoom.is_nan());
        assert_eq!(fixture.service.get_zoom(), 0.0);
    }

    #[test]
    fn test_zoom_limits() {
        let fixture = ready_fixture();
        assert_eq!(fixture.service.get_min_zoom(), 1.0);
        assert_eq!(fixture.service.get_max_zoom(), 39.0);
    }

    #[test]
    fn test_center_and_rotation() {
        let fixture = ready_fixture();
        fixture.service.set_center(GeoPoint::new(10.0, 20.0));
        assert_eq!(fixture.service.get_center(), GeoPoint::new(10.0, 20.0));

        fixture.service.set_zoom_and_center(7.0, GeoPoint::new(11.0, 21.0));
        assert_eq!(fixture.service.get_zoom(), 7.0);
        assert_eq!(fixture.service.get_center(), GeoPoint::new(11.0, 21.0));

        fixture.service.set_rotation(45.0);
        assert_eq!(fixture.service.get_rotation(), 45.0);
    }

    #[test]
    fn test_pitch_probes() {
        let fixture = ready_fixture();
        fixture.service.set_pitch(30.0);
        assert_eq!(fixture.service.get_pitch(), 30.0);
        assert_eq!(map_of(&fixture).call_count("setTilt"), 0);

        let map = map_of(&fixture);
        map.disable_method("getPitch");
        map.disable_method("getTilt");
        assert_eq!(fixture.service.get_pitch(), 0.0);
    }

    #[test]
    fn test_bounds_from_accessors() {
        let fixture = ready_fixture();
        let bounds = fixture.service.get_bounds();
        let center = fixture.service.get_center();
        assert!(bounds.south_west.lng < center.lng && center.lng < bounds.north_east.lng);

        map_of(&fixture).disable_method("getBounds");
        assert_eq!(fixture.service.get_bounds(), Bounds::from_point(center));
    }

    #[test]
    fn test_fit_bounds_prefers_native_fit() {
        let fixture = ready_fixture();
        let bounds = Bounds::from([[0.0, 0.0], [1.0, 1.0]]);
        fixture.service.fit_bounds(bounds, None);

        let map = map_of(&fixture);
        assert_eq!(map.call_count("fitBounds"), 1);
        assert_eq!(map.call_count("panToBounds"), 0);
        assert_eq!(map.call_count("setFitView"), 0);
    }

    #[test]
    fn test_fit_bounds_without_bounds_constructor_pans() {
        let fixture = fixture_with(
            MemorySdk::new().without_constructor("LatLngBounds"),
            MapServiceConfig::with_container("map").token("secret"),
        );
        futures::executor::block_on(fixture.service.init()).unwrap();
        fixture
            .service
            .fit_bounds(Bounds::from([[0.0, 1.0], [2.0, 3.0]]), None);

        let map = map_of(&fixture);
        assert_eq!(map.call_count("fitBounds"), 0);
        let calls = map.calls_to("panToBounds");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], NativeValue::from(json!([0.0, 1.0, 2.0, 3.0])));
        assert_eq!(map.call_count("setFitView"), 0);
    }

    #[test]
    fn test_map_status_fan_out() {
        let fixture = ready_fixture();
        let map = map_of(&fixture);
        map.clear_calls();

        fixture.service.set_map_status(&StatusOptions {
            rotate_enable: Some(false),
            zoom_enable: Some(true),
            resize_enable: Some(false),
            drag_enable: Some(false),
            ..StatusOptions::default()
        });
        assert_eq!(map.calls_to("setPinchRotate"), vec![vec![NativeValue::Bool(false)]]);
        assert_eq!(map.calls_to("setZoomControl"), vec![vec![NativeValue::Bool(true)]]);
        assert_eq!(map.calls_to("setZoomSlider"), vec![vec![NativeValue::Bool(true)]]);
        assert_eq!(map.call_count("resize"), 0);

        fixture.service.set_map_status(&StatusOptions {
            resize_enable: Some(true),
            ..StatusOptions::default()
        });
        assert_eq!(map.call_count("resize"), 1);
    }

    /// Answers camera queries; `setZoomControl` always throws.
    #[derive(Default)]
    struct BrokenControls {
        calls: RefCell<Vec<String>>,
    }

    impl NativeObject for BrokenControls {
        fn get(&self, _key: &str) -> Option<NativeValue> {
            None
        }

        fn has_method(&self, name: &str) -> bool {
            matches!(name, "getZoom" | "getCenter" | "setZoomControl" | "setZoomSlider")
        }

        fn call(&self, name: &str, _args: &[NativeValue]) -> crate::sdk::NativeResult<NativeValue> {
            self.calls.borrow_mut().push(name.to_string());
            match name {
                "getZoom" => Ok(3.0.into()),
                "getCenter" => Ok(NativeValue::Array(vec![10.0.into(), 20.0.into()])),
                "setZoomControl" => Err(crate::sdk::NativeError::thrown(name, "control locked")),
                _ => Ok(NativeValue::Undefined),
            }
        }
    }

    #[test]
    fn test_failed_zoom_affordance_does_not_stop_the_rest() {
        let map = Rc::new(BrokenControls::default());
        let service = MapServiceBuilder::new()
            .with_map_instance(Rc::clone(&map) as Rc<dyn NativeObject>)
            .with_scheduler(ManualScheduler::new())
            .with_container_host(MemoryContainerHost::new())
            .build()
            .unwrap();
        futures::executor::block_on(service.init()).unwrap();
        map.calls.borrow_mut().clear();

        service.set_map_status(&StatusOptions {
            zoom_enable: Some(false),
            ..StatusOptions::default()
        });
        assert_eq!(
            *map.calls.borrow(),
            vec!["setZoomControl".to_string(), "setZoomSlider".to_string()]
        );
    }

    #[test]
    fn test_style_selection() {
        let fixture = ready_fixture();
        assert_eq!(fixture.service.get_map_style(), "standard");

        fixture.service.set_map_style("night");
        assert_eq!(map_of(&fixture).camera().style.as_deref(), Some("night"));
        assert_eq!(map_of(&fixture).call_count("setPresetStyleId"), 1);
        assert_eq!(fixture.service.get_map_style(), "night");

        map_of(&fixture).disable_method("setPresetStyleId");
        fixture.service.set_map_style("custom-id");
        assert_eq!(map_of(&fixture).call_count("setStyleId"), 1);
        assert_eq!(fixture.service.get_map_style(), "custom-id");
        assert_eq!(fixture.service.get_map_style_config().len(), 3);
    }

    #[test]
    fn test_pixel_conversions_and_fallbacks() {
        let fixture = ready_fixture();
        let center = fixture.service.get_center();
        let pixel = fixture.service.lng_lat_to_pixel(center);
        assert!((pixel.x - 400.0).abs() < 1e-6);
        assert!((pixel.y - 300.0).abs() < 1e-6);
        let back = fixture.service.container_to_lng_lat(pixel);
        assert!((back.lng - center.lng).abs() < 1e-9);

        let map = map_of(&fixture);
        map.disable_method("fromScreenLocation");
        map.disable_method("toScreenLocation");
        assert_eq!(fixture.service.pixel_to_lng_lat(PixelPoint::new(1.0, 1.0)), center);
        assert_eq!(
            fixture.service.lng_lat_to_container(center),
            PixelPoint::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_lng_lat_to_coord_before_and_after_init() {
        let fixture = fixture_with(
            MemorySdk::new(),
            MapServiceConfig::with_container("map").token("secret"),
        );
        assert_eq!(fixture.service.lng_lat_to_coord([1.0, 2.0]), [1.0, 2.0]);

        futures::executor::block_on(fixture.service.init()).unwrap();
        let [x, y] = fixture.service.lng_lat_to_coord([0.0, 0.0]);
        let scale = 2f64.powf(5.0) * 512.0;
        assert!((x - scale / 2.0).abs() < 1e-6);
        assert!((y + scale / 2.0).abs() < 1e-6);

        let tree: CoordTree = serde_json::from_value(json!([[[0.0, 0.0]], [0.0, 0.0]])).unwrap();
        let projected = fixture.service.lng_lat_to_coords(&tree);
        let expected: CoordTree =
            serde_json::from_value(json!([[[x, y]], [x, y]])).unwrap();
        assert_eq!(projected, expected);
    }

    #[test]
    fn test_size_shapes() {
        let fixture = ready_fixture();
        assert_eq!(fixture.service.get_size(), [800.0, 600.0]);

        map_of(&fixture).disable_method("getSize");
        let root = fixture.containers.get_container("map").unwrap();
        assert_eq!(fixture.containers.client_size(&root), (800.0, 600.0));
        assert_eq!(fixture.service.get_size(), [800.0, 600.0]);
    }

    #[test]
    fn test_containers() {
        let fixture = ready_fixture();
        assert!(fixture.service.get_marker_container().is_some());
        let overlay = fixture.service.get_overlay_container().unwrap();
        let again = fixture.service.get_canvas_overlays().unwrap();
        assert!(Rc::ptr_eq(&overlay, &again));
        assert!(fixture.service.get_map_canvas_container().is_some());
        assert_eq!(fixture.service.export_map(ExportFormat::Png), "");
    }

    #[test]
    fn test_camera_events_sync_on_next_frame() {
        let fixture = ready_fixture();
        let synced = Rc::new(Cell::new(0));
        let s = Rc::clone(&synced);
        fixture
            .service
            .on_camera_changed(move |viewport| {
                assert_eq!(viewport.zoom, 9.0);
                s.set(s.get() + 1);
            });

        fixture.service.set_zoom(9.0);
        fixture.service.set_rotation(10.0);
        map_of(&fixture).fire("moveend", &[]);
        assert_eq!(synced.get(), 0);
        assert_eq!(fixture.scheduler.pending_frames(), 1);

        fixture.scheduler.flush_frame();
        assert_eq!(synced.get(), 1);
        assert_eq!(fixture.service.viewport().unwrap().bearing, 10.0);
    }

    #[test]
    fn test_service_events_use_emitter() {
        let fixture = ready_fixture();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let handler = EventHandler::new(move |_| h.set(h.get() + 1));
        fixture.service.on("mapAfterFrameChange", handler.clone());
        assert_eq!(fixture.service.emit(ServiceEvent::MapAfterFrameChange), 1);

        fixture.service.off("mapAfterFrameChange", &handler);
        assert_eq!(fixture.service.emit(ServiceEvent::MapAfterFrameChange), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(map_of(&fixture).listener_count("mapAfterFrameChange"), 0);
    }

    #[test]
    fn test_native_events_carry_lng_lat() {
        let fixture = ready_fixture();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        fixture
            .service
            .on("click", EventHandler::new(move |event| s.borrow_mut().push(event.clone())));

        map_of(&fixture).fire("click", &[json!({ "position": [3.0, 4.0] }).into()]);
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "click");
        assert_eq!(events[0].lng_lat, Some(GeoPoint::new(3.0, 4.0)));
        assert_eq!(
            events[0].raw.field("lngLat"),
            Some(json!({ "lng": 3.0, "lat": 4.0 }).into())
        );
        assert!(events[0].raw.has_field("lnglat"));
    }

    #[test]
    fn test_non_object_payload_passes_through() {
        let fixture = ready_fixture();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        fixture
            .service
            .on("zoomchange", EventHandler::new(move |event| *s.borrow_mut() = Some(event.clone())));

        fixture.service.set_zoom(4.0);
        let event = seen.borrow().clone().unwrap();
        assert_eq!(event.native_type.as_deref(), Some("onZoomChanged"));
        assert_eq!(event.lng_lat, None);
        assert_eq!(event.raw, NativeValue::Undefined);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let fixture = ready_fixture();
        let map = map_of(&fixture);
        fixture.service.on("click", EventHandler::new(|_| {}));
        fixture.service.get_overlay_container();
        let root = fixture.containers.get_container("map").unwrap();
        assert!(map.total_listeners() > 0);
        assert_eq!(fixture.containers.client_size(&root), (800.0, 600.0));

        fixture.service.destroy();
        assert_eq!(fixture.service.state(), ServiceState::Destroyed);
        assert_eq!(map.total_listeners(), 0);
        assert!(fixture.service.map_instance().is_none());
        assert!(fixture.service.get_marker_container().is_none());
        assert!(fixture.service.get_overlay_container().is_none());

        fixture.service.destroy();
        assert_eq!(fixture.service.state(), ServiceState::Destroyed);
        assert_eq!(
            futures::executor::block_on(fixture.service.init()),
            Err(AdapterError::Destroyed)
        );
    }

    #[test]
    fn test_readiness_waits_for_answers() {
        let fixture = fixture_with(
            MemorySdk::new().map_warmup(2),
            MapServiceConfig::with_container("map").token("secret"),
        );
        futures::executor::block_on(fixture.service.init()).unwrap();
        assert_eq!(fixture.service.state(), ServiceState::Initializing);

        fixture.scheduler.advance(std::time::Duration::from_millis(10));
        assert_eq!(fixture.service.state(), ServiceState::Initializing);
        fixture.scheduler.advance(std::time::Duration::from_millis(10));
        assert_eq!(fixture.service.state(), ServiceState::Ready);
        assert_eq!(
            futures::executor::block_on(fixture.service.ready()),
            Ok(())
        );
    }

    #[test]
    fn test_readiness_timeout() {
        let fixture = fixture_with(
            MemorySdk::new().map_warmup(u32::MAX),
            MapServiceConfig::with_container("map").token("secret"),
        );
        futures::executor::block_on(fixture.service.init()).unwrap();
        fixture.scheduler.run_until_idle();

        assert_eq!(
            futures::executor::block_on(fixture.service.ready()),
            Err(AdapterError::ReadyTimeout { attempts: 5 })
        );
        assert_eq!(fixture.service.state(), ServiceState::Initializing);
        assert_eq!(map_of(&fixture).call_count("setPinchRotate"), 0);
    }

    #[test]
    fn test_destroy_stops_readiness_poll() {
        let fixture = fixture_with(
            MemorySdk::new().map_warmup(u32::MAX),
            MapServiceConfig::with_container("map").token("secret"),
        );
        futures::executor::block_on(fixture.service.init()).unwrap();
        let map = map_of(&fixture);
        let before = map.call_count("getZoom");

        fixture.service.destroy();
        fixture.scheduler.run_until_idle();
        assert_eq!(map.call_count("getZoom"), before);
        assert_eq!(
            futures::executor::block_on(fixture.service.ready()),
            Err(AdapterError::Destroyed)
        );
    }

    #[test]
    fn test_injected_map_skips_loading_and_credentials() {
        let containers = MemoryContainerHost::new();
        let root = containers.add_container("host", 320.0, 240.0);
        let map = MemoryMap::new(root.as_value(), NativeValue::Undefined);
        let scheduler = ManualScheduler::new();

        let service = MapServiceBuilder::new()
            .with_map_instance(map.clone())
            .with_scheduler(scheduler)
            .with_container_host(containers)
            .build()
            .unwrap();
        futures::executor::block_on(service.init()).unwrap();

        assert_eq!(service.state(), ServiceState::Ready);
        assert!(service.get_map_container().is_some());
        assert_eq!(root.children_with_class("l7-marker-container").len(), 1);
        assert_eq!(service.get_size(), [800.0, 600.0]);
    }
}
