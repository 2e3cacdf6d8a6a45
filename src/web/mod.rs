//! Browser bindings: the real Petal SDK through `js-sys`, the DOM through
//! `web-sys`, and timers on the window.

use crate::core::constants::SDK_GLOBAL;
use crate::prelude::HashMap;
use crate::runtime::Scheduler;
use crate::sdk::loader::{ScriptHost, SdkHandle};
use crate::sdk::value::{NativeError, NativeListener, NativeObject, NativeResult, NativeValue};
use crate::sdk::SdkLoader;
use crate::service::container::{ContainerHost, Element};
use crate::service::PetalMapService;
use js_sys::{Array, Function, Object, Reflect};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Any JS object: the SDK namespace, a map, a `LatLng`, a DOM node.
#[derive(Debug, Clone)]
pub struct JsObject(JsValue);

impl JsObject {
    pub fn new(value: JsValue) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &JsValue {
        &self.0
    }

    fn property(&self, key: &str) -> Option<JsValue> {
        Reflect::get(&self.0, &JsValue::from_str(key))
            .ok()
            .filter(|value| !value.is_undefined())
    }

    fn function(&self, name: &str) -> NativeResult<Function> {
        self.property(name)
            .and_then(|value| value.dyn_into::<Function>().ok())
            .ok_or_else(|| NativeError::Unsupported(name.to_string()))
    }
}

impl NativeObject for JsObject {
    fn get(&self, key: &str) -> Option<NativeValue> {
        self.property(key).map(|value| from_js(&value))
    }

    fn has_method(&self, name: &str) -> bool {
        self.property(name).map_or(false, |value| value.is_function())
    }

    fn call(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        let function = self.function(name)?;
        Reflect::apply(&function, &self.0, &to_js_array(args))
            .map(|value| from_js(&value))
            .map_err(|err| NativeError::thrown(name, js_message(&err)))
    }

    fn construct(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        let constructor = self.function(name)?;
        Reflect::construct(&constructor, &to_js_array(args))
            .map(|value| from_js(&value))
            .map_err(|err| NativeError::thrown(name, js_message(&err)))
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn release_listener(&self, listener: &NativeListener) {
        release_js_listener(listener);
    }
}

/// JS → dynamic value. Objects stay handles; only arrays are copied.
pub fn from_js(value: &JsValue) -> NativeValue {
    if value.is_undefined() {
        NativeValue::Undefined
    } else if value.is_null() {
        NativeValue::Null
    } else if let Some(b) = value.as_bool() {
        NativeValue::Bool(b)
    } else if let Some(n) = value.as_f64() {
        NativeValue::Number(n)
    } else if let Some(s) = value.as_string() {
        NativeValue::String(s)
    } else if Array::is_array(value) {
        NativeValue::Array(Array::from(value).iter().map(|item| from_js(&item)).collect())
    } else {
        NativeValue::Object(Rc::new(JsObject(value.clone())))
    }
}

pub fn to_js(value: &NativeValue) -> JsValue {
    match value {
        NativeValue::Undefined => JsValue::UNDEFINED,
        NativeValue::Null => JsValue::NULL,
        NativeValue::Bool(b) => JsValue::from_bool(*b),
        NativeValue::Number(n) => JsValue::from_f64(*n),
        NativeValue::String(s) => JsValue::from_str(s),
        NativeValue::Array(items) => to_js_array(items).into(),
        NativeValue::Record(fields) => {
            let object = Object::new();
            for (key, field) in fields {
                let _ = Reflect::set(&object, &JsValue::from_str(key), &to_js(field));
            }
            object.into()
        }
        NativeValue::Object(object) => match object
            .as_any()
            .and_then(|any| any.downcast_ref::<JsObject>())
        {
            Some(js) => js.0.clone(),
            None => {
                log::warn!("non-JS native object passed to the browser SDK");
                JsValue::UNDEFINED
            }
        },
        NativeValue::Function(listener) => js_listener(listener),
    }
}

fn to_js_array(values: &[NativeValue]) -> Array {
    values.iter().map(to_js).collect()
}

struct BoundListener {
    // Keeps the listener (and so its id) alive while JS holds the function.
    _listener: NativeListener,
    _closure: Closure<dyn Fn(JsValue)>,
    function: JsValue,
}

/// Per-listener entries keyed by [`NativeListener::id`]. An entry lives from
/// the first time its listener crosses into JS until the SDK unbinds it.
struct ListenerCache<T> {
    entries: HashMap<usize, T>,
}

impl<T> Default for ListenerCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::default(),
        }
    }
}

impl<T> ListenerCache<T> {
    fn get(&self, id: usize) -> Option<&T> {
        self.entries.get(&id)
    }

    fn insert(&mut self, id: usize, entry: T) {
        self.entries.insert(id, entry);
    }

    fn release(&mut self, id: usize) -> Option<T> {
        self.entries.remove(&id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

thread_local! {
    static LISTENERS: RefCell<ListenerCache<BoundListener>> = RefCell::new(ListenerCache::default());
}

/// Number of listeners currently exposed to JS.
pub fn live_listeners() -> usize {
    LISTENERS.with(|cache| cache.borrow().len())
}

/// The JS function for `listener`. The same listener always maps to the same
/// function, so the SDK can unbind it by identity.
fn js_listener(listener: &NativeListener) -> JsValue {
    let id = listener.id();
    if let Some(function) =
        LISTENERS.with(|cache| cache.borrow().get(id).map(|bound| bound.function.clone()))
    {
        return function;
    }

    let target = listener.clone();
    let closure = Closure::wrap(Box::new(move |args: JsValue| {
        let args: Vec<NativeValue> = Array::from(&args).iter().map(|arg| from_js(&arg)).collect();
        target.invoke(&args);
    }) as Box<dyn Fn(JsValue)>);

    // Collects variadic arguments into one array for the Rust side.
    let variadic = Function::new_with_args(
        "f",
        "return function () { return f(Array.prototype.slice.call(arguments)); };",
    );
    let function = variadic
        .call1(&JsValue::NULL, closure.as_ref())
        .unwrap_or(JsValue::UNDEFINED);

    LISTENERS.with(|cache| {
        cache.borrow_mut().insert(
            id,
            BoundListener {
                _listener: listener.clone(),
                _closure: closure,
                function: function.clone(),
            },
        )
    });
    function
}

fn release_js_listener(listener: &NativeListener) {
    let released = LISTENERS.with(|cache| cache.borrow_mut().release(listener.id()));
    // A handler may unbind itself from inside its own callback; the closure
    // must outlive that call, so it is dropped on a later task.
    if let Some(bound) = released {
        wasm_bindgen_futures::spawn_local(async move { drop(bound) });
    }
}

/// `setTimeout` / `requestAnimationFrame` on the window.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move || task());
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            millis,
        ) {
            log::error!("setTimeout failed: {}", js_message(&err));
        }
    }

    fn request_animation_frame(&self, task: Box<dyn FnOnce()>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move |_timestamp: f64| task());
        if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {}", js_message(&err));
        }
    }
}

/// Where the SDK script goes: the body, else the head.
fn script_parent<T>(body: Option<T>, head: impl FnOnce() -> Option<T>) -> Option<T> {
    body.or_else(head)
}

/// Script tags and the SDK global on `window`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomScriptHost;

impl ScriptHost for DomScriptHost {
    fn sdk_global(&self) -> Option<SdkHandle> {
        let window = web_sys::window()?;
        let sdk = Reflect::get(&window, &JsValue::from_str(SDK_GLOBAL)).ok()?;
        if sdk.is_undefined() || sdk.is_null() {
            return None;
        }
        Some(Rc::new(JsObject(sdk)))
    }

    fn inject_script(
        &self,
        url: &str,
        on_load: Box<dyn FnOnce()>,
        on_error: Box<dyn FnOnce(Option<String>)>,
    ) -> Result<(), String> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or("no document")?;
        let script = document
            .create_element("script")
            .map_err(|err| js_message(&err))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| "created element is not a script".to_string())?;
        script.set_src(url);
        script.set_async(true);

        let load = Closure::once_into_js(move || on_load());
        let error = Closure::once_into_js(move |_event: JsValue| on_error(None));
        script.set_onload(Some(load.unchecked_ref()));
        script.set_onerror(Some(error.unchecked_ref()));

        let parent = script_parent(
            document.body().map(web_sys::Node::from),
            || document.head().map(web_sys::Node::from),
        )
        .ok_or("document has neither body nor head")?;
        parent.append_child(&script).map_err(|err| js_message(&err))?;
        Ok(())
    }

    fn remove_scripts(&self, pattern: &str) -> usize {
        let Some(document) = web_sys::window().and_then(|window| window.document()) else {
            return 0;
        };
        let scripts = document.get_elements_by_tag_name("script");
        let mut removed = 0;
        // Live collection: walk backwards while removing.
        for index in (0..scripts.length()).rev() {
            let Some(script) = scripts.item(index) else {
                continue;
            };
            let src = script.get_attribute("src").unwrap_or_default();
            if src.contains(pattern) {
                script.remove();
                removed += 1;
            }
        }
        removed
    }

    fn delete_sdk_global(&self) {
        if let Some(window) = web_sys::window() {
            let _ = Reflect::delete_property(&window, &JsValue::from_str(SDK_GLOBAL));
        }
    }
}

fn html_element(handle: &Element) -> Option<web_sys::HtmlElement> {
    handle
        .as_any()?
        .downcast_ref::<JsObject>()?
        .value()
        .dyn_ref::<web_sys::HtmlElement>()
        .cloned()
}

/// `zIndex` → `z-index`
fn css_property(name: &str) -> String {
    let mut property = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            property.push('-');
            property.push(c.to_ascii_lowercase());
        } else {
            property.push(c);
        }
    }
    property
}

/// The page's DOM.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomContainerHost;

impl ContainerHost for DomContainerHost {
    fn get_container(&self, id: &str) -> Option<Element> {
        let element = web_sys::window()?.document()?.get_element_by_id(id)?;
        Some(Rc::new(JsObject(element.into())))
    }

    fn ensure_positioned(&self, element: &Element) {
        let (Some(window), Some(element)) = (web_sys::window(), html_element(element)) else {
            return;
        };
        let position = window
            .get_computed_style(&element)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("position").ok())
            .unwrap_or_default();
        if position.is_empty() || position == "static" {
            let _ = element.style().set_property("position", "relative");
        }
    }

    fn create_child(&self, parent: &Element, class_name: &str, style: &[(&str, &str)]) -> Option<Element> {
        let parent = html_element(parent)?;
        let document = web_sys::window()?.document()?;
        let child = document
            .create_element("div")
            .ok()?
            .dyn_into::<web_sys::HtmlElement>()
            .ok()?;
        child.set_class_name(class_name);
        let declaration = child.style();
        for (name, value) in style {
            let _ = declaration.set_property(&css_property(name), value);
        }
        parent.append_child(&child).ok()?;
        Some(Rc::new(JsObject(child.into())))
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) {
        if let Some(element) = html_element(element) {
            let _ = element.set_attribute(name, value);
        }
    }

    fn remove(&self, element: &Element) {
        if let Some(element) = html_element(element) {
            element.remove();
        }
    }

    fn client_size(&self, element: &Element) -> (f64, f64) {
        html_element(element).map_or((0.0, 0.0), |element| {
            (f64::from(element.client_width()), f64::from(element.client_height()))
        })
    }

    fn export_canvas(&self, container: &Element, mime: &str) -> Option<String> {
        let canvas = html_element(container)?
            .query_selector("canvas")
            .ok()??
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .ok()?;
        canvas.to_data_url_with_type(mime).ok()
    }
}

/// The process-wide loader, created on first use.
pub fn default_loader() -> SdkLoader {
    if let Some(loader) = SdkLoader::global() {
        return loader;
    }
    let loader = SdkLoader::new(Rc::new(DomScriptHost), Rc::new(BrowserScheduler));
    SdkLoader::install_global(loader.clone());
    loader
}

/// Routes panics to the browser console.
pub fn install_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Starts `service.init()` on the browser event loop. Failures are logged.
pub fn spawn_init(service: PetalMapService) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = service.init().await {
            log::error!("Petal map failed to start: {err}");
        }
    });
}
