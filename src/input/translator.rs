//! Canonical ↔ native event bindings.
//!
//! The native SDK removes listeners only by identity, so every handler is
//! wrapped once per native event name and the wrapper is remembered. The same
//! handler registered under two canonical names that share a native event is
//! still bound once; the binding records both owners and is released only
//! when the last owner unregisters.

use crate::input::events::native_events;
use crate::input::handler::EventHandler;
use crate::sdk::probe::{BIND_LISTENER, UNBIND_LISTENER};
use crate::sdk::value::{NativeListener, NativeObject, NativeValue};
use std::cell::RefCell;

struct Binding {
    native: String,
    handler: EventHandler,
    wrapper: NativeListener,
    owners: Vec<String>,
}

#[derive(Default)]
pub struct EventTranslator {
    bindings: RefCell<Vec<Binding>>,
}

fn native_call(map: &dyn NativeObject, unbind: bool, native: &str, wrapper: &NativeListener) -> bool {
    let probe = if unbind { UNBIND_LISTENER } else { BIND_LISTENER };
    let args = [NativeValue::from(native), NativeValue::from(wrapper.clone())];
    match probe.invoke(map, &args) {
        Some(Ok(_)) => true,
        Some(Err(err)) => {
            log::debug!("{} for `{native}` failed: {err}", probe.operation);
            false
        }
        None => {
            log::debug!("map has no {} capability", probe.operation);
            false
        }
    }
}

/// Unbinds the wrapper natively; once the SDK has let go of it, the map may
/// free whatever it keeps for the wrapper.
fn release(map: &dyn NativeObject, binding: &Binding) {
    if native_call(map, true, &binding.native, &binding.wrapper) {
        map.release_listener(&binding.wrapper);
    }
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to every native event behind `canonical`.
    ///
    /// `wrap(canonical, native)` builds the listener actually handed to the
    /// SDK. Returns how many native listeners were added.
    pub fn bind(
        &self,
        map: &dyn NativeObject,
        canonical: &str,
        handler: &EventHandler,
        wrap: impl Fn(&str, &str) -> NativeListener,
    ) -> usize {
        let mut added = 0;
        for native in native_events(canonical) {
            let existing = {
                let mut bindings = self.bindings.borrow_mut();
                match bindings
                    .iter_mut()
                    .find(|b| b.native == native && b.handler.same(handler))
                {
                    Some(binding) => {
                        if !binding.owners.iter().any(|owner| owner == canonical) {
                            binding.owners.push(canonical.to_string());
                        }
                        true
                    }
                    None => false,
                }
            };
            if existing {
                continue;
            }

            let wrapper = wrap(canonical, native);
            if native_call(map, false, native, &wrapper) {
                self.bindings.borrow_mut().push(Binding {
                    native: native.to_string(),
                    handler: handler.clone(),
                    wrapper,
                    owners: vec![canonical.to_string()],
                });
                added += 1;
            }
        }
        added
    }

    /// Releases `canonical`'s claim on `handler`. Wrappers no longer owned by
    /// any canonical name are removed from the SDK. Returns how many native
    /// listeners were removed.
    pub fn unbind(&self, map: Option<&dyn NativeObject>, canonical: &str, handler: &EventHandler) -> usize {
        let mut removed = 0;
        for native in native_events(canonical) {
            let released = {
                let mut bindings = self.bindings.borrow_mut();
                let Some(index) = bindings
                    .iter()
                    .position(|b| b.native == native && b.handler.same(handler))
                else {
                    continue;
                };
                let binding = &mut bindings[index];
                binding.owners.retain(|owner| owner != canonical);
                if binding.owners.is_empty() {
                    Some(bindings.remove(index))
                } else {
                    None
                }
            };

            if let Some(binding) = released {
                if let Some(map) = map {
                    release(map, &binding);
                }
                removed += 1;
            }
        }
        removed
    }

    /// Drops every binding, unbinding natively when a map is given.
    pub fn clear(&self, map: Option<&dyn NativeObject>) -> usize {
        let bindings: Vec<Binding> = self.bindings.borrow_mut().drain(..).collect();
        if let Some(map) = map {
            for binding in &bindings {
                release(map, binding);
            }
        }
        bindings.len()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    /// Wrapper registered for (`native`, `handler`), if any.
    pub fn wrapper_for(&self, native: &str, handler: &EventHandler) -> Option<NativeListener> {
        self.bindings
            .borrow()
            .iter()
            .find(|b| b.native == native && b.handler.same(handler))
            .map(|b| b.wrapper.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::memory::MemoryMap;

    fn passthrough(handler: &EventHandler) -> impl Fn(&str, &str) -> NativeListener + '_ {
        move |canonical, native| {
            let handler = handler.clone();
            let (canonical, native) = (canonical.to_string(), native.to_string());
            NativeListener::new(move |args| {
                handler.call(&crate::input::events::MapEvent::native(
                    &canonical,
                    &native,
                    None,
                    args.to_vec(),
                ))
            })
        }
    }

    #[test]
    fn test_bind_fans_out_once() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let translator = EventTranslator::new();
        let handler = EventHandler::new(|_| {});

        assert_eq!(translator.bind(map.as_ref(), "mapmove", &handler, passthrough(&handler)), 2);
        assert_eq!(translator.bind(map.as_ref(), "mapmove", &handler, passthrough(&handler)), 0);
        assert_eq!(map.listener_count("movestart"), 1);
        assert_eq!(map.listener_count("moveend"), 1);
    }

    #[test]
    fn test_unbind_removes_the_wrapper() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let translator = EventTranslator::new();
        let handler = EventHandler::new(|_| {});
        translator.bind(map.as_ref(), "click", &handler, passthrough(&handler));
        let wrapper = translator.wrapper_for("click", &handler).unwrap();

        assert_eq!(translator.unbind(Some(map.as_ref()), "click", &handler), 1);
        assert_eq!(map.listener_count("click"), 0);
        let unbound = map.calls_to("un");
        assert_eq!(unbound.len(), 1);
        assert_eq!(unbound[0][1], NativeValue::from(wrapper.clone()));
        assert_eq!(map.released_listeners(), vec![wrapper.id()]);
    }

    #[test]
    fn test_failed_unbind_keeps_the_wrapper_alive() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let translator = EventTranslator::new();
        let handler = EventHandler::new(|_| {});
        translator.bind(map.as_ref(), "click", &handler, passthrough(&handler));
        for method in ["un", "off", "removeEventListener"] {
            map.disable_method(method);
        }

        assert_eq!(translator.unbind(Some(map.as_ref()), "click", &handler), 1);
        assert!(map.released_listeners().is_empty());
    }

    #[test]
    fn test_overlapping_names_are_refcounted() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let translator = EventTranslator::new();
        let handler = EventHandler::new(|_| {});
        translator.bind(map.as_ref(), "zoomchange", &handler, passthrough(&handler));
        translator.bind(map.as_ref(), "camerachange", &handler, passthrough(&handler));
        assert_eq!(map.listener_count("onZoomChanged"), 1);

        translator.unbind(Some(map.as_ref()), "zoomchange", &handler);
        assert_eq!(map.listener_count("onZoomChanged"), 1);

        translator.unbind(Some(map.as_ref()), "camerachange", &handler);
        assert_eq!(map.total_listeners(), 0);
        assert_eq!(translator.binding_count(), 0);
    }

    #[test]
    fn test_unbind_falls_back_to_off() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        map.disable_method("un");
        let translator = EventTranslator::new();
        let handler = EventHandler::new(|_| {});
        translator.bind(map.as_ref(), "click", &handler, passthrough(&handler));

        translator.unbind(Some(map.as_ref()), "click", &handler);
        assert_eq!(map.call_count("off"), 1);
        assert_eq!(map.listener_count("click"), 0);
    }

    #[test]
    fn test_clear_unbinds_everything() {
        let map = MemoryMap::new(NativeValue::Null, NativeValue::Undefined);
        let translator = EventTranslator::new();
        let a = EventHandler::new(|_| {});
        let b = EventHandler::new(|_| {});
        translator.bind(map.as_ref(), "click", &a, passthrough(&a));
        translator.bind(map.as_ref(), "mapmove", &b, passthrough(&b));

        assert_eq!(translator.clear(Some(map.as_ref())), 3);
        assert_eq!(map.total_listeners(), 0);
        assert_eq!(map.released_listeners().len(), 3);
    }
}
