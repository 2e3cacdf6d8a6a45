use crate::input::events::MapEvent;
use crate::prelude::HashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Event listener callback. Two handlers are equal only if they are clones
/// of the same registration, which is what `off` matches on.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&MapEvent)>);

impl EventHandler {
    pub fn new(f: impl Fn(&MapEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &MapEvent) {
        (self.0)(event)
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn same(&self, other: &EventHandler) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:#x})", self.id())
    }
}

/// Event management for service-synthesized events
#[derive(Default)]
pub struct EventEmitter {
    /// Event listeners by event type
    listeners: RefCell<HashMap<String, Vec<EventHandler>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on(&self, event_type: &str, handler: EventHandler) {
        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    /// Removes one registration of `handler`. Returns whether one was found.
    pub fn off(&self, event_type: &str, handler: &EventHandler) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(handlers) = listeners.get_mut(event_type) else {
            return false;
        };
        let Some(index) = handlers.iter().position(|h| h.same(handler)) else {
            return false;
        };
        handlers.remove(index);
        if handlers.is_empty() {
            listeners.remove(event_type);
        }
        true
    }

    /// Dispatches to every listener of `event.kind`. Handlers may register or
    /// remove listeners while being called; changes apply to the next emit.
    pub fn emit(&self, event: &MapEvent) -> usize {
        let handlers = self
            .listeners
            .borrow()
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    pub fn remove_all_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .borrow()
            .get(event_type)
            .map_or(0, |handlers| handlers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::events::ServiceEvent;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_registered_handlers() {
        let emitter = EventEmitter::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        emitter.on("mapload", EventHandler::new(move |_| h.set(h.get() + 1)));

        assert_eq!(emitter.emit(&MapEvent::service(ServiceEvent::MapLoad)), 1);
        assert_eq!(emitter.emit(&MapEvent::service(ServiceEvent::MapChange)), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_off_removes_by_identity() {
        let emitter = EventEmitter::new();
        let a = EventHandler::new(|_| {});
        let b = EventHandler::new(|_| {});
        emitter.on("mapchange", a.clone());
        emitter.on("mapchange", b.clone());

        assert!(emitter.off("mapchange", &a));
        assert!(!emitter.off("mapchange", &a));
        assert_eq!(emitter.listener_count("mapchange"), 1);

        assert!(emitter.off("mapchange", &b));
        assert_eq!(emitter.listener_count("mapchange"), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_during_emit() {
        let emitter = Rc::new(EventEmitter::new());
        let slot: Rc<RefCell<Option<EventHandler>>> = Rc::new(RefCell::new(None));
        let (e, s) = (Rc::clone(&emitter), Rc::clone(&slot));
        let handler = EventHandler::new(move |_| {
            if let Some(me) = s.borrow().as_ref() {
                e.off("mapchange", me);
            }
        });
        *slot.borrow_mut() = Some(handler.clone());
        emitter.on("mapchange", handler);

        assert_eq!(emitter.emit(&MapEvent::service(ServiceEvent::MapChange)), 1);
        assert_eq!(emitter.listener_count("mapchange"), 0);
    }

    #[test]
    fn test_remove_all() {
        let emitter = EventEmitter::new();
        emitter.on("mapload", EventHandler::new(|_| {}));
        emitter.on("mapchange", EventHandler::new(|_| {}));
        emitter.remove_all_listeners();
        assert_eq!(emitter.listener_count("mapload"), 0);
        assert_eq!(emitter.listener_count("mapchange"), 0);
    }
}
