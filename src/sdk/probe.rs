//! Ranked capability probes.
//!
//! Each operation that the SDK may implement in several ways (or not at all)
//! is described by a `Probe`: an ordered candidate list evaluated against the
//! live object at call time. The first available candidate wins.

use crate::sdk::value::{NativeError, NativeObject, NativeResult, NativeValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// `target.method(...)`
    Method(&'static str),
    /// `new target[name](...)`
    Constructor(&'static str),
    /// `target[namespace].method(...)`
    Namespaced {
        namespace: &'static str,
        method: &'static str,
    },
}

impl Candidate {
    pub fn name(&self) -> &'static str {
        match self {
            Candidate::Method(name) | Candidate::Constructor(name) => name,
            Candidate::Namespaced { method, .. } => method,
        }
    }

    pub fn is_available(&self, target: &dyn NativeObject) -> bool {
        match self {
            Candidate::Method(name) | Candidate::Constructor(name) => target.has_method(name),
            Candidate::Namespaced { namespace, method } => target
                .get(namespace)
                .map_or(false, |ns| ns.has_method(method)),
        }
    }

    pub fn invoke(&self, target: &dyn NativeObject, args: &[NativeValue]) -> NativeResult<NativeValue> {
        match self {
            Candidate::Method(name) => target.call(name, args),
            Candidate::Constructor(name) => target.construct(name, args),
            Candidate::Namespaced { namespace, method } => match target.get(namespace) {
                Some(ns) => ns.call(method, args),
                None => Err(NativeError::Unsupported(format!("{namespace}.{method}"))),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub operation: &'static str,
    pub candidates: &'static [Candidate],
}

impl Probe {
    pub const fn new(operation: &'static str, candidates: &'static [Candidate]) -> Self {
        Self {
            operation,
            candidates,
        }
    }

    /// First available candidate.
    pub fn resolve(&self, target: &dyn NativeObject) -> Option<Candidate> {
        self.resolve_where(target, |_| true)
    }

    /// First available candidate that also satisfies `accept`.
    pub fn resolve_where(
        &self,
        target: &dyn NativeObject,
        accept: impl Fn(Candidate) -> bool,
    ) -> Option<Candidate> {
        self.candidates
            .iter()
            .copied()
            .find(|candidate| candidate.is_available(target) && accept(*candidate))
    }

    /// Every available candidate, in rank order.
    pub fn available<'a>(&self, target: &'a dyn NativeObject) -> impl Iterator<Item = Candidate> + 'a {
        self.candidates
            .iter()
            .copied()
            .filter(move |candidate| candidate.is_available(target))
    }

    /// Invokes the winning candidate. `None` when nothing is available.
    pub fn invoke(&self, target: &dyn NativeObject, args: &[NativeValue]) -> Option<NativeResult<NativeValue>> {
        let candidate = self.resolve(target)?;
        log::trace!("{} via {}", self.operation, candidate.name());
        Some(candidate.invoke(target, args))
    }
}

/// Lat/lng value construction, args `(lat, lng)`.
pub const LAT_LNG: Probe = Probe::new(
    "createLatLng",
    &[
        Candidate::Constructor("LatLng"),
        Candidate::Constructor("HWLatLng"),
        Candidate::Namespaced {
            namespace: "HWMapUtils",
            method: "createLatLng",
        },
    ],
);

/// Bounds construction, args `(southWest, northEast)`.
pub const LAT_LNG_BOUNDS: Probe = Probe::new("createBounds", &[Candidate::Constructor("LatLngBounds")]);

/// Camera fitting, in descending preference.
pub const FIT_BOUNDS: Probe = Probe::new(
    "fitBounds",
    &[
        Candidate::Method("fitBounds"),
        Candidate::Method("panToBounds"),
        Candidate::Method("setFitView"),
    ],
);

pub const SET_STYLE: Probe = Probe::new(
    "setMapStyle",
    &[
        Candidate::Method("setPresetStyleId"),
        Candidate::Method("setStyleId"),
        Candidate::Method("setStyle"),
    ],
);

pub const BIND_LISTENER: Probe = Probe::new(
    "bindListener",
    &[Candidate::Method("on"), Candidate::Method("addEventListener")],
);

pub const UNBIND_LISTENER: Probe = Probe::new(
    "unbindListener",
    &[
        Candidate::Method("un"),
        Candidate::Method("off"),
        Candidate::Method("removeEventListener"),
    ],
);

pub const GET_PITCH: Probe = Probe::new(
    "getPitch",
    &[Candidate::Method("getPitch"), Candidate::Method("getTilt")],
);

pub const SET_PITCH: Probe = Probe::new(
    "setPitch",
    &[Candidate::Method("setPitch"), Candidate::Method("setTilt")],
);

/// Projected coordinate → lat/lng.
pub const EPSG_TO_LAT_LNG: Probe = Probe::new(
    "epsgToLatLng",
    &[Candidate::Namespaced {
        namespace: "HWMapUtils",
        method: "epsgToLatLng",
    }],
);

/// Zoom affordances toggled by `zoomEnable`; all available ones are called.
pub const ZOOM_AFFORDANCES: Probe = Probe::new(
    "zoomEnable",
    &[
        Candidate::Method("setZoomControl"),
        Candidate::Method("setZoomSlider"),
    ],
);

/// Built-in controls switched off once the map is ready.
pub const BUILTIN_CONTROLS: Probe = Probe::new(
    "builtinControls",
    &[
        Candidate::Method("setNavigationControl"),
        Candidate::Method("setZoomControl"),
        Candidate::Method("setRotateControl"),
        Candidate::Method("setScaleControl"),
        Candidate::Method("setLocationControl"),
        Candidate::Method("setCopyrightControl"),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Partial {
        methods: &'static [&'static str],
        calls: RefCell<Vec<String>>,
    }

    impl NativeObject for Partial {
        fn get(&self, _key: &str) -> Option<NativeValue> {
            None
        }

        fn has_method(&self, name: &str) -> bool {
            self.methods.contains(&name)
        }

        fn call(&self, name: &str, _args: &[NativeValue]) -> NativeResult<NativeValue> {
            self.calls.borrow_mut().push(name.to_string());
            Ok(NativeValue::Undefined)
        }
    }

    fn partial(methods: &'static [&'static str]) -> Partial {
        Partial {
            methods,
            calls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_resolve_prefers_rank_order() {
        let target = partial(&["setFitView", "panToBounds"]);
        assert_eq!(FIT_BOUNDS.resolve(&target), Some(Candidate::Method("panToBounds")));

        let target = partial(&["setStyle"]);
        assert_eq!(SET_STYLE.resolve(&target), Some(Candidate::Method("setStyle")));
    }

    #[test]
    fn test_resolve_where_skips_rejected() {
        let target = partial(&["fitBounds", "setFitView"]);
        let chosen = FIT_BOUNDS.resolve_where(&target, |c| c.name() != "fitBounds");
        assert_eq!(chosen, Some(Candidate::Method("setFitView")));
    }

    #[test]
    fn test_invoke_calls_only_winner() {
        let target = partial(&["un", "off"]);
        assert!(UNBIND_LISTENER.invoke(&target, &[]).is_some());
        assert_eq!(*target.calls.borrow(), vec!["un".to_string()]);

        let bare = partial(&[]);
        assert!(UNBIND_LISTENER.invoke(&bare, &[]).is_none());
    }

    #[test]
    fn test_available_lists_all_in_order() {
        let target = partial(&["setZoomSlider", "setZoomControl"]);
        let names: Vec<_> = ZOOM_AFFORDANCES.available(&target).map(|c| c.name()).collect();
        assert_eq!(names, vec!["setZoomControl", "setZoomSlider"]);
    }

    #[test]
    fn test_namespaced_requires_namespace() {
        let target = partial(&["createLatLng"]);
        assert_eq!(LAT_LNG.resolve(&target), None);
    }
}
