//! Dynamic values exchanged with the native SDK.
//!
//! The Petal SDK is a duck-typed JS API: any method may be missing and any
//! value may arrive in one of several shapes. `NativeValue` models those
//! values, `NativeObject` models anything with properties and methods, and
//! `NativeListener` models a callback whose identity the SDK tracks.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type NativeResult<T> = std::result::Result<T, NativeError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    #[error("native method `{0}` is not available")]
    Unsupported(String),

    #[error("native call `{method}` failed: {message}")]
    Thrown { method: String, message: String },
}

impl NativeError {
    pub fn thrown(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Thrown {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Anything the SDK hands out that has properties and methods: the SDK
/// namespace, the map, lat/lng objects, bounds, DOM nodes.
pub trait NativeObject {
    /// Reads a property. `None` when the property does not exist.
    fn get(&self, key: &str) -> Option<NativeValue>;

    /// True when `name` resolves to something callable.
    fn has_method(&self, name: &str) -> bool;

    /// Calls method `name`. Missing methods yield [`NativeError::Unsupported`].
    fn call(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue>;

    /// `new this[name](...args)`
    fn construct(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        let _ = args;
        Err(NativeError::Unsupported(name.to_string()))
    }

    /// Downcasting hook for platform bindings that need the concrete handle.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    /// Called once `listener` has been unbound from this object for good.
    /// Bindings that keep per-listener resources drop them here.
    fn release_listener(&self, listener: &NativeListener) {
        let _ = listener;
    }
}

/// Feature-detected calls.
pub trait NativeObjectExt {
    /// Calls `name` only if it exists; native errors are swallowed and logged.
    fn call_optional(&self, name: &str, args: &[NativeValue]) -> Option<NativeValue>;
}

impl<T: NativeObject + ?Sized> NativeObjectExt for T {
    fn call_optional(&self, name: &str, args: &[NativeValue]) -> Option<NativeValue> {
        if !self.has_method(name) {
            return None;
        }
        match self.call(name, args) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!("ignoring failed optional call: {err}");
                None
            }
        }
    }
}

/// Callback registered with the SDK. Two listeners are the same listener only
/// if they share the same allocation.
#[derive(Clone)]
pub struct NativeListener(Rc<dyn Fn(&[NativeValue])>);

impl NativeListener {
    pub fn new(f: impl Fn(&[NativeValue]) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn invoke(&self, args: &[NativeValue]) {
        (self.0)(args)
    }

    /// Address-based identity.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn same(&self, other: &NativeListener) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for NativeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeListener({:#x})", self.id())
    }
}

#[derive(Clone, Default)]
pub enum NativeValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<NativeValue>),
    /// Plain data object
    Record(BTreeMap<String, NativeValue>),
    /// Native handle with methods
    Object(Rc<dyn NativeObject>),
    Function(NativeListener),
}

impl NativeValue {
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, NativeValue)>) -> Self {
        NativeValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn object(object: impl NativeObject + 'static) -> Self {
        NativeValue::Object(Rc::new(object))
    }

    /// `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, NativeValue::Undefined | NativeValue::Null)
    }

    /// Records and native handles, the things that carry named fields.
    pub fn is_object_like(&self) -> bool {
        matches!(self, NativeValue::Record(_) | NativeValue::Object(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            NativeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<dyn NativeObject>> {
        match self {
            NativeValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_listener(&self) -> Option<&NativeListener> {
        match self {
            NativeValue::Function(listener) => Some(listener),
            _ => None,
        }
    }

    /// Property lookup across records and native handles.
    pub fn field(&self, key: &str) -> Option<NativeValue> {
        match self {
            NativeValue::Record(fields) => fields.get(key).cloned(),
            NativeValue::Object(object) => object.get(key),
            _ => None,
        }
    }

    /// JS `key in value`
    pub fn has_field(&self, key: &str) -> bool {
        match self {
            NativeValue::Record(fields) => fields.contains_key(key),
            NativeValue::Object(object) => object.get(key).is_some(),
            _ => false,
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        match self {
            NativeValue::Object(object) => object.has_method(name),
            _ => false,
        }
    }

    pub fn call(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        match self {
            NativeValue::Object(object) => object.call(name, args),
            _ => Err(NativeError::Unsupported(name.to_string())),
        }
    }
}

/// `Number(value) || 0`: never fails, NaN becomes 0.
pub fn coerce_number(value: &NativeValue) -> f64 {
    let n = match value {
        NativeValue::Number(n) => *n,
        NativeValue::Bool(b) => f64::from(u8::from(*b)),
        NativeValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        NativeValue::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce_number(single),
            _ => f64::NAN,
        },
        _ => f64::NAN,
    };
    if n.is_nan() {
        0.0
    } else {
        n
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Undefined => write!(f, "undefined"),
            NativeValue::Null => write!(f, "null"),
            NativeValue::Bool(b) => write!(f, "{b}"),
            NativeValue::Number(n) => write!(f, "{n}"),
            NativeValue::String(s) => write!(f, "{s:?}"),
            NativeValue::Array(items) => f.debug_list().entries(items).finish(),
            NativeValue::Record(fields) => f.debug_map().entries(fields).finish(),
            NativeValue::Object(object) => write!(f, "Object({:p})", Rc::as_ptr(object)),
            NativeValue::Function(listener) => fmt::Debug::fmt(listener, f),
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Undefined, NativeValue::Undefined) => true,
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
            (NativeValue::Number(a), NativeValue::Number(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Array(a), NativeValue::Array(b)) => a == b,
            (NativeValue::Record(a), NativeValue::Record(b)) => a == b,
            (NativeValue::Object(a), NativeValue::Object(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (NativeValue::Function(a), NativeValue::Function(b)) => a.same(b),
            _ => false,
        }
    }
}

impl From<f64> for NativeValue {
    fn from(n: f64) -> Self {
        NativeValue::Number(n)
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        NativeValue::Bool(b)
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::String(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        NativeValue::String(s)
    }
}

impl From<Vec<NativeValue>> for NativeValue {
    fn from(items: Vec<NativeValue>) -> Self {
        NativeValue::Array(items)
    }
}

impl From<NativeListener> for NativeValue {
    fn from(listener: NativeListener) -> Self {
        NativeValue::Function(listener)
    }
}

impl From<Rc<dyn NativeObject>> for NativeValue {
    fn from(object: Rc<dyn NativeObject>) -> Self {
        NativeValue::Object(object)
    }
}

impl From<serde_json::Value> for NativeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => NativeValue::Null,
            Value::Bool(b) => NativeValue::Bool(b),
            Value::Number(n) => NativeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => NativeValue::String(s),
            Value::Array(items) => NativeValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => {
                NativeValue::Record(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
