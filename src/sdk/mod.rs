//! Bindings to the native Petal Maps SDK: dynamic values, capability probes,
//! the script loader and an in-memory SDK for headless use.

pub mod loader;
pub mod memory;
pub mod probe;
pub mod value;

pub use loader::{
    LoaderError, LoaderOptions, LoaderResult, LoaderStatus, ScriptHost, SdkHandle, SdkLoader,
    SdkSource,
};
pub use probe::{Candidate, Probe};
pub use value::{
    coerce_number, NativeError, NativeListener, NativeObject, NativeObjectExt, NativeResult,
    NativeValue,
};
