//! Coordinate normalization between SDK-native shapes and [`GeoPoint`].
//!
//! Native points arrive as `LatLng` objects with `lng()`/`lat()` accessors,
//! plain `{lng, lat}` or `{longitude, latitude}` records, `[lng, lat]` arrays
//! or `{x, y}` records. Anything else (or nothing) maps to
//! [`DEFAULT_CENTER`](crate::core::constants::DEFAULT_CENTER) so that callers
//! always get a usable point.

use crate::core::geo::{Bounds, GeoPoint};
use crate::sdk::probe::{EPSG_TO_LAT_LNG, LAT_LNG, LAT_LNG_BOUNDS};
use crate::sdk::value::{coerce_number, NativeObject, NativeValue};

fn pair(value: &NativeValue, lng_key: &str, lat_key: &str) -> Option<GeoPoint> {
    if !(value.has_field(lng_key) && value.has_field(lat_key)) {
        return None;
    }
    let lng = value.field(lng_key).unwrap_or_default();
    let lat = value.field(lat_key).unwrap_or_default();
    Some(GeoPoint::new(coerce_number(&lng), coerce_number(&lat)))
}

/// Recognised point shapes in priority order; `None` for anything else.
pub fn try_normalize(value: &NativeValue) -> Option<GeoPoint> {
    if value.has_method("lng") && value.has_method("lat") {
        let lng = value.call("lng", &[]).unwrap_or_default();
        let lat = value.call("lat", &[]).unwrap_or_default();
        return Some(GeoPoint::new(coerce_number(&lng), coerce_number(&lat)));
    }
    if let Some(point) = pair(value, "lng", "lat") {
        return Some(point);
    }
    if let Some(point) = pair(value, "longitude", "latitude") {
        return Some(point);
    }
    if let Some([lng, lat, ..]) = value.as_array() {
        return Some(GeoPoint::new(coerce_number(lng), coerce_number(lat)));
    }
    pair(value, "x", "y")
}

/// Canonical point for any native value. Never fails.
pub fn normalize(value: Option<&NativeValue>) -> GeoPoint {
    value
        .filter(|value| !value.is_nullish())
        .and_then(try_normalize)
        .unwrap_or_default()
}

/// The SDK's own lat/lng value for `point`, or a plain `{lng, lat}` record
/// when the SDK exposes no lat/lng factory.
pub fn denormalize(sdk: Option<&dyn NativeObject>, point: GeoPoint) -> NativeValue {
    let args = [NativeValue::from(point.lat), NativeValue::from(point.lng)];
    match sdk.and_then(|sdk| LAT_LNG.invoke(sdk, &args)) {
        Some(Ok(value)) if !value.is_nullish() => value,
        Some(Err(err)) => {
            log::debug!("lat/lng construction failed, using a plain record: {err}");
            plain_record(point)
        }
        _ => plain_record(point),
    }
}

fn plain_record(point: GeoPoint) -> NativeValue {
    NativeValue::record([("lng", point.lng.into()), ("lat", point.lat.into())])
}

/// The SDK's bounds object, if it can build one.
pub fn denormalize_bounds(sdk: Option<&dyn NativeObject>, bounds: &Bounds) -> Option<NativeValue> {
    let sdk = sdk?;
    LAT_LNG_BOUNDS.resolve(sdk)?;
    let args = [
        denormalize(Some(sdk), bounds.south_west),
        denormalize(Some(sdk), bounds.north_east),
    ];
    match LAT_LNG_BOUNDS.invoke(sdk, &args)? {
        Ok(value) if !value.is_nullish() => Some(value),
        Ok(_) => None,
        Err(err) => {
            log::debug!("bounds construction failed: {err}");
            None
        }
    }
}

/// Bounds from a native value. Accessor objects win over arrays; anything
/// else collapses to `fallback`.
pub fn normalize_bounds(value: &NativeValue, fallback: GeoPoint) -> Bounds {
    if value.has_method("getSouthWest") && value.has_method("getNorthEast") {
        let south_west = value.call("getSouthWest", &[]).ok();
        let north_east = value.call("getNorthEast", &[]).ok();
        return Bounds::new(normalize(south_west.as_ref()), normalize(north_east.as_ref()));
    }
    if let Some([south_west, north_east, ..]) = value.as_array() {
        return Bounds::new(normalize(Some(south_west)), normalize(Some(north_east)));
    }
    Bounds::from_point(fallback)
}

fn truthy(value: &NativeValue) -> bool {
    match value {
        NativeValue::Undefined | NativeValue::Null => false,
        NativeValue::Bool(b) => *b,
        NativeValue::Number(n) => *n != 0.0 && !n.is_nan(),
        NativeValue::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn truthy_field(event: &NativeValue, key: &str) -> Option<NativeValue> {
    event.field(key).filter(truthy)
}

/// Best-effort position of a native event: `latLng`, then `position`, then a
/// projected `coordinate` (when the SDK can reverse-project it), then a screen
/// `pixel`, then the map center.
pub fn extract_event_lng_lat(
    event: &NativeValue,
    sdk: Option<&dyn NativeObject>,
    map: Option<&dyn NativeObject>,
) -> GeoPoint {
    if event.is_nullish() {
        return GeoPoint::default();
    }
    if let Some(lat_lng) = truthy_field(event, "latLng") {
        return normalize(Some(&lat_lng));
    }
    if let Some(position) = truthy_field(event, "position") {
        return normalize(Some(&position));
    }
    if let (Some(coordinate), Some(sdk)) = (truthy_field(event, "coordinate"), sdk) {
        if let Some(Ok(projected)) = EPSG_TO_LAT_LNG.invoke(sdk, &[coordinate]) {
            return normalize(Some(&projected));
        }
    }
    if let (Some(pixel), Some(map)) = (truthy_field(event, "pixel"), map) {
        if let Ok(result) = map.call("fromScreenLocation", &[pixel]) {
            if truthy(&result) {
                return normalize(Some(&result));
            }
        }
    }
    let center = map.and_then(|map| map.call("getCenter", &[]).ok());
    normalize(center.as_ref())
}

/// Position carried by an event payload, honouring a `lngLat`/`lnglat` the
/// SDK already put there. `None` for payloads that are not objects.
pub fn event_lng_lat(
    event: &NativeValue,
    sdk: Option<&dyn NativeObject>,
    map: Option<&dyn NativeObject>,
) -> Option<GeoPoint> {
    if !event.is_object_like() {
        return None;
    }
    let existing = truthy_field(event, "lngLat").or_else(|| truthy_field(event, "lnglat"));
    Some(match existing {
        Some(lng_lat) => normalize(Some(&lng_lat)),
        None => extract_event_lng_lat(event, sdk, map),
    })
}

/// Fills in missing `lngLat`/`lnglat` fields on plain payload records.
/// Native handles are returned untouched.
pub fn with_lng_lat(event: NativeValue, point: GeoPoint) -> NativeValue {
    match event {
        NativeValue::Record(mut fields) => {
            let lng_lat = fields
                .get("lngLat")
                .filter(|value| truthy(value))
                .cloned()
                .unwrap_or_else(|| plain_record(point));
            if !fields.get("lngLat").map_or(false, truthy) {
                fields.insert("lngLat".to_string(), lng_lat.clone());
            }
            if !fields.get("lnglat").map_or(false, truthy) {
                fields.insert("lnglat".to_string(), lng_lat);
            }
            NativeValue::Record(fields)
        }
        other => other,
    }
}
