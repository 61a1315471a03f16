//! C-ABI wrapper around `mixpanel-core`.
//!
//! # Overview
//! Exposes request building and response interpretation through `extern "C"`
//! functions so any language with a C FFI can talk to Mixpanel without
//! linking an HTTP stack into Rust. The host performs the GET itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `build_*` / `parse_*` mirror the core `Client` API 1:1. Properties and
//!   profile values cross the boundary as JSON text.
//! - The C caller owns all returned pointers and must call the matching
//!   `mixpanel_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use mixpanel_core::http::HttpResponse;
use mixpanel_core::types::{ProfileUpdate, Properties};
use mixpanel_core::Client;
use serde_json::Value;

use types::*;

/// Borrow a C string as `&str`. `None` for null or invalid UTF-8.
fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Borrow an optional C string. Null is `Ok(None)`; a non-null pointer that
/// is not UTF-8 is `Err(())` so callers never silently drop the argument.
fn read_optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, ()> {
    if ptr.is_null() {
        return Ok(None);
    }
    read_str(ptr).map(Some).ok_or(())
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client for project `token`.
///
/// `base_url` and `override_ip` may be null; a null `base_url` selects the
/// public Mixpanel host. Returns null if `token` is null or empty, if
/// `base_url` or `override_ip` is non-null but not UTF-8, or if an internal
/// panic occurs. Free the result with `mixpanel_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_client_new(
    token: *const c_char,
    base_url: *const c_char,
    override_ip: *const c_char,
) -> *mut FfiMixpanelClient {
    catch_unwind(|| {
        let Some(token) = read_str(token) else {
            return std::ptr::null_mut();
        };
        let (Ok(base_url), Ok(override_ip)) =
            (read_optional_str(base_url), read_optional_str(override_ip))
        else {
            return std::ptr::null_mut();
        };
        let mut builder = Client::builder(token);
        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }
        if let Some(ip) = override_ip {
            builder = builder.override_ip(ip);
        }
        match builder.build() {
            Ok(client) => Box::into_raw(Box::new(FfiMixpanelClient { inner: client })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `mixpanel_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_client_free(client: *mut FfiMixpanelClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build a track request for `event`.
///
/// `properties_json` must be a JSON object, or null for no properties.
/// Returns null if `client` or `event` is null, if `event` is empty, or if
/// `properties_json` is not a JSON object.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_build_track(
    client: *const FfiMixpanelClient,
    event: *const c_char,
    properties_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(event) = read_str(event) else {
            return std::ptr::null_mut();
        };
        let properties = if properties_json.is_null() {
            Properties::new()
        } else {
            let parsed = read_str(properties_json).map(serde_json::from_str::<Properties>);
            match parsed {
                Some(Ok(p)) => p,
                _ => return std::ptr::null_mut(),
            }
        };
        match client.inner.build_track(event, &properties) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the `$create_alias` track request linking `old_id` to `new_id`.
///
/// Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_build_alias(
    client: *const FfiMixpanelClient,
    old_id: *const c_char,
    new_id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let (Some(old_id), Some(new_id)) = (read_str(old_id), read_str(new_id)) else {
            return std::ptr::null_mut();
        };
        match client.inner.build_alias(old_id, new_id) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an engage request applying `operation` to `distinct_id`.
///
/// `value_json` must match the operation: an object for set/set-once/append/
/// union, an object of integers for add, an array of strings for unset. It is
/// ignored (and may be null) for delete. Returns null on null arguments or a
/// value of the wrong shape.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_build_engage(
    client: *const FfiMixpanelClient,
    distinct_id: *const c_char,
    operation: FfiProfileOperation,
    value_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(distinct_id) = read_str(distinct_id) else {
            return std::ptr::null_mut();
        };
        let value = if value_json.is_null() {
            Value::Null
        } else {
            match read_str(value_json).map(serde_json::from_str::<Value>) {
                Some(Ok(v)) => v,
                _ => return std::ptr::null_mut(),
            }
        };
        let update = match ProfileUpdate::from_json(operation.into(), value) {
            Ok(u) => u,
            Err(_) => return std::ptr::null_mut(),
        };
        match client.inner.build_engage(distinct_id, &update) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body or one
/// that is not UTF-8 becomes the empty string, which never counts as success.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        body: read_str(resp.body).unwrap_or("").to_string(),
    }
}

/// Interpret the response to a track (or alias) request.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_parse_track(
    client: *const FfiMixpanelClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let status = resp.status;
        match client.inner.parse_track(ffi_response_to_core(resp)) {
            Ok(()) => FfiResult::ok(status),
            Err(e) => FfiResult::from_error(e, status),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in mixpanel_parse_track"))
}

/// Interpret the response to an engage request.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_parse_engage(
    client: *const FfiMixpanelClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let status = resp.status;
        match client.inner.parse_engage(ffi_response_to_core(resp)) {
            Ok(()) => FfiResult::ok(status),
            Err(e) => FfiResult::from_error(e, status),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in mixpanel_parse_engage"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `mixpanel_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.data.is_null() {
            drop(unsafe { CString::from_raw(req.data) });
        }
    });
}

/// Free an `FfiResult` returned by any `mixpanel_parse_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn mixpanel_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
