//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String` and enums with explicit discriminants.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use mixpanel_core::error::ApiError;
use mixpanel_core::http::Endpoint;
use mixpanel_core::types::ProfileOperation;

/// Opaque handle to a `Client`. C callers receive a pointer to this and pass
/// it back into every FFI function.
pub struct FfiMixpanelClient {
    pub(crate) inner: mixpanel_core::Client,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Ingestion endpoint as a C enum.
#[repr(C)]
pub enum FfiEndpoint {
    Track = 0,
    Engage = 1,
}

impl From<Endpoint> for FfiEndpoint {
    fn from(e: Endpoint) -> Self {
        match e {
            Endpoint::Track => FfiEndpoint::Track,
            Endpoint::Engage => FfiEndpoint::Engage,
        }
    }
}

/// Profile operation selector for `mixpanel_build_engage`.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiProfileOperation {
    Set = 0,
    SetOnce = 1,
    Add = 2,
    Append = 3,
    Union = 4,
    Unset = 5,
    Delete = 6,
}

impl From<FfiProfileOperation> for ProfileOperation {
    fn from(op: FfiProfileOperation) -> Self {
        match op {
            FfiProfileOperation::Set => ProfileOperation::Set,
            FfiProfileOperation::SetOnce => ProfileOperation::SetOnce,
            FfiProfileOperation::Add => ProfileOperation::Add,
            FfiProfileOperation::Append => ProfileOperation::Append,
            FfiProfileOperation::Union => ProfileOperation::Union,
            FfiProfileOperation::Unset => ProfileOperation::Unset,
            FfiProfileOperation::Delete => ProfileOperation::Delete,
        }
    }
}

/// A GET request described as C-compatible plain data.
///
/// Built by `mixpanel_build_*` functions. The C caller issues a GET to `url`
/// and passes the response back through `mixpanel_parse_*`. `data` is the
/// base64 payload before percent-encoding, for hosts that assemble the query
/// string themselves.
#[repr(C)]
pub struct FfiHttpRequest {
    pub endpoint: FfiEndpoint,
    pub url: *mut c_char,
    pub data: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: mixpanel_core::HttpRequest) -> *mut Self {
        // base64 and percent-encoded text never contain NUL.
        let url = CString::new(req.url).unwrap_or_default().into_raw();
        let data = CString::new(req.data).unwrap_or_default().into_raw();
        Box::into_raw(Box::new(FfiHttpRequest {
            endpoint: req.endpoint.into(),
            url,
            data,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing the request,
/// then passes a pointer to a `mixpanel_parse_*` function. The FFI layer
/// reads but does not free these fields. A null `body` counts as empty.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    UnexpectedTrackResponse = 1,
    UnexpectedEngageResponse = 2,
    Serialization = 3,
    InvalidArgument = 4,
    /// Reserved. The C ABI never performs I/O, so no `mixpanel_*` function
    /// returns it today; it keeps `from_error` total over `ApiError`.
    Transport = 5,
    Panic = 6,
    NullArg = 7,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok` and `error_message` is null. On failure
/// `error_message` is a human-readable C string. `http_status` echoes the
/// status of the parsed response.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
}

impl FfiResult {
    pub(crate) fn ok(http_status: u16) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status,
        }))
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError, http_status: u16) -> *mut Self {
        let error_code = match &err {
            ApiError::UnexpectedTrackResponse { .. } => FfiErrorCode::UnexpectedTrackResponse,
            ApiError::UnexpectedEngageResponse { .. } => FfiErrorCode::UnexpectedEngageResponse,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::MissingToken | ApiError::EmptyEventName => FfiErrorCode::InvalidArgument,
            ApiError::Transport(_) => FfiErrorCode::Transport,
        };
        Self::error(error_code, &err.to_string(), http_status)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, &format!("null argument: {name}"), 0)
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg, 0)
    }

    fn error(error_code: FfiErrorCode, msg: &str, http_status: u16) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: CString::new(msg).unwrap_or_default().into_raw(),
            http_status,
        }))
    }
}
