//! C-ABI wrapper around `euromillions-core`.
//!
//! # Overview
//! Exposes the three grid operations through `extern "C"` functions so the
//! mobile shells can build and parse HTTP requests/responses without
//! linking to Rust's async runtime or serde directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `em_build_*` / `em_parse_*` mirrors the core API 1:1.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `em_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use euromillions_core::{ApiError, GridClient, HttpRequest, HttpResponse};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `GridClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs. The
/// URL itself is validated lazily: an unusable base makes every
/// `em_build_*` call return null. Call `em_client_validate` to get the
/// reason up front.
/// The caller must free the returned pointer with `em_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn em_client_new(base_url: *const c_char) -> *mut FfiGridClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = unsafe { CStr::from_ptr(base_url) }.to_string_lossy();
        let client = GridClient::new(&url);
        Box::into_raw(Box::new(FfiGridClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a `GridClient` created by `em_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn em_client_free(client: *mut FfiGridClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Check that the client's base URL can form requests.
///
/// Returns `Ok` with `data_tag = None`, `InvalidRequest` carrying the
/// reason, or `NullArg` when `client` is null.
/// The caller must free the returned pointer with `em_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn em_client_validate(client: *const FfiGridClient) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        // Every resource shares the base, so one build covers them all.
        match client.inner.build_fetch_history() {
            Ok(_) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in em_client_validate"))
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

fn build_with(
    client: *const FfiGridClient,
    build: fn(&GridClient) -> Result<HttpRequest, ApiError>,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match build(&client.inner) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request that asks the backend to refresh its draw history.
///
/// Returns null if `client` is null or its base URL is unusable.
/// The caller must free the returned pointer with `em_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn em_build_fetch_history(client: *const FfiGridClient) -> *mut FfiHttpRequest {
    build_with(client, GridClient::build_fetch_history)
}

/// Build the request that asks the backend for a fresh batch of grids.
///
/// Returns null if `client` is null or its base URL is unusable.
#[unsafe(no_mangle)]
pub extern "C" fn em_build_generate_grids(client: *const FfiGridClient) -> *mut FfiHttpRequest {
    build_with(client, GridClient::build_generate_grids)
}

/// Build the request that lists stored grids.
///
/// Returns null if `client` is null or its base URL is unusable.
#[unsafe(no_mangle)]
pub extern "C" fn em_build_fetch_grids(client: *const FfiGridClient) -> *mut FfiHttpRequest {
    build_with(client, GridClient::build_fetch_grids)
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
///
/// A null body is read as empty; invalid UTF-8 is replaced so decoding
/// reports it instead of silently dropping the body.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse::new(resp.status, body)
}

fn parse_with(
    name: &str,
    client: *const FfiGridClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&GridClient, HttpResponse) -> *mut FfiResult,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        parse(&client.inner, ffi_response_to_core(resp))
    }))
    .unwrap_or_else(|_| FfiResult::panic(&format!("panic in {name}")))
}

/// Parse the response to a history refresh.
///
/// Returns a result with `data_tag = Text` on success; `data` is the
/// backend's message verbatim.
#[unsafe(no_mangle)]
pub extern "C" fn em_parse_fetch_history(
    client: *const FfiGridClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("em_parse_fetch_history", client, response, |client, resp| {
        match client.parse_fetch_history(resp) {
            Ok(text) => FfiResult::ok_text(text),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse the response to a generation request.
///
/// Returns a result with `data_tag = NewGridList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn em_parse_generate_grids(
    client: *const FfiGridClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("em_parse_generate_grids", client, response, |client, resp| {
        match client.parse_generate_grids(resp) {
            Ok(grids) => FfiResult::ok_new_grids(grids),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse the response to a grid listing.
///
/// Returns a result with `data_tag = GridList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn em_parse_fetch_grids(
    client: *const FfiGridClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("em_parse_fetch_grids", client, response, |client, resp| {
        match client.parse_fetch_grids(resp) {
            Ok(grids) => FfiResult::ok_grids(grids),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `em_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn em_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        unsafe {
            free_c_string(req.url);
            for h in reclaim_slice(req.headers, req.headers_len) {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by any `em_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn em_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe { free_c_string(result.error_message) };
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Text => unsafe { free_c_string(result.data as *mut c_char) },
            FfiDataTag::NewGridList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiNewGridList) };
                for item in unsafe { reclaim_slice(list.items, list.len) } {
                    unsafe { item.free_fields() };
                }
            }
            FfiDataTag::GridList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiGridList) };
                for item in unsafe { reclaim_slice(list.items, list.len) } {
                    unsafe { item.free_fields() };
                }
            }
            FfiDataTag::None => {}
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn em_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| unsafe { free_c_string(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
