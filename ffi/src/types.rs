//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`,
//! and tagged enums with explicit discriminants. Dates cross as ISO-8601
//! strings so each platform parses them with its own date library.
//! Arrays are handed out as boxed slices and reclaimed with the same length.

use std::ffi::CString;
use std::os::raw::c_char;

use euromillions_core::dates::{format_calendar_date, format_timestamp};
use euromillions_core::{ApiError, Grid, GridClient, HttpMethod, HttpRequest, NewGrid};

/// Opaque handle to a `GridClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiGridClient {
    pub(crate) inner: GridClient,
}

// ---------------------------------------------------------------------------
// Allocation helpers
// ---------------------------------------------------------------------------

/// Hand a string to C. Interior NULs are dropped rather than failing.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let mut s: String = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

/// Free a string produced by `c_string`. Null is ignored.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Lengths cross the boundary as `u32`; anything longer is capped.
pub(crate) fn c_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Hand a vector to C as pointer + length. Empty vectors become null.
/// Items past `u32::MAX` are dropped so pointer and length always agree.
pub(crate) fn leak_slice<T>(mut items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = c_len(items.len());
    items.truncate(len as usize);
    let ptr = Box::into_raw(items.into_boxed_slice()) as *mut T;
    (ptr, len)
}

/// Reclaim a slice produced by `leak_slice`.
pub(crate) unsafe fn reclaim_slice<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `em_build_*` functions. The C caller executes the request
/// and passes the response back through `em_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let (headers, headers_len) = leak_slice(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request and passes a
/// pointer to an `em_parse_*` function. The FFI layer reads but does not
/// free these fields. A `status` of 0 means no status was available; a null
/// `body` is treated as empty.
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
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    /// The base URL cannot form a request. See `em_client_validate`.
    InvalidRequest = 1,
    /// Never produced by `em_parse_*`: the host owns the round-trip and
    /// reports its own network failures, timeouts and cancellations with
    /// this code.
    Transport = 2,
    /// Non-2xx status; `http_status` is 0 when the host had none.
    Server = 3,
    Decoding = 4,
    Panic = 5,
    NullArg = 6,
}

/// Tag that tells `em_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a NUL-terminated `char*`.
    Text = 1,
    NewGridList = 2,
    GridList = 3,
}

/// A generated grid exposed to C. `draw_date` is `YYYY-MM-DD`.
#[repr(C)]
pub struct FfiNewGrid {
    pub draw_date: *mut c_char,
    pub numbers: *mut u32,
    pub numbers_len: u32,
    pub stars: *mut u32,
    pub stars_len: u32,
}

/// A stored grid exposed to C. `created_at` is null when absent.
#[repr(C)]
pub struct FfiGrid {
    pub id: i64,
    pub draw_date: *mut c_char,
    pub numbers: *mut u32,
    pub numbers_len: u32,
    pub stars: *mut u32,
    pub stars_len: u32,
    pub created_at: *mut c_char,
}

#[repr(C)]
pub struct FfiNewGridList {
    pub items: *mut FfiNewGrid,
    pub len: u32,
}

#[repr(C)]
pub struct FfiGridList {
    pub items: *mut FfiGrid,
    pub len: u32,
}

impl From<NewGrid> for FfiNewGrid {
    fn from(grid: NewGrid) -> Self {
        let (numbers, numbers_len) = leak_slice(grid.numbers);
        let (stars, stars_len) = leak_slice(grid.stars);
        FfiNewGrid {
            draw_date: c_string(format_calendar_date(grid.draw_date)),
            numbers,
            numbers_len,
            stars,
            stars_len,
        }
    }
}

impl From<Grid> for FfiGrid {
    fn from(grid: Grid) -> Self {
        let (numbers, numbers_len) = leak_slice(grid.numbers);
        let (stars, stars_len) = leak_slice(grid.stars);
        FfiGrid {
            id: grid.id,
            draw_date: c_string(format_calendar_date(grid.draw_date)),
            numbers,
            numbers_len,
            stars,
            stars_len,
            created_at: grid
                .created_at
                .map(|ts| c_string(format_timestamp(ts)))
                .unwrap_or(std::ptr::null_mut()),
        }
    }
}

impl FfiNewGrid {
    /// Free the owned fields (but not the struct itself).
    pub(crate) unsafe fn free_fields(self) {
        unsafe {
            free_c_string(self.draw_date);
            drop(reclaim_slice(self.numbers, self.numbers_len));
            drop(reclaim_slice(self.stars, self.stars_len));
        }
    }
}

impl FfiGrid {
    /// Free the owned fields (but not the struct itself).
    pub(crate) unsafe fn free_fields(self) {
        unsafe {
            free_c_string(self.draw_date);
            free_c_string(self.created_at);
            drop(reclaim_slice(self.numbers, self.numbers_len));
            drop(reclaim_slice(self.stars, self.stars_len));
        }
    }
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `http_status` is set for `Server` errors when
/// known, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiResult {
    fn ok(data_tag: FfiDataTag, data: *mut std::ffi::c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn error(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build a success result with no payload.
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    /// Build a success result carrying the history message.
    pub(crate) fn ok_text(text: String) -> *mut Self {
        Self::ok(FfiDataTag::Text, c_string(text) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_new_grids(grids: Vec<NewGrid>) -> *mut Self {
        let items: Vec<FfiNewGrid> = grids.into_iter().map(FfiNewGrid::from).collect();
        let (items, len) = leak_slice(items);
        let list = Box::new(FfiNewGridList { items, len });
        Self::ok(FfiDataTag::NewGridList, Box::into_raw(list) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_grids(grids: Vec<Grid>) -> *mut Self {
        let items: Vec<FfiGrid> = grids.into_iter().map(FfiGrid::from).collect();
        let (items, len) = leak_slice(items);
        let list = Box::new(FfiGridList { items, len });
        Self::ok(FfiDataTag::GridList, Box::into_raw(list) as *mut std::ffi::c_void)
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (error_code, http_status) = match &err {
            ApiError::InvalidRequest(_) => (FfiErrorCode::InvalidRequest, 0),
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::Server { status, .. } => (FfiErrorCode::Server, status.unwrap_or(0)),
            ApiError::Decoding(_) => (FfiErrorCode::Decoding, 0),
        };
        // Server errors surface the backend's message as-is for display.
        let msg = match err {
            ApiError::Server { message, .. } => message,
            other => other.to_string(),
        };
        Self::error(error_code, http_status, msg)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
