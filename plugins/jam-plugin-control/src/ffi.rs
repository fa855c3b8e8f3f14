/*
 *  jam Plugin ABI - plugin side
 *
 *  C ABI types shared with the jam host. The host carries its own copy;
 *  the layouts must stay identical.
 */

use std::ffi::{c_char, c_int, c_ulong};

/// Dispatch / invoke entry point
pub type InvokeFn = unsafe extern "C" fn(
    address: *const c_char,
    payload: *const c_char,
    options: *const c_char,
) -> *const c_char;

/// Capability report filled in by `Report`
#[repr(C)]
#[derive(Debug)]
pub struct PluginDescriptor {
    pub plugin_type: *const c_char,
    pub product: *const c_char,
    pub description_long: *const c_char,
    pub description_short: *const c_char,
    pub plugin_id: c_ulong,
}

/// Status returned by Report / Detach
pub const STATUS_OK: c_int = 1;
pub const STATUS_FAILED: c_int = 0;

/// Helper to copy Rust string into a host-owned error buffer
///
/// Truncates to `max_len - 1` bytes and always NUL-terminates.
pub fn copy_str_to_buffer(s: &str, buffer: *mut c_char, max_len: usize) {
    if buffer.is_null() || max_len == 0 {
        return;
    }

    let bytes = s.as_bytes();
    let len = bytes.len().min(max_len - 1);

    unsafe {
        for (i, &byte) in bytes.iter().take(len).enumerate() {
            *buffer.add(i) = byte as c_char;
        }
        *buffer.add(len) = 0; // Null terminator
    }
}

/// Clear a host-owned error buffer
pub fn clear_buffer(buffer: *mut c_char, max_len: usize) {
    copy_str_to_buffer("", buffer, max_len);
}
