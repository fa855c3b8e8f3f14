/*
 *  plugin/ffi.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI types for the plugin interface
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! FFI types for the jam plugin contract
//!
//! Every candidate library may export four unmangled functions:
//!
//! ```c
//! int         Report(char* err, size_t err_cap, libsinfo* out);
//! InvokeFn    Attach(InvokeFn dispatch, char* err, size_t err_cap);
//! const char* Invoke(const char* address, const char* payload, const char* options);
//! int         Detach(char* err, size_t err_cap);
//! ```
//!
//! Nothing outside the `plugin` module sees these raw types; the error
//! buffer convention is turned into `String`/`HostError` right after each
//! native call.

use std::ffi::{c_char, c_int, c_ulong, CStr};

/// Default capacity of the per-call error buffer
pub const ERROR_BUFFER_SIZE: usize = 256;

/// Exported symbol names
pub const SYMBOL_ATTACH: &str = "Attach";
pub const SYMBOL_DETACH: &str = "Detach";
pub const SYMBOL_INVOKE: &str = "Invoke";
pub const SYMBOL_REPORT: &str = "Report";

/// `Invoke(address, payload, options) -> response`
pub type InvokeFn =
    unsafe extern "C" fn(*const c_char, *const c_char, *const c_char) -> *const c_char;

/// `Attach(dispatch, err, err_cap) -> dispatch | null`
///
/// `Option<fn>` is the nullable function pointer on the C side.
pub type AttachFn = unsafe extern "C" fn(InvokeFn, *mut c_char, usize) -> Option<InvokeFn>;

/// `Detach(err, err_cap) -> status` (0 = failure)
pub type DetachFn = unsafe extern "C" fn(*mut c_char, usize) -> c_int;

/// `Report(err, err_cap, out) -> status` (0 = failure)
pub type ReportFn = unsafe extern "C" fn(*mut c_char, usize, *mut PluginDescriptor) -> c_int;

/// Capability report filled in by the plugin
///
/// The strings point into plugin-owned memory and are only guaranteed
/// valid until the next call into the plugin.
#[repr(C)]
#[derive(Debug)]
pub struct PluginDescriptor {
    pub plugin_type: *const c_char,
    pub product: *const c_char,
    pub description_long: *const c_char,
    pub description_short: *const c_char,
    pub plugin_id: c_ulong,
}

impl Default for PluginDescriptor {
    fn default() -> Self {
        Self {
            plugin_type: std::ptr::null(),
            product: std::ptr::null(),
            description_long: std::ptr::null(),
            description_short: std::ptr::null(),
            plugin_id: 0,
        }
    }
}

/// Host-owned diagnostic buffer handed to a single native call
///
/// Always allocated zero-filled, one per call, so text from an earlier
/// call can never be read back.
pub struct ErrorBuffer {
    buffer: Vec<c_char>,
}

impl ErrorBuffer {
    /// Create a zeroed buffer; capacity is clamped to at least one byte
    /// so the NUL terminator always fits
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(1)],
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.buffer.as_mut_ptr()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the message as a Rust string
    ///
    /// Reads up to the first NUL, or the whole buffer if the plugin
    /// filled it without terminating.
    pub fn message(&self) -> String {
        let len = self.buffer.iter()
            .position(|&c| c == 0)
            .unwrap_or(self.buffer.len());

        let bytes: Vec<u8> = self.buffer[..len]
            .iter()
            .map(|&c| c as u8)
            .collect();

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Message, or `fallback` when the plugin left the buffer empty
    pub fn message_or(&self, fallback: &str) -> String {
        let message = self.message();
        if message.is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

/// Copy a plugin-owned C string into an owned `String`
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of this call.
pub unsafe fn copy_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}
