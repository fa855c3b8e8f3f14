/*
 *  jam Control Plugin - Exported Entry Points
 *
 *  Report, Attach, Invoke and Detach as seen by the jam host
 */

#![allow(non_snake_case)]

use std::any::Any;
use std::ffi::{c_char, c_int, c_ulong, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::{Mutex, MutexGuard};
use serde_json::{json, Value};

use crate::ffi::*;

const PLUGIN_TYPE: &CStr = c"control";
const PRODUCT: &CStr = c"core";
const DESCRIPTION_LONG: &CStr = c"Control plugin for discovery and orchestration";
const DESCRIPTION_SHORT: &CStr = c"control";
/// Reserved ID for control
const PLUGIN_ID: c_ulong = 0;

/// Debug output, compiled in with the `debug-logging` feature only
macro_rules! plugin_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug-logging")]
        log::debug!($($arg)*);
    };
}

/// Macro to catch panics in FFI functions
macro_rules! catch_panic {
    ($err:expr, $cap:expr, $failed:expr, $code:block) => {
        match catch_unwind(AssertUnwindSafe(|| $code)) {
            Ok(result) => result,
            Err(panic_info) => {
                copy_str_to_buffer(&panic_message(panic_info), $err, $cap);
                $failed
            }
        }
    };
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        format!("Plugin panic: {}", s)
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        format!("Plugin panic: {}", s)
    } else {
        "Plugin panic: unknown error".to_string()
    }
}

// ============================================================================
// Plugin state
// ============================================================================

/// Everything the plugin keeps between calls
struct ControlState {
    /// Dispatch handed over by the host at Attach
    dispatch: Option<InvokeFn>,

    /// Last Invoke response; valid until the next Invoke or Detach
    response: Option<CString>,
}

static STATE: Mutex<ControlState> = Mutex::new(ControlState {
    dispatch: None,
    response: None,
});

fn state() -> MutexGuard<'static, ControlState> {
    // a panicking handler never leaves the state half-written
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Handlers
// ============================================================================

type HandlerFn = fn(payload: &str, options: &str) -> Value;

/// One addressable operation
struct HandlerDef {
    sid: &'static str,
    tag: &'static str,
    fun: HandlerFn,
}

const HANDLERS: &[HandlerDef] = &[
    HandlerDef { sid: "control.run", tag: "bootstrap", fun: control_run },
    HandlerDef { sid: "control.list", tag: "introspection", fun: control_list },
];

fn control_run(_payload: &str, _options: &str) -> Value {
    plugin_log!("control.run");
    json!({ "success": true, "message": "control plugin ready" })
}

fn control_list(_payload: &str, _options: &str) -> Value {
    let handlers: Vec<Value> = HANDLERS.iter()
        .map(|h| json!({ "address": h.sid, "tag": h.tag }))
        .collect();
    json!({ "success": true, "handlers": handlers })
}

/// Route one call to its handler
fn route(address: &str, payload: &str, options: &str) -> Value {
    if state().dispatch.is_none() {
        return json!({ "success": false, "error": "not attached" });
    }

    match HANDLERS.iter().find(|h| h.sid == address) {
        Some(handler) => (handler.fun)(payload, options),
        None => {
            plugin_log!("No handler for address '{}'", address);
            json!({ "success": false, "error": "no plugin handled address" })
        }
    }
}

/// Keep `body` alive in plugin memory and hand out its address
fn store_response(body: String) -> *const c_char {
    let mut state = state();
    // serde_json escapes NUL, so this only fails on a broken invariant
    state.response = CString::new(body).ok();
    state.response.as_ref().map_or(ptr::null(), |r| r.as_ptr())
}

unsafe fn lossy(text: *const c_char) -> String {
    if text.is_null() {
        String::new()
    } else {
        CStr::from_ptr(text).to_string_lossy().into_owned()
    }
}

// ============================================================================
// Exported ABI
// ============================================================================

/// Fill in the capability report
///
/// # Safety
///
/// `err` must point to `err_cap` writable bytes (or be null); `out` must be
/// a valid descriptor or null.
#[no_mangle]
pub unsafe extern "C" fn Report(err: *mut c_char, err_cap: usize, out: *mut PluginDescriptor) -> c_int {
    catch_panic!(err, err_cap, STATUS_FAILED, {
        if out.is_null() {
            copy_str_to_buffer("descriptor handle is null", err, err_cap);
            return STATUS_FAILED;
        }

        let desc = &mut *out;
        desc.plugin_type = PLUGIN_TYPE.as_ptr();
        desc.product = PRODUCT.as_ptr();
        desc.description_long = DESCRIPTION_LONG.as_ptr();
        desc.description_short = DESCRIPTION_SHORT.as_ptr();
        desc.plugin_id = PLUGIN_ID;

        clear_buffer(err, err_cap);
        STATUS_OK
    })
}

/// Attach handshake: keep the dispatch and echo it back
///
/// # Safety
///
/// `err` must point to `err_cap` writable bytes (or be null).
#[no_mangle]
pub unsafe extern "C" fn Attach(dispatch: Option<InvokeFn>, err: *mut c_char, err_cap: usize) -> Option<InvokeFn> {
    catch_panic!(err, err_cap, None, {
        let Some(dispatch) = dispatch else {
            copy_str_to_buffer("dispatch is null", err, err_cap);
            return None;
        };

        state().dispatch = Some(dispatch);
        plugin_log!("Attached");
        clear_buffer(err, err_cap);
        Some(dispatch)
    })
}

/// Route `address` to a handler; the response stays valid until the next
/// call into the plugin
///
/// # Safety
///
/// Non-null arguments must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn Invoke(
    address: *const c_char,
    payload: *const c_char,
    options: *const c_char,
) -> *const c_char {
    if address.is_null() {
        return ptr::null();
    }

    let address = lossy(address);
    let payload = lossy(payload);
    let options = lossy(options);
    plugin_log!("Invoke address='{}' payload='{}' options='{}'", address, payload, options);

    let body = match catch_unwind(AssertUnwindSafe(|| route(&address, &payload, &options))) {
        Ok(body) => body,
        Err(panic_info) => json!({ "success": false, "error": panic_message(panic_info) }),
    };

    store_response(body.to_string())
}

/// Drop the dispatch and any response still held
///
/// # Safety
///
/// `err` must point to `err_cap` writable bytes (or be null).
#[no_mangle]
pub unsafe extern "C" fn Detach(err: *mut c_char, err_cap: usize) -> c_int {
    catch_panic!(err, err_cap, STATUS_FAILED, {
        let mut state = state();
        state.dispatch = None;
        state.response = None;
        plugin_log!("Detached");
        clear_buffer(err, err_cap);
        STATUS_OK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // exports share one static state
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn empty_descriptor() -> PluginDescriptor {
        PluginDescriptor {
            plugin_type: ptr::null(),
            product: ptr::null(),
            description_long: ptr::null(),
            description_short: ptr::null(),
            plugin_id: 0xdead,
        }
    }

    fn text(ptr: *const c_char) -> String {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    fn invoke(address: &CStr) -> Value {
        let response = unsafe { Invoke(address.as_ptr(), c"{}".as_ptr(), c"{}".as_ptr()) };
        assert!(!response.is_null());
        serde_json::from_str(&text(response)).unwrap()
    }

    fn attach() {
        let mut err = [0 as c_char; 64];
        let echoed = unsafe { Attach(Some(Invoke), err.as_mut_ptr(), err.len()) };
        assert!(echoed.is_some());
    }

    fn detach() {
        let mut err = [0 as c_char; 64];
        assert_eq!(unsafe { Detach(err.as_mut_ptr(), err.len()) }, STATUS_OK);
    }

    #[test]
    fn test_report_describes_control_plugin() {
        let mut err = [0x41 as c_char; 64];
        let mut desc = empty_descriptor();

        let status = unsafe { Report(err.as_mut_ptr(), err.len(), &mut desc) };

        assert_eq!(status, STATUS_OK);
        assert_eq!(text(desc.plugin_type), "control");
        assert_eq!(text(desc.product), "core");
        assert_eq!(text(desc.description_long), "Control plugin for discovery and orchestration");
        assert_eq!(text(desc.description_short), "control");
        assert_eq!(desc.plugin_id, 0);
        assert_eq!(err[0], 0);
    }

    #[test]
    fn test_report_null_descriptor() {
        let mut err = [0 as c_char; 64];

        let status = unsafe { Report(err.as_mut_ptr(), err.len(), ptr::null_mut()) };

        assert_eq!(status, STATUS_FAILED);
        assert_eq!(text(err.as_ptr()), "descriptor handle is null");
    }

    #[test]
    fn test_attach_echoes_dispatch() {
        let _guard = serial();
        let mut err = [0 as c_char; 64];

        let echoed = unsafe { Attach(Some(Invoke), err.as_mut_ptr(), err.len()) };

        assert_eq!(echoed.map(|f| f as usize), Some(Invoke as usize));
        detach();
    }

    #[test]
    fn test_attach_null_dispatch_fails() {
        let _guard = serial();
        let mut err = [0 as c_char; 64];

        let echoed = unsafe { Attach(None, err.as_mut_ptr(), err.len()) };

        assert!(echoed.is_none());
        assert_eq!(text(err.as_ptr()), "dispatch is null");
    }

    #[test]
    fn test_invoke_requires_attach() {
        let _guard = serial();
        detach();

        let response = invoke(c"control.run");

        assert_eq!(response["success"], false);
        assert_eq!(response["error"], "not attached");
    }

    #[test]
    fn test_invoke_routes_handlers() {
        let _guard = serial();
        attach();

        let run = invoke(c"control.run");
        assert_eq!(run["success"], true);

        let list = invoke(c"control.list");
        let addresses: Vec<&str> = list["handlers"].as_array().unwrap()
            .iter()
            .map(|h| h["address"].as_str().unwrap())
            .collect();
        assert_eq!(addresses, vec!["control.run", "control.list"]);

        let unknown = invoke(c"weather.fetch");
        assert_eq!(unknown["success"], false);
        assert_eq!(unknown["error"], "no plugin handled address");

        detach();
    }

    #[test]
    fn test_invoke_null_address() {
        let _guard = serial();
        attach();

        let response = unsafe { Invoke(ptr::null(), c"{}".as_ptr(), ptr::null()) };
        assert!(response.is_null());

        detach();
    }
}
