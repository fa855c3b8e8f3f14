/*
 *  tests/common/mod.rs
 *
 *  In-process loader and mock plugins for the integration tests
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 */

#![allow(dead_code)]

pub mod artifacts;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use jam_host::plugin::ffi::{InvokeFn, PluginDescriptor};
use jam_host::plugin::{ImageLoader, SymbolAddress};
use jam_host::HostError;

pub const FIXED_RESPONSE: &str = r#"{"success":true,"message":"mock ran"}"#;

// ============================================================================
// Call journal
// ============================================================================

thread_local! {
    static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(call: impl Into<String>) {
    CALLS.with(|c| c.borrow_mut().push(call.into()));
}

/// Every native call made on this thread, in order
pub fn calls() -> Vec<String> {
    CALLS.with(|c| c.borrow().clone())
}

pub fn call_count(name: &str) -> usize {
    calls().iter().filter(|c| c.as_str() == name || c.starts_with(&format!("{name}("))).count()
}

fn write_err(err: *mut c_char, cap: usize, msg: &str) {
    if err.is_null() || cap == 0 {
        return;
    }
    let len = msg.len().min(cap - 1);
    unsafe {
        for (i, &b) in msg.as_bytes().iter().take(len).enumerate() {
            *err.add(i) = b as c_char;
        }
        *err.add(len) = 0;
    }
}

fn fill(out: *mut PluginDescriptor, plugin_type: &'static CStr, product: &'static CStr, id: u32) {
    unsafe {
        (*out).plugin_type = plugin_type.as_ptr();
        (*out).product = product.as_ptr();
        (*out).description_long = c"Mock plugin for host tests".as_ptr();
        (*out).description_short = c"mock".as_ptr();
        (*out).plugin_id = id.into();
    }
}

// ============================================================================
// Mock plugin entry points
// ============================================================================

pub unsafe extern "C" fn report_control(_err: *mut c_char, _cap: usize, out: *mut PluginDescriptor) -> c_int {
    record("Report");
    fill(out, c"control", c"first", 0x10);
    1
}

pub unsafe extern "C" fn report_control_second(_err: *mut c_char, _cap: usize, out: *mut PluginDescriptor) -> c_int {
    record("Report");
    fill(out, c"control", c"second", 0x20);
    1
}

pub unsafe extern "C" fn report_data(_err: *mut c_char, _cap: usize, out: *mut PluginDescriptor) -> c_int {
    record("Report");
    fill(out, c"data", c"store", 0x30);
    1
}

pub unsafe extern "C" fn report_fail(err: *mut c_char, cap: usize, _out: *mut PluginDescriptor) -> c_int {
    record("Report");
    write_err(err, cap, "mock report failure");
    0
}

pub unsafe extern "C" fn attach_echo(dispatch: InvokeFn, _err: *mut c_char, _cap: usize) -> Option<InvokeFn> {
    record("Attach");
    Some(dispatch)
}

pub unsafe extern "C" fn attach_other(_dispatch: InvokeFn, _err: *mut c_char, _cap: usize) -> Option<InvokeFn> {
    record("Attach");
    Some(invoke_null)
}

pub unsafe extern "C" fn attach_fail(_dispatch: InvokeFn, err: *mut c_char, cap: usize) -> Option<InvokeFn> {
    record("Attach");
    write_err(err, cap, "attach refused");
    None
}

pub unsafe extern "C" fn invoke_fixed(
    address: *const c_char,
    payload: *const c_char,
    options: *const c_char,
) -> *const c_char {
    let (address, payload, options) = unsafe {
        (
            CStr::from_ptr(address).to_string_lossy().into_owned(),
            CStr::from_ptr(payload).to_string_lossy().into_owned(),
            CStr::from_ptr(options).to_string_lossy().into_owned(),
        )
    };
    record(format!("Invoke({address},{payload},{options})"));
    c"{\"success\":true,\"message\":\"mock ran\"}".as_ptr()
}

pub unsafe extern "C" fn invoke_null(
    _address: *const c_char,
    _payload: *const c_char,
    _options: *const c_char,
) -> *const c_char {
    record("Invoke");
    std::ptr::null()
}

pub unsafe extern "C" fn detach_ok(_err: *mut c_char, _cap: usize) -> c_int {
    record("Detach");
    1
}

pub unsafe extern "C" fn detach_fail(err: *mut c_char, cap: usize) -> c_int {
    record("Detach");
    write_err(err, cap, "teardown error");
    0
}

// ============================================================================
// Symbol tables
// ============================================================================

pub type SymbolTable = Vec<(&'static str, SymbolAddress)>;

pub fn sym(ptr: *const ()) -> SymbolAddress {
    NonNull::new(ptr as *mut c_void).unwrap()
}

/// Well-behaved control plugin
pub fn control_plugin() -> SymbolTable {
    vec![
        ("Report", sym(report_control as *const ())),
        ("Attach", sym(attach_echo as *const ())),
        ("Invoke", sym(invoke_fixed as *const ())),
        ("Detach", sym(detach_ok as *const ())),
    ]
}

/// `control_plugin` with one entry point swapped out
pub fn control_plugin_with(name: &'static str, ptr: *const ()) -> SymbolTable {
    control_plugin()
        .into_iter()
        .map(|(n, addr)| if n == name { (n, sym(ptr)) } else { (n, addr) })
        .collect()
}

/// `control_plugin` without one entry point
pub fn control_plugin_without(name: &'static str) -> SymbolTable {
    control_plugin().into_iter().filter(|(n, _)| *n != name).collect()
}

// ============================================================================
// Loader
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Load(PathBuf),
    Unload(PathBuf),
}

enum Image {
    Corrupt(String),
    Library(SymbolTable),
}

/// Handle to a mock image
#[derive(Debug)]
pub struct MockImage {
    path: PathBuf,
}

/// Loader serving symbol tables from memory and journaling load/unload
#[derive(Default)]
pub struct MockLoader {
    images: HashMap<PathBuf, Image>,
    events: RefCell<Vec<Event>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, path: impl Into<PathBuf>, symbols: SymbolTable) -> Self {
        self.images.insert(path.into(), Image::Library(symbols));
        self
    }

    pub fn with_corrupt(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.insert(path.into(), Image::Corrupt("invalid ELF header".into()));
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn loads(&self, path: &Path) -> usize {
        self.events().iter().filter(|e| **e == Event::Load(path.to_path_buf())).count()
    }

    pub fn unloads(&self, path: &Path) -> usize {
        self.events().iter().filter(|e| **e == Event::Unload(path.to_path_buf())).count()
    }

    /// Images loaded and not yet unloaded
    pub fn live_images(&self) -> usize {
        self.events().iter().fold(0isize, |n, e| match e {
            Event::Load(_) => n + 1,
            Event::Unload(_) => n - 1,
        }) as usize
    }
}

impl ImageLoader for MockLoader {
    type Image = MockImage;

    fn load(&self, path: &Path) -> Result<MockImage, HostError> {
        match self.images.get(path) {
            Some(Image::Library(_)) => {
                self.events.borrow_mut().push(Event::Load(path.to_path_buf()));
                Ok(MockImage { path: path.to_path_buf() })
            }
            Some(Image::Corrupt(reason)) => Err(HostError::LoadFailed {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }),
            None => Err(HostError::LoadFailed {
                path: path.to_path_buf(),
                reason: "cannot open shared object file".into(),
            }),
        }
    }

    fn resolve(&self, image: &MockImage, symbol: &str) -> Option<SymbolAddress> {
        match self.images.get(&image.path) {
            Some(Image::Library(symbols)) => symbols.iter()
                .find(|(name, _)| *name == symbol)
                .map(|(_, addr)| *addr),
            _ => None,
        }
    }

    fn unload(&self, image: MockImage) {
        self.events.borrow_mut().push(Event::Unload(image.path));
    }
}

/// Library file name following the platform convention
pub fn lib_name(stem: &str) -> String {
    format!("lib{}{}", stem, std::env::consts::DLL_SUFFIX)
}
