/*
 *  jam Control Plugin
 *
 *  Reference control plugin for the jam host, exporting the plugin ABI
 *  (Report, Attach, Invoke, Detach) from a shared library.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 */

//! # jam Control Plugin
//!
//! Built as `libjam_control.so` / `libjam_control.dylib`. On Windows cargo
//! names it `jam_control.dll`; the host only scans `lib*` files, so install
//! it as `libjam_control.dll`. Drop it next to the
//! `jam` binary, or into the directory named by `--plugin-dir` /
//! `JAM_PLUGIN_DIR`, and the host binds it as the `"control"` plugin.
//!
//! ## Addresses
//!
//! - `control.run` - bootstrap acknowledgement
//! - `control.list` - names of every address this plugin answers
//!
//! Anything else answers `{"success":false,"error":"no plugin handled address"}`.

mod ffi;
mod plugin;

pub use plugin::{Attach, Detach, Invoke, Report};
