/*
 *  plugin/mod.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Dynamic plugin discovery and lifecycle
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

//! Dynamic plugin system for the jam host
//!
//! The host knows nothing about plugin implementations at build time. At
//! startup it scans a directory for shared libraries, probes each through
//! the capability report, and binds the first one reporting the requested
//! role (normally `"control"`).
//!
//! ## Architecture
//!
//! 1. **FFI Layer** (`ffi.rs`) - C ABI types and the error buffer convention
//! 2. **Scanner** (`scanner.rs`) - enumerates candidate library files
//! 3. **Loader** (`loader.rs`) - loads images and resolves symbols
//! 4. **Entry points** (`entry.rs`) - validated function pointer set
//! 5. **Report** (`report.rs`) - capability report query
//! 6. **Selector** (`selector.rs`) - picks the plugin, unloads the rest
//! 7. **Lifecycle** (`lifecycle.rs`) - Attach, Invoke, Detach
//!
//! ## Plugin Naming Convention
//!
//! - Linux: `libjam_control.so`
//! - macOS: `libjam_control.dylib`
//! - Windows: `libjam_control.dll` (the `lib` prefix is required everywhere;
//!   cargo emits `jam_control.dll` there, so install it under the prefixed name)

pub mod ffi;
pub mod scanner;
pub mod loader;
pub mod entry;
pub mod report;
pub mod selector;
pub mod lifecycle;

// Re-exports for convenience
pub use loader::{ImageLoader, NativeLoader, SymbolAddress};
pub use report::PluginMetadata;
pub use selector::{PluginSelector, ScanStats, SurveyEntry};
pub use lifecycle::{BoundPlugin, LifecycleState};
