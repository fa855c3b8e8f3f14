/*
 *  plugin/loader.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Dynamic loader adapter - loads, resolves and unloads library images
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

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use log::{debug, warn};
use libloading::{Library, Symbol};

use crate::error::HostError;

/// Raw address of an exported symbol
pub type SymbolAddress = NonNull<c_void>;

/// Platform dynamic-linking facility behind a stable interface
///
/// `unload` consumes the image, so a handle can never be released twice.
pub trait ImageLoader {
    /// Exclusive ownership of one loaded image
    type Image;

    /// Open a library image
    fn load(&self, path: &Path) -> Result<Self::Image, HostError>;

    /// Look up an exported symbol by exact name; `None` when not exported
    fn resolve(&self, image: &Self::Image, symbol: &str) -> Option<SymbolAddress>;

    /// Release the image
    fn unload(&self, image: Self::Image);
}

/// Loader backed by `dlopen`/`LoadLibrary` through libloading
///
/// On Unix images are opened with `RTLD_LAZY | RTLD_LOCAL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ImageLoader for NativeLoader {
    type Image = Library;

    fn load(&self, path: &Path) -> Result<Library, HostError> {
        debug!("Loading library image: {}", path.display());

        // SAFETY: running a candidate's initialisers is inherent to probing
        // it; the host accepts that plugins are trusted native code
        unsafe { Library::new(path) }
            .map_err(|e| HostError::LoadFailed {
                path: PathBuf::from(path),
                reason: e.to_string(),
            })
    }

    fn resolve(&self, image: &Library, symbol: &str) -> Option<SymbolAddress> {
        // SAFETY: the symbol is read as an opaque address only; it is typed
        // later by `EntryPoints` once the full set is known to be present
        let sym: Symbol<*mut c_void> = unsafe { image.get(symbol.as_bytes()) }.ok()?;
        NonNull::new(*sym)
    }

    fn unload(&self, image: Library) {
        if let Err(e) = image.close() {
            warn!("Failed to unload library image: {}", e);
        }
    }
}
