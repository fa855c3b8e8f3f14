/*
 *  plugin/lifecycle.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Lifecycle driver - Attach, Invoke and Detach of the bound plugin
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

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use log::{debug, info, warn};

use crate::error::HostError;
use super::entry::EntryPoints;
use super::ffi::ErrorBuffer;
use super::loader::ImageLoader;
use super::report::PluginMetadata;

/// Where the bound plugin is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Selected, Attach not (successfully) called yet
    Unbound,
    /// Between a successful Attach and Detach
    Attached,
    /// Detach ran and the image is unloaded
    Detached,
}

/// The one plugin selected for this run
///
/// Owns the plugin image. Detach runs exactly once: through [`detach`],
/// or from `Drop` if the value goes out of scope first, whether or not
/// Attach ever succeeded.
///
/// [`detach`]: BoundPlugin::detach
pub struct BoundPlugin<'l, L: ImageLoader> {
    loader: &'l L,
    path: PathBuf,
    image: Option<L::Image>,
    entry: EntryPoints,
    metadata: PluginMetadata,
    state: LifecycleState,
    error_capacity: usize,
}

impl<'l, L: ImageLoader> BoundPlugin<'l, L> {
    pub(crate) fn bind(
        loader: &'l L,
        path: PathBuf,
        image: Option<L::Image>,
        entry: EntryPoints,
        metadata: PluginMetadata,
        error_capacity: usize,
    ) -> Self {
        Self {
            loader,
            path,
            image,
            entry,
            metadata,
            state: LifecycleState::Unbound,
            error_capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == LifecycleState::Attached
    }

    /// Attach handshake
    ///
    /// Hands the plugin its own `Invoke` address; a non-null return means
    /// attached. The plugin is expected to echo the address back, anything
    /// else non-null is accepted with a warning.
    pub fn attach(&mut self) -> Result<(), HostError> {
        if self.state != LifecycleState::Unbound {
            return Err(HostError::InvalidState { operation: "attach", state: self.state });
        }

        let token = self.entry.invoke;
        let mut err = ErrorBuffer::new(self.error_capacity);

        // SAFETY: entry points were validated at bind time and the image is
        // still loaded; the buffer outlives the call
        let returned = unsafe { (self.entry.attach)(token, err.as_mut_ptr(), err.capacity()) };

        match returned {
            Some(confirmed) => {
                if !std::ptr::fn_addr_eq(confirmed, token) {
                    warn!("Attach returned a different dispatch address than the one handed over");
                }
                self.state = LifecycleState::Attached;
                info!("Control plugin attached successfully");
                Ok(())
            }
            None => Err(HostError::AttachFailed {
                message: err.message_or("Attach returned null"),
            }),
        }
    }

    /// Fire-once call into the plugin; the response is copied before return
    pub fn invoke(&self, address: &str, payload: &str, options: &str) -> Result<String, HostError> {
        if self.state != LifecycleState::Attached {
            return Err(HostError::InvalidState { operation: "invoke", state: self.state });
        }

        let address_c = to_c_string("address", address)?;
        let payload_c = to_c_string("payload", payload)?;
        let options_c = to_c_string("options", options)?;

        debug!("Invoking '{}'", address);

        // SAFETY: all three strings live until after the call returns
        let response = unsafe {
            (self.entry.invoke)(address_c.as_ptr(), payload_c.as_ptr(), options_c.as_ptr())
        };

        if response.is_null() {
            return Err(HostError::InvokeFailed {
                message: format!("plugin returned null response for '{}'", address),
            });
        }

        // SAFETY: non-null response stays valid until the next plugin call
        let text = unsafe { CStr::from_ptr(response) };
        Ok(text.to_string_lossy().into_owned())
    }

    /// Detach and unload
    ///
    /// The image is unloaded even when the plugin reports a teardown
    /// failure; that failure comes back as `DetachFailed` for logging.
    pub fn detach(mut self) -> Result<(), HostError> {
        match self.release() {
            Some(message) => Err(HostError::DetachFailed { message }),
            None => Ok(()),
        }
    }

    /// Detach + unload, once; returns the plugin's teardown diagnostic
    fn release(&mut self) -> Option<String> {
        if self.state == LifecycleState::Detached {
            return None;
        }

        let mut err = ErrorBuffer::new(self.error_capacity);

        // SAFETY: image is still loaded at this point
        let status = unsafe { (self.entry.detach)(err.as_mut_ptr(), err.capacity()) };

        self.state = LifecycleState::Detached;
        if let Some(image) = self.image.take() {
            self.loader.unload(image);
            debug!("Unloaded {}", self.path.display());
        }

        if status == 0 {
            Some(err.message_or("Detach returned failure"))
        } else {
            None
        }
    }
}

impl<L: ImageLoader> Drop for BoundPlugin<'_, L> {
    fn drop(&mut self) {
        if self.state != LifecycleState::Detached {
            debug!("Bound plugin dropped without explicit detach: {}", self.path.display());
            if let Some(message) = self.release() {
                warn!("Control plugin Detach failed: {}", message);
            }
        }
    }
}

fn to_c_string(what: &str, value: &str) -> Result<CString, HostError> {
    CString::new(value).map_err(|_| HostError::InvokeFailed {
        message: format!("{} contains an interior NUL byte", what),
    })
}
