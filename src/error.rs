/*
 *  error.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for plugin discovery and lifecycle
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

use std::path::PathBuf;
use thiserror::Error;

use crate::plugin::lifecycle::LifecycleState;

/// Unified error type for every step of the host pipeline
#[derive(Debug, Error)]
pub enum HostError {
    /// Scan directory could not be listed, or the executable's own
    /// location could not be resolved
    #[error("cannot read plugin directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Platform loader refused the image
    #[error("failed to load {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },

    /// One or more of Attach/Detach/Invoke is not exported
    #[error("{} missing required functions ({})", path.display(), missing.join("/"))]
    MissingEntryPoints {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    /// Report is not exported, the candidate cannot be classified
    #[error("{} missing Report function", path.display())]
    CapabilityUnknown { path: PathBuf },

    /// Report returned failure (or an unusable descriptor)
    #[error("{} Report failed: {message}", path.display())]
    ReportFailed { path: PathBuf, message: String },

    /// Report succeeded but declared a different role
    #[error("{} is not {expected} plugin (type={found})", path.display())]
    TypeMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Scan finished without any candidate matching the role
    #[error("no {role} plugin found in {}", dir.display())]
    NoMatchingPlugin { role: String, dir: PathBuf },

    /// Attach returned no handshake token
    #[error("plugin Attach failed: {message}")]
    AttachFailed { message: String },

    /// Invoke could not be issued or returned nothing
    #[error("plugin Invoke failed: {message}")]
    InvokeFailed { message: String },

    /// Detach reported failure; the image was unloaded regardless
    #[error("plugin Detach failed: {message}")]
    DetachFailed { message: String },

    /// Lifecycle call issued in the wrong state
    #[error("cannot {operation} plugin in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
}

impl HostError {
    /// Per-candidate failures the selector recovers from by moving on
    pub fn is_candidate_rejection(&self) -> bool {
        matches!(
            self,
            HostError::LoadFailed { .. }
                | HostError::MissingEntryPoints { .. }
                | HostError::CapabilityUnknown { .. }
                | HostError::ReportFailed { .. }
                | HostError::TypeMismatch { .. }
        )
    }
}
