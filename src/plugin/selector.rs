/*
 *  plugin/selector.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugin selector - probes candidates and binds the first matching role
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

use std::path::{Path, PathBuf};
use log::{debug, info, warn};

use crate::error::HostError;
use super::entry::{EntryPoints, PluginCandidate};
use super::ffi::ERROR_BUFFER_SIZE;
use super::lifecycle::BoundPlugin;
use super::loader::ImageLoader;
use super::report::{self, PluginMetadata};

/// Counters from one selection pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Files that matched the naming filter and were examined
    pub found: usize,
    /// Images the platform loader accepted
    pub loaded: usize,
    /// Loaded images rejected and unloaded
    pub rejected: usize,
}

/// Outcome of probing one candidate in survey mode
#[derive(Debug)]
pub struct SurveyEntry {
    pub path: PathBuf,
    pub report: Result<PluginMetadata, HostError>,
}

/// Drives candidates through load, resolve and report, keeping the first
/// whose reported type matches the requested role
///
/// Candidates are taken in the order given. For a directory scan that is
/// enumeration order, which the platform does not specify; when several
/// candidates share the role, which one wins is therefore not portable.
pub struct PluginSelector<'l, L: ImageLoader> {
    loader: &'l L,
    role: String,
    error_capacity: usize,
}

impl<'l, L: ImageLoader> PluginSelector<'l, L> {
    pub fn new(loader: &'l L, role: impl Into<String>) -> Self {
        Self {
            loader,
            role: role.into(),
            error_capacity: ERROR_BUFFER_SIZE,
        }
    }

    /// Capacity of every error buffer handed to plugins
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Bind the first candidate reporting the requested role
    ///
    /// Every rejected candidate is unloaded before the next one is
    /// loaded; candidates after the match are never touched. `dir` is only
    /// used to describe a failed search.
    pub fn select<I>(&self, candidates: I, dir: &Path) -> Result<(BoundPlugin<'l, L>, ScanStats), HostError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut stats = ScanStats::default();

        for path in candidates {
            stats.found += 1;
            info!("Found candidate: {}", display_name(&path));

            let (candidate, entry, metadata) = match self.examine(&path, &mut stats) {
                Ok(probed) => probed,
                Err(e) => {
                    self.log_rejection(&e);
                    continue;
                }
            };

            if metadata.plugin_type != self.role {
                let e = HostError::TypeMismatch {
                    path: path.clone(),
                    expected: self.role.clone(),
                    found: metadata.plugin_type.clone(),
                };
                stats.rejected += 1;
                self.log_rejection(&e);
                drop(candidate);
                continue;
            }

            info!(
                "{} identified as {} plugin (type={}, id=0x{:x})",
                display_name(&path), self.role, metadata.plugin_type, metadata.plugin_id
            );
            info!("Scan complete: {} found, {} loaded, {} rejected", stats.found, stats.loaded, stats.rejected);

            let (path, image) = candidate.promote();
            let bound = BoundPlugin::bind(self.loader, path, image, entry, metadata, self.error_capacity);
            return Ok((bound, stats));
        }

        info!("Scan complete: {} found, {} loaded, {} rejected", stats.found, stats.loaded, stats.rejected);
        Err(HostError::NoMatchingPlugin {
            role: self.role.clone(),
            dir: dir.to_path_buf(),
        })
    }

    /// Probe every candidate's capability report without binding anything
    pub fn survey<I>(&self, candidates: I) -> Vec<SurveyEntry>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut stats = ScanStats::default();
        let mut entries = Vec::new();

        for path in candidates {
            stats.found += 1;
            // the candidate drops (and unloads) at the end of this statement
            let report = self.examine(&path, &mut stats)
                .map(|(_candidate, _entry, metadata)| metadata);
            entries.push(SurveyEntry { path, report });
        }

        info!("Survey complete: {} found, {} loaded", stats.found, stats.loaded);
        entries
    }

    /// Load, resolve and report one candidate
    ///
    /// On any error the candidate has already been unloaded.
    fn examine(
        &self,
        path: &Path,
        stats: &mut ScanStats,
    ) -> Result<(PluginCandidate<'l, L>, EntryPoints, PluginMetadata), HostError> {
        let candidate = PluginCandidate::load(self.loader, path)?;
        stats.loaded += 1;

        let outcome = self.probe(&candidate);
        if outcome.is_err() {
            stats.rejected += 1;
        }
        outcome.map(|(entry, metadata)| (candidate, entry, metadata))
    }

    fn probe(&self, candidate: &PluginCandidate<'l, L>) -> Result<(EntryPoints, PluginMetadata), HostError> {
        let path = candidate.path();
        let symbols = candidate.resolve_symbols();

        let entry = EntryPoints::from_symbols(&symbols)
            .ok_or_else(|| HostError::MissingEntryPoints {
                path: path.to_path_buf(),
                missing: symbols.missing(),
            })?;

        debug!("{} has valid plugin interface", display_name(path));

        let report_fn = symbols.report()
            .ok_or_else(|| HostError::CapabilityUnknown { path: path.to_path_buf() })?;

        let metadata = report::query(report_fn, self.error_capacity)
            .map_err(|message| HostError::ReportFailed { path: path.to_path_buf(), message })?;

        Ok((entry, metadata))
    }

    fn log_rejection(&self, e: &HostError) {
        debug_assert!(e.is_candidate_rejection());
        match e {
            HostError::LoadFailed { .. } | HostError::ReportFailed { .. } => warn!("{}", e),
            _ => info!("{}", e),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
