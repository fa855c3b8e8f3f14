/*
 *  host.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host pipeline - scan, select, attach, invoke, detach
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
use log::{error, info, warn};

use crate::config::Config;
use crate::error::HostError;
use crate::plugin::{scanner, ImageLoader, PluginMetadata, PluginSelector, ScanStats, SurveyEntry};

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Scan directory; `None` means the executable's own directory
    pub plugin_dir: Option<PathBuf>,
    pub role: String,
    pub error_buffer_size: usize,
    pub address: String,
    pub payload: String,
    pub options: String,
}

impl From<&Config> for HostSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            plugin_dir: cfg.plugin_dir().map(PathBuf::from),
            role: cfg.role().to_string(),
            error_buffer_size: cfg.error_buffer_size(),
            address: cfg.address().to_string(),
            payload: cfg.payload().to_string(),
            options: cfg.options().to_string(),
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// What a successful run produced
#[derive(Debug)]
pub struct Outcome {
    pub path: PathBuf,
    pub plugin: PluginMetadata,
    /// Invoke response, verbatim; `None` if the call itself failed
    pub response: Option<String>,
    pub stats: ScanStats,
}

/// Directory to scan for this run
pub fn scan_dir(settings: &HostSettings) -> Result<PathBuf, HostError> {
    match settings.plugin_dir.as_ref() {
        Some(dir) => Ok(dir.clone()),
        None => scanner::executable_dir(),
    }
}

/// Discover, bind and drive the plugin for `settings.role`
///
/// Once a plugin is selected it is always detached and unloaded before
/// this returns, including when Attach fails.
pub fn run<L: ImageLoader>(settings: &HostSettings, loader: &L) -> Result<Outcome, HostError> {
    let dir = scan_dir(settings)?;
    info!("Discovering {} plugin in {}", settings.role, dir.display());

    let candidates = scanner::scan(&dir)?;
    let selector = PluginSelector::new(loader, settings.role.as_str())
        .with_error_capacity(settings.error_buffer_size);

    let (mut bound, stats) = selector.select(candidates, &dir)?;

    if let Err(e) = bound.attach() {
        error!("{}", e);
        if let Err(d) = bound.detach() {
            warn!("{}", d);
        }
        return Err(e);
    }

    let response = match bound.invoke(&settings.address, &settings.payload, &settings.options) {
        Ok(r) => {
            info!("Control plugin result received ({} bytes)", r.len());
            Some(r)
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    };

    let path = bound.path().to_path_buf();
    let plugin = bound.metadata().clone();

    if let Err(e) = bound.detach() {
        warn!("{}", e);
    }

    Ok(Outcome { path, plugin, response, stats })
}

/// Report every candidate in the scan directory without binding any
pub fn list<L: ImageLoader>(settings: &HostSettings, loader: &L) -> Result<Vec<SurveyEntry>, HostError> {
    let dir = scan_dir(settings)?;
    info!("Surveying plugins in {}", dir.display());

    let candidates = scanner::scan(&dir)?;
    let selector = PluginSelector::new(loader, settings.role.as_str())
        .with_error_capacity(settings.error_buffer_size);

    Ok(selector.survey(candidates))
}
