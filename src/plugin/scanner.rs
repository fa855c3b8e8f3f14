/*
 *  plugin/scanner.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library scanner - enumerates candidate .so/.dylib/.dll files
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

use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};
use log::debug;

use crate::error::HostError;

/// Conventional library-name prefix, applied on every platform
pub const LIBRARY_PREFIX: &str = "lib";

/// Platform shared-library suffix (".so", ".dylib" or ".dll")
pub const LIBRARY_SUFFIX: &str = std::env::consts::DLL_SUFFIX;

/// Directory holding the running executable, with symlinks resolved
pub fn executable_dir() -> Result<PathBuf, HostError> {
    let exe = std::env::current_exe()
        .map_err(|source| HostError::DirectoryUnreadable {
            path: PathBuf::from("<current executable>"),
            source,
        })?;

    let exe = fs::canonicalize(&exe)
        .map_err(|source| HostError::DirectoryUnreadable { path: exe.clone(), source })?;

    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| HostError::DirectoryUnreadable {
            path: exe.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "executable has no parent directory"),
        })
}

/// Does `name` follow the shared-library naming convention?
pub fn is_candidate_name(name: &str) -> bool {
    name.starts_with(LIBRARY_PREFIX) && name.ends_with(LIBRARY_SUFFIX)
}

/// Start a single pass over `dir`
pub fn scan(dir: &Path) -> Result<LibraryScan, HostError> {
    let entries = fs::read_dir(dir)
        .map_err(|source| HostError::DirectoryUnreadable { path: dir.to_path_buf(), source })?;

    debug!("Scanning directory: {}", dir.display());
    Ok(LibraryScan { entries })
}

/// Lazy sequence of candidate library paths
///
/// Yields paths in directory-enumeration order, which the platform leaves
/// unspecified. The sequence is consumed once and cannot be restarted.
pub struct LibraryScan {
    entries: ReadDir,
}

impl Iterator for LibraryScan {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let matches = path.file_name()
                .map(|name| is_candidate_name(&name.to_string_lossy()))
                .unwrap_or(false);

            if matches {
                return Some(path);
            }
        }
        None
    }
}
