/*
 *  plugin/entry.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Candidate images and their resolved entry points
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
use log::debug;

use crate::error::HostError;
use super::ffi::{
    AttachFn,
    DetachFn,
    InvokeFn,
    ReportFn,
    SYMBOL_ATTACH,
    SYMBOL_DETACH,
    SYMBOL_INVOKE,
    SYMBOL_REPORT,
};
use super::loader::{ImageLoader, SymbolAddress};

/// Whatever a candidate exports of the plugin contract; any may be absent
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedSymbols {
    pub attach: Option<SymbolAddress>,
    pub detach: Option<SymbolAddress>,
    pub invoke: Option<SymbolAddress>,
    pub report: Option<SymbolAddress>,
}

impl ResolvedSymbols {
    /// Names of the lifecycle functions that are not exported
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (SYMBOL_ATTACH, self.attach),
            (SYMBOL_DETACH, self.detach),
            (SYMBOL_INVOKE, self.invoke),
        ]
        .into_iter()
        .filter(|(_, addr)| addr.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Typed `Report` entry point, if exported
    pub fn report(&self) -> Option<ReportFn> {
        // SAFETY: an exported `Report` is trusted to have the contract
        // signature; the address is non-null
        self.report.map(|addr| unsafe { std::mem::transmute::<*mut std::ffi::c_void, ReportFn>(addr.as_ptr()) })
    }
}

/// Validated lifecycle entry points of one plugin
///
/// Only constructed once Attach, Detach and Invoke are all known to be
/// present, so holders never see a partial set.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub(crate) attach: AttachFn,
    pub(crate) detach: DetachFn,
    pub(crate) invoke: InvokeFn,
}

impl EntryPoints {
    /// Build the capability set, or `None` if any required symbol is absent
    pub fn from_symbols(symbols: &ResolvedSymbols) -> Option<Self> {
        let (attach, detach, invoke) = (symbols.attach?, symbols.detach?, symbols.invoke?);

        // SAFETY: all three addresses are non-null exports of the names
        // the contract assigns to these signatures
        unsafe {
            Some(Self {
                attach: std::mem::transmute::<*mut std::ffi::c_void, AttachFn>(attach.as_ptr()),
                detach: std::mem::transmute::<*mut std::ffi::c_void, DetachFn>(detach.as_ptr()),
                invoke: std::mem::transmute::<*mut std::ffi::c_void, InvokeFn>(invoke.as_ptr()),
            })
        }
    }
}

/// A loaded candidate image
///
/// Unloads its image on drop unless promoted, so every rejection path
/// releases the image exactly once.
pub struct PluginCandidate<'l, L: ImageLoader> {
    loader: &'l L,
    path: PathBuf,
    image: Option<L::Image>,
}

impl<'l, L: ImageLoader> PluginCandidate<'l, L> {
    /// Load the image at `path`
    pub fn load(loader: &'l L, path: &Path) -> Result<Self, HostError> {
        let image = loader.load(path)?;
        Ok(Self {
            loader,
            path: path.to_path_buf(),
            image: Some(image),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up every symbol of the plugin contract
    pub fn resolve_symbols(&self) -> ResolvedSymbols {
        let Some(image) = self.image.as_ref() else {
            return ResolvedSymbols::default();
        };

        ResolvedSymbols {
            attach: self.loader.resolve(image, SYMBOL_ATTACH),
            detach: self.loader.resolve(image, SYMBOL_DETACH),
            invoke: self.loader.resolve(image, SYMBOL_INVOKE),
            report: self.loader.resolve(image, SYMBOL_REPORT),
        }
    }

    /// Hand over the image; the candidate no longer unloads it
    pub(crate) fn promote(mut self) -> (PathBuf, Option<L::Image>) {
        let image = self.image.take();
        (std::mem::take(&mut self.path), image)
    }
}

impl<L: ImageLoader> Drop for PluginCandidate<'_, L> {
    fn drop(&mut self) {
        if let Some(image) = self.image.take() {
            debug!("Unloading rejected candidate: {}", self.path.display());
            self.loader.unload(image);
        }
    }
}
