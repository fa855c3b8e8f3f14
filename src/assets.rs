/*
 *  assets.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Embedded read-only asset stores
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

//! Embedded static assets
//!
//! `assets/` and `refs/` are bundled into the binary with rust-embed and
//! handed to the rest of the application under fixed identifiers. The host
//! itself never interprets their contents.

use std::borrow::Cow;
use std::marker::PhantomData;
use log::debug;
use rust_embed::RustEmbed;

pub const ASSETS_ID: &str = "main.efs.assets";
pub const REFS_ID: &str = "app.refs";

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

#[derive(RustEmbed)]
#[folder = "refs/"]
struct Refs;

/// Read-only hierarchical file store keyed by relative path
pub trait AssetStore {
    /// Fixed identifier the store is published under
    fn id(&self) -> &'static str;

    /// Short tag, e.g. "assets"
    fn tag(&self) -> &'static str;

    fn get(&self, path: &str) -> Option<Cow<'static, [u8]>>;

    fn paths(&self) -> Vec<String>;
}

/// Store backed by a rust-embed folder
pub struct EmbeddedStore<E: RustEmbed> {
    id: &'static str,
    tag: &'static str,
    _embed: PhantomData<E>,
}

impl<E: RustEmbed> EmbeddedStore<E> {
    const fn new(id: &'static str, tag: &'static str) -> Self {
        Self { id, tag, _embed: PhantomData }
    }
}

impl<E: RustEmbed> AssetStore for EmbeddedStore<E> {
    fn id(&self) -> &'static str {
        self.id
    }

    fn tag(&self) -> &'static str {
        self.tag
    }

    fn get(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        E::get(path.trim_start_matches('/')).map(|file| file.data)
    }

    fn paths(&self) -> Vec<String> {
        E::iter().map(|p| p.into_owned()).collect()
    }
}

/// Every embedded store the binary carries
pub fn stores() -> Vec<Box<dyn AssetStore>> {
    vec![
        Box::new(EmbeddedStore::<Assets>::new(ASSETS_ID, "assets")) as Box<dyn AssetStore>,
        Box::new(EmbeddedStore::<Refs>::new(REFS_ID, "refs")),
    ]
}

/// Look a store up by its identifier
pub fn store(id: &str) -> Option<Box<dyn AssetStore>> {
    stores().into_iter().find(|s| s.id() == id)
}

/// Log what is embedded (startup diagnostics)
pub fn announce() {
    for s in stores() {
        debug!("Embedded store {} ({}): {} entries", s.id(), s.tag(), s.paths().len());
    }
}
