/*
 *  lib.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
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

//! jam host library
//!
//! Split from the binary so the pipeline can be driven from integration
//! tests with an in-process loader.

pub mod assets;
pub mod config;
pub mod error;
pub mod host;
pub mod plugin;

pub use error::HostError;
pub use host::{HostSettings, Outcome};
