/*
 *  plugin/report.rs
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 *
 *  Capability report query
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

use std::fmt;

use super::ffi::{copy_c_string, ErrorBuffer, PluginDescriptor, ReportFn};

/// Plugin metadata copied out of a successful capability report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Role tag (e.g. "control")
    pub plugin_type: String,

    /// Product name (e.g. "core")
    pub product: String,

    pub description_long: String,

    pub description_short: String,

    /// Informational only
    pub plugin_id: u64,
}

impl fmt::Display for PluginMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} (type={}, id=0x{:x})",
            self.product, self.description_short, self.plugin_type, self.plugin_id)
    }
}

/// Call `Report` and copy the descriptor before anything else touches
/// the plugin
///
/// The error is the plugin's diagnostic text.
pub fn query(report: ReportFn, error_capacity: usize) -> Result<PluginMetadata, String> {
    let mut desc = PluginDescriptor::default();
    let mut err = ErrorBuffer::new(error_capacity);

    // SAFETY: the buffer and descriptor outlive the call and the capacity
    // passed matches the allocation
    let status = unsafe { report(err.as_mut_ptr(), err.capacity(), &mut desc) };

    if status == 0 {
        return Err(err.message_or("Report returned failure without detail"));
    }

    // SAFETY: on success the plugin guarantees the strings are valid until
    // its next invocation, and none happens before these copies
    let plugin_type = unsafe { copy_c_string(desc.plugin_type) }
        .ok_or_else(|| "returned null plugin_type".to_string())?;

    let (product, description_long, description_short) = unsafe {
        (
            copy_c_string(desc.product).unwrap_or_default(),
            copy_c_string(desc.description_long).unwrap_or_default(),
            copy_c_string(desc.description_short).unwrap_or_default(),
        )
    };

    Ok(PluginMetadata {
        plugin_type,
        product,
        description_long,
        description_short,
        plugin_id: desc.plugin_id as u64,
    })
}
