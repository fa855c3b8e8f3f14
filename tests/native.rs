/*
 *  tests/native.rs
 *
 *  The platform loader against the reference control plugin image
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 */

mod common;

use jam_host::host::{self, HostSettings};
use jam_host::plugin::entry::{EntryPoints, PluginCandidate};
use jam_host::plugin::{report, ImageLoader, NativeLoader, ScanStats};
use tempfile::TempDir;

use common::artifacts::{install_control_library, CONTROL_RUN_RESPONSE};

#[test]
fn test_native_loader_resolves_exports() {
    let dir = TempDir::new().unwrap();
    let path = install_control_library(dir.path());

    let image = NativeLoader.load(&path).unwrap();

    for symbol in ["Report", "Attach", "Invoke", "Detach"] {
        assert!(NativeLoader.resolve(&image, symbol).is_some(), "{symbol} not resolved");
    }
    assert!(NativeLoader.resolve(&image, "NotExported").is_none());
    assert!(NativeLoader.resolve(&image, "report").is_none());

    NativeLoader.unload(image);
}

#[test]
fn test_real_image_entry_points_and_report() {
    let dir = TempDir::new().unwrap();
    let path = install_control_library(dir.path());

    let candidate = PluginCandidate::load(&NativeLoader, &path).unwrap();
    let symbols = candidate.resolve_symbols();

    assert!(symbols.missing().is_empty());
    assert!(EntryPoints::from_symbols(&symbols).is_some());

    let meta = report::query(symbols.report().unwrap(), 256).unwrap();
    assert_eq!(meta.plugin_type, "control");
    assert_eq!(meta.product, "core");
    assert_eq!(meta.description_long, "Control plugin for discovery and orchestration");
    assert_eq!(meta.description_short, "control");
    assert_eq!(meta.plugin_id, 0);
}

#[test]
fn test_host_run_with_native_loader() {
    let dir = TempDir::new().unwrap();
    let path = install_control_library(dir.path());
    let settings = HostSettings {
        plugin_dir: Some(dir.path().to_path_buf()),
        ..HostSettings::default()
    };

    let outcome = host::run(&settings, &NativeLoader).unwrap();

    assert_eq!(outcome.path, path);
    assert_eq!(outcome.response.as_deref(), Some(CONTROL_RUN_RESPONSE));
    assert_eq!(outcome.stats, ScanStats { found: 1, loaded: 1, rejected: 0 });
}

#[test]
fn test_host_run_lists_handlers() {
    let dir = TempDir::new().unwrap();
    install_control_library(dir.path());
    let settings = HostSettings {
        plugin_dir: Some(dir.path().to_path_buf()),
        address: "control.list".into(),
        ..HostSettings::default()
    };

    let outcome = host::run(&settings, &NativeLoader).unwrap();
    let response = outcome.response.unwrap();

    assert!(response.starts_with(r#"{"handlers":["#));
    assert!(response.contains(r#""address":"control.run""#));
    assert!(response.contains(r#""address":"control.list""#));
}
