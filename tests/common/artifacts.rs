/*
 *  tests/common/artifacts.rs
 *
 *  Builds the reference control plugin for tests that load a real image
 *
 *  jam - control plugin host
 *  (c) 2020-26 Stuart Hunter
 */

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use assert_cmd::Command;

use super::lib_name;

/// Response of the reference plugin to `control.run`
pub const CONTROL_RUN_RESPONSE: &str = r#"{"message":"control plugin ready","success":true}"#;

/// Build `jam-plugin-control` once per test binary; path of the cdylib
///
/// Uses its own target directory so the nested cargo never waits on the
/// lock held by the outer build.
pub fn control_library() -> &'static Path {
    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();

    LIBRARY.get_or_init(|| {
        let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("plugin-build");

        Command::new(env!("CARGO"))
            .current_dir(env!("CARGO_MANIFEST_DIR"))
            .args(["build", "-p", "jam-plugin-control", "--target-dir"])
            .arg(&target_dir)
            .assert()
            .success();

        // cargo emits `jam_control.dll` on Windows, `libjam_control.so` elsewhere
        target_dir.join("debug").join(format!("{}jam_control{}", DLL_PREFIX, DLL_SUFFIX))
    })
}

/// Install the built plugin into `dir` under the name the host scans for
pub fn install_control_library(dir: &Path) -> PathBuf {
    let dest = dir.join(lib_name("jam_control"));
    fs::copy(control_library(), &dest).unwrap();
    dest
}
