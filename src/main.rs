/*
 *  main.rs
 *
 *  jam - control plugin host
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::process::ExitCode;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use jam_host::assets;
use jam_host::config::{self, Cli};
use jam_host::host::{self, HostSettings};
use jam_host::plugin::NativeLoader;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        return match serde_yaml::to_string(&cfg) {
            Ok(s) => {
                println!("{s}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Initialize the logger; --debug wins over the configured level
    let level = if cli.debug { "debug" } else { cfg.log_level.as_deref().unwrap_or("info") };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("=== {} HOST ===", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    assets::announce();

    let settings = HostSettings::from(&cfg);
    let result = if cli.list { survey(&settings) } else { drive(&settings) };

    match result {
        Ok(()) => {
            info!("=== {} HOST COMPLETE ===", env!("CARGO_PKG_NAME"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Bind the control plugin and issue the configured call
fn drive(settings: &HostSettings) -> anyhow::Result<()> {
    let outcome = host::run(settings, &NativeLoader)
        .with_context(|| format!("cannot run {} plugin", settings.role))?;

    info!("Ran {} from {}", outcome.plugin, outcome.path.display());

    // response goes to stdout untouched, logs go to stderr
    if let Some(response) = outcome.response {
        println!("{response}");
    }
    Ok(())
}

/// `--list`: show every candidate's capability report
fn survey(settings: &HostSettings) -> anyhow::Result<()> {
    let entries = host::list(settings, &NativeLoader)
        .context("cannot survey plugin directory")?;

    println!("=== DISCOVERED PLUGINS ===");
    for (i, entry) in entries.iter().enumerate() {
        let name = entry.path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &entry.report {
            Ok(meta) => println!("{}. {} - {}", i + 1, name, meta),
            Err(e) => println!("{}. {} - rejected: {}", i + 1, name, e),
        }
    }
    println!("==========================");
    Ok(())
}
