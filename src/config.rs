use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::plugin::ffi::ERROR_BUFFER_SIZE;

pub const DEFAULT_ROLE: &str = "control";
pub const DEFAULT_ADDRESS: &str = "control.run";
pub const DEFAULT_PAYLOAD: &str = "{}";
pub const DEFAULT_OPTIONS: &str = "{}";

const ERROR_BUFFER_RANGE: std::ops::RangeInclusive<usize> = 16..=65536;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub plugin: Option<PluginConfig>,
    pub invoke: Option<InvokeConfig>,
}

/// Where to look and what to look for.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginConfig {
    pub dir: Option<PathBuf>,              // default: directory of the executable
    pub role: Option<String>,              // default: "control"
    pub error_buffer_size: Option<usize>,  // bytes handed to Report/Attach/Detach
}

/// The single call issued once the plugin is attached.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InvokeConfig {
    pub address: Option<String>,   // e.g. "control.run"
    pub payload: Option<String>,   // opaque, usually JSON text
    pub options: Option<String>,   // opaque, usually JSON text
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "jam", version, about = "Discover, bind and run the control plugin")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Directory to scan for plugins (default: the executable's directory)
    #[arg(long, env = "JAM_PLUGIN_DIR", value_hint = ValueHint::DirPath)]
    pub plugin_dir: Option<PathBuf>,
    /// Plugin role to bind
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long)]
    pub error_buffer_size: Option<usize>,
    /// Invoke address
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub payload: Option<String>,
    #[arg(long)]
    pub options: Option<String>,
    /// list every candidate's capability report and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub list: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) environment + CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

impl Config {
    pub fn role(&self) -> &str {
        self.plugin.as_ref()
            .and_then(|p| p.role.as_deref())
            .unwrap_or(DEFAULT_ROLE)
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin.as_ref().and_then(|p| p.dir.as_deref())
    }

    pub fn error_buffer_size(&self) -> usize {
        self.plugin.as_ref()
            .and_then(|p| p.error_buffer_size)
            .unwrap_or(ERROR_BUFFER_SIZE)
    }

    pub fn address(&self) -> &str {
        self.invoke.as_ref()
            .and_then(|i| i.address.as_deref())
            .unwrap_or(DEFAULT_ADDRESS)
    }

    pub fn payload(&self) -> &str {
        self.invoke.as_ref()
            .and_then(|i| i.payload.as_deref())
            .unwrap_or(DEFAULT_PAYLOAD)
    }

    pub fn options(&self) -> &str {
        self.invoke.as_ref()
            .and_then(|i| i.options.as_deref())
            .unwrap_or(DEFAULT_OPTIONS)
    }
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/jam/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/jam/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/jam.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["jam.yaml", "config/jam.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    match (&mut dst.plugin, src.plugin) {
        (None, Some(c)) => dst.plugin = Some(c),
        (Some(d), Some(s)) => merge_plugin(d, s),
        _ => {}
    }
    match (&mut dst.invoke, src.invoke) {
        (None, Some(c)) => dst.invoke = Some(c),
        (Some(d), Some(s)) => merge_invoke(d, s),
        _ => {}
    }
}

fn merge_plugin(dst: &mut PluginConfig, src: PluginConfig) {
    if src.dir.is_some()                { dst.dir = src.dir; }
    if src.role.is_some()               { dst.role = src.role; }
    if src.error_buffer_size.is_some()  { dst.error_buffer_size = src.error_buffer_size; }
}

fn merge_invoke(dst: &mut InvokeConfig, src: InvokeConfig) {
    if src.address.is_some()  { dst.address = src.address; }
    if src.payload.is_some()  { dst.payload = src.payload; }
    if src.options.is_some()  { dst.options = src.options; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }

    merge(cfg, Config {
        log_level: None,
        plugin: Some(PluginConfig {
            dir: cli.plugin_dir.clone(),
            role: cli.role.clone(),
            error_buffer_size: cli.error_buffer_size,
        }),
        invoke: Some(InvokeConfig {
            address: cli.address.clone(),
            payload: cli.payload.clone(),
            options: cli.options.clone(),
        }),
    });
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.role().trim().is_empty() {
        return Err(ConfigError::Validation("plugin role must not be empty".into()));
    }
    if cfg.address().trim().is_empty() {
        return Err(ConfigError::Validation("invoke address must not be empty".into()));
    }
    for (name, value) in [("address", cfg.address()), ("payload", cfg.payload()), ("options", cfg.options())] {
        if value.contains('\0') {
            return Err(ConfigError::Validation(format!("invoke {name} must not contain NUL")));
        }
    }
    let size = cfg.error_buffer_size();
    if !ERROR_BUFFER_RANGE.contains(&size) {
        return Err(ConfigError::Validation(format!(
            "plugin error_buffer_size must be {}..={}",
            ERROR_BUFFER_RANGE.start(), ERROR_BUFFER_RANGE.end()
        )));
    }
    Ok(())
}
