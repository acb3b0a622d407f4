//! `ar-aging config` and config file resolution.
//!
//! Lookup order: `--config` / `$AR_AGING_CONFIG`, then the per-user file
//! under the platform config directory, then built-in defaults.

use std::path::{Path, PathBuf};

use ar_aging::AgingConfig;
use clap::Subcommand;

use crate::exit_codes::EXIT_CONFIG;
use crate::CliError;

pub const CONFIG_ENV: &str = "AR_AGING_CONFIG";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    #[command(after_help = "\
Examples:
  ar-aging config show
  ar-aging config show --config team.toml > ~/.config/ar-aging/config.toml")]
    Show {
        /// Config file (overrides the per-user file)
        #[arg(long, env = CONFIG_ENV)]
        config: Option<PathBuf>,
    },

    /// Print the per-user config file location
    Path,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Explicit(PathBuf),
    User(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigOrigin::Explicit(p) | ConfigOrigin::User(p) => write!(f, "{}", p.display()),
            ConfigOrigin::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

/// `<config_dir>/ar-aging/config.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ar-aging").join("config.toml"))
}

pub fn resolve(explicit: Option<&Path>) -> ConfigOrigin {
    if let Some(path) = explicit {
        return ConfigOrigin::Explicit(path.to_path_buf());
    }
    match user_config_path() {
        Some(path) if path.is_file() => ConfigOrigin::User(path),
        _ => ConfigOrigin::BuiltIn,
    }
}

/// Resolve and parse the effective configuration.
pub fn load(explicit: Option<&Path>) -> Result<(AgingConfig, ConfigOrigin), CliError> {
    let origin = resolve(explicit);
    let config = match &origin {
        ConfigOrigin::Explicit(path) | ConfigOrigin::User(path) => read_config(path)?,
        ConfigOrigin::BuiltIn => AgingConfig::default(),
    };
    tracing::debug!("config: {origin}");
    Ok((config, origin))
}

fn read_config(path: &Path) -> Result<AgingConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::config(format!("cannot read config {}: {e}", path.display()))
    })?;
    AgingConfig::from_toml(&text).map_err(|e| {
        CliError::config(format!("{}: {e}", path.display()))
            .with_hint("run `ar-aging config show` to see the expected layout")
    })
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show { config } => {
            let (config, origin) = load(config.as_deref())?;
            let text = config
                .to_toml()
                .map_err(|e| CliError { code: EXIT_CONFIG, message: e.to_string(), hint: None })?;
            eprintln!("# source: {origin}");
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Path => match user_config_path() {
            Some(path) => {
                println!("{}", path.display());
                if !path.is_file() {
                    eprintln!("note: file does not exist; built-in defaults apply");
                }
                Ok(())
            }
            None => Err(CliError::config("no config directory on this platform")),
        },
    }
}
