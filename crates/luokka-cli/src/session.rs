//! Directory session bootstrap
//!
//! Settings are resolved and the FreeIPA session opened once, at start-up;
//! the resulting [`ClassAdmin`] is handed to whichever command runs.

use anyhow::{bail, Context};
use clap::Args;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use luokka_core::config::IPA_DEFAULT_CONF;
use luokka_core::{AuditLog, ClassAdmin, Error, IpaClient, Settings};

/// Environment variable holding the login password
pub const PASSWORD_ENV: &str = "LUOKKA_PASSWORD";

/// Connection options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Settings file (defaults to ~/.config/luokka/config.toml)
    #[arg(long, global = true, env = "LUOKKA_CONFIG")]
    pub config: Option<PathBuf>,

    /// FreeIPA server host name
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// FreeIPA base URL (overrides --server)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Account to log in as
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// Resolve settings: file, then command-line overrides
///
/// # Errors
/// Returns an error if the settings file is invalid
pub fn load_settings(global: &GlobalArgs) -> Result<Settings, Error> {
    let path = global.config.clone().or_else(Settings::default_path);
    let mut settings = match &path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(server) = &global.server {
        settings.server = Some(server.clone());
    }
    if let Some(url) = &global.url {
        settings.url = Some(url.clone());
    }
    if let Some(user) = &global.user {
        settings.user = user.clone();
    }
    Ok(settings)
}

fn password(user: &str) -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        bail!("{PASSWORD_ENV} is not set and there is no terminal to ask for the password");
    }
    dialoguer::Password::new()
        .with_prompt(format!("Password for {user}"))
        .interact()
        .context("Failed to read password")
}

/// Log in and build the operations handle
///
/// # Errors
/// Returns an error if settings are incomplete or the login fails
pub fn open(global: &GlobalArgs) -> anyhow::Result<ClassAdmin<IpaClient>> {
    let settings = load_settings(global)?;
    let base_url = settings.base_url(Path::new(IPA_DEFAULT_CONF))?;
    let password = password(&settings.user)?;

    tracing::debug!(%base_url, user = %settings.user, "connecting");
    let client = IpaClient::connect(&settings, &base_url, &password).map_err(Error::from)?;

    let log = AuditLog::new(settings.log_file.clone(), settings.log_cap);
    Ok(ClassAdmin::new(client, log, settings.initial_password))
}
