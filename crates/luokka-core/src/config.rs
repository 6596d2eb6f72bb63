//! Settings
//!
//! Loaded from a TOML file (`~/.config/luokka/config.toml` by default); every
//! field has a default so a missing file is fine. When no server is set the
//! FreeIPA client configuration in `/etc/ipa/default.conf` is consulted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::audit::DEFAULT_LOG_CAP;
use crate::error::{Error, Result};

/// FreeIPA client configuration written by `ipa-client-install`
pub const IPA_DEFAULT_CONF: &str = "/etc/ipa/default.conf";

/// CA certificate installed by `ipa-client-install`
pub const IPA_CA_CERT: &str = "/etc/ipa/ca.crt";

/// Tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// FreeIPA server host name
    pub server: Option<String>,

    /// Base URL, overrides `server` (`https://ipa.example.com`)
    pub url: Option<String>,

    /// Account used to log in
    pub user: String,

    /// PEM bundle trusted for the server certificate
    pub ca_cert: Option<PathBuf>,

    /// JSON-RPC API version sent with every command
    pub api_version: String,

    /// Password given to new student accounts
    pub initial_password: String,

    /// Audit log location
    pub log_file: PathBuf,

    /// Lines kept in the audit log
    pub log_cap: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: None,
            url: None,
            user: "admin".to_string(),
            ca_cert: None,
            api_version: "2.251".to_string(),
            initial_password: "changeme".to_string(),
            log_file: PathBuf::from("ipa_luokkahallinta.log"),
            log_cap: DEFAULT_LOG_CAP,
        }
    }
}

impl Settings {
    /// Default settings file location
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("luokka").join("config.toml"))
    }

    /// Load settings from `path`, or defaults if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but is unreadable or invalid
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{}: {e}", path.display()))),
        }
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid settings TOML
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Base URL of the FreeIPA server.
    ///
    /// `url` wins over `server`; with neither set, `ipa_conf` (normally
    /// [`IPA_DEFAULT_CONF`]) is read for the enrolled server.
    ///
    /// # Errors
    /// Returns an error if no server can be determined
    pub fn base_url(&self, ipa_conf: &Path) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        if let Some(server) = &self.server {
            return Ok(format!("https://{server}"));
        }
        let content = fs::read_to_string(ipa_conf).map_err(|_| {
            Error::Config(format!(
                "no FreeIPA server configured and {} is not readable",
                ipa_conf.display()
            ))
        })?;
        server_from_ipa_conf(&content)
            .map(|server| format!("https://{server}"))
            .ok_or_else(|| {
                Error::Config(format!("no server entry in {}", ipa_conf.display()))
            })
    }

    /// CA bundle to trust: the configured one, else the enrolled client's
    #[must_use]
    pub fn ca_cert_path(&self) -> Option<PathBuf> {
        self.ca_cert.clone().or_else(|| {
            let enrolled = PathBuf::from(IPA_CA_CERT);
            enrolled.exists().then_some(enrolled)
        })
    }
}

/// Server host from the `[global]` section of an IPA `default.conf`.
///
/// Prefers `server =`, falls back to the host of `xmlrpc_uri =`.
#[must_use]
pub fn server_from_ipa_conf(content: &str) -> Option<String> {
    let mut in_global = false;
    let mut server = None;
    let mut xmlrpc_host = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_global = line == "[global]";
            continue;
        }
        if !in_global {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "server" if !value.is_empty() => server = Some(value.to_string()),
            "xmlrpc_uri" => {
                xmlrpc_host = value
                    .split_once("://")
                    .and_then(|(_, rest)| rest.split('/').next())
                    .filter(|host| !host.is_empty())
                    .map(str::to_string);
            }
            _ => {}
        }
    }

    server.or(xmlrpc_host)
}
