use anyhow::{Context, Result};
use reconcile::GroupAttributes;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cli::RunArgs;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ldap-group-cleanup"))
}

/// Default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config File
// ============================================================================

/// Contents of config.toml; every key is optional
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Bind password; prefer the prompt or LDAP_PASSWORD
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub base_dn: Option<String>,

    #[serde(default)]
    pub principal_filter: Option<String>,

    #[serde(default)]
    pub group_filter: Option<String>,

    #[serde(default)]
    pub member_attribute: Option<String>,

    #[serde(default)]
    pub label_attribute: Option<String>,

    #[serde(default)]
    pub description_attribute: Option<String>,

    /// Upgrade with StartTLS before binding (default: true)
    #[serde(default)]
    pub starttls: Option<bool>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load the config file
    ///
    /// An explicit path must exist. The default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                Self::load_from(Path::new(&expanded))
            }
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config file at {}", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load a config file from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

pub const DEFAULT_PRINCIPAL_FILTER: &str = "(objectClass=person)";
pub const DEFAULT_GROUP_FILTER: &str = "(objectClass=groupOfNames)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Required settings that were given nowhere
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required setting(s): {}", .0.join(", "))]
pub struct MissingSettings(pub Vec<&'static str>);

/// Settings after merging flags, environment and config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub starttls: bool,
    pub timeout: Duration,
    pub bind_dn: String,
    pub password: Option<String>,
    pub base_dn: String,
    pub principal_filter: String,
    pub group_filter: String,
    pub attributes: GroupAttributes,
    pub dry_run: bool,
    pub strict_principals: bool,
}

impl Settings {
    /// Merge command line values over the config file
    pub fn resolve(args: &RunArgs, file: FileConfig) -> Result<Self, MissingSettings> {
        let host = args.host.clone().or(file.host);
        let bind_dn = args.bind_dn.clone().or(file.bind_dn);
        let base_dn = args.base_dn.clone().or(file.base_dn);

        let missing: Vec<&'static str> = [
            ("host", host.is_none()),
            ("bind_dn", bind_dn.is_none()),
            ("base_dn", base_dn.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(host), Some(bind_dn), Some(base_dn)) = (host, bind_dn, base_dn) else {
            return Err(MissingSettings(missing));
        };

        let defaults = GroupAttributes::default();
        let attributes = GroupAttributes {
            member: args
                .member_attribute
                .clone()
                .or(file.member_attribute)
                .unwrap_or(defaults.member),
            label: file.label_attribute.unwrap_or(defaults.label),
            description: file.description_attribute.unwrap_or(defaults.description),
        };

        Ok(Self {
            url: ldap_url(&host),
            starttls: !args.no_starttls && file.starttls.unwrap_or(true),
            timeout: Duration::from_secs(
                args.timeout
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            bind_dn,
            password: args.password.clone().or(file.password),
            base_dn,
            principal_filter: args
                .principal_filter
                .clone()
                .or(file.principal_filter)
                .unwrap_or_else(|| DEFAULT_PRINCIPAL_FILTER.to_string()),
            group_filter: args
                .group_filter
                .clone()
                .or(file.group_filter)
                .unwrap_or_else(|| DEFAULT_GROUP_FILTER.to_string()),
            attributes,
            dry_run: args.dry_run,
            strict_principals: args.strict_principals,
        })
    }
}

/// Turn a bare host into an ldap:// URL; URLs pass through
pub fn ldap_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("ldap://{host}")
    }
}
