//! Runtime configuration, read from a TOML file.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! firm_name = "BTown Accounting"
//! id_prefix = "BTOWN"
//! from_email = "noreply@btownaccounting.ca"
//! admin_email = "contact@btownaccounting.ca"
//! draft_dir = "/var/lib/taxintake/drafts"
//! draft_max_age_days = 30
//! rules_file = "rules.txt"
//! default_province = "ON"
//! default_filing_type = "personal"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FormState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    pub firm_name: String,
    /// First segment of generated intake ids.
    pub id_prefix: String,
    pub from_email: String,
    /// Recipient of new-intake notifications.
    pub admin_email: String,
    /// Where [`FileDraftStore`](crate::FileDraftStore) keeps drafts.
    pub draft_dir: PathBuf,
    pub draft_max_age_days: u32,
    /// A rule DSL file replacing the built-in rule table.
    pub rules_file: Option<PathBuf>,
    pub default_province: String,
    pub default_filing_type: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            firm_name: "BTown Accounting".to_owned(),
            id_prefix: "BTOWN".to_owned(),
            from_email: "noreply@btownaccounting.ca".to_owned(),
            admin_email: "contact@btownaccounting.ca".to_owned(),
            draft_dir: default_draft_dir(),
            draft_max_age_days: 30,
            rules_file: None,
            default_province: "ON".to_owned(),
            default_filing_type: "personal".to_owned(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ca", "btownaccounting", "taxintake")
}

fn default_draft_dir() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(".taxintake").join("drafts"),
        |dirs| dirs.data_dir().join("drafts"),
    )
}

impl IntakeConfig {
    /// The per-user config file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Read and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid TOML,
    /// or holds an unusable value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, else the per-user file if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a chosen file cannot be loaded.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix_ok = !self.id_prefix.is_empty()
            && self
                .id_prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !prefix_ok {
            return Err(ConfigError::Invalid {
                key: "id_prefix",
                message: format!("'{}' must be upper-case letters or digits", self.id_prefix),
            });
        }
        if !self.admin_email.contains('@') {
            return Err(ConfigError::Invalid {
                key: "admin_email",
                message: format!("'{}' is not an email address", self.admin_email),
            });
        }
        if !self.from_email.contains('@') {
            return Err(ConfigError::Invalid {
                key: "from_email",
                message: format!("'{}' is not an email address", self.from_email),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn draft_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.draft_max_age_days))
    }

    /// A fresh form seeded with the tax year, province and filing type.
    #[must_use]
    pub fn initial_form(&self, tax_year: i32) -> FormState {
        FormState::new()
            .set("taxYear", tax_year)
            .set("province", self.default_province.as_str())
            .set("filingType", self.default_filing_type.as_str())
    }
}
