//! Optional on-disk configuration, following `refinery_core::config`'s
//! shape: a TOML file naming the schema-master table and toggling whether
//! [`crate::Manager::initialize`] is allowed to fall back to a destructive
//! rebuild. Feature-gated behind `config` since most embedders wire these
//! two values up directly in code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Kind};

/// The default schema-master table name, used when a loaded `Config` leaves
/// `schema_master_table` unset.
pub const DEFAULT_SCHEMA_MASTER_TABLE: &str = "schema_master";

/// Settings an embedder would otherwise hardcode: the schema-master table
/// name and the destructive-fallback toggle passed to `initialize`.
///
/// Can be built directly with [`Config::new`] or loaded from a TOML file on
/// disk with [`Config::from_file_location`].
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_table_name")]
    schema_master_table: String,
    #[serde(default)]
    fallback_destructive: bool,
}

fn default_table_name() -> String {
    DEFAULT_SCHEMA_MASTER_TABLE.to_string()
}

impl Default for Config {
    fn default() -> Config {
        Config {
            schema_master_table: default_table_name(),
            fallback_destructive: false,
        }
    }
}

impl Config {
    /// Build a `Config` with the default table name and fallback disabled.
    pub fn new() -> Config {
        Config::default()
    }

    /// Load a `Config` from a TOML file on disk.
    pub fn from_file_location<T: AsRef<Path>>(location: T) -> Result<Config, Error> {
        let file = std::fs::read_to_string(location).map_err(|err| {
            Error::new(Kind::InvalidConfiguration(format!(
                "could not open config file: {err}"
            )))
        })?;

        toml::from_str(&file).map_err(|err| {
            Error::new(Kind::InvalidConfiguration(format!(
                "could not parse config file: {err}"
            )))
        })
    }

    pub fn schema_master_table(&self) -> &str {
        &self.schema_master_table
    }

    pub fn fallback_destructive(&self) -> bool {
        self.fallback_destructive
    }

    pub fn set_schema_master_table(self, name: impl Into<String>) -> Config {
        Config {
            schema_master_table: name.into(),
            ..self
        }
    }

    pub fn set_fallback_destructive(self, fallback_destructive: bool) -> Config {
        Config {
            fallback_destructive,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_conservative() {
        let config = Config::new();
        assert_eq!(config.schema_master_table(), DEFAULT_SCHEMA_MASTER_TABLE);
        assert!(!config.fallback_destructive());
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = Config::new()
            .set_schema_master_table("_meta_schema")
            .set_fallback_destructive(true);
        assert_eq!(config.schema_master_table(), "_meta_schema");
        assert!(config.fallback_destructive());
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new_in(".").unwrap();
        writeln!(file, "schema_master_table = \"versions\"").unwrap();
        writeln!(file, "fallback_destructive = true").unwrap();

        let config = Config::from_file_location(file.path()).unwrap();
        assert_eq!(config.schema_master_table(), "versions");
        assert!(config.fallback_destructive());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new_in(".").unwrap();
        writeln!(file, "fallback_destructive = true").unwrap();

        let config = Config::from_file_location(file.path()).unwrap();
        assert_eq!(config.schema_master_table(), DEFAULT_SCHEMA_MASTER_TABLE);
        assert!(config.fallback_destructive());
    }

    #[test]
    fn reports_invalid_configuration_for_missing_file() {
        let err = Config::from_file_location("does-not-exist.toml").unwrap_err();
        match err.kind() {
            Kind::InvalidConfiguration(msg) => assert!(msg.contains("could not open config file")),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
