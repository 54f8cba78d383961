use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use connector_core::config::{LoggingConfig, ProviderConfig};

pub const ENV_PREFIX: &str = "CONNECTOR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Layers `/etc/connector/connector.toml`, `./connector.toml`, the
    /// explicit file and `CONNECTOR_*` variables, later sources winning.
    pub fn new(explicit_file: &Option<PathBuf>) -> Result<Self, config::ConfigError> {
        Self::load(
            Path::new("/etc/connector/connector.toml"),
            Path::new("connector.toml"),
            explicit_file.as_deref(),
        )
    }

    fn load(
        base: &Path,
        local: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self, config::ConfigError> {
        let mut s = config::Config::builder();

        s = s.add_source(config::File::from(base).required(false));
        s = s.add_source(config::File::from(local).required(false));

        // an explicit file must exist
        if let Some(explicit) = explicit {
            s = s.add_source(config::File::from(explicit).required(true));
        }

        // double underscore keeps snake_case field names intact
        s = s.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        s.build()?.try_deserialize()
    }
}
