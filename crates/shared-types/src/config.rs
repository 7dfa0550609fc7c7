use serde::{Deserialize, Serialize};

fn default_production() -> bool {
    true
}

/// Resolver settings from the `[resolver]` table of `config.toml`.
///
/// `production` defaults to `true`, so a missing or incomplete config file
/// keeps the development mock path disabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverSettings {
    #[serde(default = "default_production")]
    pub production: bool,
    /// Profile id substituted by the development fallback.
    #[serde(default)]
    pub dev_mock_profile_id: Option<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            production: default_production(),
            dev_mock_profile_id: None,
        }
    }
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverSettings,
}
