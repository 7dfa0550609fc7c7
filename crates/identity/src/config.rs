use shared_types::{AppConfig, ResolverSettings};

/// Path to the config file, relative to the project root.
const CONFIG_PATH: &str = "config.toml";

/// Construction-time settings for [`crate::resolver::IdentityResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// When true the development mock path is unreachable.
    pub production: bool,
    /// Default mock id for [`crate::resolver::IdentityResolver::resolve_with_configured_fallback`].
    pub dev_mock_profile_id: Option<String>,
}

impl ResolverConfig {
    pub fn production() -> Self {
        Self {
            production: true,
            dev_mock_profile_id: None,
        }
    }

    pub fn development() -> Self {
        Self {
            production: false,
            dev_mock_profile_id: None,
        }
    }

    pub fn with_dev_mock_profile_id(mut self, id: impl Into<String>) -> Self {
        self.dev_mock_profile_id = Some(id.into());
        self
    }

    pub fn dev_fallback_enabled(&self) -> bool {
        !self.production
    }

    /// Apply a `DEPLOY_ENV` value on top of file settings.
    ///
    /// Only `development`/`dev`/`local` select development. Any other
    /// non-empty value forces production. Unset or empty keeps the file setting.
    pub fn from_settings(settings: ResolverSettings, deploy_env: Option<&str>) -> Self {
        let production = match deploy_env.map(str::trim) {
            Some(env) if !env.is_empty() => match env.to_lowercase().as_str() {
                "development" | "dev" | "local" => false,
                "production" | "prod" => true,
                other => {
                    tracing::warn!(deploy_env = other, "Unrecognised DEPLOY_ENV; using production");
                    true
                }
            },
            _ => settings.production,
        };
        Self {
            production,
            dev_mock_profile_id: settings
                .dev_mock_profile_id
                .filter(|id| !id.trim().is_empty()),
        }
    }

    /// Parse `config.toml` contents. Unparseable input falls back to defaults,
    /// which are production.
    pub fn parse(contents: &str, deploy_env: Option<&str>) -> Self {
        let config: AppConfig = toml::from_str(contents).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {CONFIG_PATH}: {e}; using production defaults");
            AppConfig::default()
        });
        Self::from_settings(config.resolver, deploy_env)
    }

    /// Read `config.toml` and `DEPLOY_ENV` (after loading `.env`).
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let deploy_env = std::env::var("DEPLOY_ENV").ok();

        let config = match std::fs::read_to_string(CONFIG_PATH) {
            Ok(contents) => Self::parse(&contents, deploy_env.as_deref()),
            Err(e) => {
                tracing::info!("{CONFIG_PATH} not found ({e}); using production defaults");
                Self::from_settings(ResolverSettings::default(), deploy_env.as_deref())
            }
        };
        tracing::info!(
            production = config.production,
            has_mock = config.dev_mock_profile_id.is_some(),
            "Resolver config loaded"
        );
        config
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::production()
    }
}
