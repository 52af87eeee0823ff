use std::env;

/// Environment variable overriding [`SeedConfig::app_name`].
pub const ENV_APP_NAME: &str = "STRATA_APP_NAME";
/// Environment variable overriding [`SeedConfig::app_url`].
pub const ENV_APP_URL: &str = "STRATA_APP_URL";
/// Environment variable overriding [`SeedConfig::admin_email`].
pub const ENV_ADMIN_EMAIL: &str = "STRATA_ADMIN_EMAIL";
/// Environment variable overriding [`SeedConfig::admin_password`].
pub const ENV_ADMIN_PASSWORD: &str = "STRATA_ADMIN_PASSWORD";

pub const DEFAULT_SEED_APP_NAME: &str = "LinknLink";
pub const DEFAULT_SEED_APP_URL: &str = "http://localhost:8090";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123456789";

/// Inputs of the bootstrap migrations.
///
/// # Usage
/// ```text
/// let config = SeedConfig::from_env()
///     .with_admin_email("ops@example.com");
/// strata::migrations::register(&mut registry, &config)?;
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SeedConfig {
    app_name: String,
    app_url: String,
    admin_email: String,
    admin_password: String,
}

impl SeedConfig {
    /// Reads every value from the environment.
    ///
    /// Unset or empty variables fall back to the defaults.
    pub fn from_env() -> Self {
        SeedConfig {
            app_name: env_or(ENV_APP_NAME, DEFAULT_SEED_APP_NAME),
            app_url: env_or(ENV_APP_URL, DEFAULT_SEED_APP_URL),
            admin_email: env_or(ENV_ADMIN_EMAIL, DEFAULT_ADMIN_EMAIL),
            admin_password: env_or(ENV_ADMIN_PASSWORD, DEFAULT_ADMIN_PASSWORD),
        }
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.app_name = app_name.to_string();
        self
    }

    pub fn with_app_url(mut self, app_url: &str) -> Self {
        self.app_url = app_url.to_string();
        self
    }

    pub fn with_admin_email(mut self, admin_email: &str) -> Self {
        self.admin_email = admin_email.to_string();
        self
    }

    pub fn with_admin_password(mut self, admin_password: &str) -> Self {
        self.admin_password = admin_password.to_string();
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        SeedConfig {
            app_name: DEFAULT_SEED_APP_NAME.to_string(),
            app_url: DEFAULT_SEED_APP_URL.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("app_name", &self.app_name)
            .field("app_url", &self.app_url)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            log::debug!("{} is not set, using default", key);
            default.to_string()
        }
    }
}
