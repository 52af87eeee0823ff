use crate::config::SeedConfig;
use crate::migration::{Migration, Version};
use crate::store::StoreOperations;

pub const VERSION: Version = Version::new(1768297640);
pub const NAME: &str = "server_settings";

/// Request logs are kept this many days.
pub const LOG_MAX_DAYS: u32 = 2;

/// Sets the application name and URL and the request log policy.
///
/// Settings changes are not undone on rollback.
pub fn migration(config: &SeedConfig) -> Migration {
    let app_name = config.app_name().to_string();
    let app_url = config.app_url().to_string();

    Migration::irreversible(VERSION, NAME, move |tx| {
        let mut settings = tx.settings()?;
        settings.meta.app_name = app_name.clone();
        settings.meta.app_url = app_url.clone();
        settings.logs.max_days = LOG_MAX_DAYS;
        settings.logs.log_auth_id = true;
        settings.logs.log_ip = false;
        tx.save_settings(&settings)?;

        log::info!("Server settings set for '{}' at {}", app_name, app_url);
        Ok(())
    })
}
