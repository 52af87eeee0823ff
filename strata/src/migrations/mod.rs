//! Bootstrap migrations of the link manager application.
//!
//! | version | name |
//! |---|---|
//! | 1768297640 | server_settings |
//! | 1768297641 | admin_user |
//! | 1768297642 | tags_and_links |

pub mod admin_user;
pub mod server_settings;
pub mod tags_and_links;

use crate::config::SeedConfig;
use crate::errors::StrataResult;
use crate::migration::MigrationRegistry;

/// Registers every bootstrap migration with `registry`.
pub fn register(registry: &mut MigrationRegistry, config: &SeedConfig) -> StrataResult<()> {
    registry.register(server_settings::migration(config))?;
    registry.register(admin_user::migration(config))?;
    registry.register(tags_and_links::migration())?;
    Ok(())
}
