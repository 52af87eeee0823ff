use crate::common::{DEFAULT_APP_NAME, DEFAULT_APP_URL, DEFAULT_LOG_MAX_DAYS};

/// Application-level settings persisted alongside the schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub meta: MetaSettings,
    pub logs: LogsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetaSettings {
    pub app_name: String,
    pub app_url: String,
}

/// Request log retention settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogsSettings {
    pub max_days: u32,
    pub log_auth_id: bool,
    pub log_ip: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            meta: MetaSettings {
                app_name: DEFAULT_APP_NAME.to_string(),
                app_url: DEFAULT_APP_URL.to_string(),
            },
            logs: LogsSettings {
                max_days: DEFAULT_LOG_MAX_DAYS,
                log_auth_id: false,
                log_ip: true,
            },
        }
    }
}
