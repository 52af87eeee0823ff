// record constants
pub const RECORD_ID: &str = "id";
pub const AUTH_EMAIL: &str = "email";
pub const AUTH_PASSWORD: &str = "password";

// system collections
pub const SUPERUSERS_COLLECTION: &str = "_superusers";
pub const SUPERUSERS_COLLECTION_ID: &str = "_pbc_superusers";
pub const USERS_COLLECTION: &str = "users";
pub const USERS_COLLECTION_ID: &str = "_pb_users_auth_";

// id constants
pub const ID_LENGTH: usize = 15;
pub const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const COLLECTION_ID_PREFIX: &str = "pbc_";

// field constants
pub const MAX_TEXT_LENGTH: usize = 5000;
pub const MIN_PASSWORD_LENGTH: usize = 8;

// settings constants
pub const DEFAULT_APP_NAME: &str = "Strata";
pub const DEFAULT_APP_URL: &str = "http://localhost:8090";
pub const DEFAULT_LOG_MAX_DAYS: u32 = 5;
