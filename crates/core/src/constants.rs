//! Constants used throughout the Rently core crate.

/// Default upload root when no explicit directory is configured.
pub const DEFAULT_UPLOAD_ROOT: &str = "uploads";

/// Default directory for repository data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "rently_data";

/// Default bind address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Environment variable naming the upload root.
pub const UPLOAD_ROOT_ENV: &str = "RENTLY_UPLOAD_ROOT";

/// Environment variable naming the repository data directory.
pub const DATA_DIR_ENV: &str = "RENTLY_DATA_DIR";

/// Environment variable naming the REST bind address.
pub const REST_ADDR_ENV: &str = "RENTLY_REST_ADDR";

/// Directory name (under the data dir) for listing records.
pub const LISTINGS_DIR_NAME: &str = "listings";

/// Filename (under the data dir) for the user directory.
pub const USERS_FILENAME: &str = "users.yaml";

/// Longest accepted listing name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Longest accepted listing description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1023;
