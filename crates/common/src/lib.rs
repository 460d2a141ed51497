//! airshipUI Common Library
//!
//! Wire envelope, payload types, and errors shared by the airshipUI client
//! and command line crates.

pub mod envelope;
pub mod error;
pub mod types;
pub mod yaml;

// Re-export commonly used types
pub use envelope::{
    component, sub, ActionType, AuthMethod, Authentication, Channel, Dashboard, DocumentMode,
    Envelope, RouteKey, PROTOCOL_VERSION,
};
pub use error::{Error, Result};
pub use types::*;

/// airshipUI client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default state directory
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".airshipui")
}

/// Default location of the cached session token
pub fn default_token_path() -> std::path::PathBuf {
    default_store_path().join("token.json")
}

/// Default client configuration file
pub fn default_config_path() -> std::path::PathBuf {
    default_store_path().join("client.toml")
}

/// Current wall clock in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh correlation id for an outgoing request
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
