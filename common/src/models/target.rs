//! Monitored database server records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default MySQL port used when a target does not specify one.
pub const MYSQL_PORT: u16 = 3306;

/// A configured database server to monitor.
///
/// Immutable once loaded; the engine shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Target {
    /// Unique display name.
    pub name: String,
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password (never serialized).
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Target {
    /// Creates a target on the default MySQL port.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: MYSQL_PORT,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Overrides the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@tcp({}:{})", self.username, self.address, self.port)
    }
}
