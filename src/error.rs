/// Error type produced by backends; wrapped, never discarded, by the session.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the registry and capture sessions.
#[derive(Debug, thiserror::Error)]
pub enum MocapError {
    /// The requested backend id is not registered.
    #[error("unknown backend '{id}' (available: {})", .available.join(", "))]
    UnknownBackend { id: String, available: Vec<String> },

    /// The backend failed during connect (bad config, unreachable host, no device).
    #[error("failed to connect to backend '{backend}'")]
    Connection {
        backend: String,
        #[source]
        source: BackendError,
    },

    /// The backend transport failed mid-session. The session is now disconnected.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        reason: String,
        #[source]
        source: Option<BackendError>,
    },

    /// No rigid body with this name in the current frame.
    #[error("rigid body '{0}' not found in current frame")]
    NotFound(String),
}

impl MocapError {
    /// True for errors after which the session must be discarded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MocapError::ConnectionLost { .. })
    }
}

/// Errors raised while reading backend configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key '{key}'")]
    Missing { key: String },

    #[error("invalid value '{value}' for config key '{key}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
