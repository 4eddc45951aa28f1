use thiserror::Error;

/// Failures surfaced by the connection manager and its configuration.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not connect to MongoDB at {host}:{port}; make sure MongoDB is running")]
    Connectivity { host: String, port: u16 },

    #[error("MongoDB configuration error: {0}")]
    Configuration(String),

    #[error("database initialization failed: {0}")]
    Initialization(String),

    #[error("database not initialized; call init() first")]
    NotInitialized,
}

impl DbError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_message_names_host_and_port() {
        let err = DbError::Connectivity {
            host: "db.internal".into(),
            port: 27018,
        };
        assert!(err.to_string().contains("db.internal:27018"));
    }

    #[test]
    fn not_initialized_mentions_init() {
        assert!(DbError::NotInitialized.to_string().contains("init()"));
    }
}
