use thiserror::Error;

/// Main error type for story-billing
#[derive(Error, Debug)]
pub enum BillingError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Epics API returned a non-success response
    #[error("Epics API error: {0}")]
    EpicsApi(String),

    /// Graph token exchange or send failure
    #[error("Graph error: {0}")]
    Graph(String),
}

/// Result type alias for story-billing operations
pub type Result<T> = std::result::Result<T, BillingError>;

impl BillingError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new missing-configuration error
    pub fn missing<S: Into<String>>(name: S) -> Self {
        Self::MissingConfig(name.into())
    }

    /// Create a new Epics API error
    pub fn epics_api<S: Into<String>>(msg: S) -> Self {
        Self::EpicsApi(msg.into())
    }

    /// Create a new Graph error
    pub fn graph<S: Into<String>>(msg: S) -> Self {
        Self::Graph(msg.into())
    }
}
