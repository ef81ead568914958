use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Version parsing error: {0}")]
    SemVer(#[from] semver::Error),

    #[error("Invalid version range '{0}': {1}")]
    InvalidRange(String, String),

    #[error("Invalid target framework '{0}'")]
    InvalidFramework(String),

    #[error("Invalid registry URL '{0}': {1}")]
    InvalidRegistryUrl(String, String),

    #[error("Registry '{registry}' does not support {operation}")]
    UnsupportedOperation { registry: String, operation: String },

    #[error("Registry '{registry}' is not reachable: {source}")]
    RegistryAccess {
        registry: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid solution file: {0}")]
    InvalidSolution(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when this error is a cooperative cancellation, which callers
    /// must treat as "abandon the result" rather than a failure to report.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// True when a registry categorically cannot serve the requested
    /// operation, as opposed to a transient access failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedOperation { .. })
    }
}
