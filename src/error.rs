use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid release version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to download: HTTP {status}")]
    DownloadFailed { status: u16 },

    #[error("Too many redirects (limit is {limit})")]
    TooManyRedirects { limit: usize },

    #[error("Checksum verification failed!\nExpected: {expected}\nActual: {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("TokenUse binary not found at {}\n\n\
             Hint: The prebuilt binary is downloaded when the package is installed.\n\
             Please reinstall the package: npm install -g tokenuse",
             path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("Failed to start {}: {source}\n\n\
             Hint: The installed binary may be damaged or built for another platform.\n\
             Please reinstall the package: npm install -g tokenuse",
             path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock install directory {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}
