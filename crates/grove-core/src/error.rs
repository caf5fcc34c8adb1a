use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading a file's content.
///
/// Never escapes the content reader; it is rendered into the observation
/// string instead.
#[derive(Error, Debug)]
pub enum ContentReadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure while extracting metadata from a manifest file.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
