use std::path::PathBuf;

use thiserror::Error;

use crate::{
    retry::{Classify, RetryClass},
    transport::TransportError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no transmittable source for asset \"{key}\"")]
    ResourceNotFound { key: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to read {}: {source}", path.display())]
    ReadAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn resource_not_found(key: impl Into<String>) -> Self {
        Self::ResourceNotFound { key: key.into() }
    }

    #[must_use]
    pub fn read_asset(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadAsset {
            path: path.into(),
            source,
        }
    }
}

/// Only transport failures are ever transient.
impl Classify for Error {
    fn retry_class(&self) -> RetryClass {
        match self {
            Self::Transport(e) => e.retry_class(),
            _ => RetryClass::Permanent,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
