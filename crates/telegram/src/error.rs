use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("script step {step} references unknown asset '{asset}'")]
    UnknownAsset { step: usize, asset: String },
}

impl Error {
    #[must_use]
    pub fn unknown_asset(step: usize, asset: impl Into<String>) -> Self {
        Self::UnknownAsset {
            step,
            asset: asset.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
