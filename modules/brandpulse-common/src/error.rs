use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrandPulseError {
    /// Bad caller input. Surfaces as a client error; no processing happened.
    #[error("{0}")]
    Validation(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BrandPulseError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, BrandPulseError::Validation(_))
    }
}
