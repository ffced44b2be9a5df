//! Errors of the crate.

pub use burn::record::RecorderError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Data Error: {0}")]
    Data(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Load Error: {0}")]
    Load(String),

    #[error("Polygon Error: {0}")]
    Polygon(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Rasterize Error: {0}")]
    Rasterize(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Record Error: {0:?}")]
    Record(RecorderError),

    #[error("Shape Error: {0}")]
    Shape(String),

    #[error("Validation Error: {0} should be {1}")]
    Validation(String, String),
}

impl From<RecorderError> for Error {
    #[inline]
    fn from(error: RecorderError) -> Self {
        Self::Record(error)
    }
}
