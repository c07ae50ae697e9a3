use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeImageError {
    #[error("invalid block data")]
    InvalidData,
    #[error("need {expected} bytes of block data, got {actual}")]
    NotEnoughData { expected: usize, actual: usize },
    #[error("failed to build image buffer")]
    ImageDecode,
}

impl From<std::io::Error> for DecodeImageError {
    fn from(_: std::io::Error) -> Self {
        Self::InvalidData
    }
}
