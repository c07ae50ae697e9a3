use std::fmt::Display;

use thiserror::Error;

use crate::classes::ClassID;
use crate::reader::Eof;
use crate::texture::TextureFormat;

#[derive(Debug, Error)]
pub enum UnityError {
    #[error("unexpected end of data")]
    Eof,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unknown file signature")]
    UnknownSignature,
    #[error("unsupported bundle signature {0}")]
    UnsupportedSignature(String),
    #[error("unsupported serialized file version {0}")]
    UnsupportedVersion(u32),
    #[error("unsupported compression type {0}")]
    UnsupportedCompression(u32),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("type tree not available for class {0:?}")]
    TypeTreeNotFound(ClassID),
    #[error("deserialize failed: {0}")]
    Deserialize(String),
    #[error("no object with path id {0}")]
    ObjectNotFound(i64),
    #[error("object {path_id} is a {class:?}, not a Texture2D or Sprite")]
    NotATexture { path_id: i64, class: ClassID },
    #[error("field {0} missing from object")]
    MissingField(String),
    #[error("resource file {0} not found")]
    ResourceNotFound(String),
    #[error("unknown texture format {0}")]
    UnknownTextureFormat(i32),
    #[error("texture format {0:?} is not supported")]
    UnsupportedTextureFormat(TextureFormat),
    #[error("texture decode failed: {0}")]
    Decode(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type UnityResult<T> = Result<T, UnityError>;

impl From<Eof> for UnityError {
    fn from(_: Eof) -> Self {
        Self::Eof
    }
}

impl From<texture_decoder::DecodeImageError> for UnityError {
    fn from(e: texture_decoder::DecodeImageError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl serde::de::Error for UnityError {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Self::Deserialize(msg.to_string())
    }
}
