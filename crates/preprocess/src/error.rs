use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to resize {width}x{height} image: {reason}")]
    Resize {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Failed to re-encode frame as JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Frame does not fit tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl NormalizeError {
    /// Short label for logs and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizeError::Decode(_) => "decode",
            NormalizeError::Resize { .. } => "resize",
            NormalizeError::Encode(_) => "encode",
            NormalizeError::Shape(_) => "shape",
        }
    }
}
