//! Codec error types.

use thiserror::Error;

/// Errors raised while building, encoding, or decoding image tensors.
#[derive(Debug, Error)]
pub enum TensorError {
    /// The tensor carries a dtype other than `uint8`.
    #[error("image tensor must be uint8, got '{dtype}'")]
    UnsupportedDtype {
        /// The rejected dtype tag.
        dtype: String,
    },

    /// The tensor shape is not `[height, width, 3 | 4]`.
    #[error("invalid image tensor shape: {0}")]
    Shape(String),

    /// A pixel buffer's length does not match `width * height * 4`.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes required by the dimensions.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// Decoded tensor data does not match the shape.
    #[error("tensor data decodes to {actual} bytes, shape requires {expected}")]
    DataLength {
        /// Bytes required by the shape.
        expected: usize,
        /// Bytes produced by decoding.
        actual: usize,
    },

    /// The data string is not valid base64.
    #[error("invalid tensor data: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, TensorError>;
