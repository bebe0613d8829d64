//! # hivemind-tensor
//!
//! Converts pixel buffers to and from the JSON tensor shape the daemon
//! understands:
//!
//! ```json
//! { "data": "/wAA/w==", "shape": [1, 1, 4], "dtype": "uint8" }
//! ```
//!
//! - [`PixelBuffer`]: validated RGBA buffer, convertible from/to `image` types
//! - [`Tensor`]: the wire representation
//! - [`encode`] / [`decode`]: the codec itself

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod pixels;
pub mod tensor;

pub use codec::{decode, encode};
pub use errors::{Result, TensorError};
pub use pixels::PixelBuffer;
pub use tensor::{Tensor, UINT8};
