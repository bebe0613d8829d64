//! Wire representation of an image tensor.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TensorError};

/// The only dtype tag image tensors carry.
pub const UINT8: &str = "uint8";

/// A dense row-major pixel buffer encoded for JSON transport.
///
/// `shape` is `[height, width, channels]` with channels 3 (RGB) or 4 (RGBA).
/// `data` is standard base64 of the channel bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tensor {
    /// Base64 channel bytes.
    pub data: String,
    /// `[height, width, channels]`.
    pub shape: Vec<usize>,
    /// Element type tag.
    pub dtype: String,
}

/// Validated tensor dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    /// Rows.
    pub height: u32,
    /// Columns.
    pub width: u32,
    /// 3 or 4.
    pub channels: usize,
}

impl Dims {
    /// Whether the tensor carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        self.channels == 4
    }

    /// Number of channel bytes the data must decode to.
    pub fn byte_len(self) -> Result<usize> {
        (self.height as usize)
            .checked_mul(self.width as usize)
            .and_then(|n| n.checked_mul(self.channels))
            .ok_or_else(|| TensorError::Shape("tensor is too large".into()))
    }
}

impl Tensor {
    /// Check and unpack `shape`.
    pub fn dims(&self) -> Result<Dims> {
        let &[height, width, channels] = self.shape.as_slice() else {
            return Err(TensorError::Shape(format!(
                "expected [height, width, channels], got {:?}",
                self.shape
            )));
        };
        if channels != 3 && channels != 4 {
            return Err(TensorError::Shape(format!(
                "channel count must be 3 or 4, got {channels}"
            )));
        }
        let height = u32::try_from(height)
            .map_err(|_| TensorError::Shape(format!("height {height} out of range")))?;
        let width = u32::try_from(width)
            .map_err(|_| TensorError::Shape(format!("width {width} out of range")))?;
        Ok(Dims {
            height,
            width,
            channels,
        })
    }

    /// Parse a tensor out of an arbitrary JSON value, e.g. a command result.
    pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let t = Tensor {
            data: "/wAA/w==".into(),
            shape: vec![1, 1, 4],
            dtype: UINT8.into(),
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v, json!({"data": "/wAA/w==", "shape": [1, 1, 4], "dtype": "uint8"}));
    }

    #[test]
    fn from_value_reads_result_payload() {
        let t = Tensor::from_value(json!({"data": "AAAA", "shape": [1, 1, 3], "dtype": "uint8"}))
            .unwrap();
        assert_eq!(t.shape, vec![1, 1, 3]);
    }

    #[test]
    fn from_value_rejects_negative_dims() {
        assert!(Tensor::from_value(json!({"data": "", "shape": [-1, 1, 3], "dtype": "uint8"})).is_err());
    }

    #[test]
    fn dims_unpacks_height_width_channels() {
        let t = Tensor {
            data: String::new(),
            shape: vec![480, 640, 3],
            dtype: UINT8.into(),
        };
        let dims = t.dims().unwrap();
        assert_eq!(dims.height, 480);
        assert_eq!(dims.width, 640);
        assert!(!dims.has_alpha());
        assert_eq!(dims.byte_len().unwrap(), 480 * 640 * 3);
    }

    #[test]
    fn dims_rejects_wrong_rank() {
        let t = Tensor {
            data: String::new(),
            shape: vec![4, 4],
            dtype: UINT8.into(),
        };
        assert_matches!(t.dims(), Err(TensorError::Shape(_)));
    }

    #[test]
    fn dims_rejects_grayscale() {
        let t = Tensor {
            data: String::new(),
            shape: vec![4, 4, 1],
            dtype: UINT8.into(),
        };
        let err = t.dims().unwrap_err();
        assert!(err.to_string().contains("3 or 4"));
    }
}
