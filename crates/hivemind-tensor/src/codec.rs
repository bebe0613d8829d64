//! Image tensor encode/decode.
//!
//! Channel bytes are packed with the standard base64 alphabet, 3 bytes to 4
//! characters, most-significant bits first. Without alpha every pixel
//! contributes exactly one 3-byte group, so padding can only appear when
//! alpha is kept and `4 * width * height` is not a multiple of 3.
//!
//! Decoding honours `=` padding: each `=` drops one byte from the final
//! group. Unpadded input is accepted as well.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::trace;

use crate::errors::{Result, TensorError};
use crate::pixels::{PixelBuffer, RGBA_CHANNELS};
use crate::tensor::{Tensor, UINT8};

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const OPAQUE: u8 = 255;

/// Encode a pixel buffer as a `uint8` tensor.
///
/// With `alpha == false` the alpha byte of every pixel is dropped and the
/// tensor has shape `[height, width, 3]`; otherwise `[height, width, 4]`.
pub fn encode(pixels: &PixelBuffer, alpha: bool) -> Tensor {
    let (channels, data) = if alpha {
        (RGBA_CHANNELS, ENGINE.encode(pixels.as_bytes()))
    } else {
        let rgb: Vec<u8> = pixels
            .pixels()
            .flat_map(|px| px[..3].iter().copied())
            .collect();
        (3, ENGINE.encode(rgb))
    };
    trace!(
        width = pixels.width(),
        height = pixels.height(),
        channels,
        encoded_len = data.len(),
        "encoded image tensor"
    );
    Tensor {
        data,
        shape: vec![pixels.height() as usize, pixels.width() as usize, channels],
        dtype: UINT8.to_string(),
    }
}

/// Decode a `uint8` image tensor into an RGBA pixel buffer.
///
/// RGB tensors get an alpha of 255 on every pixel. Fails without producing
/// a buffer when the dtype, shape, or data length is wrong.
pub fn decode(tensor: &Tensor) -> Result<PixelBuffer> {
    if tensor.dtype != UINT8 {
        return Err(TensorError::UnsupportedDtype {
            dtype: tensor.dtype.clone(),
        });
    }
    let dims = tensor.dims()?;
    let expected = dims.byte_len()?;

    let raw = ENGINE.decode(tensor.data.as_bytes())?;
    if raw.len() != expected {
        return Err(TensorError::DataLength {
            expected,
            actual: raw.len(),
        });
    }

    let rgba = if dims.has_alpha() {
        raw
    } else {
        raw.chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], OPAQUE])
            .collect()
    };
    PixelBuffer::new(dims.width, dims.height, rgba)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn red_pixel() -> PixelBuffer {
        PixelBuffer::new(1, 1, vec![255, 0, 0, 255]).unwrap()
    }

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let data = (0..width * height * 4).map(|i| (i * 37 % 251) as u8).collect();
        PixelBuffer::new(width, height, data).unwrap()
    }

    // ── encode ──────────────────────────────────────────────────────

    #[test]
    fn red_pixel_with_alpha() {
        let t = encode(&red_pixel(), true);
        assert_eq!(t.shape, vec![1, 1, 4]);
        assert_eq!(t.dtype, "uint8");
        assert_eq!(t.data, "/wAA/w==");
    }

    #[test]
    fn red_pixel_without_alpha() {
        let t = encode(&red_pixel(), false);
        assert_eq!(t.shape, vec![1, 1, 3]);
        assert_eq!(t.data, "/wAA");
    }

    #[test]
    fn rgb_encoding_never_pads() {
        let t = encode(&gradient(5, 3), false);
        assert!(!t.data.contains('='));
        assert_eq!(t.data.len(), 5 * 3 * 4);
    }

    #[test]
    fn shape_is_height_width_channels() {
        let buf = gradient(7, 2);
        assert_eq!(encode(&buf, true).shape, vec![2, 7, 4]);
        assert_eq!(encode(&buf, false).shape, vec![2, 7, 3]);
    }

    #[test]
    fn alpha_length_follows_four_per_three() {
        // 2x2 RGBA = 16 bytes -> 6 groups, last one holding a single byte
        let t = encode(&gradient(2, 2), true);
        assert_eq!(t.data.len(), 24);
        assert!(t.data.ends_with("=="));
    }

    // ── decode ──────────────────────────────────────────────────────

    #[test]
    fn red_pixel_round_trip() {
        let decoded = decode(&encode(&red_pixel(), true)).unwrap();
        assert_eq!(decoded.as_bytes(), &[255, 0, 0, 255]);
    }

    #[test]
    fn rgb_decode_sets_opaque_alpha() {
        let src = PixelBuffer::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let decoded = decode(&encode(&src, false)).unwrap();
        assert_eq!(decoded.as_bytes(), &[1, 2, 3, 255, 5, 6, 7, 255]);
    }

    #[test]
    fn padding_truncates_final_group() {
        let t = Tensor {
            data: "/wAA/w==".into(),
            shape: vec![1, 1, 4],
            dtype: UINT8.into(),
        };
        assert_eq!(decode(&t).unwrap().as_bytes(), &[255, 0, 0, 255]);
    }

    #[test]
    fn unpadded_data_accepted() {
        let t = Tensor {
            data: "/wAA/w".into(),
            shape: vec![1, 1, 4],
            dtype: UINT8.into(),
        };
        assert_eq!(decode(&t).unwrap().as_bytes(), &[255, 0, 0, 255]);
    }

    #[test]
    fn non_uint8_dtype_rejected() {
        let mut t = encode(&red_pixel(), true);
        t.dtype = "float32".into();
        assert_matches!(
            decode(&t),
            Err(TensorError::UnsupportedDtype { dtype }) if dtype == "float32"
        );
    }

    #[test]
    fn dtype_checked_before_data() {
        let t = Tensor {
            data: "!!not base64!!".into(),
            shape: vec![1],
            dtype: "int16".into(),
        };
        assert_matches!(decode(&t), Err(TensorError::UnsupportedDtype { .. }));
    }

    #[test]
    fn character_outside_alphabet_rejected() {
        let t = Tensor {
            data: "/w-A".into(),
            shape: vec![1, 1, 3],
            dtype: UINT8.into(),
        };
        assert_matches!(decode(&t), Err(TensorError::Encoding(_)));
    }

    #[test]
    fn data_shorter_than_shape_rejected() {
        let mut t = encode(&gradient(2, 2), false);
        t.shape = vec![3, 2, 3];
        assert_matches!(
            decode(&t),
            Err(TensorError::DataLength {
                expected: 18,
                actual: 12
            })
        );
    }

    #[test]
    fn bad_channel_count_rejected() {
        let mut t = encode(&red_pixel(), true);
        t.shape = vec![1, 1, 2];
        assert_matches!(decode(&t), Err(TensorError::Shape(_)));
    }

    #[test]
    fn non_square_dimensions_not_swapped() {
        let src = gradient(3, 1);
        let decoded = decode(&encode(&src, true)).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 1);
        assert_eq!(decoded, src);
    }

    proptest! {
        #[test]
        fn alpha_round_trip_is_exact(
            (width, height, data) in (2u32..8, 2u32..8).prop_flat_map(|(w, h)| {
                (Just(w), Just(h), proptest::collection::vec(any::<u8>(), (w * h * 4) as usize))
            })
        ) {
            let src = PixelBuffer::new(width, height, data).unwrap();
            let decoded = decode(&encode(&src, true)).unwrap();
            prop_assert_eq!(decoded, src);
        }

        #[test]
        fn rgb_round_trip_keeps_color_drops_alpha(
            (width, height, data) in (2u32..8, 2u32..8).prop_flat_map(|(w, h)| {
                (Just(w), Just(h), proptest::collection::vec(any::<u8>(), (w * h * 4) as usize))
            })
        ) {
            let src = PixelBuffer::new(width, height, data).unwrap();
            let decoded = decode(&encode(&src, false)).unwrap();
            for (a, b) in src.pixels().zip(decoded.pixels()) {
                prop_assert_eq!(&a[..3], &b[..3]);
                prop_assert_eq!(b[3], 255);
            }
        }
    }
}
