//! Data layers and their texel encodings.
//!
//! Every layer shares one pipeline; only the texel type differs:
//!
//! | Layer        | Texel  | Size | Range source            |
//! |--------------|--------|------|-------------------------|
//! | `Elevation`  | `f32`  | 4    | tile header             |
//! | `Color`      | `Rgb8` | 3    | -                       |
//! | `Scalar(n)`  | `f32`  | 4    | texels, nodata excluded |

use std::fmt;

/// Fixed-size little-endian texel.
pub trait Texel: Copy + PartialEq + fmt::Debug + Send + 'static {
  /// Encoded size in bytes.
  const SIZE: usize;

  /// Decode from exactly `SIZE` bytes.
  fn decode(bytes: &[u8]) -> Self;

  /// Encode into exactly `SIZE` bytes.
  fn encode(self, out: &mut [u8]);
}

impl Texel for f32 {
  const SIZE: usize = 4;

  #[inline]
  fn decode(bytes: &[u8]) -> Self {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
  }

  #[inline]
  fn encode(self, out: &mut [u8]) {
    out[..4].copy_from_slice(&self.to_le_bytes());
  }
}

/// 8-bit RGB color texel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb8(pub [u8; 3]);

impl Rgb8 {
  pub const BLACK: Self = Self([0, 0, 0]);
}

impl Texel for Rgb8 {
  const SIZE: usize = 3;

  #[inline]
  fn decode(bytes: &[u8]) -> Self {
    Self([bytes[0], bytes[1], bytes[2]])
  }

  #[inline]
  fn encode(self, out: &mut [u8]) {
    out[..3].copy_from_slice(&self.0);
  }
}

/// Data layer of a tile pyramid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
  Elevation,
  Color,
  /// Additional scalar layer, numbered in source order.
  Scalar(u8),
}

impl Layer {
  /// Encoded texel size of the layer.
  pub fn texel_size(self) -> usize {
    match self {
      Layer::Color => Rgb8::SIZE,
      Layer::Elevation | Layer::Scalar(_) => f32::SIZE,
    }
  }
}

impl fmt::Display for Layer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Layer::Elevation => f.write_str("elevation"),
      Layer::Color => f.write_str("color"),
      Layer::Scalar(n) => write!(f, "layer {n}"),
    }
  }
}

/// Decode a raw texel buffer into `out`.
///
/// `bytes` must hold at least `out.len() * T::SIZE` bytes.
pub fn decode_texels<T: Texel>(bytes: &[u8], out: &mut [T]) {
  debug_assert!(bytes.len() >= out.len() * T::SIZE);
  for (texel, chunk) in out.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
    *texel = T::decode(chunk);
  }
}

/// Encode texels into a fresh byte buffer.
pub fn encode_texels<T: Texel>(texels: &[T]) -> Vec<u8> {
  let mut bytes = vec![0u8; texels.len() * T::SIZE];
  for (texel, chunk) in texels.iter().zip(bytes.chunks_exact_mut(T::SIZE)) {
    texel.encode(chunk);
  }
  bytes
}

/// `[min, max]` of the values that are not `nodata`.
///
/// NaN counts as nodata. Returns `[0, 0]` when nothing is valid.
pub fn value_range(values: &[f32], nodata: f32) -> [f32; 2] {
  let mut range = [f32::INFINITY, f32::NEG_INFINITY];
  for &v in values {
    if v == nodata || v.is_nan() {
      continue;
    }
    range[0] = range[0].min(v);
    range[1] = range[1].max(v);
  }
  if range[0] > range[1] {
    [0.0, 0.0]
  } else {
    range
  }
}
