//! Image Engine Abstraction
//!
//! Decoding, drawing and encoding of raster images owned by the native side.
//! The core only ever holds opaque addresses returned by these calls and must
//! hand each one back through the matching `release_*` call exactly once.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque identifier of a resource owned by a native collaborator.
///
/// `0` is never a valid address; it marks an empty or released slot.
pub type NativeAddress = u64;

/// Axis-aligned rectangle in pixel coordinates.
///
/// Crosses the boundary as a four-integer array `[left, top, right, bottom]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin with the given size.
    ///
    /// Sizes beyond `i32::MAX` are capped.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    /// Horizontal extent, saturating at the `i32` range.
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    /// Vertical extent, saturating at the `i32` range.
    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// A rectangle with no positive area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn to_array(self) -> [i32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

impl From<[i32; 4]> for Rect {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        r.to_array()
    }
}

/// Output encoding for [`ImageEngine::encode_surface`] / [`ImageEngine::encode_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressFormat {
    Jpeg,
    Png,
    Webp,
    WebpLossy,
    WebpLossless,
}

impl CompressFormat {
    /// Integer code understood by the native encoder.
    pub fn native_code(self) -> i32 {
        match self {
            CompressFormat::Jpeg => 0,
            CompressFormat::Png => 1,
            CompressFormat::Webp => 2,
            CompressFormat::WebpLossy => 3,
            CompressFormat::WebpLossless => 4,
        }
    }

    pub fn from_native_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CompressFormat::Jpeg),
            1 => Some(CompressFormat::Png),
            2 => Some(CompressFormat::Webp),
            3 => Some(CompressFormat::WebpLossy),
            4 => Some(CompressFormat::WebpLossless),
            _ => None,
        }
    }
}

/// Result of decoding an encoded image: its handle plus fixed dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    pub address: NativeAddress,
    pub width: u32,
    pub height: u32,
}

/// Native image engine trait
///
/// Two kinds of resources live behind this trait:
/// - **images**: immutable decoded bitmaps created by [`decode_image`](Self::decode_image)
/// - **surfaces**: mutable drawing targets created by [`create_surface`](Self::create_surface)
///
/// Implementations must tolerate calls from any thread. Releasing an address
/// that is unknown (or already released) must be a no-op, not a crash.
pub trait ImageEngine: Send + Sync {
    /// Decode an encoded image (PNG, JPEG, WebP, ...).
    fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage>;

    /// Allocate a blank drawing surface of the given size.
    fn create_surface(&self, width: u32, height: u32) -> Result<NativeAddress>;

    /// Draw the `src` region of `image` into the `dst` region of `surface`.
    fn draw_image(
        &self,
        image: NativeAddress,
        surface: NativeAddress,
        src: Rect,
        dst: Rect,
    ) -> Result<()>;

    /// Encode the current contents of a surface.
    fn encode_surface(
        &self,
        surface: NativeAddress,
        format: CompressFormat,
        quality: u8,
    ) -> Result<Bytes>;

    /// Re-encode a decoded image.
    fn encode_image(
        &self,
        image: NativeAddress,
        format: CompressFormat,
        quality: u8,
    ) -> Result<Bytes>;

    fn release_image(&self, image: NativeAddress);

    fn release_surface(&self, surface: NativeAddress);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(10, 20, 110, 70);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 50);
        assert!(!rect.is_empty());
        assert!(Rect::new(5, 5, 5, 10).is_empty());
    }

    #[test]
    fn test_rect_extreme_coordinates_saturate() {
        let wide = Rect::new(i32::MIN, 0, 1, 1);
        assert_eq!(wide.width(), i32::MAX);
        assert!(!wide.is_empty());

        let inverted = Rect::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        assert_eq!(inverted.width(), i32::MIN);
        assert_eq!(inverted.height(), i32::MIN);
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_rect_from_size_caps_large_dimensions() {
        let rect = Rect::from_size(u32::MAX, 3_000_000_000);
        assert_eq!(rect.right, i32::MAX);
        assert_eq!(rect.bottom, i32::MAX);
        assert_eq!(Rect::from_size(640, 480), Rect::new(0, 0, 640, 480));
    }

    #[test]
    fn test_rect_wire_format_is_ltrb_array() {
        let rect = Rect::new(1, 2, 3, 4);
        assert_eq!(serde_json::to_string(&rect).unwrap(), "[1,2,3,4]");

        let parsed: Rect = serde_json::from_str("[0,0,640,480]").unwrap();
        assert_eq!(parsed, Rect::from_size(640, 480));
    }

    #[test]
    fn test_compress_format_codes() {
        assert_eq!(CompressFormat::Jpeg.native_code(), 0);
        assert_eq!(CompressFormat::WebpLossless.native_code(), 4);
        assert_eq!(CompressFormat::from_native_code(1), Some(CompressFormat::Png));
        assert_eq!(CompressFormat::from_native_code(9), None);
    }
}
