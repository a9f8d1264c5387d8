//! # Bitmaps
//!
//! A [`Bitmap`] wraps one native resource, in one of two modes:
//!
//! - **image**: decoded from encoded bytes; a read-only draw source
//! - **surface**: allocated blank with explicit dimensions; a draw target
//!
//! Dimensions are fixed at creation. Releasing clears whichever handle is
//! populated through the exactly-once protocol of [`NativeHandle`], so
//! explicit [`Bitmap::release`] and `Drop` may both run, from any thread.
//!
//! ```ignore
//! let page = Bitmap::decode(engine.clone(), &png_bytes)?;
//! let thumb = Bitmap::create(engine, 200, 300)?;
//!
//! Canvas::new(&thumb).draw_bitmap(
//!     &page,
//!     Rect::from_size(page.width(), page.height()),
//!     Rect::from_size(200, 300),
//! );
//! let jpeg = thumb.compress(CompressFormat::Jpeg, 80)?;
//! ```

use crate::error::{CoreError, Result};
use crate::handle::NativeHandle;
use bridge_traits::{CompressFormat, ImageEngine, Rect};
use bytes::Bytes;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// Quality used for `0` and for anything above it.
pub const MAX_EFFECTIVE_QUALITY: u8 = 90;

/// Clamp a compression quality.
///
/// Values outside `0..=100` are rejected. `0` and anything above
/// [`MAX_EFFECTIVE_QUALITY`] become [`MAX_EFFECTIVE_QUALITY`]; `1..=90` pass
/// through unchanged.
pub fn normalize_quality(quality: i32) -> Result<u8> {
    if !(0..=100).contains(&quality) {
        return Err(CoreError::Validation(format!(
            "quality must be in 0..=100, got {}",
            quality
        )));
    }

    let quality = quality as u8;
    if quality == 0 || quality > MAX_EFFECTIVE_QUALITY {
        Ok(MAX_EFFECTIVE_QUALITY)
    } else {
        Ok(quality)
    }
}

/// Image or drawing surface owned by the native image engine.
pub struct Bitmap {
    engine: Arc<dyn ImageEngine>,
    image: NativeHandle,
    surface: NativeHandle,
    width: u32,
    height: u32,
}

impl Bitmap {
    /// Decode encoded bytes into an image-mode bitmap.
    pub fn decode(engine: Arc<dyn ImageEngine>, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::Validation("image data is empty".to_string()));
        }

        let decoded = engine.decode_image(bytes)?;
        if decoded.address == 0 {
            return Err(CoreError::Transport(
                "image engine returned a null image".to_string(),
            ));
        }

        debug!(
            address = decoded.address,
            width = decoded.width,
            height = decoded.height,
            "Decoded image"
        );

        Ok(Self {
            engine,
            image: NativeHandle::new(decoded.address),
            surface: NativeHandle::empty(),
            width: decoded.width,
            height: decoded.height,
        })
    }

    /// Decode `len` bytes of `data` starting at `offset`.
    pub fn decode_range(
        engine: Arc<dyn ImageEngine>,
        data: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<Self> {
        let range = offset
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .map(|end| offset..end)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "range {}+{} exceeds {} bytes of image data",
                    offset,
                    len,
                    data.len()
                ))
            })?;

        Self::decode(engine, &data[range])
    }

    /// Read `reader` to the end and decode the result.
    pub fn decode_reader<R: Read>(engine: Arc<dyn ImageEngine>, mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(engine, &bytes)
    }

    /// Allocate a blank surface-mode bitmap.
    pub fn create(engine: Arc<dyn ImageEngine>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::Validation(format!(
                "surface dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let address = engine.create_surface(width, height)?;
        if address == 0 {
            return Err(CoreError::Transport(
                "image engine returned a null surface".to_string(),
            ));
        }

        debug!(address, width, height, "Created surface");

        Ok(Self {
            engine,
            image: NativeHandle::empty(),
            surface: NativeHandle::new(address),
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_surface(&self) -> bool {
        !self.surface.is_released()
    }

    pub fn is_image(&self) -> bool {
        !self.image.is_released()
    }

    pub fn is_released(&self) -> bool {
        self.image.is_released() && self.surface.is_released()
    }

    /// Draw the `src` region of `source` into the `dst` region of this bitmap.
    ///
    /// Requires `self` in surface mode and `source` in image mode. Anything
    /// else, including a native failure, is logged and skipped. Returns
    /// whether the draw reached the engine and succeeded.
    pub fn draw(&self, source: &Bitmap, src: Rect, dst: Rect) -> bool {
        let surface = self.surface.address();
        if surface == 0 {
            warn!("Draw target is not a live surface; skipping draw");
            return false;
        }

        let image = source.image.address();
        if image == 0 {
            warn!(surface, "Draw source is not a live image; skipping draw");
            return false;
        }

        match self.engine.draw_image(image, surface, src, dst) {
            Ok(()) => true,
            Err(e) => {
                warn!(image, surface, error = %e, "Native draw failed");
                false
            }
        }
    }

    /// Encode the bitmap.
    ///
    /// The surface is encoded if present, otherwise the image. A released
    /// bitmap yields an empty payload.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when `quality` lies outside `0..=100`;
    /// [`CoreError::Bridge`] when the engine fails to encode.
    pub fn compress(&self, format: CompressFormat, quality: i32) -> Result<Bytes> {
        let quality = normalize_quality(quality)?;

        let surface = self.surface.address();
        if surface != 0 {
            return Ok(self.engine.encode_surface(surface, format, quality)?);
        }

        let image = self.image.address();
        if image != 0 {
            return Ok(self.engine.encode_image(image, format, quality)?);
        }

        let stale = CoreError::StaleReference("bitmap already released".to_string());
        warn!(error = %stale, ?format, "Compressing a released bitmap");
        Ok(Bytes::new())
    }

    /// [`compress`](Self::compress) into `sink`. Returns the bytes written.
    pub fn compress_to<W: Write>(
        &self,
        format: CompressFormat,
        quality: i32,
        sink: &mut W,
    ) -> Result<usize> {
        let payload = self.compress(format, quality)?;
        sink.write_all(&payload)?;
        Ok(payload.len())
    }

    /// Release the native resources. Safe to call repeatedly.
    pub fn release(&self) {
        let engine = &self.engine;
        if self.image.release_with(|address| engine.release_image(address)) {
            debug!("Released image");
        }
        if self
            .surface
            .release_with(|address| engine.release_surface(address))
        {
            debug!("Released surface");
        }
    }
}

impl Drop for Bitmap {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("image", &self.image)
            .field("surface", &self.surface)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Drawing facade over a surface-mode [`Bitmap`].
#[derive(Debug)]
pub struct Canvas<'a> {
    target: &'a Bitmap,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a Bitmap) -> Self {
        Self { target }
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    pub fn draw_bitmap(&self, source: &Bitmap, src: Rect, dst: Rect) -> bool {
        self.target.draw(source, src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_clamp() {
        assert_eq!(normalize_quality(0).unwrap(), 90);
        assert_eq!(normalize_quality(1).unwrap(), 1);
        assert_eq!(normalize_quality(50).unwrap(), 50);
        assert_eq!(normalize_quality(90).unwrap(), 90);
        assert_eq!(normalize_quality(91).unwrap(), 90);
        assert_eq!(normalize_quality(100).unwrap(), 90);
    }

    #[test]
    fn test_quality_out_of_range() {
        assert!(matches!(normalize_quality(-1), Err(CoreError::Validation(_))));
        assert!(matches!(normalize_quality(101), Err(CoreError::Validation(_))));
        assert!(matches!(normalize_quality(i32::MIN), Err(CoreError::Validation(_))));
    }
}
