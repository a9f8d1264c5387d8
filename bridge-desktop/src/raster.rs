//! Raster Image Engine using the `image` crate

use bridge_traits::{
    error::{BridgeError, Result},
    image::{CompressFormat, DecodedImage, ImageEngine, NativeAddress, Rect},
};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{imageops, DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// In-process raster engine
///
/// Decoded images and drawing surfaces live in two tables keyed by addresses
/// from a shared counter, so an image address can never be mistaken for a
/// surface address. Addresses start at 1; 0 stays reserved for "empty".
///
/// WebP output is always lossless: the `image` crate ships no lossy WebP
/// encoder, so `Webp` and `WebpLossy` fall back to lossless encoding.
pub struct RasterImageEngine {
    next_address: AtomicU64,
    images: Mutex<HashMap<NativeAddress, Arc<DynamicImage>>>,
    surfaces: Mutex<HashMap<NativeAddress, RgbaImage>>,
}

impl RasterImageEngine {
    pub fn new() -> Self {
        Self {
            next_address: AtomicU64::new(1),
            images: Mutex::new(HashMap::new()),
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    /// Number of decoded images not yet released.
    pub fn live_images(&self) -> usize {
        self.images.lock().len()
    }

    /// Number of surfaces not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.surfaces.lock().len()
    }

    fn allocate(&self) -> NativeAddress {
        self.next_address.fetch_add(1, Ordering::Relaxed)
    }

    fn image(&self, address: NativeAddress) -> Result<Arc<DynamicImage>> {
        self.images
            .lock()
            .get(&address)
            .cloned()
            .ok_or(BridgeError::UnknownHandle(address))
    }

    /// Clip `rect` to an image of `width` x `height`.
    fn clamp(rect: Rect, width: u32, height: u32) -> Rect {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Rect::new(
            rect.left.clamp(0, w),
            rect.top.clamp(0, h),
            rect.right.clamp(0, w),
            rect.bottom.clamp(0, h),
        )
    }

    fn encode(image: &DynamicImage, format: CompressFormat, quality: u8) -> Result<Bytes> {
        let mut out = Vec::new();
        let result = match format {
            CompressFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut out, quality.min(100)).write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )
            }
            CompressFormat::Png => {
                let rgba = image.to_rgba8();
                PngEncoder::new(&mut out).write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
            }
            CompressFormat::Webp | CompressFormat::WebpLossy | CompressFormat::WebpLossless => {
                if format != CompressFormat::WebpLossless {
                    debug!(?format, "Lossy WebP unavailable, encoding losslessly");
                }
                let rgba = image.to_rgba8();
                WebPEncoder::new_lossless(&mut out).write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
            }
        };

        result.map_err(|e| BridgeError::OperationFailed(format!("Encoding failed: {}", e)))?;
        Ok(Bytes::from(out))
    }
}

/// One axis of a draw: the part of the destination that lands on the
/// surface, and the source pixels that map onto it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    src_start: u32,
    src_len: u32,
    start: i64,
    len: u32,
}

impl Span {
    /// `src_*` must already lie inside the source image and be non-empty.
    /// Returns `None` when the destination misses `[0, limit)` entirely.
    fn clip(src_start: i32, src_end: i32, dst_start: i32, dst_end: i32, limit: u32) -> Option<Self> {
        let (src_start, src_end) = (i64::from(src_start), i64::from(src_end));
        let (dst_start, dst_end) = (i64::from(dst_start), i64::from(dst_end));

        let visible_start = dst_start.max(0);
        let visible_end = dst_end.min(i64::from(limit));
        if visible_start >= visible_end {
            return None;
        }

        let scale = (src_end - src_start) as f64 / (dst_end - dst_start) as f64;
        let map = |offset: i64| src_start as f64 + (offset - dst_start) as f64 * scale;
        let from = (map(visible_start).floor() as i64).clamp(src_start, src_end - 1);
        let to = (map(visible_end).ceil() as i64).clamp(from + 1, src_end);

        Some(Self {
            src_start: u32::try_from(from).ok()?,
            src_len: u32::try_from(to - from).ok()?,
            start: visible_start,
            len: u32::try_from(visible_end - visible_start).ok()?,
        })
    }
}

impl Default for RasterImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEngine for RasterImageEngine {
    fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| BridgeError::OperationFailed(format!("Decoding failed: {}", e)))?;

        let address = self.allocate();
        let (width, height) = (decoded.width(), decoded.height());
        self.images.lock().insert(address, Arc::new(decoded));

        debug!(address, width, height, len = bytes.len(), "Decoded image");
        Ok(DecodedImage {
            address,
            width,
            height,
        })
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<NativeAddress> {
        if width == 0 || height == 0 {
            return Err(BridgeError::OperationFailed(format!(
                "Surface dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let address = self.allocate();
        self.surfaces
            .lock()
            .insert(address, RgbaImage::new(width, height));

        debug!(address, width, height, "Created surface");
        Ok(address)
    }

    fn draw_image(
        &self,
        image: NativeAddress,
        surface: NativeAddress,
        src: Rect,
        dst: Rect,
    ) -> Result<()> {
        let source = self.image(image)?;
        let src = Self::clamp(src, source.width(), source.height());

        if src.is_empty() || dst.is_empty() {
            debug!(?src, ?dst, "Skipping draw of empty region");
            return Ok(());
        }

        let (surface_width, surface_height) = self
            .surfaces
            .lock()
            .get(&surface)
            .map(|target| target.dimensions())
            .ok_or(BridgeError::UnknownHandle(surface))?;

        let spans = Span::clip(src.left, src.right, dst.left, dst.right, surface_width)
            .zip(Span::clip(src.top, src.bottom, dst.top, dst.bottom, surface_height));
        let Some((x, y)) = spans else {
            debug!(?dst, surface_width, surface_height, "Destination outside surface");
            return Ok(());
        };

        let region = source.crop_imm(x.src_start, y.src_start, x.src_len, y.src_len);
        let scaled = if x.src_len == x.len && y.src_len == y.len {
            region.to_rgba8()
        } else {
            region
                .resize_exact(x.len, y.len, imageops::FilterType::Triangle)
                .to_rgba8()
        };

        let mut surfaces = self.surfaces.lock();
        let target = surfaces
            .get_mut(&surface)
            .ok_or(BridgeError::UnknownHandle(surface))?;
        imageops::overlay(target, &scaled, x.start, y.start);

        Ok(())
    }

    fn encode_surface(
        &self,
        surface: NativeAddress,
        format: CompressFormat,
        quality: u8,
    ) -> Result<Bytes> {
        let snapshot = self
            .surfaces
            .lock()
            .get(&surface)
            .cloned()
            .ok_or(BridgeError::UnknownHandle(surface))?;

        Self::encode(&DynamicImage::ImageRgba8(snapshot), format, quality)
    }

    fn encode_image(
        &self,
        image: NativeAddress,
        format: CompressFormat,
        quality: u8,
    ) -> Result<Bytes> {
        let source = self.image(image)?;
        Self::encode(&source, format, quality)
    }

    fn release_image(&self, image: NativeAddress) {
        if self.images.lock().remove(&image).is_none() {
            warn!(address = image, "Release of unknown image");
        }
    }

    fn release_surface(&self, surface: NativeAddress) {
        if self.surfaces.lock().remove(&surface).is_none() {
            warn!(address = surface, "Release of unknown surface");
        }
    }
}
