//! Pixel transforms applied to downloaded backgrounds before they are saved.
//!
//! - gradient: a vertical black gradient, faint at the top and dark at the
//!   bottom, approximating how the Chromecast shows its backgrounds
//! - watermark: `Photo by <author>` in translucent white near the bottom-right
//!   corner, drawn with the 8x8 bitmap font scaled up
//!
//! All functions here are synchronous and CPU-bound; the downloader runs them on
//! the blocking thread pool.

use crate::error::Result;
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Gradient opacity at the top edge
const GRADIENT_TOP_ALPHA: f32 = 0.098;
/// Gradient opacity at the bottom edge
const GRADIENT_BOTTOM_ALPHA: f32 = 0.9;

/// Watermark text opacity
const WATERMARK_ALPHA: f32 = 0.25;
/// Distance of the watermark from the right and bottom edges
const WATERMARK_MARGIN: u32 = 50;
/// Scale applied to the 8px font (about 24px text)
const WATERMARK_SCALE: u32 = 3;
/// Width and height of one glyph in the bitmap font
const GLYPH_SIZE: u32 = 8;

/// Which transforms to run on each image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformOptions {
    /// Overlay the dark gradient
    pub gradient: bool,
    /// Stamp the author's name
    pub watermark: bool,
    /// JPEG quality used when re-encoding, 1-100
    pub jpeg_quality: u8,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            gradient: false,
            watermark: false,
            jpeg_quality: 90,
        }
    }
}

impl TransformOptions {
    /// Whether any transform is enabled (and the image must be re-encoded)
    pub fn any(&self) -> bool {
        self.gradient || self.watermark
    }
}

/// Check that `bytes` look like an image payload
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat> {
    Ok(image::guess_format(bytes)?)
}

/// Decode an image payload into RGB pixels
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Run the enabled transforms in place (gradient first, then watermark)
pub fn apply(image: &mut RgbImage, author: &str, options: &TransformOptions) {
    if options.gradient {
        overlay_gradient(image);
    }
    if options.watermark {
        apply_watermark(image, author);
    }
}

/// Encode as JPEG with the given quality
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
    image.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Composite a vertical black gradient over the image
pub fn overlay_gradient(image: &mut RgbImage) {
    let height = image.height();
    let span = height.saturating_sub(1).max(1) as f32;

    for (_, y, pixel) in image.enumerate_pixels_mut() {
        let t = y as f32 / span;
        let alpha = GRADIENT_TOP_ALPHA + (GRADIENT_BOTTOM_ALPHA - GRADIENT_TOP_ALPHA) * t;
        for channel in pixel.0.iter_mut() {
            *channel = (*channel as f32 * (1.0 - alpha)).round() as u8;
        }
    }
}

/// Stamp `Photo by <author>` near the bottom-right corner
///
/// Text that does not fit is clipped at the left and top edges.
pub fn apply_watermark(image: &mut RgbImage, author: &str) {
    let text = format!("Photo by {author}");
    let glyph_px = GLYPH_SIZE * WATERMARK_SCALE;
    let text_width = text.chars().count() as i64 * glyph_px as i64;

    let origin_x = image.width() as i64 - text_width - WATERMARK_MARGIN as i64;
    let origin_y = image.height() as i64 - glyph_px as i64 - WATERMARK_MARGIN as i64;

    for (index, c) in text.chars().enumerate() {
        let glyph = glyph_for(c);
        let glyph_x = origin_x + index as i64 * glyph_px as i64;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x = glyph_x + (col * WATERMARK_SCALE) as i64;
                let y = origin_y + (row as u32 * WATERMARK_SCALE) as i64;
                fill_block(image, x, y, WATERMARK_SCALE);
            }
        }
    }
}

fn glyph_for(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn fill_block(image: &mut RgbImage, x: i64, y: i64, size: u32) {
    for dy in 0..size as i64 {
        for dx in 0..size as i64 {
            let (px, py) = (x + dx, y + dy);
            if px < 0 || py < 0 || px >= image.width() as i64 || py >= image.height() as i64 {
                continue;
            }
            let pixel = image.get_pixel_mut(px as u32, py as u32);
            *pixel = blend_white(*pixel);
        }
    }
}

fn blend_white(pixel: Rgb<u8>) -> Rgb<u8> {
    let mix = |v: u8| (v as f32 * (1.0 - WATERMARK_ALPHA) + 255.0 * WATERMARK_ALPHA).round() as u8;
    Rgb([mix(pixel[0]), mix(pixel[1]), mix(pixel[2])])
}
