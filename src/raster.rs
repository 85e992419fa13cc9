//! Renders a confirmed crop into a fresh JPEG.
//!
//! The output surface is sized to the crop rectangle. Source pixels are placed
//! by translating to the surface centre, rotating, scaling, and finally
//! offsetting by the negative crop origin. Each output pixel is filled by
//! inverting that transform and sampling the source bilinearly; anything that
//! falls outside the source stays black.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};

use crate::edit::Ticket;
use crate::error::{CaptureError, Result};
use crate::geometry::CropRect;
use crate::intake::{Preview, SourceFile};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

const MAX_SURFACE_SIDE: u32 = 16_384;
const MAX_SURFACE_PIXELS: u64 = 1 << 28;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub rotation_degrees: u16,
    pub scale: f32,
}

/// Off-screen raster sized to one crop. Dropped as soon as it is encoded.
struct Surface {
    pixels: RgbImage,
}

impl Surface {
    fn acquire(crop: &CropRect) -> Result<Self> {
        let width = crop.width.round().max(0.0) as u32;
        let height = crop.height.round().max(0.0) as u32;
        if width == 0
            || height == 0
            || width > MAX_SURFACE_SIDE
            || height > MAX_SURFACE_SIDE
            || width as u64 * height as u64 > MAX_SURFACE_PIXELS
        {
            return Err(CaptureError::DrawingSurfaceUnavailable { width, height });
        }
        Ok(Self {
            pixels: RgbImage::new(width, height),
        })
    }

    /// The crop origin maps to the surface centre, not its top-left corner,
    /// so the output is not the rectangle the canvas overlay outlines. Keep
    /// this placement; committed attachments are rendered with it.
    fn draw(&mut self, source: &RgbaImage, crop: &CropRect, transform: Transform) {
        let (w, h) = self.pixels.dimensions();
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let theta = (transform.rotation_degrees as f32).to_radians();
        let (sin, cos) = theta.sin_cos();
        let inv_scale = 1.0 / transform.scale;

        for (px, py, out) in self.pixels.enumerate_pixels_mut() {
            // Sample at pixel centres
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            // Undo rotation, then scale
            let rx = (dx * cos + dy * sin) * inv_scale;
            let ry = (-dx * sin + dy * cos) * inv_scale;
            let sx = rx + crop.x - 0.5;
            let sy = ry + crop.y - 0.5;
            if let Some(rgb) = sample_bilinear(source, sx, sy) {
                *out = rgb;
            }
        }
    }

    fn encode(self, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        self.pixels.write_with_encoder(encoder).map_err(CaptureError::Encode)?;
        Ok(bytes)
    }
}

/// Alpha is composited onto black, matching an opaque JPEG export.
fn sample_bilinear(source: &RgbaImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 || x < -0.5 || y < -0.5 || x > w as f32 - 0.5 || y > h as f32 - 0.5 {
        return None;
    }
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut rgb = [0u8; 3];
    for (c, channel) in rgb.iter_mut().enumerate() {
        let value = |px: u32, py: u32| {
            let p = source.get_pixel(px, py);
            p[c] as f32 * p[3] as f32 / 255.0
        };
        let top = value(x0, y0) * (1.0 - fx) + value(x1, y0) * fx;
        let bottom = value(x0, y1) * (1.0 - fx) + value(x1, y1) * fx;
        *channel = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(rgb))
}

/// Renders `crop` of `source` under `transform` and encodes it as JPEG.
pub fn render_crop(
    source: &RgbaImage,
    crop: &CropRect,
    transform: Transform,
    quality: u8,
) -> Result<Vec<u8>> {
    let mut surface = Surface::acquire(crop)?;
    surface.draw(source, crop, transform);
    surface.encode(quality)
}

#[derive(Debug)]
pub struct Committed {
    pub file: SourceFile,
    pub preview: Preview,
}

/// Crop confirmation work, run off the UI thread.
#[derive(Debug)]
pub struct CommitJob {
    pub ticket: Ticket,
    pub name: String,
    pub source: Arc<RgbaImage>,
    pub crop: CropRect,
    pub transform: Transform,
    pub quality: u8,
}

impl CommitJob {
    pub fn run(self) -> (Ticket, Result<Committed>) {
        let result = render_crop(&self.source, &self.crop, self.transform, self.quality)
            .and_then(|bytes| {
                let preview = Preview::decode(&self.name, &bytes)?;
                Ok(Committed {
                    file: SourceFile {
                        name: self.name.clone(),
                        mime: "image/jpeg".to_owned(),
                        bytes: Arc::from(bytes),
                    },
                    preview,
                })
            });
        (self.ticket, result)
    }
}
