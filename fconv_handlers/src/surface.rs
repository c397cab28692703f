use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageResult};

/// Bytes per RGBA pixel.
pub const RGBA_STRIDE: usize = 4;

/// Off-screen RGBA raster, reused across conversions.
///
/// The pixel buffer is row-major, top-left origin, four bytes per pixel in
/// red, green, blue, alpha order, with no padding between rows. Resizing keeps
/// the allocation and clears every pixel to transparent black, so nothing from
/// a previous image survives into the next one.
#[derive(Debug, Default)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set new dimensions and clear the canvas to `(0, 0, 0, 0)`.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize * RGBA_STRIDE, 0);
    }

    /// Decode a PNG and draw it at the origin, resizing the canvas to fit.
    pub fn draw_png(&mut self, png: &[u8]) -> ImageResult<()> {
        let decoded = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        self.resize(width, height);
        self.pixels.copy_from_slice(decoded.as_raw());
        Ok(())
    }

    /// Current pixel data.
    pub fn image_data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn image_data_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Encode the canvas as an RGBA PNG.
    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        PngEncoder::new(&mut out).write_image(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(out.into_inner())
    }
}
