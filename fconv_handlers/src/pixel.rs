use fconv_core::common::PNG;
use fconv_core::format::CATEGORY_IMAGE;
use fconv_core::naming::replace_extension;
use fconv_core::{ConvertError, ConvertResult, FileRecord, FormatDescriptor, FormatHandler};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::surface::{RasterSurface, RGBA_STRIDE};

pub const INTERNAL_PNG: &str = "png";
pub const INTERNAL_RGB: &str = "rgb";
pub const INTERNAL_RGBA: &str = "rgba";

const RGB_STRIDE: usize = 3;
const OPAQUE: u8 = 0xFF;

/// Raw pixel-sample transcoder.
///
/// Converts between PNG bitmaps, packed RGB triples (no alpha) and packed RGBA
/// quadruples (straight alpha). Going from RGBA to PNG has no width/height to
/// work with, so the samples are laid out on the smallest square canvas that
/// holds them all.
///
/// The raster surface is allocated by `init()` and held for the handler's
/// lifetime. Its lock is taken for the whole of `do_convert`, so concurrent
/// calls on one instance run one at a time.
#[derive(Default)]
pub struct PixelSampleHandler {
    formats: Vec<FormatDescriptor>,
    surface: Option<Mutex<RasterSurface>>,
}

/// The conversions this handler performs, chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    BitmapToRgba,
    RgbToRgba,
    RgbaToRgb,
    RgbaToBitmap,
}

impl Route {
    fn select(input: &FormatDescriptor, output: &FormatDescriptor) -> ConvertResult<Self> {
        let from = input.internal.as_str();
        let to = output.internal.as_str();
        match (from, to) {
            (INTERNAL_PNG, INTERNAL_RGBA) => Ok(Self::BitmapToRgba),
            (INTERNAL_RGB, INTERNAL_RGBA) => Ok(Self::RgbToRgba),
            (INTERNAL_RGBA, INTERNAL_RGB) => Ok(Self::RgbaToRgb),
            (INTERNAL_RGBA, INTERNAL_PNG) => Ok(Self::RgbaToBitmap),
            (INTERNAL_PNG, INTERNAL_RGB) | (INTERNAL_RGB, INTERNAL_PNG) => Err(
                ConvertError::unsupported(from, to, "defer to general image codec"),
            ),
            _ => Err(ConvertError::unsupported(from, to, "Invalid input-output.")),
        }
    }
}

impl PixelSampleHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn convert_one(
        route: Route,
        surface: &mut RasterSurface,
        file: &FileRecord,
    ) -> ConvertResult<Vec<u8>> {
        match route {
            Route::BitmapToRgba => {
                surface
                    .draw_png(&file.bytes)
                    .map_err(|e| ConvertError::engine(&file.name, e))?;
                Ok(surface.image_data().to_vec())
            }
            Route::RgbToRgba => {
                ensure_whole_samples(file, RGB_STRIDE, "RGB")?;
                Ok(rgb_to_rgba(&file.bytes))
            }
            Route::RgbaToRgb => {
                ensure_whole_samples(file, RGBA_STRIDE, "RGBA")?;
                Ok(rgba_to_rgb(&file.bytes))
            }
            Route::RgbaToBitmap => {
                ensure_whole_samples(file, RGBA_STRIDE, "RGBA")?;
                rasterize_square(surface, file)?;
                surface
                    .encode_png()
                    .map_err(|e| ConvertError::engine(&file.name, e))
            }
        }
    }
}

impl FormatHandler for PixelSampleHandler {
    fn name(&self) -> &'static str {
        "rgba"
    }

    fn supported_formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    fn ready(&self) -> bool {
        self.surface.is_some()
    }

    fn init(&mut self) -> ConvertResult<()> {
        if self.ready() {
            return Ok(());
        }
        self.formats = vec![
            PNG.supported(INTERNAL_PNG, true, true, false),
            FormatDescriptor {
                name: "Raw red, green, and blue samples".to_string(),
                format: "rgb".to_string(),
                extension: "rgb".to_string(),
                mime: "image/x-rgb".to_string(),
                from: true,
                to: true,
                internal: INTERNAL_RGB.to_string(),
                category: Some(CATEGORY_IMAGE.to_string()),
                lossless: Some(false),
            },
            FormatDescriptor {
                name: "Raw red, green, blue, and alpha samples".to_string(),
                format: "rgba".to_string(),
                extension: "rgba".to_string(),
                mime: "image/x-rgba".to_string(),
                from: true,
                to: true,
                internal: INTERNAL_RGBA.to_string(),
                category: Some(CATEGORY_IMAGE.to_string()),
                lossless: Some(true),
            },
        ];
        self.surface = Some(Mutex::new(RasterSurface::new()));
        Ok(())
    }

    fn do_convert(
        &self,
        input_files: &[FileRecord],
        input_format: &FormatDescriptor,
        output_format: &FormatDescriptor,
    ) -> ConvertResult<Vec<FileRecord>> {
        self.ensure_declared(input_format, output_format)?;
        let route = Route::select(input_format, output_format)?;
        let Some(surface) = &self.surface else {
            return Err(ConvertError::NotReady {
                handler: self.name().to_string(),
            });
        };
        let mut surface = surface.lock();

        info!(
            handler = self.name(),
            from = %input_format.internal,
            to = %output_format.internal,
            files = input_files.len(),
            "converting pixel samples"
        );

        let mut outputs = Vec::with_capacity(input_files.len());
        for file in input_files {
            let bytes = Self::convert_one(route, &mut surface, file)?;
            debug!(
                file = %file.name,
                in_len = file.len(),
                out_len = bytes.len(),
                "converted"
            );
            outputs.push(FileRecord::new(
                replace_extension(&file.name, &output_format.extension),
                bytes,
            ));
        }
        Ok(outputs)
    }
}

// ── Sample transcoding ─────────────────────────────────────────────────────

fn ensure_whole_samples(file: &FileRecord, stride: usize, label: &str) -> ConvertResult<()> {
    if file.len() % stride != 0 {
        return Err(ConvertError::malformed(
            &file.name,
            format!(
                "Invalid {label} file size; not a whole number of samples ({} bytes is not a multiple of {stride}).",
                file.len()
            ),
        ));
    }
    Ok(())
}

/// Append an opaque alpha byte to every RGB triple. A trailing partial triple
/// is ignored.
pub fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgb.len() / RGB_STRIDE * RGBA_STRIDE);
    for px in rgb.chunks_exact(RGB_STRIDE) {
        out.extend_from_slice(px);
        out.push(OPAQUE);
    }
    out
}

/// Drop the alpha byte of every RGBA quadruple. A trailing partial quadruple
/// is ignored.
pub fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len() / RGBA_STRIDE * RGB_STRIDE);
    for px in rgba.chunks_exact(RGBA_STRIDE) {
        out.extend_from_slice(&px[..RGB_STRIDE]);
    }
    out
}

/// Smallest `side` with `side * side >= pixels`.
///
/// Linear search from zero, so there is no floating-point square root to
/// round the wrong way on large inputs.
pub fn square_side(pixels: u64) -> u64 {
    let mut side = 0u64;
    while side * side < pixels {
        side += 1;
    }
    side
}

/// Lay the RGBA samples of `file` out row-major on a square canvas.
///
/// Canvas pixels past the end of the input are transparent black.
fn rasterize_square(surface: &mut RasterSurface, file: &FileRecord) -> ConvertResult<()> {
    let pixels = (file.len() / RGBA_STRIDE) as u64;
    if pixels == 0 {
        return Err(ConvertError::malformed(
            &file.name,
            "RGBA input holds no samples; nothing to rasterize.",
        ));
    }
    let side = square_side(pixels);
    let side = u32::try_from(side).map_err(|_| {
        ConvertError::malformed(
            &file.name,
            format!("{pixels} samples need a {side}x{side} canvas, which is too large"),
        )
    })?;

    surface.resize(side, side);
    surface.image_data_mut()[..file.len()].copy_from_slice(&file.bytes);
    debug!(file = %file.name, pixels, side, "rasterized samples onto square canvas");
    Ok(())
}
