mod archive;
mod pixel;
mod surface;

pub use archive::{ArchiveHandler, ArchiveKind, INTERNAL_CBZ, INTERNAL_ZIP};
pub use pixel::{
    rgb_to_rgba, rgba_to_rgb, square_side, PixelSampleHandler, INTERNAL_PNG, INTERNAL_RGB,
    INTERNAL_RGBA,
};
pub use surface::RasterSurface;

use fconv_core::{ConvertResult, FormatDescriptor, FormatHandler};

/// Names accepted by [`handler_by_name`].
pub const HANDLER_NAMES: &[&str] = &["rgba", "comics"];

/// Construct a fresh, not yet initialized handler from its name.
pub fn handler_by_name(name: &str) -> Option<Box<dyn FormatHandler>> {
    match name {
        "rgba" => Some(Box::new(PixelSampleHandler::new())),
        "comics" => Some(Box::new(ArchiveHandler::new())),
        _ => None,
    }
}

/// One initialized instance of every bundled handler.
///
/// Called once at startup; the first handler that fails to initialize aborts
/// the whole set.
pub fn all_handlers() -> ConvertResult<Vec<Box<dyn FormatHandler>>> {
    let mut handlers = Vec::with_capacity(HANDLER_NAMES.len());
    for name in HANDLER_NAMES {
        if let Some(mut handler) = handler_by_name(name) {
            handler.init()?;
            handlers.push(handler);
        }
    }
    Ok(handlers)
}

/// A handler that converts `from` to `to` in a single hop, together with the
/// two descriptors it published for that pair.
pub struct Resolved<'a> {
    pub handler: &'a dyn FormatHandler,
    pub input: &'a FormatDescriptor,
    pub output: &'a FormatDescriptor,
}

/// Find the first ready handler declaring `from` as readable and `to` as
/// writable, matching on internal keys. No chains of handlers are considered.
pub fn find_handler<'a>(
    handlers: &'a [Box<dyn FormatHandler>],
    from: &str,
    to: &str,
) -> Option<Resolved<'a>> {
    handlers.iter().find_map(|handler| {
        if !handler.ready() {
            return None;
        }
        let input = handler.format(from)?;
        let output = handler.format(to)?;
        handler.can_convert(input, output).then(|| Resolved {
            handler: &**handler,
            input,
            output,
        })
    })
}
