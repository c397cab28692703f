use serde::{Deserialize, Serialize};

use crate::naming::has_extension;

// ── Categories ─────────────────────────────────────────────────────────────

pub const CATEGORY_IMAGE: &str = "image";
pub const CATEGORY_ARCHIVE: &str = "archive";

// ── Descriptor ─────────────────────────────────────────────────────────────

/// One file format variant a handler can accept or produce.
///
/// Handlers publish a list of these from `init()`. Callers pick an input and
/// an output descriptor out of that list and pass both back to `do_convert`;
/// the handler dispatches purely on the two `internal` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Human-readable label.
    pub name: String,
    /// Short format code.
    pub format: String,
    /// File-name suffix (without the dot) used when naming outputs.
    pub extension: String,
    pub mime: String,
    /// The handler can decode this format.
    pub from: bool,
    /// The handler can encode this format.
    pub to: bool,
    /// Handler-private key; distinguishes variants that share a MIME type.
    pub internal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lossless: Option<bool>,
}

impl FormatDescriptor {
    /// True when `file_name` ends in `.{extension}`, ignoring ASCII case.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.extension)
    }
}

// ── Common format templates ─────────────────────────────────────────────────

/// Static description of a widely used format, shared between handlers.
///
/// A template carries everything except the handler-specific parts (the
/// internal key and the read/write capabilities), which are filled in by
/// [`FormatTemplate::supported`] or [`FormatTemplate::builder`].
#[derive(Debug, Clone, Copy)]
pub struct FormatTemplate {
    pub name: &'static str,
    pub format: &'static str,
    pub extension: &'static str,
    pub mime: &'static str,
    pub category: &'static str,
}

impl FormatTemplate {
    /// Shorthand for the common case: a descriptor with explicit capabilities.
    pub fn supported(&self, internal: &str, from: bool, to: bool, lossless: bool) -> FormatDescriptor {
        let builder = self.builder(internal).allow_from(from).allow_to(to);
        if lossless {
            builder.mark_lossless().build()
        } else {
            builder.mark_lossy().build()
        }
    }

    /// Start a fluent builder. Both directions default to allowed and the
    /// lossless flag defaults to unset.
    pub fn builder(&self, internal: &str) -> FormatBuilder {
        FormatBuilder {
            descriptor: FormatDescriptor {
                name: self.name.to_string(),
                format: self.format.to_string(),
                extension: self.extension.to_string(),
                mime: self.mime.to_string(),
                from: true,
                to: true,
                internal: internal.to_string(),
                category: Some(self.category.to_string()),
                lossless: None,
            },
        }
    }
}

#[must_use]
pub struct FormatBuilder {
    descriptor: FormatDescriptor,
}

impl FormatBuilder {
    pub fn allow_from(mut self, from: bool) -> Self {
        self.descriptor.from = from;
        self
    }

    pub fn allow_to(mut self, to: bool) -> Self {
        self.descriptor.to = to;
        self
    }

    pub fn mark_lossless(mut self) -> Self {
        self.descriptor.lossless = Some(true);
        self
    }

    pub fn mark_lossy(mut self) -> Self {
        self.descriptor.lossless = Some(false);
        self
    }

    pub fn build(self) -> FormatDescriptor {
        self.descriptor
    }
}

pub mod common {
    use super::{FormatTemplate, CATEGORY_ARCHIVE, CATEGORY_IMAGE};

    pub const PNG: FormatTemplate = FormatTemplate {
        name: "Portable Network Graphics",
        format: "png",
        extension: "png",
        mime: "image/png",
        category: CATEGORY_IMAGE,
    };

    /// Outputs are named `.jpg`, and name matching uses that extension only,
    /// so a `.jpeg` file does not match this format.
    pub const JPEG: FormatTemplate = FormatTemplate {
        name: "Joint Photographic Experts Group JFIF",
        format: "jpeg",
        extension: "jpg",
        mime: "image/jpeg",
        category: CATEGORY_IMAGE,
    };

    pub const WEBP: FormatTemplate = FormatTemplate {
        name: "WebP",
        format: "webp",
        extension: "webp",
        mime: "image/webp",
        category: CATEGORY_IMAGE,
    };

    pub const BMP: FormatTemplate = FormatTemplate {
        name: "Windows Bitmap",
        format: "bmp",
        extension: "bmp",
        mime: "image/bmp",
        category: CATEGORY_IMAGE,
    };

    pub const TIFF: FormatTemplate = FormatTemplate {
        name: "Tagged Image File Format",
        format: "tiff",
        extension: "tiff",
        mime: "image/tiff",
        category: CATEGORY_IMAGE,
    };

    pub const GIF: FormatTemplate = FormatTemplate {
        name: "CompuServe Graphics Interchange Format",
        format: "gif",
        extension: "gif",
        mime: "image/gif",
        category: CATEGORY_IMAGE,
    };

    pub const ZIP: FormatTemplate = FormatTemplate {
        name: "ZIP Archive",
        format: "zip",
        extension: "zip",
        mime: "application/zip",
        category: CATEGORY_ARCHIVE,
    };
}
