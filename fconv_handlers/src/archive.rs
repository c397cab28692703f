use std::io::{self, Cursor, Read, Write};

use fconv_core::common::{BMP, GIF, JPEG, PNG, TIFF, WEBP, ZIP};
use fconv_core::format::CATEGORY_ARCHIVE;
use fconv_core::naming::{has_extension, series_name};
use fconv_core::{ConvertError, ConvertResult, FileRecord, FormatDescriptor, FormatHandler};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const INTERNAL_ZIP: &str = "zip";
pub const INTERNAL_CBZ: &str = "cbz";

/// Sidecar metadata suffix tolerated inside comic archives (e.g. `ComicInfo.xml`).
const METADATA_EXTENSION: &str = "xml";

/// Which flavor of archive a descriptor names. Both use the zip container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Entries keep their original file names.
    Generic,
    /// Entries are renamed to `Page {i}.{ext}` on pack; an `.xml` sidecar is
    /// tolerated on unpack.
    Comic,
}

impl ArchiveKind {
    pub fn from_internal(internal: &str) -> Option<Self> {
        match internal {
            INTERNAL_ZIP => Some(Self::Generic),
            INTERNAL_CBZ => Some(Self::Comic),
            _ => None,
        }
    }
}

/// Packs a sequence of page images into a zip/cbz archive, and unpacks such
/// archives back into pages.
///
/// Archives are assumed to hold pages of a single image type. Unpacking
/// refuses any archive with other content rather than guessing which entries
/// matter.
#[derive(Default)]
pub struct ArchiveHandler {
    formats: Vec<FormatDescriptor>,
    ready: bool,
}

impl ArchiveHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn pack(
        pages: &[FileRecord],
        page_format: &FormatDescriptor,
        archive_format: &FormatDescriptor,
        kind: ArchiveKind,
    ) -> ConvertResult<FileRecord> {
        let first = pages.first().ok_or_else(|| ConvertError::EmptyResult {
            reason: "no pages supplied to pack".to_string(),
        })?;
        let archive_name = format!(
            "{}.{}",
            series_name(&first.name, &page_format.extension),
            archive_format.extension
        );
        let fail = |e: zip::result::ZipError| ConvertError::engine(&archive_name, e);

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (i, page) in pages.iter().enumerate() {
            let entry = match kind {
                ArchiveKind::Comic => format!("Page {}.{}", i, page_format.extension),
                ArchiveKind::Generic => page.name.clone(),
            };
            debug!(page = %page.name, entry = %entry, "adding page");
            writer.start_file(entry, options).map_err(fail)?;
            writer
                .write_all(&page.bytes)
                .map_err(|e| ConvertError::engine(&archive_name, e))?;
        }

        let bytes = writer.finish().map_err(fail)?.into_inner();
        Ok(FileRecord::new(archive_name, bytes))
    }

    fn unpack(
        archives: &[FileRecord],
        page_format: &FormatDescriptor,
        kind: ArchiveKind,
    ) -> ConvertResult<Vec<FileRecord>> {
        let mut pages = Vec::new();

        for archive in archives {
            let fail = |e: zip::result::ZipError| ConvertError::engine(&archive.name, e);
            let mut zip = ZipArchive::new(Cursor::new(archive.bytes.as_slice())).map_err(fail)?;

            for index in 0..zip.len() {
                let mut entry = zip.by_index(index).map_err(fail)?;
                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_string();

                if page_format.matches_file_name(&name) {
                    // Sizes come from the archive itself; cap both the reservation and the read.
                    let declared = entry.size();
                    let hint = declared.min(archive.bytes.len() as u64) as usize;
                    let mut bytes = Vec::with_capacity(hint);
                    (&mut entry)
                        .take(declared)
                        .read_to_end(&mut bytes)
                        .map_err(|e| ConvertError::engine(&archive.name, e))?;
                    if bytes.len() as u64 != declared {
                        let reason = format!(
                            "entry '{}' declares {} bytes but holds {}",
                            name,
                            declared,
                            bytes.len()
                        );
                        return Err(ConvertError::engine(
                            &archive.name,
                            io::Error::new(io::ErrorKind::InvalidData, reason),
                        ));
                    }
                    debug!(archive = %archive.name, entry = %name, len = bytes.len(), "extracted");
                    pages.push(FileRecord::new(name, bytes));
                } else if kind == ArchiveKind::Comic && has_extension(&name, METADATA_EXTENSION) {
                    debug!(archive = %archive.name, entry = %name, "skipping metadata sidecar");
                } else {
                    return Err(ConvertError::HeterogeneousArchive {
                        file: archive.name.clone(),
                        entry: name,
                    });
                }
            }
        }

        if pages.is_empty() {
            return Err(ConvertError::EmptyResult {
                reason: "no applicable files found".to_string(),
            });
        }
        Ok(pages)
    }
}

impl FormatHandler for ArchiveHandler {
    fn name(&self) -> &'static str {
        "comics"
    }

    fn supported_formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn init(&mut self) -> ConvertResult<()> {
        if self.ready {
            return Ok(());
        }
        self.formats = vec![
            PNG.supported("png", true, true, true),
            JPEG.supported("jpeg", true, true, true),
            WEBP.supported("webp", true, true, true),
            BMP.supported("bmp", true, true, true),
            TIFF.supported("tiff", true, true, true),
            GIF.supported("gif", true, true, true),
            ZIP.supported(INTERNAL_ZIP, true, true, true),
            FormatDescriptor {
                name: "Comic Book Archive (ZIP)".to_string(),
                format: "cbz".to_string(),
                extension: "cbz".to_string(),
                mime: "application/vnd.comicbook+zip".to_string(),
                from: true,
                to: true,
                internal: INTERNAL_CBZ.to_string(),
                category: Some(CATEGORY_ARCHIVE.to_string()),
                lossless: Some(true),
            },
        ];
        self.ready = true;
        Ok(())
    }

    fn do_convert(
        &self,
        input_files: &[FileRecord],
        input_format: &FormatDescriptor,
        output_format: &FormatDescriptor,
    ) -> ConvertResult<Vec<FileRecord>> {
        self.ensure_declared(input_format, output_format)?;

        info!(
            handler = self.name(),
            from = %input_format.internal,
            to = %output_format.internal,
            files = input_files.len(),
            "converting archive"
        );

        match (
            ArchiveKind::from_internal(&input_format.internal),
            ArchiveKind::from_internal(&output_format.internal),
        ) {
            (None, Some(kind)) => {
                Self::pack(input_files, input_format, output_format, kind).map(|a| vec![a])
            }
            (Some(kind), None) => Self::unpack(input_files, output_format, kind),
            _ => Err(ConvertError::unsupported(
                &input_format.internal,
                &output_format.internal,
                "invalid input-output",
            )),
        }
    }
}
