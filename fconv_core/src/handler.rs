use crate::error::{ConvertError, ConvertResult};
use crate::format::FormatDescriptor;
use crate::record::FileRecord;

/// Core conversion abstraction.
///
/// Each `FormatHandler` implementation:
/// - Publishes the formats it reads and writes from `init()`. Before that the
///   list is empty and `ready()` is false.
/// - Dispatches `do_convert` purely on `input_format.internal` and
///   `output_format.internal`, and rejects any pair it did not declare.
/// - Treats a call as all-or-nothing: on error, no output files are returned,
///   even if earlier files in the batch converted fine.
pub trait FormatHandler: Send + Sync {
    /// Stable handler name, used for lookup and display.
    fn name(&self) -> &'static str;

    /// Formats published by `init()`; empty until then.
    fn supported_formats(&self) -> &[FormatDescriptor];

    fn ready(&self) -> bool;

    /// One-time setup. Calling it again on a ready handler does nothing.
    ///
    /// On failure the handler must stay not-ready.
    fn init(&mut self) -> ConvertResult<()>;

    /// Convert a batch of files from `input_format` to `output_format`.
    ///
    /// Files are processed strictly in order; the first failure aborts the
    /// whole call.
    fn do_convert(
        &self,
        input_files: &[FileRecord],
        input_format: &FormatDescriptor,
        output_format: &FormatDescriptor,
    ) -> ConvertResult<Vec<FileRecord>>;

    /// Look up a published descriptor by its internal key.
    fn format(&self, internal: &str) -> Option<&FormatDescriptor> {
        self.supported_formats()
            .iter()
            .find(|f| f.internal == internal)
    }

    /// True when `input` is published as readable and `output` as writable.
    fn can_convert(&self, input: &FormatDescriptor, output: &FormatDescriptor) -> bool {
        let readable = input.from && self.format(&input.internal).is_some_and(|f| f.from);
        let writable = output.to && self.format(&output.internal).is_some_and(|f| f.to);
        readable && writable
    }

    /// Guard run at the top of every `do_convert`: the handler must be ready and
    /// the pair must be one it declared.
    fn ensure_declared(
        &self,
        input: &FormatDescriptor,
        output: &FormatDescriptor,
    ) -> ConvertResult<()> {
        if !self.ready() {
            return Err(ConvertError::NotReady {
                handler: self.name().to_string(),
            });
        }
        if !self.can_convert(input, output) {
            return Err(ConvertError::unsupported(
                &input.internal,
                &output.internal,
                format!("not declared by handler '{}'", self.name()),
            ));
        }
        Ok(())
    }
}
