pub mod error;
pub mod format;
pub mod handler;
pub mod naming;
pub mod record;

pub use error::{ConvertError, ConvertResult, EngineError, ErrorKind};
pub use format::{common, FormatBuilder, FormatDescriptor, FormatTemplate};
pub use handler::FormatHandler;
pub use record::FileRecord;
