//! Archive downloading and extraction.

mod archive;
mod file;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use file::FileDownloader;
