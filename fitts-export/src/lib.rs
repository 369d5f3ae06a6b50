pub mod archive;
pub mod error;
pub mod receiver;
pub mod tables;
pub mod upload;

pub use archive::{ARCHIVE_SUFFIXES, write_archive};
pub use error::ExportError;
pub use receiver::{DEFAULT_DATA_DIR, DEFAULT_RECEIVER_ADDR, receive};
pub use tables::ResultTables;
pub use upload::{UploadPayload, upload};

use fitts_core::StudyResults;
use std::path::{Path, PathBuf};

/// Renders the tables and writes `<dir>/<stem>.zip`. Returns the archive path.
pub fn export_results(results: &StudyResults, dir: &Path) -> Result<PathBuf, ExportError> {
    let tables = ResultTables::from_results(results)?;
    let stem = results.session.file_stem();
    fs_err::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.zip"));
    write_archive(&path, &stem, &tables)?;
    log::info!("Results written to {}", path.display());
    Ok(path)
}
