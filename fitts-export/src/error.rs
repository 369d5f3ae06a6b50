use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("table is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("upload failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected upload with status {0}")]
    Rejected(reqwest::StatusCode),
}
