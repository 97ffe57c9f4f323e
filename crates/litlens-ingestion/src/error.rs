use litlens_common::LitlensError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Blocked(#[from] LitlensError),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Unpaywall requires a contact email")]
    MissingContactEmail,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("download exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("response is not a PDF")]
    NotPdf,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}
