//! PDF download.
//!
//! PDFs are served from arbitrary publisher and repository hosts, so this
//! uses its own client rather than the allowlisted one. Downloads are capped
//! and must start with the `%PDF` magic.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use crate::error::SourceError;

pub const DEFAULT_MAX_PDF_BYTES: usize = 25 * 1024 * 1024;
const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Clone)]
pub struct PdfFetcher {
    client: Client,
    max_bytes: usize,
}

impl PdfFetcher {
    pub fn new(max_bytes: usize, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("litlens/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let parsed = Url::parse(url).map_err(|_| SourceError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl(url.to_string()));
        }

        let mut resp = self.client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "application/pdf")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status { status: resp.status().as_u16(), url: url.to_string() });
        }
        if resp.content_length().is_some_and(|len| len as usize > self.max_bytes) {
            return Err(SourceError::TooLarge { limit: self.max_bytes });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(SourceError::TooLarge { limit: self.max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        check_pdf(&bytes)?;
        info!(bytes = bytes.len(), "PDF downloaded");
        Ok(bytes)
    }
}

pub(crate) fn check_pdf(bytes: &[u8]) -> Result<(), SourceError> {
    // Some servers prepend whitespace or a BOM before the header.
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        Ok(())
    } else {
        Err(SourceError::NotPdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pdf_magic() {
        assert!(check_pdf(b"%PDF-1.7\n...").is_ok());
        assert!(check_pdf(b"\xEF\xBB\xBF%PDF-1.4").is_ok());
        assert!(matches!(check_pdf(b"<html>paywall</html>"), Err(SourceError::NotPdf)));
        assert!(matches!(check_pdf(b""), Err(SourceError::NotPdf)));
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let fetcher = PdfFetcher::new(DEFAULT_MAX_PDF_BYTES, Duration::from_secs(5)).unwrap();
        assert!(matches!(fetcher.download("ftp://host/file.pdf").await, Err(SourceError::InvalidUrl(_))));
        assert!(matches!(fetcher.download("not a url").await, Err(SourceError::InvalidUrl(_))));
    }
}
