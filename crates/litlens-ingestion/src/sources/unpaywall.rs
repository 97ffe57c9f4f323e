//! Unpaywall client: open-access copies by DOI.
//!
//! Endpoint: https://api.unpaywall.org/v2/{doi}?email=...

use litlens_common::sandbox::SandboxClient as Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::pdf_url::PdfLocation;

const UNPAYWALL_URL: &str = "https://api.unpaywall.org/v2";

pub struct UnpaywallClient {
    client: Client,
    email: Option<String>,
}

impl UnpaywallClient {
    pub fn new(email: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::new()?,
            email: email.filter(|e| !e.trim().is_empty()),
        })
    }

    /// Best open-access PDF for a DOI, or `None` if Unpaywall knows no free copy.
    #[instrument(skip(self))]
    pub async fn best_pdf(&self, doi: &str) -> Result<Option<PdfLocation>, SourceError> {
        let email = self.email.as_deref().ok_or(SourceError::MissingContactEmail)?;
        let url = format!("{}/{}", UNPAYWALL_URL, doi.trim());

        let resp = self.client.get(&url)?.query(&[("email", email)]).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("DOI unknown to Unpaywall");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SourceError::Status { status: resp.status().as_u16(), url });
        }
        let body: Value = resp.json().await?;
        Ok(best_pdf_from(&body))
    }
}

/// `best_oa_location.url_for_pdf`, else the first `oa_locations[*].url_for_pdf`.
pub(crate) fn best_pdf_from(body: &Value) -> Option<PdfLocation> {
    let pdf_of = |loc: &Value| {
        loc["url_for_pdf"]
            .as_str()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
    };
    let url = pdf_of(&body["best_oa_location"]).or_else(|| {
        body["oa_locations"]
            .as_array()
            .and_then(|locs| locs.iter().find_map(pdf_of))
    })?;
    Some(PdfLocation {
        url,
        source: "unpaywall".to_string(),
        open_access: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_best_location_wins() {
        let body = json!({
            "best_oa_location": {"url_for_pdf": "https://repo/best.pdf"},
            "oa_locations": [{"url_for_pdf": "https://repo/other.pdf"}]
        });
        assert_eq!(best_pdf_from(&body).unwrap().url, "https://repo/best.pdf");
    }

    #[test]
    fn test_falls_back_to_first_location_with_pdf() {
        let body = json!({
            "best_oa_location": {"url_for_pdf": null, "url": "https://landing"},
            "oa_locations": [{"url_for_pdf": null}, {"url_for_pdf": "https://repo/second.pdf"}]
        });
        let loc = best_pdf_from(&body).unwrap();
        assert_eq!(loc.url, "https://repo/second.pdf");
        assert_eq!(loc.source, "unpaywall");
    }

    #[test]
    fn test_closed_article_has_no_pdf() {
        assert!(best_pdf_from(&json!({"is_oa": false, "best_oa_location": null, "oa_locations": []})).is_none());
    }

    #[tokio::test]
    async fn test_missing_email_is_an_error() {
        let client = UnpaywallClient::new(Some("  ".into())).unwrap();
        let err = client.best_pdf("10.1000/x").await.unwrap_err();
        assert!(matches!(err, SourceError::MissingContactEmail));
    }
}
