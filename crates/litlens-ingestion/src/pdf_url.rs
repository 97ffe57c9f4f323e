//! Locating a downloadable PDF for an article.
//!
//! Locators are tried in order (PMC, Europe PMC, Unpaywall); the first hit
//! wins. A failing locator is logged and skipped.

use std::sync::Arc;

use async_trait::async_trait;
use litlens_common::Article;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::sources::europepmc::EuropePmcClient;
use crate::sources::unpaywall::UnpaywallClient;

const PMC_PDF_BASE: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfLocation {
    pub url: String,
    /// Which locator found it: `pmc`, `europepmc` or `unpaywall`.
    pub source: String,
    pub open_access: bool,
}

#[async_trait]
pub trait PdfLocator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self, article: &Article) -> anyhow::Result<Option<PdfLocation>>;
}

/// PubMed Central copy, derived from the article's PMCID without a request.
pub struct PmcLocator;

#[async_trait]
impl PdfLocator for PmcLocator {
    fn name(&self) -> &'static str {
        "pmc"
    }

    async fn locate(&self, article: &Article) -> anyhow::Result<Option<PdfLocation>> {
        Ok(article.pmcid.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(|pmcid| {
            let pmcid = if pmcid.starts_with("PMC") {
                pmcid.to_string()
            } else {
                format!("PMC{}", pmcid)
            };
            PdfLocation {
                url: format!("{}/{}/pdf/", PMC_PDF_BASE, pmcid),
                source: "pmc".to_string(),
                open_access: true,
            }
        }))
    }
}

#[async_trait]
impl PdfLocator for EuropePmcClient {
    fn name(&self) -> &'static str {
        "europepmc"
    }

    async fn locate(&self, article: &Article) -> anyhow::Result<Option<PdfLocation>> {
        self.pdf_url(&article.pmid).await
    }
}

#[async_trait]
impl PdfLocator for UnpaywallClient {
    fn name(&self) -> &'static str {
        "unpaywall"
    }

    async fn locate(&self, article: &Article) -> anyhow::Result<Option<PdfLocation>> {
        match article.doi.as_deref() {
            Some(doi) => Ok(self.best_pdf(doi).await?),
            None => Ok(None),
        }
    }
}

pub struct PdfUrlResolver {
    locators: Vec<Arc<dyn PdfLocator>>,
}

impl PdfUrlResolver {
    pub fn new(locators: Vec<Arc<dyn PdfLocator>>) -> Self {
        Self { locators }
    }

    /// The standard chain: PMC, then Europe PMC, then Unpaywall.
    pub fn standard(europe_pmc: Arc<EuropePmcClient>, unpaywall: Arc<UnpaywallClient>) -> Self {
        let locators: Vec<Arc<dyn PdfLocator>> = vec![Arc::new(PmcLocator), europe_pmc, unpaywall];
        Self::new(locators)
    }

    #[instrument(skip(self, article), fields(pmid = %article.pmid))]
    pub async fn resolve(&self, article: &Article) -> Option<PdfLocation> {
        for locator in &self.locators {
            match locator.locate(article).await {
                Ok(Some(location)) => {
                    debug!(locator = locator.name(), url = %location.url, "PDF located");
                    return Some(location);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(locator = locator.name(), error = %e, "PDF locator failed; trying next");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixed(&'static str, Option<&'static str>);

    #[async_trait]
    impl PdfLocator for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn locate(&self, _article: &Article) -> anyhow::Result<Option<PdfLocation>> {
            Ok(self.1.map(|url| PdfLocation {
                url: url.to_string(),
                source: self.0.to_string(),
                open_access: false,
            }))
        }
    }

    struct Failing;

    #[async_trait]
    impl PdfLocator for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn locate(&self, _article: &Article) -> anyhow::Result<Option<PdfLocation>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    #[tokio::test]
    async fn test_pmc_locator_uses_pmcid() {
        let mut article = Article::new("1", "t");
        assert_eq!(PmcLocator.locate(&article).await.unwrap(), None);

        article.pmcid = Some("PMC123".into());
        let loc = PmcLocator.locate(&article).await.unwrap().unwrap();
        assert_eq!(loc.url, "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC123/pdf/");
        assert!(loc.open_access);
    }

    #[tokio::test]
    async fn test_first_hit_wins_and_errors_are_skipped() {
        let resolver = PdfUrlResolver::new(vec![
            Arc::new(Fixed("none", None)),
            Arc::new(Failing),
            Arc::new(Fixed("second", Some("https://b/pdf"))),
            Arc::new(Fixed("third", Some("https://c/pdf"))),
        ]);
        let loc = resolver.resolve(&Article::new("1", "t")).await.unwrap();
        assert_eq!(loc.source, "second");
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let resolver = PdfUrlResolver::new(vec![Arc::new(Failing), Arc::new(Fixed("none", None))]);
        assert!(resolver.resolve(&Article::new("1", "t")).await.is_none());
    }
}
