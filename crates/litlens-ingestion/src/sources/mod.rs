//! Literature source clients.

pub mod pubmed;
pub mod europepmc;
pub mod unpaywall;

use async_trait::async_trait;
use litlens_common::Article;

/// Common interface for article metadata sources.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Search for articles matching a query.
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Article>>;

    /// Fetch full metadata for known PMIDs. Unknown PMIDs are absent from the result.
    async fn fetch(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>>;
}
