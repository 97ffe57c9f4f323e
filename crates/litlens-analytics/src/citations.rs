//! Citation analysis: who cites an article, what it references, and how fast
//! citations are accumulating.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use futures_util::future::join;
use litlens_ingestion::{CitedWork, EuropePmcClient};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::cache::TtlCache;

/// Years, counting back from the current one, that make up "recent" velocity.
const VELOCITY_WINDOW_YEARS: i32 = 3;

#[async_trait]
pub trait CitationSource: Send + Sync {
    async fn citing(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>>;
    async fn referenced(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>>;
}

#[async_trait]
impl CitationSource for EuropePmcClient {
    async fn citing(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>> {
        self.citations(pmid).await
    }

    async fn referenced(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>> {
        self.references(pmid).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitationReport {
    pub pmid: String,
    pub citation_count: usize,
    pub reference_count: usize,
    pub citing: Vec<CitedWork>,
    pub references: Vec<CitedWork>,
    pub citations_by_year: Vec<YearCount>,
    /// Mean citations per year over the last three calendar years.
    pub recent_velocity: f64,
    /// Lookups that failed; the matching lists are empty.
    pub errors: Vec<String>,
}

pub fn build_report(
    pmid: &str,
    citing: Vec<CitedWork>,
    references: Vec<CitedWork>,
    current_year: i32,
) -> CitationReport {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for work in &citing {
        if let Some(year) = work.year {
            *per_year.entry(year).or_insert(0) += 1;
        }
    }

    let window_start = current_year - VELOCITY_WINDOW_YEARS + 1;
    let recent: usize = per_year
        .range(window_start..=current_year)
        .map(|(_, count)| count)
        .sum();

    CitationReport {
        pmid: pmid.to_string(),
        citation_count: citing.len(),
        reference_count: references.len(),
        citations_by_year: per_year
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect(),
        recent_velocity: recent as f64 / VELOCITY_WINDOW_YEARS as f64,
        citing,
        references,
        errors: Vec::new(),
    }
}

pub struct CitationAnalyzer {
    source: Arc<dyn CitationSource>,
    cache: TtlCache<CitationReport>,
}

impl CitationAnalyzer {
    pub fn new(source: Arc<dyn CitationSource>, cache: TtlCache<CitationReport>) -> Self {
        Self { source, cache }
    }

    /// Citation report for a PMID. Lookup failures are logged and reported in
    /// `errors`; only complete reports are cached.
    #[instrument(skip(self))]
    pub async fn analyze(&self, pmid: &str) -> CitationReport {
        let key = TtlCache::<CitationReport>::key(&["citations", pmid]);
        if let Some(report) = self.cache.get(&key).await {
            return report;
        }

        let (citing, references) = join(self.source.citing(pmid), self.source.referenced(pmid)).await;

        let mut errors = Vec::new();
        let citing = citing.unwrap_or_else(|e| {
            warn!(error = %e, "Citation lookup failed");
            errors.push(format!("citations: {}", e));
            Vec::new()
        });
        let references = references.unwrap_or_else(|e| {
            warn!(error = %e, "Reference lookup failed");
            errors.push(format!("references: {}", e));
            Vec::new()
        });

        let mut report = build_report(pmid, citing, references, Utc::now().year());
        if errors.is_empty() {
            self.cache.insert(key, report.clone()).await;
        }
        report.errors = errors;
        report
    }
}
