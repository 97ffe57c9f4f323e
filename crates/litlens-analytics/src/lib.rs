//! litlens-analytics — literature analytics engines.
//!
//! All engines are pure functions over articles, except citation analysis
//! which reads from a `CitationSource` and caches its reports.

pub mod cache;
pub mod similarity;
pub mod timeline;
pub mod citations;
pub mod authors;

pub use cache::TtlCache;
pub use similarity::{cosine, jaccard, tokenize, SimilarArticle, SimilarityEngine, SimilarityWeights, TfIdf};
pub use timeline::{Timeline, Trend, YearBucket};
pub use citations::{CitationAnalyzer, CitationReport, CitationSource, YearCount};
pub use authors::{AuthorReport, AuthorStats, Collaboration};
