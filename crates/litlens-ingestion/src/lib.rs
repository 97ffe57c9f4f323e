//! litlens-ingestion — getting literature into LitLens.
//!
//! - Article discovery and metadata (PubMed E-utilities, Europe PMC)
//! - Open-access PDF location (PMC, Europe PMC, Unpaywall)
//! - PDF download with size and type checks
//! - PDF text extraction and methods-section detection

pub mod error;
pub mod sources;
pub mod pdf_url;
pub mod pdf_fetch;
pub mod pdf_text;

pub use error::SourceError;
pub use sources::europepmc::{CitedWork, EuropePmcClient};
pub use sources::pubmed::PubMedClient;
pub use sources::unpaywall::UnpaywallClient;
pub use sources::LiteratureSource;
pub use pdf_url::{PdfLocation, PdfLocator, PdfUrlResolver, PmcLocator};
pub use pdf_fetch::PdfFetcher;
pub use pdf_text::{extract_text, methods_section, ExtractedText};
