//! LitLens Database Layer
//!
//! SQLite persistence through sqlx. `Database` owns the pool and creates the
//! schema; each entity has a repository holding an `Arc<Database>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use litlens_db::{Database, ArticleRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://litlens.db", 10).await?;
//!     db.initialize().await?;
//!
//!     let articles = ArticleRepository::new(std::sync::Arc::new(db));
//!     println!("{} articles stored", articles.count().await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod articles;
pub mod projects;
pub mod questions;
pub mod hypotheses;
pub mod triages;
pub mod protocols;
pub mod collections;
pub mod annotations;
pub mod alerts;

pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use articles::ArticleRepository;
pub use projects::{ProjectRepository, ProjectUpdate};
pub use questions::{QuestionRepository, QuestionUpdate};
pub use hypotheses::{HypothesisRepository, HypothesisUpdate};
pub use triages::TriageRepository;
pub use protocols::ProtocolRepository;
pub use collections::CollectionRepository;
pub use annotations::AnnotationRepository;
pub use alerts::AlertRepository;
