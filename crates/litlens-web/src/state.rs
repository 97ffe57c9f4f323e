//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Duration;

use litlens_agents::RunSettings;
use litlens_analytics::{
    CitationAnalyzer, CitationSource, SimilarArticle, SimilarityEngine, SimilarityWeights, TtlCache,
};
use litlens_common::TriageStatus;
use litlens_config::Config;
use litlens_db::{
    AlertRepository, AnnotationRepository, ArticleRepository, CollectionRepository, Database,
    HypothesisRepository, ProjectRepository, ProtocolRepository, QuestionRepository,
    TriageRepository,
};
use litlens_ingestion::{
    EuropePmcClient, LiteratureSource, PdfFetcher, PdfUrlResolver, PubMedClient, UnpaywallClient,
};
use litlens_llm::{build_backend, LlmBackend};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

const PDF_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// An article was fetched from PubMed and stored
    ArticleStored { pmid: String, title: String },
    /// A paper was triaged for a project
    TriageCompleted { project_id: Uuid, pmid: String, status: TriageStatus, score: f64 },
    /// A protocol was extracted from a paper
    ProtocolExtracted { project_id: Uuid, pmid: String, protocol_id: Uuid, name: String },
    /// Project insights were generated
    InsightsGenerated { project_id: Uuid, fallbacks: Vec<String> },
    /// An alert was raised on a project
    AlertRaised { project_id: Uuid, alert_id: Uuid, title: String },
    /// General system notification
    Notification { level: String, message: String },
}

impl AppEvent {
    /// The project an event belongs to; `None` for events visible to everyone.
    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            AppEvent::TriageCompleted { project_id, .. }
            | AppEvent::ProtocolExtracted { project_id, .. }
            | AppEvent::InsightsGenerated { project_id, .. }
            | AppEvent::AlertRaised { project_id, .. } => Some(*project_id),
            AppEvent::ArticleStored { .. } | AppEvent::Notification { .. } => None,
        }
    }
}

/// External collaborators of the server: the LLM, literature sources and
/// PDF retrieval. Built from config in production, injected in tests.
pub struct Services {
    pub llm: Arc<dyn LlmBackend>,
    pub literature: Arc<dyn LiteratureSource>,
    pub citations: Arc<dyn CitationSource>,
    pub pdf_resolver: PdfUrlResolver,
    pub pdf_fetcher: PdfFetcher,
}

impl Services {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = build_backend(&config.llm)?;

        let sources = &config.sources;
        let ncbi_key = sources.ncbi_api_key.as_ref().map(|k| k.expose_secret().to_string());
        let pubmed = PubMedClient::new(ncbi_key, sources.contact_email.clone())?;
        let europe_pmc = Arc::new(EuropePmcClient::new()?);
        let unpaywall = Arc::new(UnpaywallClient::new(sources.contact_email.clone())?);

        Ok(Self {
            llm,
            literature: Arc::new(pubmed),
            citations: europe_pmc.clone(),
            pdf_resolver: PdfUrlResolver::standard(europe_pmc, unpaywall),
            pdf_fetcher: PdfFetcher::new(sources.pdf_max_bytes, PDF_DOWNLOAD_TIMEOUT)?,
        })
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,

    pub articles: ArticleRepository,
    pub projects: ProjectRepository,
    pub questions: QuestionRepository,
    pub hypotheses: HypothesisRepository,
    pub triages: TriageRepository,
    pub protocols: ProtocolRepository,
    pub collections: CollectionRepository,
    pub annotations: AnnotationRepository,
    pub alerts: AlertRepository,

    pub llm: Arc<dyn LlmBackend>,
    pub run_settings: RunSettings,
    pub literature: Arc<dyn LiteratureSource>,
    pub pdf_resolver: PdfUrlResolver,
    pub pdf_fetcher: PdfFetcher,

    pub similarity: SimilarityEngine,
    pub similar_cache: TtlCache<Vec<SimilarArticle>>,
    pub citations: CitationAnalyzer,

    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<Database>, services: Services) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let ttl = Duration::from_secs(config.analytics.cache_ttl_secs);
        let capacity = config.analytics.cache_capacity;

        Self {
            articles: ArticleRepository::new(db.clone()),
            projects: ProjectRepository::new(db.clone()),
            questions: QuestionRepository::new(db.clone()),
            hypotheses: HypothesisRepository::new(db.clone()),
            triages: TriageRepository::new(db.clone()),
            protocols: ProtocolRepository::new(db.clone()),
            collections: CollectionRepository::new(db.clone()),
            annotations: AnnotationRepository::new(db.clone()),
            alerts: AlertRepository::new(db.clone()),
            db,
            llm: services.llm,
            run_settings: RunSettings::from(&config.llm),
            literature: services.literature,
            pdf_resolver: services.pdf_resolver,
            pdf_fetcher: services.pdf_fetcher,
            similarity: SimilarityEngine::new(SimilarityWeights::from(&config.analytics)),
            similar_cache: TtlCache::new(ttl, capacity),
            citations: CitationAnalyzer::new(services.citations, TtlCache::new(ttl, capacity)),
            event_tx,
            config,
        }
    }

    /// Connects and initializes the database, then builds the external
    /// services from config.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database.url, config.database.max_connections).await?;
        db.initialize().await?;
        info!(url = %config.database.url, "Database ready");

        let services = Services::from_config(&config)?;
        info!(model = %services.llm.model_id(), "LLM backend ready");
        Ok(Self::new(config, Arc::new(db), services))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast to SSE subscribers. Having none is not an error.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub type SharedState = Arc<AppState>;
