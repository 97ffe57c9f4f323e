/// Core entity types shared by the database, agents and the web layer.
/// Enum values are persisted as the snake_case strings returned by `as_str`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

fn normalise_token(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub pmid: String,
    pub title: String,
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub pmcid: Option<String>,
    #[serde(default)]
    pub mesh_terms: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(pmid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            pmid: pmid.into(),
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            journal: None,
            publication_year: None,
            doi: None,
            pmcid: None,
            mesh_terms: Vec::new(),
            keywords: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Title, abstract and keywords joined for text analytics.
    pub fn searchable_text(&self) -> String {
        let mut text = self.title.clone();
        if let Some(abs) = &self.abstract_text {
            text.push('\n');
            text.push_str(abs);
        }
        if !self.keywords.is_empty() {
            text.push('\n');
            text.push_str(&self.keywords.join(" "));
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Project and access control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordered: a higher role implies every permission of the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Viewer,
    Editor,
    Owner,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Viewer => "viewer",
            ProjectRole::Editor => "editor",
            ProjectRole::Owner  => "owner",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match normalise_token(s).as_str() {
            "viewer" => Some(ProjectRole::Viewer),
            "editor" => Some(ProjectRole::Editor),
            "owner"  => Some(ProjectRole::Owner),
            _        => None,
        }
    }

    pub fn allows(&self, required: ProjectRole) -> bool {
        *self >= required
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub project_id: Uuid,
    pub user_id: String,
    pub role: ProjectRole,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Research questions & hypotheses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Open,
    Answered,
    Parked,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Open     => "open",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Parked   => "parked",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalise_token(s).as_str() {
            "answered" => QuestionStatus::Answered,
            "parked"   => QuestionStatus::Parked,
            _          => QuestionStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub id: Uuid,
    pub project_id: Uuid,
    pub text: String,
    /// 1 (highest) ..= 5 (lowest)
    pub priority: u8,
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    Proposed,
    Supported,
    Refuted,
    Inconclusive,
}

impl HypothesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Proposed     => "proposed",
            HypothesisStatus::Supported    => "supported",
            HypothesisStatus::Refuted      => "refuted",
            HypothesisStatus::Inconclusive => "inconclusive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalise_token(s).as_str() {
            "supported"    => HypothesisStatus::Supported,
            "refuted"      => HypothesisStatus::Refuted,
            "inconclusive" => HypothesisStatus::Inconclusive,
            _              => HypothesisStatus::Proposed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: Uuid,
    pub project_id: Uuid,
    pub question_id: Option<Uuid>,
    pub statement: String,
    pub status: HypothesisStatus,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Triage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    MustRead,
    NiceToKnow,
    Ignore,
}

impl TriageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageStatus::MustRead   => "must_read",
            TriageStatus::NiceToKnow => "nice_to_know",
            TriageStatus::Ignore     => "ignore",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match normalise_token(s).as_str() {
            "must_read"    => Some(TriageStatus::MustRead),
            "nice_to_know" => Some(TriageStatus::NiceToKnow),
            "ignore"       => Some(TriageStatus::Ignore),
            _              => None,
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or(TriageStatus::Ignore)
    }

    /// Status implied by a 0..=100 relevance score alone.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            TriageStatus::MustRead
        } else if score >= 40.0 {
            TriageStatus::NiceToKnow
        } else {
            TriageStatus::Ignore
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: Uuid,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceExcerpt {
    pub excerpt: String,
    #[serde(default)]
    pub question_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisRelation {
    Supports,
    Contradicts,
    #[default]
    Neutral,
}

impl HypothesisRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisRelation::Supports    => "supports",
            HypothesisRelation::Contradicts => "contradicts",
            HypothesisRelation::Neutral     => "neutral",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalise_token(s).as_str() {
            "supports" | "supporting" | "support"             => HypothesisRelation::Supports,
            "contradicts" | "contradicting" | "contradict"    => HypothesisRelation::Contradicts,
            _                                                 => HypothesisRelation::Neutral,
        }
    }
}

impl<'de> Deserialize<'de> for HypothesisRelation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisLink {
    pub hypothesis_id: Uuid,
    #[serde(default)]
    pub relationship: HypothesisRelation,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperTriage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pmid: String,
    pub status: TriageStatus,
    pub relevance_score: f64,
    pub confidence: f64,
    pub rationale: String,
    pub key_findings: Vec<String>,
    pub question_scores: Vec<QuestionScore>,
    pub evidence: Vec<EvidenceExcerpt>,
    pub hypothesis_links: Vec<HypothesisLink>,
    /// Names of orchestrator steps that fell back to their default output.
    pub fallbacks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Protocols
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStep {
    pub step_number: u32,
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pmid: String,
    pub name: String,
    pub protocol_type: Option<String>,
    pub materials: Vec<Material>,
    pub equipment: Vec<Equipment>,
    pub steps: Vec<ProtocolStep>,
    pub key_parameters: Vec<String>,
    pub difficulty: Option<String>,
    pub estimated_duration: Option<String>,
    /// 0.0 ..= 1.0
    pub confidence: f64,
    pub fallbacks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Collections, annotations, alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Note,
    Highlight,
    Question,
    Finding,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Note      => "note",
            NoteType::Highlight => "highlight",
            NoteType::Question  => "question",
            NoteType::Finding   => "finding",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalise_token(s).as_str() {
            "highlight" => NoteType::Highlight,
            "question"  => NoteType::Question,
            "finding"   => NoteType::Finding,
            _           => NoteType::Note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pmid: Option<String>,
    pub author_id: String,
    pub content: String,
    pub note_type: NoteType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighRelevancePaper,
    HypothesisEvidence,
    ProtocolReady,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighRelevancePaper => "high_relevance_paper",
            AlertKind::HypothesisEvidence => "hypothesis_evidence",
            AlertKind::ProtocolReady      => "protocol_ready",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalise_token(s).as_str() {
            "hypothesis_evidence" => AlertKind::HypothesisEvidence,
            "protocol_ready"      => AlertKind::ProtocolReady,
            _                     => AlertKind::HighRelevancePaper,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAlert {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub pmid: Option<String>,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_ordering_grants_lower_permissions() {
        assert!(ProjectRole::Owner.allows(ProjectRole::Editor));
        assert!(ProjectRole::Editor.allows(ProjectRole::Viewer));
        assert!(!ProjectRole::Viewer.allows(ProjectRole::Editor));
        assert!(!ProjectRole::Editor.allows(ProjectRole::Owner));
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert_eq!(ProjectRole::try_parse(" Editor "), Some(ProjectRole::Editor));
        assert_eq!(ProjectRole::try_parse("admin"), None);
    }

    #[test]
    fn test_triage_status_lenient_parse() {
        assert_eq!(TriageStatus::try_parse("Must Read"), Some(TriageStatus::MustRead));
        assert_eq!(TriageStatus::try_parse("nice-to-know"), Some(TriageStatus::NiceToKnow));
        assert_eq!(TriageStatus::try_parse("maybe"), None);
        assert_eq!(TriageStatus::parse("maybe"), TriageStatus::Ignore);
    }

    #[test]
    fn test_triage_status_from_score_thresholds() {
        assert_eq!(TriageStatus::from_score(70.0), TriageStatus::MustRead);
        assert_eq!(TriageStatus::from_score(69.9), TriageStatus::NiceToKnow);
        assert_eq!(TriageStatus::from_score(40.0), TriageStatus::NiceToKnow);
        assert_eq!(TriageStatus::from_score(12.0), TriageStatus::Ignore);
    }

    #[test]
    fn test_unknown_strings_map_to_defaults() {
        assert_eq!(QuestionStatus::parse("???"), QuestionStatus::Open);
        assert_eq!(HypothesisStatus::parse(""), HypothesisStatus::Proposed);
        assert_eq!(NoteType::parse("scribble"), NoteType::Note);
        assert_eq!(AlertKind::parse("other"), AlertKind::HighRelevancePaper);
    }

    #[test]
    fn test_enum_strings_round_trip() {
        for s in [TriageStatus::MustRead, TriageStatus::NiceToKnow, TriageStatus::Ignore] {
            assert_eq!(TriageStatus::parse(s.as_str()), s);
        }
        for k in [AlertKind::HighRelevancePaper, AlertKind::HypothesisEvidence, AlertKind::ProtocolReady] {
            assert_eq!(AlertKind::parse(k.as_str()), k);
        }
    }

    #[test]
    fn test_unknown_relation_deserializes_as_neutral() {
        let link: HypothesisLink = serde_json::from_value(serde_json::json!({
            "hypothesis_id": Uuid::nil(),
            "relationship": "partially_supports"
        }))
        .unwrap();
        assert_eq!(link.relationship, HypothesisRelation::Neutral);
    }

    #[test]
    fn test_relation_is_case_insensitive() {
        let link: HypothesisLink = serde_json::from_value(serde_json::json!({
            "hypothesis_id": Uuid::nil(),
            "relationship": "Supports"
        }))
        .unwrap();
        assert_eq!(link.relationship, HypothesisRelation::Supports);
        assert_eq!(HypothesisRelation::parse(" CONTRADICTS "), HypothesisRelation::Contradicts);
        for r in [HypothesisRelation::Supports, HypothesisRelation::Contradicts, HypothesisRelation::Neutral] {
            assert_eq!(HypothesisRelation::parse(r.as_str()), r);
        }
    }

    #[test]
    fn test_searchable_text_includes_abstract_and_keywords() {
        let mut a = Article::new("1", "KRAS inhibitors");
        a.abstract_text = Some("Sotorasib binds G12C.".into());
        a.keywords = vec!["oncology".into()];
        assert_eq!(a.searchable_text(), "KRAS inhibitors\nSotorasib binds G12C.\noncology");
    }
}
