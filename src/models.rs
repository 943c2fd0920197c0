use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Answer to a study item: free text for flashcards/short answers, or an
/// index into `options` for multiple-choice questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Index(usize),
    Text(String),
}

impl Answer {
    /// Resolve the answer to display text, looking up option indices.
    pub fn display<'a>(&'a self, options: Option<&'a [String]>) -> &'a str {
        match self {
            Answer::Text(text) => text,
            Answer::Index(i) => options
                .and_then(|opts| opts.get(*i))
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

/// A flashcard or quiz question tracked by the spaced-repetition scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyItem {
    pub id: Uuid,
    pub prompt: String,
    pub answer: Answer,
    pub options: Option<Vec<String>>, // ordered, unique
    pub difficulty: f64,              // 0-5 continuous
    pub interval: i64,                // days, >= 1 once repetitions >= 1
    pub repetitions: i32,
    pub easiness_factor: f64, // floor 1.3
    pub next_review: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub source_document_id: Option<String>,
    pub hint: Option<String>,
    pub explanation: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl StudyItem {
    /// Create a fresh item with initial scheduling state.
    pub fn new(prompt: String, answer: Answer) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prompt,
            answer,
            options: None,
            difficulty: 3.0,
            interval: 1,
            repetitions: 0,
            easiness_factor: 2.5,
            next_review: now,
            created: now,
            last_reviewed: None,
            tags: Vec::new(),
            source_document_id: None,
            hint: None,
            explanation: None,
            examples: Vec::new(),
        }
    }

    /// The answer as display text.
    pub fn answer_text(&self) -> &str {
        self.answer.display(self.options.as_deref())
    }
}

/// What kind of content a generation request should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Flashcards,
    Quiz,
    Summary,
    Keywords,
}

impl GenerationKind {
    /// Storage collection this kind of content is persisted under.
    pub fn collection_name(self) -> &'static str {
        match self {
            GenerationKind::Flashcards => "flashcards",
            GenerationKind::Quiz => "quiz",
            GenerationKind::Summary => "summary",
            GenerationKind::Keywords => "keywords",
        }
    }
}

/// Requested difficulty band for generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl DifficultyLevel {
    /// Map the band onto the item's 0-5 continuous difficulty scale.
    pub fn numeric(self) -> f64 {
        match self {
            DifficultyLevel::Easy => 1.5,
            DifficultyLevel::Medium => 3.0,
            DifficultyLevel::Hard => 4.5,
            DifficultyLevel::Mixed => 3.0,
        }
    }
}

/// Sentence pattern categories recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Definition,
    Characteristic,
    CauseEffect,
    Method,
    Terminology,
    /// Frequency-ranked keyword fallback when pattern yield is short.
    Keyword,
}

/// Options for a single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub count: usize,
    pub difficulty: DifficultyLevel,
    /// Pattern categories to allow; empty means all.
    pub types: Vec<PatternCategory>,
    pub use_ai: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            count: 5,
            difficulty: DifficultyLevel::Mixed,
            types: Vec::new(),
            use_ai: true,
        }
    }
}

/// Operating mode of the content service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    Mock,
    Free,
    Offline,
    Custom,
}

/// Which backend actually produces content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Llm,
    Offline,
}

/// Process-wide service state: mode, provider and quota counters.
///
/// Loaded once at startup from the persisted config document, mutated on
/// every successful provider call and mode switch, persisted after each
/// mutation. Reset fields are rewritten lazily when the stored date falls
/// behind the current calendar day/month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    pub mode: ServiceMode,
    pub provider: ProviderKind,
    pub daily_quota: u32,
    pub used_quota: u32,
    pub monthly_quota: u32,
    pub used_monthly_quota: u32,
    pub last_reset: NaiveDate,
    pub last_monthly_reset: NaiveDate,
    pub api_key: Option<String>,
}

impl ServiceState {
    pub fn new(daily_quota: u32, monthly_quota: u32, today: NaiveDate) -> Self {
        Self {
            mode: ServiceMode::Free,
            provider: ProviderKind::Llm,
            daily_quota,
            used_quota: 0,
            monthly_quota,
            used_monthly_quota: 0,
            last_reset: today,
            last_monthly_reset: today,
            api_key: None,
        }
    }
}

/// Transient extraction output; discarded after ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub prompt: String,
    pub answer: String,
    pub category: PatternCategory,
    pub source_sentence: String,
}

/// Result of a quota gate check.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaStatus {
    pub can_use: bool,
    pub reason: Option<String>,
}

/// Remaining calls in the current daily/monthly windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingQuota {
    pub daily: u32,
    pub monthly: u32,
}
