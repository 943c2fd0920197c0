use serde::Deserialize;
use tracing::warn;

use crate::content_ranker::ContentRanker;
use crate::distractor_generator::{DistractorGenerator, DISTRACTOR_COUNT};
use crate::errors::ProviderError;
use crate::llm_providers::{JsonResponseParser, LlmProvider};
use crate::models::{
    Answer, GenerationKind, GenerationOptions, PatternCategory, RemainingQuota, ServiceMode,
    StudyItem,
};
use crate::pattern_extractor::PatternExtractor;
use crate::quota_manager::QuotaManager;
use crate::{log_generation_done, log_generation_start, log_provider_fallback};

/// Wire format for AI-generated flashcards.
#[derive(Debug, Deserialize)]
struct GeneratedCards {
    cards: Vec<GeneratedCard>,
}

#[derive(Debug, Deserialize)]
struct GeneratedCard {
    front: String,
    back: String,
    difficulty: Option<f64>,
}

/// Wire format for AI-generated quiz questions.
#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    options: Option<Vec<String>>,
    #[serde(rename = "correctAnswer")]
    correct_answer: Answer,
    explanation: Option<String>,
    difficulty: Option<f64>,
}

/// Single entry point for content generation.
///
/// `generate` is a total function: whatever fails underneath (provider
/// outage, quota exhaustion, malformed response, missing configuration),
/// the caller always receives study items. Failures degrade through the
/// offline rule-based path or, for configuration breakage, the mock path,
/// and are reported through logs rather than errors.
pub struct ProviderGateway {
    quota: QuotaManager,
    provider: Option<LlmProvider>,
    json_parser: JsonResponseParser,
    extractor: PatternExtractor,
    distractors: DistractorGenerator,
    ranker: ContentRanker,
}

impl ProviderGateway {
    pub fn new(quota: QuotaManager, provider: Option<LlmProvider>) -> Self {
        Self {
            quota,
            provider,
            json_parser: JsonResponseParser,
            extractor: PatternExtractor::new(),
            distractors: DistractorGenerator::new(),
            ranker: ContentRanker::new(),
        }
    }

    /// Deterministic distractor shuffling for reproducible output.
    pub fn with_distractor_seed(mut self, seed: u64) -> Self {
        self.distractors = DistractorGenerator::with_seed(seed);
        self
    }

    pub fn quota(&self) -> &QuotaManager {
        &self.quota
    }

    pub fn mode(&self) -> ServiceMode {
        self.quota.mode()
    }

    pub async fn set_mode(&mut self, mode: ServiceMode) -> anyhow::Result<()> {
        self.quota.set_mode(mode).await
    }

    pub fn get_remaining(&self) -> RemainingQuota {
        self.quota.get_remaining()
    }

    /// Generate study items from source text. Never fails; degraded paths
    /// return rule-based or sample content instead of errors.
    pub async fn generate(
        &mut self,
        kind: GenerationKind,
        text: &str,
        options: &GenerationOptions,
    ) -> Vec<StudyItem> {
        log_generation_start!(kind, mode = self.quota.mode(), count = options.count);

        // Summaries and keywords are always produced locally; the provider
        // only ever generates flashcards and quiz questions.
        if matches!(kind, GenerationKind::Summary | GenerationKind::Keywords) {
            return self.offline_generation(kind, text, options);
        }

        match self.quota.mode() {
            ServiceMode::Mock => self.mock_generation(kind, text, options),
            ServiceMode::Offline => self.offline_generation(kind, text, options),
            ServiceMode::Free | ServiceMode::Custom => {
                if !options.use_ai {
                    return self.offline_generation(kind, text, options);
                }
                self.generate_with_provider(kind, text, options).await
            }
        }
    }

    async fn generate_with_provider(
        &mut self,
        kind: GenerationKind,
        text: &str,
        options: &GenerationOptions,
    ) -> Vec<StudyItem> {
        match self.quota.check_quota().await {
            Ok(status) if status.can_use => {}
            Ok(_) => {
                // Denial reason already logged by the quota manager
                return self.offline_generation(kind, text, options);
            }
            Err(error) => {
                warn!(
                    component = "provider_gateway",
                    error = %error,
                    "Quota state unavailable, using offline generation"
                );
                return self.offline_generation(kind, text, options);
            }
        }

        match self.call_provider(kind, text, options).await {
            Ok(items) => {
                if let Err(error) = self.quota.increment_usage().await {
                    warn!(
                        component = "provider_gateway",
                        error = %error,
                        "Failed to persist usage counters"
                    );
                }
                let items = self.ranker.rank(items, options.count);
                log_generation_done!(kind, source = "llm", count = items.len());
                items
            }
            Err(error) => {
                let fallback = error.fallback_mode();
                if fallback == ServiceMode::Mock {
                    log_provider_fallback!(error, fallback = "mock");
                    if let Err(save_error) = self.quota.set_mode(ServiceMode::Mock).await {
                        warn!(
                            component = "provider_gateway",
                            error = %save_error,
                            "Failed to persist mode switch"
                        );
                    }
                    self.mock_generation(kind, text, options)
                } else {
                    log_provider_fallback!(error, fallback = "offline");
                    self.offline_generation(kind, text, options)
                }
            }
        }
    }

    async fn call_provider(
        &self,
        kind: GenerationKind,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<StudyItem>, ProviderError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            ProviderError::Config("no LLM provider configured".to_string())
        })?;

        let system_message = "You are an educational content generator. \
             Respond with valid JSON only, no surrounding prose.";

        match kind {
            GenerationKind::Flashcards => {
                let prompt = flashcard_prompt(text, options);
                let response = provider.make_request(Some(system_message), &prompt).await?;
                let payload: GeneratedCards = self.json_parser.parse_json_response(&response)?;
                if payload.cards.is_empty() {
                    return Err(ProviderError::Parsing(
                        "provider returned no cards".to_string(),
                    ));
                }
                Ok(payload
                    .cards
                    .into_iter()
                    .map(|card| {
                        let mut item =
                            StudyItem::new(card.front, Answer::Text(card.back));
                        item.difficulty =
                            card.difficulty.unwrap_or_else(|| options.difficulty.numeric());
                        item.tags = vec!["ai".to_string()];
                        item
                    })
                    .collect())
            }
            GenerationKind::Quiz => {
                let prompt = quiz_prompt(text, options);
                let response = provider.make_request(Some(system_message), &prompt).await?;
                let payload: GeneratedQuestions =
                    self.json_parser.parse_json_response(&response)?;
                if payload.questions.is_empty() {
                    return Err(ProviderError::Parsing(
                        "provider returned no questions".to_string(),
                    ));
                }
                Ok(payload
                    .questions
                    .into_iter()
                    .map(|question| {
                        let mut item =
                            StudyItem::new(question.question, question.correct_answer);
                        item.options = question.options;
                        item.explanation = question.explanation;
                        item.difficulty = question
                            .difficulty
                            .unwrap_or_else(|| options.difficulty.numeric());
                        item.tags = vec!["ai".to_string()];
                        item
                    })
                    .collect())
            }
            GenerationKind::Summary | GenerationKind::Keywords => Err(ProviderError::Config(
                "summary and keyword generation are local-only".to_string(),
            )),
        }
    }

    /// Rule-based generation from the pattern extractor. Used in offline
    /// mode and as the degraded path for every recoverable failure.
    fn offline_generation(
        &self,
        kind: GenerationKind,
        text: &str,
        options: &GenerationOptions,
    ) -> Vec<StudyItem> {
        let items = match kind {
            GenerationKind::Flashcards => self.offline_flashcards(text, options),
            GenerationKind::Quiz => self.offline_quiz(text, options),
            GenerationKind::Summary => self.offline_summary(text, options),
            GenerationKind::Keywords => self.offline_keywords(text, options),
        };
        let items = self.ranker.rank(items, options.count);
        log_generation_done!(kind, source = "offline", count = items.len());
        items
    }

    fn offline_flashcards(&self, text: &str, options: &GenerationOptions) -> Vec<StudyItem> {
        // Over-extract so the ranker has room to dedup
        self.extractor
            .extract_with_types(text, options.count * 2, &options.types)
            .into_iter()
            .map(|pair| {
                let mut item = StudyItem::new(pair.prompt, Answer::Text(pair.answer));
                item.difficulty = options.difficulty.numeric();
                item.explanation = Some(pair.source_sentence);
                item.tags = vec![category_tag(pair.category).to_string()];
                item
            })
            .collect()
    }

    fn offline_quiz(&self, text: &str, options: &GenerationOptions) -> Vec<StudyItem> {
        self.extractor
            .extract_with_types(text, options.count * 2, &options.types)
            .into_iter()
            .map(|pair| {
                let mut choices = self.distractors.generate(&pair.answer, text);
                // Deterministic insertion position derived from the prompt
                let position = pair.prompt.chars().count() % (DISTRACTOR_COUNT + 1);
                choices.insert(position, pair.answer);

                let mut item = StudyItem::new(pair.prompt, Answer::Index(position));
                item.options = Some(choices);
                item.difficulty = options.difficulty.numeric();
                item.explanation = Some(pair.source_sentence);
                item.tags = vec![category_tag(pair.category).to_string()];
                item
            })
            .collect()
    }

    fn offline_summary(&self, text: &str, options: &GenerationOptions) -> Vec<StudyItem> {
        let sentences = self.extractor.summarize(text, 3);
        if sentences.is_empty() {
            return Vec::new();
        }
        let mut item = StudyItem::new(
            "다음 글의 핵심 내용을 요약하시오.".to_string(),
            Answer::Text(sentences.join(" ")),
        );
        item.difficulty = options.difficulty.numeric();
        item.tags = vec!["summary".to_string()];
        vec![item]
    }

    fn offline_keywords(&self, text: &str, options: &GenerationOptions) -> Vec<StudyItem> {
        self.extractor
            .keywords(text, options.count)
            .into_iter()
            .map(|(keyword, sentence)| {
                let mut item = StudyItem::new(
                    format!("키워드 '{}'의 의미를 설명하시오.", keyword),
                    Answer::Text(sentence.clone()),
                );
                item.difficulty = options.difficulty.numeric();
                item.explanation = Some(sentence);
                item.tags = vec!["keyword".to_string()];
                item
            })
            .collect()
    }

    /// Deterministic sample content sliced from the input text. No
    /// provider, no quota, no randomness beyond item ids. Numbered samples
    /// fill in when the text runs out of sentences.
    fn mock_generation(
        &self,
        kind: GenerationKind,
        text: &str,
        options: &GenerationOptions,
    ) -> Vec<StudyItem> {
        let sentences: Vec<&str> = text
            .split(|c: char| matches!(c, '.' | '!' | '?' | '。' | '\n'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let items: Vec<StudyItem> = (0..options.count)
            .map(|i| {
                let (prompt, answer_text) = match sentences.get(i) {
                    Some(sentence) => (
                        format!("[샘플] 다음 내용을 설명하시오: {}", snippet(sentence)),
                        (*sentence).to_string(),
                    ),
                    None => (
                        format!("[샘플] 연습 문제 {}", i + 1),
                        format!("[샘플] 답변 {}", i + 1),
                    ),
                };

                let mut item = match kind {
                    GenerationKind::Quiz => {
                        let mut item = StudyItem::new(prompt, Answer::Index(0));
                        item.options = Some(vec![
                            answer_text,
                            "오답 보기 1".to_string(),
                            "오답 보기 2".to_string(),
                            "오답 보기 3".to_string(),
                        ]);
                        item
                    }
                    _ => StudyItem::new(prompt, Answer::Text(answer_text)),
                };
                item.difficulty = options.difficulty.numeric();
                item.tags = vec!["mock".to_string()];
                item
            })
            .collect();

        log_generation_done!(kind, source = "mock", count = items.len());
        items
    }
}

/// Leading slice of a sentence for sample prompts, cut on a char boundary.
fn snippet(sentence: &str) -> String {
    let short: String = sentence.chars().take(24).collect();
    if short.chars().count() < sentence.chars().count() {
        format!("{}…", short.trim_end())
    } else {
        short
    }
}

fn category_tag(category: PatternCategory) -> &'static str {
    match category {
        PatternCategory::Definition => "definition",
        PatternCategory::Characteristic => "characteristic",
        PatternCategory::CauseEffect => "cause_effect",
        PatternCategory::Method => "method",
        PatternCategory::Terminology => "terminology",
        PatternCategory::Keyword => "keyword",
    }
}

fn flashcard_prompt(text: &str, options: &GenerationOptions) -> String {
    format!(
        r#"Create {count} flashcards from the following study material. The material may be Korean or English; answer in the material's language.

Material:
{text}

Requested difficulty: {difficulty:?}

Respond with JSON in exactly this shape:
{{
  "cards": [
    {{"front": "question text", "back": "answer text", "difficulty": 3.0}}
  ]
}}"#,
        count = options.count,
        text = text,
        difficulty = options.difficulty,
    )
}

fn quiz_prompt(text: &str, options: &GenerationOptions) -> String {
    format!(
        r#"Create {count} multiple-choice quiz questions from the following study material. The material may be Korean or English; answer in the material's language. Each question needs exactly 4 options.

Material:
{text}

Requested difficulty: {difficulty:?}

Respond with JSON in exactly this shape:
{{
  "questions": [
    {{
      "question": "question text",
      "options": ["option 1", "option 2", "option 3", "option 4"],
      "correctAnswer": 0,
      "explanation": "why this is correct",
      "difficulty": 3.0
    }}
  ]
}}"#,
        count = options.count,
        text = text,
        difficulty = options.difficulty,
    )
}
