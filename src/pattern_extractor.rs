use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::debug;

use crate::models::{CandidatePair, PatternCategory};

/// Minimum sentence length (chars) for a sentence to be eligible at all.
const MIN_SENTENCE_CHARS: usize = 10;

/// Maximum answer length (chars); longer answers are cut at a token boundary.
const MAX_ANSWER_CHARS: usize = 70;

/// Trailing particles/case markers stripped from extracted answers.
const TRAILING_PARTICLES: [char; 14] = [
    '은', '는', '이', '가', '을', '를', '의', '에', '로', '와', '과', '도', '만', '며',
];

/// Fixed repair table for sentences that end mid-conjugation. The source
/// texts this engine sees routinely truncate verb endings ("수행 한"); the
/// repairs are an enumerated lookup, not a general conjugation model.
const VERB_REPAIRS: [(&str, &str); 8] = [
    ("수행 한", "수행한다"),
    ("사용 한", "사용한다"),
    ("실행 한", "실행한다"),
    ("처리 한", "처리한다"),
    ("구성 된", "구성된다"),
    ("포함 된", "포함된다"),
    ("생성 된", "생성된다"),
    ("정의 된", "정의된다"),
];

/// Function words excluded from keyword frequency ranking.
const STOPWORDS: [&str; 14] = [
    "그리고", "하지만", "그러나", "또한", "있는", "있다", "하는", "것은", "것이다", "위해",
    "대한", "경우", "통해", "이것은",
];

type PairBuilder = fn(&Captures<'_>) -> (String, String);

struct PatternRule {
    category: PatternCategory,
    min_chars: usize,
    regex: Regex,
    build: PairBuilder,
}

/// Rule engine that turns sentences into candidate question/answer pairs.
///
/// Rules are evaluated in priority order and the first match wins, so the
/// specific patterns (terminology, cause-effect, method, characteristic)
/// always take a sentence before the generic definition catch-all can, and
/// each sentence yields at most one candidate.
pub struct PatternExtractor {
    rules: Vec<PatternRule>,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        let rules = vec![
            PatternRule {
                category: PatternCategory::Terminology,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)(?:이란|란)\s+(.+)$").unwrap(),
                build: build_terminology,
            },
            PatternRule {
                category: PatternCategory::CauseEffect,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)\s*(?:때문에|로 인해|로 인하여)\s+(.+)$").unwrap(),
                build: build_cause_effect,
            },
            PatternRule {
                category: PatternCategory::CauseEffect,
                min_chars: 10,
                regex: Regex::new(r"(?i)^(.+?)\s+because\s+(.+)$").unwrap(),
                build: build_cause_effect_en,
            },
            PatternRule {
                category: PatternCategory::Method,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)(?:하려면|하기\s*위해서는)\s+(.+)$").unwrap(),
                build: build_method,
            },
            PatternRule {
                category: PatternCategory::Method,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)의\s*방법(?:은|는|으로는)?\s+(.+)$").unwrap(),
                build: build_method_noun,
            },
            PatternRule {
                category: PatternCategory::Characteristic,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)(?:의|은|는)\s*(특징|특성|장점|단점)(?:은|는|으로)?\s+(.+)$")
                    .unwrap(),
                build: build_characteristic,
            },
            // Generic definition catch-alls; must stay last
            PatternRule {
                category: PatternCategory::Definition,
                min_chars: 10,
                regex: Regex::new(r"^(.+?)(?:은|는)\s+(.+)$").unwrap(),
                build: build_definition,
            },
            PatternRule {
                category: PatternCategory::Definition,
                min_chars: 10,
                regex: Regex::new(r"(?i)^([\w\s'-]+?)\s+(?:is|are)\s+(.+)$").unwrap(),
                build: build_definition_en,
            },
        ];
        Self { rules }
    }

    /// Extract up to `count` candidates from the text.
    pub fn extract(&self, text: &str, count: usize) -> Vec<CandidatePair> {
        self.extract_with_types(text, count, &[])
    }

    /// Extract with an allow-list of pattern categories; empty allows all.
    /// The keyword fallback is always permitted, so the method still yields
    /// `min(count, eligible_sentences)` candidates whenever any eligible
    /// sentence exists.
    pub fn extract_with_types(
        &self,
        text: &str,
        count: usize,
        types: &[PatternCategory],
    ) -> Vec<CandidatePair> {
        if count == 0 {
            return Vec::new();
        }

        let sentences = split_sentences(text);
        let mut candidates = Vec::new();
        let mut used = vec![false; sentences.len()];

        // First pass: ordered pattern rules, first match wins per sentence.
        for (i, sentence) in sentences.iter().enumerate() {
            if candidates.len() >= count {
                break;
            }
            for rule in &self.rules {
                if !types.is_empty() && !types.contains(&rule.category) {
                    continue;
                }
                if sentence.chars().count() < rule.min_chars {
                    continue;
                }
                let Some(caps) = rule.regex.captures(sentence) else {
                    continue;
                };
                let (prompt, raw_answer) = (rule.build)(&caps);
                let answer = clean_answer(&raw_answer);
                if answer.is_empty() {
                    continue;
                }
                candidates.push(CandidatePair {
                    prompt,
                    answer,
                    category: rule.category,
                    source_sentence: sentence.clone(),
                });
                used[i] = true;
                break;
            }
        }

        // Second pass: frequency-ranked keywords paired with their sentence.
        if candidates.len() < count {
            for (keyword, sentence_idx) in self.keyword_sentences(&sentences) {
                if candidates.len() >= count {
                    break;
                }
                if used[sentence_idx] {
                    continue;
                }
                let sentence = &sentences[sentence_idx];
                let answer = clean_answer(sentence);
                if answer.is_empty() {
                    continue;
                }
                candidates.push(CandidatePair {
                    prompt: format!("'{}'에 대해 설명하시오.", keyword),
                    answer,
                    category: PatternCategory::Keyword,
                    source_sentence: sentence.clone(),
                });
                used[sentence_idx] = true;
            }
        }

        // Final top-up: any eligible sentence not yet consumed.
        if candidates.len() < count {
            for (i, sentence) in sentences.iter().enumerate() {
                if candidates.len() >= count {
                    break;
                }
                if used[i] {
                    continue;
                }
                let answer = clean_answer(sentence);
                if answer.is_empty() {
                    continue;
                }
                candidates.push(CandidatePair {
                    prompt: "다음 내용의 핵심은 무엇인가?".to_string(),
                    answer,
                    category: PatternCategory::Keyword,
                    source_sentence: sentence.clone(),
                });
                used[i] = true;
            }
        }

        debug!(
            sentence_count = sentences.len(),
            candidate_count = candidates.len(),
            requested = count,
            "Pattern extraction finished"
        );
        candidates
    }

    /// Frequency-ranked keywords with the text's sentence that contains them.
    pub fn keywords(&self, text: &str, count: usize) -> Vec<(String, String)> {
        let sentences = split_sentences(text);
        self.keyword_sentences(&sentences)
            .into_iter()
            .take(count)
            .map(|(kw, idx)| (kw, sentences[idx].clone()))
            .collect()
    }

    /// Top sentences by summed keyword frequency, in original text order.
    pub fn summarize(&self, text: &str, max_sentences: usize) -> Vec<String> {
        let sentences = split_sentences(text);
        let frequencies = keyword_frequencies(&sentences);

        let mut scored: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let score = s
                    .split_whitespace()
                    .filter_map(normalize_token)
                    .map(|tok| frequencies.get(&tok).copied().unwrap_or(0))
                    .sum();
                (i, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut picked: Vec<usize> = scored.into_iter().take(max_sentences).map(|(i, _)| i).collect();
        picked.sort_unstable();
        picked.into_iter().map(|i| sentences[i].clone()).collect()
    }

    fn keyword_sentences(&self, sentences: &[String]) -> Vec<(String, usize)> {
        let frequencies = keyword_frequencies(sentences);
        let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
        // Deterministic order: frequency desc, then lexicographic
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .filter_map(|(keyword, _)| {
                sentences
                    .iter()
                    .position(|s| s.contains(&keyword))
                    .map(|idx| (keyword, idx))
            })
            .collect()
    }
}

/// Split text into sentence-like segments and drop the too-short ones.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, '.' | '!' | '?' | '。' | '\n'))
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

fn keyword_frequencies(sentences: &[String]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for sentence in sentences {
        for token in sentence.split_whitespace() {
            if let Some(word) = normalize_token(token) {
                *counts.entry(word).or_default() += 1;
            }
        }
    }
    counts
}

/// Strip punctuation and one trailing particle from a token; None when the
/// remainder is too short or a stopword.
fn normalize_token(token: &str) -> Option<String> {
    let trimmed = token.trim_matches(|c: char| c.is_ascii_punctuation() || c == '。');
    let mut chars: Vec<char> = trimmed.chars().collect();
    if chars.len() >= 3 && TRAILING_PARTICLES.contains(chars.last().unwrap_or(&' ')) {
        chars.pop();
    }
    let word: String = chars.into_iter().collect();
    if word.chars().count() < 2 || STOPWORDS.contains(&word.as_str()) {
        return None;
    }
    Some(word)
}

/// Post-pass cleanup applied to every extracted answer: trailing punctuation
/// and particles come off, truncated verb endings are repaired from the
/// fixed table, copula endings are stripped, and the result is capped at a
/// token boundary.
fn clean_answer(raw: &str) -> String {
    let mut answer = raw.trim().trim_end_matches(['.', '!', '?', '。', ',']).trim().to_string();

    for (broken, repaired) in VERB_REPAIRS {
        if let Some(stem) = answer.strip_suffix(broken) {
            answer = format!("{stem}{repaired}");
            break;
        }
    }

    if let Some(stripped) = answer.strip_suffix("입니다") {
        answer = stripped.trim_end().to_string();
    } else if let Some(stripped) = answer.strip_suffix("이다") {
        answer = stripped.trim_end().to_string();
    }

    let mut chars: Vec<char> = answer.chars().collect();
    if chars.len() > 2 && TRAILING_PARTICLES.contains(chars.last().unwrap_or(&' ')) {
        // Only strip a case marker off a noun phrase, never a verb ending
        let last = *chars.last().unwrap_or(&' ');
        if last != '며' || !answer.ends_with("하며") {
            chars.pop();
        }
    }
    answer = chars.into_iter().collect::<String>().trim_end().to_string();

    cap_at_boundary(&answer, MAX_ANSWER_CHARS)
}

/// Cap to `max` chars, cutting back to the nearest token/clause boundary
/// rather than mid-word.
fn cap_at_boundary(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let prefix: String = s.chars().take(max).collect();
    let cut = prefix.rfind([' ', ',', '.']);
    let capped = match cut {
        Some(idx) if idx > 0 => &prefix[..idx],
        _ => prefix.as_str(),
    };
    capped.trim_end_matches([',', '.', ' ']).to_string()
}

fn build_terminology(caps: &Captures<'_>) -> (String, String) {
    let term = caps[1].trim();
    (format!("'{}'(이)란 무엇인가?", term), caps[2].trim().to_string())
}

fn build_cause_effect(caps: &Captures<'_>) -> (String, String) {
    let cause = caps[1].trim();
    let effect = caps[2].trim().trim_end_matches(['.', '!', '?']);
    (format!("'{}'의 원인은 무엇인가?", effect), cause.to_string())
}

fn build_cause_effect_en(caps: &Captures<'_>) -> (String, String) {
    let effect = caps[1].trim();
    let cause = caps[2].trim();
    (format!("What is the reason that {}?", effect), cause.to_string())
}

fn build_method(caps: &Captures<'_>) -> (String, String) {
    let goal = caps[1].trim();
    (format!("{}하려면 어떻게 해야 하는가?", goal), caps[2].trim().to_string())
}

fn build_method_noun(caps: &Captures<'_>) -> (String, String) {
    let subject = caps[1].trim();
    (format!("'{}'의 방법은 무엇인가?", subject), caps[2].trim().to_string())
}

fn build_characteristic(caps: &Captures<'_>) -> (String, String) {
    let subject = caps[1].trim();
    let aspect = caps[2].trim();
    (format!("'{}'의 {}은 무엇인가?", subject, aspect), caps[3].trim().to_string())
}

fn build_definition(caps: &Captures<'_>) -> (String, String) {
    let subject = caps[1].trim();
    (format!("'{}'은(는) 무엇인가?", subject), caps[2].trim().to_string())
}

fn build_definition_en(caps: &Captures<'_>) -> (String, String) {
    let subject = caps[1].trim();
    (format!("What is {}?", subject), caps[2].trim().to_string())
}
