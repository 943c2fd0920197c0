use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Number of wrong answers every multiple-choice item carries.
pub const DISTRACTOR_COUNT: usize = 3;

/// Length window for mined phrases, relative to the correct answer.
const MIN_LENGTH_RATIO: f64 = 0.4;
const MAX_LENGTH_RATIO: f64 = 2.5;

/// Generic fillers used when the source text lacks usable material.
const GENERIC_DISTRACTORS: [&str; 3] = [
    "위 보기 중 정답이 없다",
    "본문에서 언급되지 않은 내용이다",
    "정답과 관련이 없는 설명이다",
];

/// Produces plausible wrong answers for multiple-choice items by mining the
/// source text for phrases of comparable length and shape.
pub struct DistractorGenerator {
    seed: Option<u64>,
}

impl Default for DistractorGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DistractorGenerator {
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Deterministic variant for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// Always returns exactly three distractors, none equal to the correct
    /// answer; generic fillers pad out whatever the text cannot supply.
    pub fn generate(&self, correct_answer: &str, full_text: &str) -> Vec<String> {
        let correct = correct_answer.trim();
        let correct_len = correct.chars().count().max(1);
        let min_len = (correct_len as f64 * MIN_LENGTH_RATIO).ceil() as usize;
        let max_len = (correct_len as f64 * MAX_LENGTH_RATIO).floor() as usize;

        let mut phrases: Vec<String> = Vec::new();
        for phrase in mine_phrases(full_text) {
            let len = phrase.chars().count();
            if len < min_len || len > max_len {
                continue;
            }
            if phrase == correct || phrases.contains(&phrase) {
                continue;
            }
            phrases.push(phrase);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        phrases.shuffle(&mut rng);

        let mut distractors: Vec<String> = phrases.into_iter().take(DISTRACTOR_COUNT).collect();
        for filler in GENERIC_DISTRACTORS {
            if distractors.len() >= DISTRACTOR_COUNT {
                break;
            }
            if filler != correct && !distractors.iter().any(|d| d == filler) {
                distractors.push(filler.to_string());
            }
        }

        // The fixed pool can collide with the correct answer; numbered
        // fillers guarantee the count regardless.
        let mut n = 1;
        while distractors.len() < DISTRACTOR_COUNT {
            let filler = format!("본문과 관련 없는 보기 {}", n);
            if filler != correct && !distractors.iter().any(|d| d == &filler) {
                distractors.push(filler);
            }
            n += 1;
        }
        distractors
    }
}

/// Candidate phrases at two granularities: whole short sentences (10-50
/// chars) and clause-level fragments split on commas/connectives.
fn mine_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();

    for sentence in text.split(|c: char| matches!(c, '.' | '!' | '?' | '。' | '\n')) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let len = sentence.chars().count();
        if (10..=50).contains(&len) {
            phrases.push(sentence.to_string());
        }

        for clause in sentence.split([',', '、', ';']) {
            let clause = clause.trim();
            if clause != sentence && clause.chars().count() >= 4 {
                phrases.push(clause.to_string());
            }
        }
    }
    phrases
}
