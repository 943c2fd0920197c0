use std::collections::HashSet;
use tracing::debug;

use crate::models::StudyItem;

/// Prompts sharing more than this token-overlap ratio are duplicates.
const DUPLICATE_THRESHOLD: f64 = 0.7;

const BASE_SCORE: u32 = 50;

/// Deduplicates near-identical questions and orders candidates by a simple
/// quality score. Deterministic: ties keep input order, so ranking the same
/// list twice yields the same output.
#[derive(Debug, Clone, Default)]
pub struct ContentRanker;

impl ContentRanker {
    pub fn new() -> Self {
        Self
    }

    /// Dedup, score, sort descending and truncate to `target_count`.
    pub fn rank(&self, items: Vec<StudyItem>, target_count: usize) -> Vec<StudyItem> {
        let input_count = items.len();

        let mut kept: Vec<StudyItem> = Vec::new();
        for item in items {
            let duplicate = kept
                .iter()
                .any(|k| token_overlap_ratio(&k.prompt, &item.prompt) > DUPLICATE_THRESHOLD);
            if !duplicate {
                kept.push(item);
            }
        }

        // Stable sort: equal scores preserve candidate order
        kept.sort_by_key(|item| std::cmp::Reverse(score(item)));
        kept.truncate(target_count);

        debug!(
            input_count,
            deduped_count = kept.len(),
            target_count,
            "Ranked generation candidates"
        );
        kept
    }
}

/// Shared lowercase whitespace tokens over the longer prompt's token count.
/// Both sides are deduplicated first, so a word repeated within one prompt
/// counts once and cannot inflate (or dilute) the ratio near the cutoff.
fn token_overlap_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count();
    shared as f64 / longest as f64
}

/// 0-100 quality score favoring well-sized prompts/answers and enriched
/// items (hints, explanations, examples).
fn score(item: &StudyItem) -> u32 {
    let mut score = BASE_SCORE;

    let prompt_len = item.prompt.chars().count();
    if (20..=100).contains(&prompt_len) {
        score += 20;
    }

    let answer_len = item.answer_text().chars().count();
    if (5..=50).contains(&answer_len) {
        score += 15;
    }

    if item.hint.is_some() {
        score += 10;
    }
    if item.explanation.is_some() {
        score += 10;
    }
    if !item.examples.is_empty() {
        score += 5;
    }

    score.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;

    fn item(prompt: &str, answer: &str) -> StudyItem {
        StudyItem::new(prompt.to_string(), Answer::Text(answer.to_string()))
    }

    #[test]
    fn test_near_duplicate_prompts_keep_first() {
        let ranker = ContentRanker::new();
        let items = vec![
            item("운영체제는 무엇을 관리하는 소프트웨어인가?", "컴퓨터 자원"),
            item("운영체제는 무엇을 관리하는 프로그램인가?", "하드웨어 자원"),
            item("캐시 적중률이 낮으면 어떻게 되는가?", "성능이 떨어진다"),
        ];

        let ranked = ranker.rank(items, 10);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().any(|i| i.prompt.contains("소프트웨어")));
        assert!(!ranked.iter().any(|i| i.prompt.contains("프로그램")));
    }

    #[test]
    fn test_distinct_prompts_survive() {
        let ranker = ContentRanker::new();
        let items = vec![
            item("스레드란 무엇인가?", "실행 흐름"),
            item("프로세스란 무엇인가?", "실행 중인 프로그램"),
        ];
        // Two shared tokens out of three is below the cutoff only when
        // prompts differ in their subject token.
        let ranked = ranker.rank(items, 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_enriched_items_rank_higher() {
        let ranker = ContentRanker::new();
        let plain = item("이 질문의 길이는 점수 구간에 들어간다", "적당한 답변 길이");
        let mut enriched = item("이 문장의 길이도 점수 구간에 들어간다", "비슷한 답변 길이");
        enriched.hint = Some("힌트".to_string());
        enriched.explanation = Some("설명".to_string());
        enriched.examples = vec!["예시".to_string()];

        let ranked = ranker.rank(vec![plain.clone(), enriched.clone()], 2);
        assert_eq!(ranked[0].id, enriched.id);
        assert_eq!(ranked[1].id, plain.id);
    }

    #[test]
    fn test_truncates_to_target_count() {
        let ranker = ContentRanker::new();
        let items = vec![
            item("첫 번째 질문은 무엇인가?", "하나"),
            item("두 번째 문제는 무엇인가?", "둘"),
            item("세 번째 내용은 무엇인가?", "셋"),
        ];
        assert_eq!(ranker.rank(items, 2).len(), 2);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let ranker = ContentRanker::new();
        let mut enriched = item("캐시 적중률을 높이는 방법은 무엇인가?", "지역성 활용");
        enriched.hint = Some("메모리 접근 패턴".to_string());
        let items = vec![
            item("스케줄러는 무엇을 결정하는가?", "작업 순서"),
            enriched,
            item("로그는 어디에 쓰이는가?", "장애 분석"),
        ];

        let first = ranker.rank(items.clone(), 2);
        let second = ranker.rank(items, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlap_ratio() {
        assert!(token_overlap_ratio("하나 둘 셋", "하나 둘 셋") > 0.99);
        assert!(token_overlap_ratio("하나 둘 셋", "넷 다섯 여섯") < 0.01);
        assert_eq!(token_overlap_ratio("", ""), 0.0);
    }
}
