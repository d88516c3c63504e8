//! Answer revision after a rejected review.

use crate::maker::sentences;
use assistant_knowledge::Passage;

const ADDITIONAL_CONTEXT_HEADER: &str = "\n\n**Additional Context:**\n";
/// Sentences must be longer than this to be appended.
const MIN_CONTEXT_CHARS: usize = 30;
const CONTEXT_PASSAGES: usize = 2;

/// Revises a rejected answer using the checker's feedback.
pub trait AnswerRefiner: Send + Sync {
    fn refine(&self, query: &str, passages: &[Passage], prior: &str, feedback: &str) -> String;
}

/// Appends one extra sentence from each of the leading passages.
///
/// The prior answer is always kept as a prefix, so repeated refinement grows
/// the answer monotonically.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendRefiner;

impl AnswerRefiner for AppendRefiner {
    fn refine(&self, _query: &str, passages: &[Passage], prior: &str, feedback: &str) -> String {
        let mut refined = String::from(prior);
        refined.push_str(ADDITIONAL_CONTEXT_HEADER);

        for passage in passages.iter().take(CONTEXT_PASSAGES) {
            if let Some(sentence) = sentences(passage, MIN_CONTEXT_CHARS).into_iter().next() {
                refined.push_str(&sentence);
                refined.push(' ');
            }
        }

        tracing::debug!(
            feedback_lines = feedback.lines().count(),
            "Refined answer from {} to {} chars",
            prior.chars().count(),
            refined.chars().count()
        );
        refined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_first_long_sentence_of_leading_passages() {
        let passages = vec![
            "Short. The first passage has a sufficiently long sentence. Another long sentence follows here."
                .to_string(),
            "The second passage contributes one sentence as well.".to_string(),
            "The third passage is never consulted by the refiner.".to_string(),
        ];

        let refined = AppendRefiner.refine("q", &passages, "Prior answer.", "APPROVED: NO");

        assert_eq!(
            refined,
            "Prior answer.\n\n**Additional Context:**\n\
             The first passage has a sufficiently long sentence. \
             The second passage contributes one sentence as well. "
        );
    }

    #[test]
    fn test_prior_is_preserved_without_usable_sentences() {
        let passages = vec!["tiny.".to_string()];
        let refined = AppendRefiner.refine("q", &passages, "Prior.", "");
        assert_eq!(refined, "Prior.\n\n**Additional Context:**\n");
    }

    #[test]
    fn test_refinement_is_monotonic() {
        let passages = vec!["A reasonably long sentence that qualifies for appending.".to_string()];
        let once = AppendRefiner.refine("q", &passages, "start", "");
        let twice = AppendRefiner.refine("q", &passages, &once, "");

        assert!(once.starts_with("start"));
        assert!(twice.starts_with(&once));
        assert!(twice.len() > once.len());
    }
}
