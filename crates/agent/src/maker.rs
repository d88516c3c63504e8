//! Candidate answer generation.

use assistant_core::{AppError, AppResult};
use assistant_knowledge::Passage;
use std::cmp::Reverse;
use std::collections::BTreeSet;

const PREAMBLE: &str = "Based on the research documents in the knowledge base:\n\n";
const SUMMARY_BODY: &str =
    "The documents above contain relevant information addressing your question. ";
const FOOTER: &str =
    "*Note: This response is generated from the local knowledge base using semantic search.*";

/// Sentences must be longer than this to be quoted.
const MIN_SENTENCE_CHARS: usize = 20;
const SENTENCES_PER_SOURCE: usize = 3;
const MAX_KEY_TERMS: usize = 5;
/// Key terms must be longer than this.
const MIN_KEY_TERM_CHARS: usize = 8;

/// Produces the first candidate answer for a query.
pub trait AnswerMaker: Send + Sync {
    /// Build an answer from `passages`. Fails when `passages` is empty.
    fn generate(&self, query: &str, passages: &[Passage]) -> AppResult<String>;
}

/// Extractive answer built from quoted passage sentences and key terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveMaker;

impl AnswerMaker for ExtractiveMaker {
    fn generate(&self, query: &str, passages: &[Passage]) -> AppResult<String> {
        if passages.is_empty() {
            return Err(AppError::Pipeline(
                "cannot generate an answer without passages".to_string(),
            ));
        }

        let mut answer = String::from(PREAMBLE);

        for (i, passage) in passages.iter().enumerate() {
            let quoted = sentences(passage, MIN_SENTENCE_CHARS);
            if quoted.is_empty() {
                continue;
            }
            answer.push_str(&format!("**Source {}:**\n", i + 1));
            answer.push_str(&quoted[..quoted.len().min(SENTENCES_PER_SOURCE)].join("\n"));
            answer.push_str("\n\n");
        }

        answer.push_str(&format!("\n**Summary for your query: '{}'**\n", query));
        answer.push_str(SUMMARY_BODY);
        answer.push_str("Key concepts include: ");
        answer.push_str(&key_terms(passages).join(", "));
        answer.push_str(".\n\n");
        answer.push_str(FOOTER);

        tracing::debug!("Generated candidate answer ({} chars)", answer.chars().count());
        Ok(answer)
    }
}

/// Split `text` into sentences whose body is longer than `min_chars`.
///
/// Sentences end at `.`, `!` or `?`. Each returned sentence is trimmed and
/// carries its terminator; a trailing fragment without one gets a `.`.
pub(crate) fn sentences(text: &str, min_chars: usize) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .filter_map(|piece| {
            let trimmed = piece.trim();
            let body = trimmed.trim_end_matches(['.', '!', '?']).trim_end();
            if body.chars().count() <= min_chars {
                return None;
            }
            if trimmed.len() == body.len() {
                Some(format!("{}.", body))
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Distinct long alphabetic words from the passages.
///
/// Longest first, ties broken alphabetically, so the selection is stable.
pub(crate) fn key_terms(passages: &[Passage]) -> Vec<String> {
    let joined = passages.join(" ").to_lowercase();
    let distinct: BTreeSet<&str> = joined
        .split_whitespace()
        .filter(|w| w.chars().all(char::is_alphabetic) && w.chars().count() > MIN_KEY_TERM_CHARS)
        .collect();

    let mut terms: Vec<&str> = distinct.into_iter().collect();
    terms.sort_by_key(|w| (Reverse(w.chars().count()), *w));
    terms
        .into_iter()
        .take(MAX_KEY_TERMS)
        .map(str::to_string)
        .collect()
}
