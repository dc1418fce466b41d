use std::collections::BTreeSet;

use crate::KnowledgeChunk;

const KEYWORD_EXACT_WEIGHT: u32 = 4;
const KEYWORD_PARTIAL_WEIGHT: u32 = 2;
const TITLE_TOKEN_WEIGHT: u32 = 2;
const CONTENT_TOKEN_WEIGHT: u32 = 1;

// Substring probes shorter than this match too much unrelated text.
const MIN_PARTIAL_TOKEN_LEN: usize = 3;

/// Scores one chunk against the combined query/history text.
///
/// Exact keyword matches (every keyword token present in the query)
/// weigh most; keyword substring overlap and title tokens sit in the
/// middle; bare content-token hits weigh least. Pure function over
/// immutable inputs so it is unit-testable without any I/O.
pub fn score_chunk(
    query_text: &str,
    query_tokens: &BTreeSet<String>,
    chunk: &KnowledgeChunk,
) -> u32 {
    if query_tokens.is_empty() {
        return 0;
    }

    let mut score = 0u32;

    for keyword in &chunk.keywords {
        let keyword_lower = keyword.to_lowercase();
        let keyword_tokens = tokenize(&keyword_lower);
        if keyword_tokens.is_empty() {
            continue;
        }

        let exact = keyword_tokens
            .iter()
            .all(|token| query_tokens.contains(token));
        if exact {
            score += KEYWORD_EXACT_WEIGHT;
            continue;
        }

        let partial = query_text.contains(&keyword_lower)
            || query_tokens
                .iter()
                .any(|token| token.len() >= MIN_PARTIAL_TOKEN_LEN && keyword_lower.contains(token));
        if partial {
            score += KEYWORD_PARTIAL_WEIGHT;
        }
    }

    let title_tokens: BTreeSet<String> = tokenize(&chunk.title).into_iter().collect();
    let content_tokens: BTreeSet<String> = tokenize(&chunk.content).into_iter().collect();
    for token in query_tokens {
        if title_tokens.contains(token) {
            score += TITLE_TOKEN_WEIGHT;
        }
        if content_tokens.contains(token) {
            score += CONTENT_TOKEN_WEIGHT;
        }
    }

    score
}

/// Ranks chunks by descending lexical score, dropping zero scores and
/// keeping knowledge-base order on ties (stable sort). Returns
/// `(chunk_index, score)` pairs bounded by `max_chunks`.
pub fn rank_chunks(
    combined_text: &str,
    chunks: &[KnowledgeChunk],
    max_chunks: usize,
) -> Vec<(usize, u32)> {
    if max_chunks == 0 {
        return Vec::new();
    }

    let query_text = combined_text.to_lowercase();
    let query_tokens: BTreeSet<String> = tokenize(&query_text).into_iter().collect();
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, u32)> = chunks
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let score = score_chunk(&query_text, &query_tokens, chunk);
            if score > 0 {
                Some((index, score))
            } else {
                None
            }
        })
        .collect();

    ranked.sort_by(|left, right| right.1.cmp(&left.1));
    ranked.truncate(max_chunks);
    ranked
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
}
