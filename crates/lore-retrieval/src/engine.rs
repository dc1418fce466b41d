use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::scoring::rank_chunks;
use crate::{KnowledgeBase, KnowledgeChunk};

/// Upper bound on assembled context characters. Overflow truncates
/// trailing content so higher-relevance chunks survive intact.
pub const MAX_CONTEXT_CHARS: usize = 6_000;

const RELATED_SECTION_LABEL: &str = "Related Information";

#[derive(Debug, Error)]
/// Enumerates supported `RetrievalError` values.
pub enum RetrievalError {
    #[error("retrieval engine is not initialized")]
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Assembled retrieval output for one request.
///
/// `chunk_ids` lists every chunk that contributed text, primary
/// selections first; `context_text` never exceeds [`MAX_CONTEXT_CHARS`]
/// characters.
pub struct RetrievalResult {
    pub context_text: String,
    pub chunk_ids: Vec<String>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self {
            context_text: String::new(),
            chunk_ids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.context_text.is_empty() && self.chunk_ids.is_empty()
    }
}

/// Read-only retrieval engine over an immutable knowledge base.
///
/// Constructed once at startup and shared by reference across
/// concurrent requests; nothing here mutates after `new`, so readers
/// need no locking.
#[derive(Debug)]
pub struct RetrievalEngine {
    chunks: Vec<KnowledgeChunk>,
    system_prompt: String,
    index_by_id: HashMap<String, usize>,
}

impl RetrievalEngine {
    pub fn new(knowledge_base: KnowledgeBase, system_prompt: impl Into<String>) -> Self {
        let mut index_by_id = HashMap::with_capacity(knowledge_base.len());
        for (index, chunk) in knowledge_base.iter().enumerate() {
            // First occurrence wins on duplicate ids.
            index_by_id.entry(chunk.id.clone()).or_insert(index);
        }

        Self {
            chunks: knowledge_base,
            system_prompt: system_prompt.into(),
            index_by_id,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Scores every chunk against `query` plus `history`, selects the
    /// top `max_chunks` non-zero scorers, joins in their related
    /// chunks, and assembles the bounded context string.
    pub fn relevant_context(
        &self,
        query: &str,
        history: &str,
        max_chunks: usize,
    ) -> RetrievalResult {
        let combined = if history.trim().is_empty() {
            query.to_string()
        } else {
            format!("{query}\n{history}")
        };

        let ranked = rank_chunks(&combined, &self.chunks, max_chunks);
        if ranked.is_empty() {
            return RetrievalResult::empty();
        }

        let primary_ids: HashSet<&str> = ranked
            .iter()
            .map(|(index, _)| self.chunks[*index].id.as_str())
            .collect();

        // Primary section, then that chunk's related block, in
        // selection order. A related chunk appears at most once even
        // when several primaries reference it; dangling ids are
        // skipped.
        let mut used: HashSet<&str> = primary_ids.clone();
        let mut sections: Vec<(&str, String)> = Vec::new();
        for (index, _score) in &ranked {
            let chunk = &self.chunks[*index];
            sections.push((
                chunk.id.as_str(),
                format!("## {}\n{}", chunk.title, chunk.content),
            ));

            for related_id in &chunk.related_chunks {
                let Some(related_index) = self.index_by_id.get(related_id) else {
                    continue;
                };
                let related = &self.chunks[*related_index];
                if !used.insert(related.id.as_str()) {
                    continue;
                }
                sections.push((
                    related.id.as_str(),
                    format!(
                        "### {RELATED_SECTION_LABEL}: {}\n{}",
                        related.title, related.content
                    ),
                ));
            }
        }

        let (context_text, contributed) = assemble_bounded(&sections, MAX_CONTEXT_CHARS);

        // Observability ordering: primary ids first, then related.
        let mut chunk_ids: Vec<String> = contributed
            .iter()
            .filter(|id| primary_ids.contains(*id))
            .map(|id| id.to_string())
            .collect();
        chunk_ids.extend(
            contributed
                .iter()
                .filter(|id| !primary_ids.contains(*id))
                .map(|id| id.to_string()),
        );

        tracing::debug!(
            query_chars = query.chars().count(),
            context_chars = context_text.chars().count(),
            chunk_ids = ?chunk_ids,
            "assembled knowledge-base context"
        );

        RetrievalResult {
            context_text,
            chunk_ids,
        }
    }
}

/// Concatenates sections under a character budget. Sections past the
/// budget are dropped; the section that crosses it is truncated rather
/// than discarded, and earlier (higher-relevance) sections are never
/// sacrificed.
fn assemble_bounded<'a>(
    sections: &[(&'a str, String)],
    budget_chars: usize,
) -> (String, Vec<&'a str>) {
    let mut context = String::new();
    let mut contributed = Vec::new();
    let mut remaining = budget_chars;

    for (id, section) in sections {
        if remaining == 0 {
            break;
        }
        let separator = if context.is_empty() { "" } else { "\n\n" };
        let separator_chars = separator.chars().count();
        if separator_chars >= remaining {
            break;
        }
        let content_budget = remaining - separator_chars;
        let section_chars = section.chars().count();

        context.push_str(separator);
        if section_chars <= content_budget {
            context.push_str(section);
            remaining -= separator_chars + section_chars;
        } else {
            context.extend(section.chars().take(content_budget));
            remaining = 0;
        }
        contributed.push(*id);
    }

    (context, contributed)
}

/// Initialize-once holder for the shared [`RetrievalEngine`].
///
/// Mirrors the session-start lifecycle: `initialize` is expected at
/// most once per process but is last-writer-wins if repeated, and
/// querying before initialization yields [`RetrievalError::NotReady`]
/// instead of silently operating on empty state.
#[derive(Debug, Default)]
pub struct EngineCell {
    inner: RwLock<Option<Arc<RetrievalEngine>>>,
}

impl EngineCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&self, engine: RetrievalEngine) {
        let mut slot = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Arc::new(engine));
    }

    pub fn is_ready(&self) -> bool {
        let slot = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.is_some()
    }

    pub fn get(&self) -> Result<Arc<RetrievalEngine>, RetrievalError> {
        let slot = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone().ok_or(RetrievalError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineCell, RetrievalEngine, RetrievalError, MAX_CONTEXT_CHARS};
    use crate::KnowledgeChunk;

    fn chunk(id: &str, title: &str, content: &str, keywords: &[&str], related: &[&str]) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            related_chunks: related.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn support_knowledge_base() -> Vec<KnowledgeChunk> {
        vec![
            chunk(
                "password-reset",
                "Resetting Your Password",
                "Use the forgot-password link on the sign-in page.",
                &["password", "reset", "login"],
                &["account-security", "contact-support"],
            ),
            chunk(
                "account-security",
                "Account Security",
                "Enable two-factor authentication from the settings page.",
                &["security", "two-factor"],
                &[],
            ),
            chunk(
                "billing",
                "Billing and Invoices",
                "Invoices are issued on the first of each month.",
                &["billing", "invoice", "payment"],
                &["contact-support", "missing-chunk"],
            ),
            chunk(
                "contact-support",
                "Contacting Support",
                "Reach the support desk through the in-app help widget.",
                &["support", "help"],
                &[],
            ),
        ]
    }

    fn engine() -> RetrievalEngine {
        RetrievalEngine::new(support_knowledge_base(), "You are a support assistant.")
    }

    #[test]
    fn functional_no_keyword_overlap_yields_empty_result() {
        let result = engine().relevant_context("what is the weather on mars", "", 3);
        assert!(result.context_text.is_empty());
        assert!(result.chunk_ids.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn functional_matching_chunk_ranks_first_with_labeled_related_section() {
        let result = engine().relevant_context("how do I reset my password", "", 3);

        assert_eq!(result.chunk_ids[0], "password-reset");
        assert!(result.context_text.starts_with("## Resetting Your Password"));
        assert!(result
            .context_text
            .contains("### Related Information: Account Security"));
        assert!(result.context_text.contains("two-factor authentication"));
    }

    #[test]
    fn functional_related_chunk_referenced_twice_appears_once() {
        // Both password-reset and billing relate to contact-support.
        let result = engine().relevant_context("reset my password and fix my billing invoice", "", 3);

        let occurrences = result
            .context_text
            .matches("### Related Information: Contacting Support")
            .count();
        assert_eq!(occurrences, 1);

        let id_count = result
            .chunk_ids
            .iter()
            .filter(|id| id.as_str() == "contact-support")
            .count();
        assert_eq!(id_count, 1);
    }

    #[test]
    fn regression_dangling_related_reference_is_skipped_not_fatal() {
        let result = engine().relevant_context("billing invoice question", "", 3);
        assert!(result.chunk_ids.contains(&"billing".to_string()));
        assert!(!result.chunk_ids.iter().any(|id| id == "missing-chunk"));
    }

    #[test]
    fn functional_history_participates_in_scoring() {
        let result = engine().relevant_context(
            "can you explain that again",
            "user: how do invoices and billing work\nassistant: invoices are monthly",
            3,
        );
        assert!(result.chunk_ids.contains(&"billing".to_string()));
    }

    #[test]
    fn unit_zero_scores_are_excluded_even_below_max_chunks() {
        let result = engine().relevant_context("password", "", 3);
        // Only the password chunk scores; the budget of 3 is not padded.
        assert_eq!(
            result
                .chunk_ids
                .iter()
                .filter(|id| *id == "password-reset")
                .count(),
            1
        );
        assert!(!result.chunk_ids.contains(&"billing".to_string()));
    }

    #[test]
    fn unit_context_length_never_exceeds_budget() {
        let oversized = vec![
            chunk(
                "big-first",
                "First Oversized",
                &"alpha ".repeat(2_000),
                &["oversized"],
                &[],
            ),
            chunk(
                "big-second",
                "Second Oversized",
                &"beta ".repeat(2_000),
                &["oversized"],
                &[],
            ),
        ];
        let engine = RetrievalEngine::new(oversized, "prompt");
        let result = engine.relevant_context("oversized", "", 3);

        assert!(result.context_text.chars().count() <= MAX_CONTEXT_CHARS);
        // Earlier chunk survives intact; the trailing one is truncated.
        assert!(result.context_text.contains("## First Oversized"));
        assert_eq!(result.chunk_ids[0], "big-first");
    }

    #[test]
    fn unit_rebuilding_engine_from_identical_inputs_is_idempotent() {
        let first = engine().relevant_context("reset my password", "", 3);
        let second = engine().relevant_context("reset my password", "", 3);
        assert_eq!(first, second);
    }

    #[test]
    fn engine_cell_reports_not_ready_before_initialization() {
        let cell = EngineCell::new();
        assert!(!cell.is_ready());
        assert!(matches!(cell.get(), Err(RetrievalError::NotReady)));
    }

    #[test]
    fn engine_cell_initialization_is_last_writer_wins() {
        let cell = EngineCell::new();
        cell.initialize(RetrievalEngine::new(support_knowledge_base(), "first"));
        cell.initialize(RetrievalEngine::new(support_knowledge_base(), "second"));

        let engine = cell.get().expect("initialized cell must yield an engine");
        assert!(cell.is_ready());
        assert_eq!(engine.system_prompt(), "second");
        assert_eq!(engine.chunk_count(), 4);
    }
}
