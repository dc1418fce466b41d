//! Prompt assembly helpers.
//!
//! Pure functions over the caller-supplied conversation; the pipeline
//! composes them so each windowing and formatting rule stays
//! independently testable.
use lore_ai::{Message, MessageRole};

/// At most this many trailing conversation messages are forwarded to
/// the provider.
pub const MAX_HISTORY_MESSAGES: usize = 10;

/// At most this many turns before the latest message feed retrieval
/// scoring as history.
pub const HISTORY_CONTEXT_TURNS: usize = 6;

const CONTEXT_PREAMBLE: &str =
    "Here is the relevant information from your knowledge base to help answer the user's question:";

const CROSS_CHUNK_INSTRUCTIONS: &str = "Use the information above to answer. When sections \
reference each other, combine them into a single coherent answer instead of treating them as \
separate topics. If the knowledge base does not cover the question, say so rather than guessing.";

/// The retrieval query is the latest message's content verbatim.
pub fn retrieval_query(messages: &[Message]) -> &str {
    messages.last().map(|m| m.content.as_str()).unwrap_or("")
}

/// Formats up to [`HISTORY_CONTEXT_TURNS`] turns preceding the latest
/// message as `role: content` lines, oldest first. The latest message
/// itself is excluded; it is the query.
pub fn history_lines(messages: &[Message]) -> String {
    let Some((_, prior)) = messages.split_last() else {
        return String::new();
    };
    let start = prior.len().saturating_sub(HISTORY_CONTEXT_TURNS);
    prior[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trims the conversation to its trailing [`MAX_HISTORY_MESSAGES`]
/// entries, preserving order.
pub fn conversation_window(messages: &[Message]) -> &[Message] {
    let start = messages.len().saturating_sub(MAX_HISTORY_MESSAGES);
    &messages[start..]
}

/// Builds the system message sent to the provider. The knowledge-base
/// block is appended only when retrieval produced context; otherwise
/// the configured system prompt stands alone.
pub fn build_system_message(system_prompt: &str, context_text: &str) -> Message {
    if context_text.trim().is_empty() {
        return Message::system(system_prompt);
    }
    Message::system(format!(
        "{system_prompt}\n\n{CONTEXT_PREAMBLE}\n\n{context_text}\n\n{CROSS_CHUNK_INSTRUCTIONS}"
    ))
}

/// Total characters across all message contents, the basis for the
/// logged token estimate.
pub fn prompt_char_count(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.content.chars().count()).sum()
}

/// True only for the roles a caller may submit; system messages are
/// injected by the pipeline, never accepted from outside.
pub fn is_caller_role(role: MessageRole) -> bool {
    matches!(role, MessageRole::User | MessageRole::Assistant)
}
