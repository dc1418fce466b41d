//! Knowledge-base retrieval for Lore.
//!
//! Holds the chunked knowledge base and system prompt, scores chunks
//! lexically against a query plus recent history, and assembles a
//! size-bounded context string with cross-chunk "Related Information"
//! sections. Pure and synchronous; no network I/O.
mod chunk;
mod engine;
mod scoring;

pub use chunk::{KnowledgeBase, KnowledgeChunk};
pub use engine::{
    EngineCell, RetrievalEngine, RetrievalError, RetrievalResult, MAX_CONTEXT_CHARS,
};
pub use scoring::{rank_chunks, score_chunk};
