use serde::{Deserialize, Serialize};

/// Immutable unit of the knowledge base.
///
/// `related_chunks` lists ids of chunks that supply supplementary
/// context when this chunk is selected; dangling ids are tolerated and
/// skipped during retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub related_chunks: Vec<String>,
}

/// Ordered sequence of chunks; insertion order breaks scoring ties but
/// carries no other meaning.
pub type KnowledgeBase = Vec<KnowledgeChunk>;
