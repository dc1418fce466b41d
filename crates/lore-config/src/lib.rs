//! Assistant configuration loading for Lore.
//!
//! The system prompt and chunked knowledge base are loaded once at
//! startup from a JSON document and handed to the retrieval engine;
//! nothing here is consulted again during request handling.
use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use lore_retrieval::{KnowledgeBase, RetrievalEngine};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Public struct `AssistantConfig` used across Lore components.
pub struct AssistantConfig {
    pub system_prompt: String,
    #[serde(default)]
    pub knowledge_base: KnowledgeBase,
}

impl AssistantConfig {
    /// Parses a configuration document and validates chunk references.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AssistantConfig =
            serde_json::from_str(raw).context("failed to parse assistant configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Duplicate chunk ids are configuration errors; dangling
    /// `relatedChunks` references are tolerated (retrieval skips them)
    /// but logged so curators can fix the links.
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for chunk in &self.knowledge_base {
            if chunk.id.trim().is_empty() {
                bail!("knowledge chunk with empty id");
            }
            if !seen.insert(chunk.id.as_str()) {
                bail!("duplicate knowledge chunk id '{}'", chunk.id);
            }
        }

        for chunk in &self.knowledge_base {
            for related_id in &chunk.related_chunks {
                if !seen.contains(related_id.as_str()) {
                    tracing::warn!(
                        chunk_id = %chunk.id,
                        related_id = %related_id,
                        "knowledge chunk references a missing related chunk"
                    );
                }
            }
        }

        Ok(())
    }

    /// Consumes the config into a ready retrieval engine.
    pub fn into_engine(self) -> RetrievalEngine {
        RetrievalEngine::new(self.knowledge_base, self.system_prompt)
    }
}
