use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::{TitleId, TitleKind};
use crate::error::{AppError, AppResult};

/// Where the seeds of a run come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecommendationSource {
    /// The user's personal library of the requested kind
    Library,
    /// A named themed collection
    Collection { collection_id: Uuid },
}

/// Identifies the delivery slot a run publishes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotKey {
    pub kind: TitleKind,
    pub source: RecommendationSource,
}

/// Input of one recompute call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub kind: TitleKind,
    pub source: RecommendationSource,
    /// Titles that must never be surfaced (owned, already added this session)
    #[serde(default)]
    pub excluded_ids: HashSet<TitleId>,
    /// Overrides the collection's stored name as the theme source
    #[serde(default)]
    pub collection_name: Option<String>,
}

impl RecommendationContext {
    pub fn library(kind: TitleKind) -> Self {
        Self {
            kind,
            source: RecommendationSource::Library,
            excluded_ids: HashSet::new(),
            collection_name: None,
        }
    }

    pub fn collection(kind: TitleKind, collection_id: Uuid) -> Self {
        Self {
            kind,
            source: RecommendationSource::Collection { collection_id },
            excluded_ids: HashSet::new(),
            collection_name: None,
        }
    }

    pub fn with_excluded(mut self, ids: impl IntoIterator<Item = TitleId>) -> Self {
        self.excluded_ids.extend(ids);
        self
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey {
            kind: self.kind,
            source: self.source,
        }
    }

    /// Rejects contexts that can never produce a meaningful run
    pub fn validate(&self) -> AppResult<()> {
        if let RecommendationSource::Collection { collection_id } = self.source {
            if collection_id.is_nil() {
                return Err(AppError::InvalidInput(
                    "Collection id cannot be nil".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_collection_rejected() {
        let context = RecommendationContext::collection(TitleKind::Movie, Uuid::nil());
        assert!(matches!(context.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_library_context_is_valid() {
        let context = RecommendationContext::library(TitleKind::Show).with_excluded([TitleId(7)]);
        assert!(context.validate().is_ok());
        assert!(context.excluded_ids.contains(&TitleId(7)));
    }

    #[test]
    fn test_slot_ignores_exclusions_and_name() {
        let id = Uuid::new_v4();
        let a =
            RecommendationContext::collection(TitleKind::Movie, id).with_excluded([TitleId(1)]);
        let b =
            RecommendationContext::collection(TitleKind::Movie, id).with_collection_name("Xmas");
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.slot(), RecommendationContext::library(TitleKind::Movie).slot());
    }

    #[test]
    fn test_context_deserialization() {
        let json = r#"{
            "kind": "movie",
            "source": {
                "type": "collection",
                "collection_id": "67e55044-10b1-426f-9247-bb680e5fe0c8"
            },
            "excluded_ids": [603, 27205]
        }"#;

        let context: RecommendationContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.kind, TitleKind::Movie);
        assert_eq!(context.excluded_ids.len(), 2);
        assert_eq!(context.collection_name, None);
        assert!(matches!(context.source, RecommendationSource::Collection { .. }));
    }
}
