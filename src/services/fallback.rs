use std::collections::HashSet;

use crate::{
    models::{RankedCandidate, TitleId, TitleKind},
    services::{
        providers::TextSearchProvider,
        ranking::{by_theme, to_ranked, RESULT_LIMIT},
        thematic::{derive_keywords, derive_search_query},
    },
};

/// Searches directly for a collection's theme when there is nothing to seed from
///
/// Without a frequency signal, a result is only kept when it matches at least
/// one theme keyword. A failed search is reported as no results.
pub async fn search_by_theme(
    provider: &dyn TextSearchProvider,
    collection_name: &str,
    kind: TitleKind,
    excluded_ids: &HashSet<TitleId>,
) -> Vec<RankedCandidate> {
    let Some(query) = derive_search_query(collection_name) else {
        tracing::debug!(name = %collection_name, "No searchable theme in collection name");
        return Vec::new();
    };
    let keywords = derive_keywords(collection_name);

    let results = match provider.search(&query, kind).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Theme search failed");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut ranked: Vec<RankedCandidate> = results
        .into_iter()
        .filter(|candidate| !excluded_ids.contains(&candidate.id()))
        .map(|candidate| to_ranked(candidate, &keywords))
        .filter(|ranked| ranked.thematic_score > 0)
        .filter(|ranked| seen.insert(ranked.candidate.id()))
        .collect();

    ranked.sort_by(by_theme);
    ranked.truncate(RESULT_LIMIT);

    tracing::info!(
        query = %query,
        results = ranked.len(),
        "Theme search fallback ranked"
    );

    ranked
}
