use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::{
    models::{Candidate, Seed},
    services::providers::RelatedItemsProvider,
};

/// Fetches related items for every seed in parallel
///
/// Each seed resolves into its own slot, and slots are flattened in seed order,
/// so the order in which calls complete never changes the output. A title is
/// kept once per seed, so its occurrences in the output equal the number of
/// seeds that returned it. A failing seed
/// contributes nothing. Seeds still outstanding when `deadline` elapses are
/// aborted and contribute nothing either.
///
/// Dropping the returned future aborts every outstanding call.
pub async fn fetch_candidates(
    provider: Arc<dyn RelatedItemsProvider>,
    seeds: &[Seed],
    deadline: Duration,
) -> Vec<Candidate> {
    if seeds.is_empty() {
        return Vec::new();
    }

    tracing::info!(seed_count = seeds.len(), "Fetching related items");

    let mut tasks = JoinSet::new();
    for (slot, seed) in seeds.iter().copied().enumerate() {
        let provider = Arc::clone(&provider);
        tasks.spawn(async move {
            let result = provider.fetch_related(seed.id, seed.kind).await;
            (slot, seed, result)
        });
    }

    let mut per_seed: Vec<Vec<Candidate>> = vec![Vec::new(); seeds.len()];
    let mut failed = 0usize;
    let expires_at = Instant::now() + deadline;

    loop {
        match tokio::time::timeout_at(expires_at, tasks.join_next()).await {
            Ok(Some(Ok((slot, seed, Ok(candidates))))) => {
                let returned = candidates.len();
                let mut seen = HashSet::new();
                let unique: Vec<Candidate> = candidates
                    .into_iter()
                    .filter(|candidate| seen.insert(candidate.id()))
                    .collect();

                tracing::debug!(
                    seed_id = %seed.id,
                    results = unique.len(),
                    duplicates = returned - unique.len(),
                    "Seed resolved"
                );
                per_seed[slot] = unique;
            }
            Ok(Some(Ok((_, seed, Err(e))))) => {
                failed += 1;
                tracing::warn!(
                    seed_id = %seed.id,
                    error = %e,
                    "Related items fetch failed for seed"
                );
            }
            Ok(Some(Err(e))) => {
                failed += 1;
                tracing::warn!(error = %e, "Task join error");
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    outstanding = tasks.len(),
                    deadline_ms = deadline.as_millis() as u64,
                    "Related items deadline elapsed, abandoning outstanding seeds"
                );
                tasks.abort_all();
                break;
            }
        }
    }

    if failed > 0 {
        tracing::warn!(
            success_count = seeds.len() - failed,
            error_count = failed,
            "Partial related items failure"
        );
    }

    per_seed.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{MovieSummary, TitleId, TitleKind};
    use crate::services::providers::MockRelatedItemsProvider;

    fn movie(id: u64) -> Candidate {
        Candidate::Movie(MovieSummary {
            id: TitleId(id),
            title: format!("Movie {}", id),
            overview: None,
            vote_average: 7.0,
            release_date: None,
        })
    }

    fn seed(id: u64) -> Seed {
        Seed {
            id: TitleId(id),
            kind: TitleKind::Movie,
        }
    }

    fn ids(candidates: &[Candidate]) -> Vec<u64> {
        candidates.iter().map(|c| c.id().0).collect()
    }

    #[tokio::test]
    async fn test_flattens_in_seed_order() {
        let mut provider = MockRelatedItemsProvider::new();
        provider
            .expect_fetch_related()
            .times(3)
            .returning(|id, _| match id.0 {
                1 => Ok(vec![movie(10), movie(11)]),
                2 => Ok(vec![movie(11), movie(12)]),
                _ => Ok(vec![movie(11)]),
            });

        let candidates = fetch_candidates(
            Arc::new(provider),
            &[seed(1), seed(2), seed(3)],
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(ids(&candidates), vec![10, 11, 11, 12, 11]);
    }

    #[tokio::test]
    async fn test_failed_seed_contributes_nothing() {
        let mut provider = MockRelatedItemsProvider::new();
        provider.expect_fetch_related().returning(|id, _| {
            if id.0 == 2 {
                Err(AppError::ExternalApi("TMDB returned status 500".to_string()))
            } else {
                Ok(vec![movie(id.0 * 100)])
            }
        });

        let candidates = fetch_candidates(
            Arc::new(provider),
            &[seed(1), seed(2), seed(3)],
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(ids(&candidates), vec![100, 300]);
    }

    #[tokio::test]
    async fn test_repeated_title_kept_once_per_seed() {
        let mut provider = MockRelatedItemsProvider::new();
        provider.expect_fetch_related().returning(|id, _| match id.0 {
            1 => Ok(vec![movie(50), movie(51), movie(50)]),
            _ => Ok(vec![movie(50), movie(60)]),
        });

        let candidates =
            fetch_candidates(Arc::new(provider), &[seed(1), seed(2)], Duration::from_secs(5))
                .await;

        assert_eq!(ids(&candidates), vec![50, 51, 50, 60]);
    }

    #[tokio::test]
    async fn test_no_seeds_makes_no_calls() {
        let mut provider = MockRelatedItemsProvider::new();
        provider.expect_fetch_related().never();

        let candidates = fetch_candidates(Arc::new(provider), &[], Duration::from_secs(5)).await;
        assert!(candidates.is_empty());
    }

    /// Seed 2 never answers
    struct StuckSeedProvider;

    #[async_trait::async_trait]
    impl RelatedItemsProvider for StuckSeedProvider {
        async fn fetch_related(
            &self,
            id: TitleId,
            _kind: TitleKind,
        ) -> crate::error::AppResult<Vec<Candidate>> {
            if id.0 == 2 {
                std::future::pending::<()>().await;
            }
            Ok(vec![movie(id.0 * 100)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_stuck_seed() {
        let started = Instant::now();
        let candidates = fetch_candidates(
            Arc::new(StuckSeedProvider),
            &[seed(1), seed(2), seed(3)],
            Duration::from_secs(10),
        )
        .await;

        assert_eq!(ids(&candidates), vec![100, 300]);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }
}
