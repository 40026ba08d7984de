//! Recommendation orchestration with last-call-wins semantics per slot.
//!
//! Every `recompute` bumps the generation of its slot and aborts whatever run
//! the slot had in flight. A run only publishes if its generation is still the
//! slot's current one when it finishes, checked under the slot lock, so a stale
//! run can never overwrite a fresher result.
//!
//! Generations are drawn from one engine-wide counter, so a slot that was
//! dropped and later recreated never reuses a generation an old handle holds.
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;

use crate::{
    db::{CollectionSource, LibrarySource},
    error::AppResult,
    models::{RankedCandidate, RecommendationContext, RecommendationSource, Seed, SlotKey},
    services::{
        fallback::search_by_theme,
        fetcher::fetch_candidates,
        providers::{RelatedItemsProvider, TextSearchProvider},
        ranking::rank_candidates,
        seeds::{
            select_collection_seeds, select_library_seeds, COLLECTION_SEED_LIMIT,
            LIBRARY_SEED_LIMIT,
        },
        thematic::{derive_keywords, ThemeKeywords},
    },
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Upper bound on the related-items fan-out of one run
    pub fetch_deadline: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch_deadline: Duration::from_secs(15),
        }
    }
}

/// What a slot's subscribers see
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotSnapshot {
    /// Generation of the most recent run started for the slot
    pub generation: u64,
    pub computing: bool,
    /// Results of the last published run
    pub results: Vec<RankedCandidate>,
}

struct SlotState {
    generation: u64,
    in_flight: Option<AbortHandle>,
    updates: watch::Sender<SlotSnapshot>,
}

impl SlotState {
    fn new() -> Self {
        let (updates, _) = watch::channel(SlotSnapshot::default());
        Self {
            generation: 0,
            in_flight: None,
            updates,
        }
    }

    /// Nothing running, nobody listening and nothing worth reporting
    fn is_disposable(&self) -> bool {
        self.in_flight.is_none()
            && self.updates.receiver_count() == 0
            && self.updates.borrow().results.is_empty()
    }
}

struct EngineInner {
    related: Arc<dyn RelatedItemsProvider>,
    search: Arc<dyn TextSearchProvider>,
    library: Arc<dyn LibrarySource>,
    collections: Arc<dyn CollectionSource>,
    settings: EngineSettings,
    generations: AtomicU64,
    slots: Mutex<HashMap<SlotKey, SlotState>>,
}

/// Orchestrates seed selection, fan-out, ranking and fallback search
///
/// Cheap to clone; clones share slots.
#[derive(Clone)]
pub struct RecommendationEngine {
    inner: Arc<EngineInner>,
}

impl RecommendationEngine {
    pub fn new(
        related: Arc<dyn RelatedItemsProvider>,
        search: Arc<dyn TextSearchProvider>,
        library: Arc<dyn LibrarySource>,
        collections: Arc<dyn CollectionSource>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                related,
                search,
                library,
                collections,
                settings,
                generations: AtomicU64::new(0),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Starts a new run for the context's slot, discarding any run in flight
    ///
    /// Returns immediately. Must be called from within a Tokio runtime.
    /// Invalid contexts are rejected before any state changes.
    pub fn recompute(&self, context: RecommendationContext) -> AppResult<RecomputeHandle> {
        context.validate()?;

        let slot = context.slot();
        let (results_tx, results_rx) = oneshot::channel();

        let mut slots = self.inner.lock_slots();
        let generation = self.inner.next_generation();
        let state = slots.entry(slot).or_insert_with(SlotState::new);
        state.generation = generation;

        if let Some(previous) = state.in_flight.take() {
            previous.abort();
            tracing::debug!(?slot, generation, "Discarded in-flight run");
        }
        state.updates.send_modify(|snapshot| {
            snapshot.generation = generation;
            snapshot.computing = true;
        });

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let results = inner.run(&context).await.unwrap_or_else(|e| {
                tracing::warn!(?slot, error = %e, "Recommendation run failed");
                Vec::new()
            });
            inner.publish(slot, generation, results, results_tx);
        });
        state.in_flight = Some(task.abort_handle());

        tracing::info!(?slot, generation, "Recompute started");

        Ok(RecomputeHandle {
            slot,
            generation,
            results: results_rx,
            engine: Arc::downgrade(&self.inner),
        })
    }

    /// Delivery channel for a slot; yields a new snapshot on every start and publish
    ///
    /// A slot with no subscribers, nothing in flight and an empty result is
    /// dropped once its run finishes, so its snapshot reads as the default.
    pub fn subscribe(&self, slot: SlotKey) -> watch::Receiver<SlotSnapshot> {
        self.inner
            .lock_slots()
            .entry(slot)
            .or_insert_with(SlotState::new)
            .updates
            .subscribe()
    }

    pub fn snapshot(&self, slot: SlotKey) -> SlotSnapshot {
        self.inner
            .lock_slots()
            .get(&slot)
            .map(|state| state.updates.borrow().clone())
            .unwrap_or_default()
    }
}

impl EngineInner {
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<SlotKey, SlotState>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with the slot lock held
    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn release_if_idle(slots: &mut HashMap<SlotKey, SlotState>, slot: SlotKey) {
        if slots.get(&slot).is_some_and(SlotState::is_disposable) {
            slots.remove(&slot);
            tracing::debug!(?slot, "Idle slot released");
        }
    }

    /// Applies a finished run if it is still the slot's current one
    fn publish(
        &self,
        slot: SlotKey,
        generation: u64,
        results: Vec<RankedCandidate>,
        results_tx: oneshot::Sender<Vec<RankedCandidate>>,
    ) {
        let mut slots = self.lock_slots();
        let Some(state) = slots.get_mut(&slot) else {
            return;
        };

        if state.generation != generation {
            tracing::debug!(
                ?slot,
                generation,
                current = state.generation,
                "Stale run discarded"
            );
            return;
        }

        state.in_flight = None;
        state.updates.send_replace(SlotSnapshot {
            generation,
            computing: false,
            results: results.clone(),
        });
        Self::release_if_idle(&mut slots, slot);
        drop(slots);

        tracing::info!(
            ?slot,
            generation,
            results = results.len(),
            "Recommendations published"
        );

        // The caller may have dropped its handle
        let _ = results_tx.send(results);
    }

    /// Abandons a run without publishing, if it is still current and running
    fn cancel(&self, slot: SlotKey, generation: u64) {
        let mut slots = self.lock_slots();
        let Some(state) = slots.get_mut(&slot) else {
            return;
        };
        if state.generation != generation {
            return;
        }
        let Some(task) = state.in_flight.take() else {
            return;
        };

        task.abort();
        let current = self.next_generation();
        state.generation = current;
        state.updates.send_modify(|snapshot| {
            snapshot.generation = current;
            snapshot.computing = false;
        });
        Self::release_if_idle(&mut slots, slot);

        tracing::info!(?slot, generation, "Recompute cancelled");
    }

    async fn run(&self, context: &RecommendationContext) -> AppResult<Vec<RankedCandidate>> {
        let kind = context.kind;

        let (seeds, theme_name, minimum_frequency) = match context.source {
            RecommendationSource::Library => {
                let items = self.library.library_items(kind).await?;
                let seeds = select_library_seeds(&items, kind, LIBRARY_SEED_LIMIT)?;
                (seeds, context.collection_name.clone(), 1)
            }
            RecommendationSource::Collection { collection_id } => {
                let collection = self.collections.collection(collection_id).await?;
                if collection.is_none() {
                    tracing::warn!(%collection_id, "Collection not found, nothing to seed from");
                }

                let (entries, stored_name) = collection
                    .map(|c| (c.entries, Some(c.name)))
                    .unwrap_or_default();
                let seeds = select_collection_seeds(&entries, kind, COLLECTION_SEED_LIMIT)?;
                let minimum_frequency = if seeds.len() >= 2 { 2 } else { 1 };
                let name = context.collection_name.clone().or(stored_name);
                (seeds, name, minimum_frequency)
            }
        };

        tracing::info!(
            kind = %kind,
            seed_count = seeds.len(),
            minimum_frequency,
            themed = theme_name.is_some(),
            "Seeds selected"
        );

        if seeds.is_empty() {
            return Ok(match theme_name {
                Some(name) => {
                    search_by_theme(self.search.as_ref(), &name, kind, &context.excluded_ids).await
                }
                None => Vec::new(),
            });
        }

        let keywords = theme_name
            .as_deref()
            .map(derive_keywords)
            .unwrap_or_default();

        Ok(self
            .rank_from_seeds(&seeds, context, minimum_frequency, &keywords)
            .await)
    }

    async fn rank_from_seeds(
        &self,
        seeds: &[Seed],
        context: &RecommendationContext,
        minimum_frequency: usize,
        keywords: &ThemeKeywords,
    ) -> Vec<RankedCandidate> {
        let candidates = fetch_candidates(
            Arc::clone(&self.related),
            seeds,
            self.settings.fetch_deadline,
        )
        .await;

        rank_candidates(candidates, &context.excluded_ids, minimum_frequency, keywords)
    }
}

/// Handle to one started run
///
/// Awaiting it yields the published results, or `None` when the run was
/// superseded or cancelled. Dropping it does not stop the run.
pub struct RecomputeHandle {
    slot: SlotKey,
    generation: u64,
    results: oneshot::Receiver<Vec<RankedCandidate>>,
    engine: Weak<EngineInner>,
}

impl RecomputeHandle {
    pub fn slot(&self) -> SlotKey {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves to the published results, `None` if superseded or cancelled
    pub async fn wait(self) -> Option<Vec<RankedCandidate>> {
        self.await
    }

    /// Stops the run; a no-op once it has published or a newer run has started
    pub fn cancel(&self) {
        if let Some(inner) = self.engine.upgrade() {
            inner.cancel(self.slot, self.generation);
        }
    }
}

impl Future for RecomputeHandle {
    type Output = Option<Vec<RankedCandidate>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.results).poll(cx).map(Result::ok)
    }
}
