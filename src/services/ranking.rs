use std::cmp::Ordering;
use std::collections::{hash_map::Entry, HashMap, HashSet};

use crate::{
    models::{Candidate, RankedCandidate, TitleId},
    services::thematic::ThemeKeywords,
};

/// Candidates rated below this never surface from related items
pub const QUALITY_FLOOR: f64 = 6.0;
/// Maximum length of any result list
pub const RESULT_LIMIT: usize = 20;
/// The on-theme subset replaces the result only when at least this large
pub const THEMED_MINIMUM: usize = 3;

pub(crate) fn to_ranked(candidate: Candidate, keywords: &ThemeKeywords) -> RankedCandidate {
    let representative_text = candidate.searchable_text();
    let thematic_score = keywords.score(&representative_text);
    RankedCandidate {
        candidate,
        frequency: 1,
        thematic_score,
        representative_text,
    }
}

/// Frequency, then thematic score, then quality; all descending
fn by_frequency(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.frequency
        .cmp(&a.frequency)
        .then_with(|| b.thematic_score.cmp(&a.thematic_score))
        .then_with(|| {
            b.candidate
                .quality_score()
                .total_cmp(&a.candidate.quality_score())
        })
}

/// Thematic score, then quality; both descending
pub(crate) fn by_theme(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.thematic_score.cmp(&a.thematic_score).then_with(|| {
        b.candidate
            .quality_score()
            .total_cmp(&a.candidate.quality_score())
    })
}

/// Merges the related items of every seed into the final ranked list
///
/// `candidates` holds each seed's related items back to back, with a title at
/// most once per seed (see `fetch_candidates`), so occurrences count seeds.
/// Excluded and low-quality candidates are dropped before anything is counted.
/// Duplicates collapse onto the first-seen record. When no candidate reaches
/// `minimum_frequency` the threshold relaxes to 1. With a non-empty keyword
/// set, the on-theme subset wins if it still holds [`THEMED_MINIMUM`] entries.
/// Ties keep first-seen order.
pub fn rank_candidates(
    candidates: Vec<Candidate>,
    excluded_ids: &HashSet<TitleId>,
    minimum_frequency: usize,
    keywords: &ThemeKeywords,
) -> Vec<RankedCandidate> {
    let mut first_seen: Vec<TitleId> = Vec::new();
    let mut tallies: HashMap<TitleId, RankedCandidate> = HashMap::new();

    for candidate in candidates {
        let id = candidate.id();
        if excluded_ids.contains(&id) || candidate.quality_score() < QUALITY_FLOOR {
            continue;
        }

        match tallies.entry(id) {
            Entry::Occupied(mut tally) => tally.get_mut().frequency += 1,
            Entry::Vacant(slot) => {
                first_seen.push(id);
                slot.insert(to_ranked(candidate, keywords));
            }
        }
    }

    let mut ranked: Vec<RankedCandidate> = first_seen
        .into_iter()
        .filter_map(|id| tallies.remove(&id))
        .collect();
    ranked.sort_by(by_frequency);

    let reaches_threshold = ranked.iter().any(|r| r.frequency >= minimum_frequency);
    let threshold = if !reaches_threshold && minimum_frequency > 1 {
        tracing::debug!(
            minimum_frequency,
            unique = ranked.len(),
            "No candidate shared by enough seeds, relaxing to 1"
        );
        1
    } else {
        minimum_frequency
    };
    ranked.retain(|r| r.frequency >= threshold);

    if !keywords.is_empty() {
        let themed = ranked.iter().filter(|r| r.thematic_score > 0).count();
        if themed >= THEMED_MINIMUM {
            ranked.retain(|r| r.thematic_score > 0);
        }
    }

    ranked.truncate(RESULT_LIMIT);
    ranked
}
