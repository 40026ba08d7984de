use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{CollectionEntry, LibraryItem, Seed, TitleId, TitleKind},
};

/// Seed cap when seeding from the personal library
pub const LIBRARY_SEED_LIMIT: usize = 5;
/// Seed cap when seeding from a themed collection
pub const COLLECTION_SEED_LIMIT: usize = 8;

fn check_limit(limit: usize) -> AppResult<()> {
    if limit == 0 {
        return Err(AppError::InvalidInput(
            "Seed limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Keeps the first occurrence of every id, up to `limit` seeds
fn take_unique(ids: impl Iterator<Item = TitleId>, kind: TitleKind, limit: usize) -> Vec<Seed> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .take(limit)
        .map(|id| Seed { id, kind })
        .collect()
}

/// Picks up to `limit` library items to seed a run, strongest signal first.
///
/// Tiers, each newest first:
/// 1. liked items, by `added_at`
/// 2. unfinished items not liked, by `added_at`
/// 3. finished items not liked, by `completed_at` (undated last)
pub fn select_library_seeds(
    items: &[LibraryItem],
    kind: TitleKind,
    limit: usize,
) -> AppResult<Vec<Seed>> {
    check_limit(limit)?;

    let (mut liked, rest): (Vec<&LibraryItem>, Vec<&LibraryItem>) = items
        .iter()
        .filter(|item| item.kind == kind)
        .partition(|item| item.is_liked());
    liked.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    let (mut finished, mut in_progress): (Vec<&LibraryItem>, Vec<&LibraryItem>) =
        rest.into_iter().partition(|item| item.is_completed);
    in_progress.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    // None sorts below Some, so reversing puts undated completions last
    finished.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let ordered = liked
        .into_iter()
        .chain(in_progress)
        .chain(finished)
        .map(|item| item.id);

    Ok(take_unique(ordered, kind, limit))
}

/// Picks up to `limit` collection entries of `kind`, most recently added first
pub fn select_collection_seeds(
    entries: &[CollectionEntry],
    kind: TitleKind,
    limit: usize,
) -> AppResult<Vec<Seed>> {
    check_limit(limit)?;

    let mut of_kind: Vec<&CollectionEntry> =
        entries.iter().filter(|entry| entry.kind == kind).collect();
    of_kind.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    Ok(take_unique(of_kind.into_iter().map(|entry| entry.id), kind, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRating;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn item(id: u64, added: u32) -> LibraryItem {
        LibraryItem {
            id: TitleId(id),
            kind: TitleKind::Movie,
            added_at: t(added),
            completed_at: None,
            user_rating: None,
            is_completed: false,
        }
    }

    fn liked(mut item: LibraryItem) -> LibraryItem {
        item.user_rating = Some(UserRating::Positive);
        item
    }

    fn completed(mut item: LibraryItem, on: Option<u32>) -> LibraryItem {
        item.is_completed = true;
        item.completed_at = on.map(t);
        item
    }

    fn ids(seeds: &[Seed]) -> Vec<u64> {
        seeds.iter().map(|seed| seed.id.0).collect()
    }

    #[test]
    fn test_tier_ordering() {
        let a = liked(item(1, 3));
        let c = liked(item(3, 1));
        let b = item(2, 5);
        let d = completed(item(4, 1), Some(2));

        let seeds =
            select_library_seeds(&[d, b, c, a], TitleKind::Movie, LIBRARY_SEED_LIMIT).unwrap();
        assert_eq!(ids(&seeds), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_liked_completed_item_stays_in_first_tier() {
        let watched_and_loved = liked(completed(item(1, 1), Some(9)));
        let unwatched = item(2, 20);

        let seeds =
            select_library_seeds(&[unwatched, watched_and_loved], TitleKind::Movie, 5).unwrap();
        assert_eq!(ids(&seeds), vec![1, 2]);
    }

    #[test]
    fn test_undated_completions_sort_last() {
        let undated = completed(item(1, 10), None);
        let older = completed(item(2, 1), Some(3));
        let newer = completed(item(3, 1), Some(8));

        let seeds = select_library_seeds(&[undated, older, newer], TitleKind::Movie, 5).unwrap();
        assert_eq!(ids(&seeds), vec![3, 2, 1]);
    }

    #[test]
    fn test_limit_and_duplicates() {
        let items: Vec<LibraryItem> = (1..=7)
            .map(|n| liked(item(n, n as u32)))
            .chain(std::iter::once(liked(item(7, 28))))
            .collect();

        let seeds = select_library_seeds(&items, TitleKind::Movie, 5).unwrap();
        assert_eq!(ids(&seeds), vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_other_kinds_ignored() {
        let mut show = liked(item(9, 9));
        show.kind = TitleKind::Show;

        let seeds = select_library_seeds(&[show, item(1, 1)], TitleKind::Movie, 5).unwrap();
        assert_eq!(ids(&seeds), vec![1]);
        assert!(seeds.iter().all(|seed| seed.kind == TitleKind::Movie));
    }

    #[test]
    fn test_empty_library_yields_no_seeds() {
        let seeds = select_library_seeds(&[], TitleKind::Movie, 5).unwrap();
        assert!(seeds.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(
            select_library_seeds(&[item(1, 1)], TitleKind::Movie, 0),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            select_collection_seeds(&[], TitleKind::Movie, 0),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_collection_seeds_newest_first() {
        let entries: Vec<CollectionEntry> = (1..=10)
            .map(|n| CollectionEntry {
                id: TitleId(n),
                kind: TitleKind::Movie,
                added_at: t(n as u32),
            })
            .collect();

        let seeds =
            select_collection_seeds(&entries, TitleKind::Movie, COLLECTION_SEED_LIMIT).unwrap();
        assert_eq!(ids(&seeds), vec![10, 9, 8, 7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_collection_seeds_dedupe_and_filter_kind() {
        let entries = vec![
            CollectionEntry {
                id: TitleId(1),
                kind: TitleKind::Show,
                added_at: t(5),
            },
            CollectionEntry {
                id: TitleId(2),
                kind: TitleKind::Movie,
                added_at: t(4),
            },
            CollectionEntry {
                id: TitleId(2),
                kind: TitleKind::Movie,
                added_at: t(1),
            },
            CollectionEntry {
                id: TitleId(3),
                kind: TitleKind::Movie,
                added_at: t(2),
            },
        ];

        let seeds = select_collection_seeds(&entries, TitleKind::Movie, 8).unwrap();
        assert_eq!(ids(&seeds), vec![2, 3]);
    }
}
