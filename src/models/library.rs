use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{TitleId, TitleKind};
use crate::error::AppError;

/// Personal thumbs rating attached to a library item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRating {
    Positive,
    Neutral,
    Negative,
}

impl FromStr for UserRating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(UserRating::Positive),
            "neutral" => Ok(UserRating::Neutral),
            "negative" => Ok(UserRating::Negative),
            other => Err(AppError::InvalidInput(format!("Unknown rating: {}", other))),
        }
    }
}

/// A tracked title with the user's personal watch state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub id: TitleId,
    pub kind: TitleKind,
    pub added_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub user_rating: Option<UserRating>,
    pub is_completed: bool,
}

impl LibraryItem {
    pub fn is_liked(&self) -> bool {
        self.user_rating == Some(UserRating::Positive)
    }
}

/// Member of a named themed collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionEntry {
    pub id: TitleId,
    pub kind: TitleKind,
    pub added_at: DateTime<Utc>,
}

/// A named, user-curated collection of titles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub entries: Vec<CollectionEntry>,
}
