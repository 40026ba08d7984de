use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod context;
pub mod library;

pub use context::{RecommendationContext, RecommendationSource, SlotKey};
pub use library::{Collection, CollectionEntry, LibraryItem, UserRating};

/// Numeric provider identifier for a movie or show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(pub u64);

impl Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of tracked titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    Movie,
    Show,
}

impl TitleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleKind::Movie => "movie",
            TitleKind::Show => "show",
        }
    }
}

impl Display for TitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(TitleKind::Movie),
            "show" => Ok(TitleKind::Show),
            other => Err(AppError::InvalidInput(format!("Unknown title kind: {}", other))),
        }
    }
}

/// Minimal reference used to query the related-items provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seed {
    pub id: TitleId,
    pub kind: TitleKind,
}

// ============================================================================
// Candidate Types
// ============================================================================

/// Movie as returned by TMDB list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: TitleId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Show as returned by TMDB list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowSummary {
    pub id: TitleId,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

/// A title returned by a related-items or search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Candidate {
    Movie(MovieSummary),
    Show(ShowSummary),
}

impl Candidate {
    pub fn id(&self) -> TitleId {
        match self {
            Candidate::Movie(movie) => movie.id,
            Candidate::Show(show) => show.id,
        }
    }

    pub fn kind(&self) -> TitleKind {
        match self {
            Candidate::Movie(_) => TitleKind::Movie,
            Candidate::Show(_) => TitleKind::Show,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Candidate::Movie(movie) => &movie.title,
            Candidate::Show(show) => &show.name,
        }
    }

    pub fn overview(&self) -> &str {
        let overview = match self {
            Candidate::Movie(movie) => movie.overview.as_deref(),
            Candidate::Show(show) => show.overview.as_deref(),
        };
        overview.unwrap_or_default()
    }

    /// Provider rating on a 0-10 scale
    pub fn quality_score(&self) -> f64 {
        match self {
            Candidate::Movie(movie) => movie.vote_average,
            Candidate::Show(show) => show.vote_average,
        }
    }

    /// Title and overview joined, the text thematic scoring runs against
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title(), self.overview())
    }
}

/// One entry of a recommendation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    /// Number of seeds whose related items contained this candidate
    pub frequency: usize,
    /// Number of theme keywords matched by the representative text
    pub thematic_score: usize,
    pub representative_text: String,
}
