//! Theme keyword derivation from a collection name, and keyword scoring of free text.
use std::collections::{BTreeSet, HashSet};

/// Words that carry no theme on their own
pub const STOPWORDS: &[&str] = &[
    "list", "lists", "stuff", "things", "my", "the", "and", "for", "best", "top", "all", "time",
];

/// Theme name to expansion terms. Expansions are normalized before use,
/// so "sci-fi" contributes the phrase "sci fi".
pub const THEME_TABLE: &[(&str, &[&str])] = &[
    (
        "christmas",
        &[
            "christmas", "xmas", "holiday", "santa", "reindeer", "snow", "grinch", "noel",
            "nutcracker",
        ],
    ),
    (
        "halloween",
        &[
            "halloween", "pumpkin", "trick or treat", "witch", "ghost", "haunted", "costume",
            "spooky",
        ],
    ),
    (
        "horror",
        &[
            "horror", "haunted", "ghost", "demon", "slasher", "possession", "zombie", "vampire",
            "terror", "killer",
        ],
    ),
    (
        "anime",
        &["anime", "manga", "japanese animation", "shonen", "studio ghibli", "mecha"],
    ),
    (
        "sci fi",
        &[
            "sci-fi", "science fiction", "space", "alien", "future", "robot", "time travel",
            "dystopian", "galaxy",
        ],
    ),
    (
        "romance",
        &["romance", "love", "romantic", "wedding", "relationship", "heart"],
    ),
    (
        "war",
        &["war", "soldier", "battle", "army", "military", "wwii", "world war", "combat"],
    ),
    (
        "superhero",
        &["superhero", "marvel", "hero", "villain", "powers", "avengers", "comic"],
    ),
];

const MIN_TOKEN_CHARS: usize = 3;

/// Lowercases and collapses every run of non-alphanumeric characters into one space.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn theme_tokens(name: &str) -> Vec<String> {
    tokenize(name)
        .into_iter()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

fn theme_matches(theme: &str, tokens: &[String], normalized_name: &str) -> bool {
    let all_words_present = theme
        .split(' ')
        .all(|word| tokens.iter().any(|token| token == word));

    all_words_present || normalized_name.contains(theme)
}

/// Normalized keyword set derived from a collection name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeKeywords(BTreeSet<String>);

impl ThemeKeywords {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Counts the distinct keywords matched by `text`.
    ///
    /// Single words must appear as whole words. Phrases match either as a
    /// substring of the normalized text or when each of their words appears.
    pub fn score(&self, text: &str) -> usize {
        if self.0.is_empty() {
            return 0;
        }

        let haystack = normalize(text);
        let words: HashSet<&str> = haystack.split(' ').filter(|w| !w.is_empty()).collect();

        self.0
            .iter()
            .filter(|keyword| {
                if keyword.contains(' ') {
                    haystack.contains(keyword.as_str())
                        || keyword.split(' ').all(|word| words.contains(word))
                } else {
                    words.contains(keyword.as_str())
                }
            })
            .count()
    }
}

/// Derives the keyword set for a collection name.
///
/// Every theme of [`THEME_TABLE`] the name matches contributes its expansions;
/// overlapping themes are unioned.
pub fn derive_keywords(name: &str) -> ThemeKeywords {
    let tokens = theme_tokens(name);
    let normalized_name = normalize(name);
    let mut keywords: BTreeSet<String> = tokens.iter().cloned().collect();

    for (theme, expansions) in THEME_TABLE {
        if theme_matches(theme, &tokens, &normalized_name) {
            keywords.extend(expansions.iter().map(|term| normalize(term)));
        }
    }

    ThemeKeywords(keywords)
}

/// Turns a collection name into a text-search query.
///
/// Returns the first matching theme name verbatim, else the name's meaningful
/// tokens. `None` when nothing searchable remains.
pub fn derive_search_query(name: &str) -> Option<String> {
    let tokens = theme_tokens(name);
    let normalized_name = normalize(name);

    let query = THEME_TABLE
        .iter()
        .map(|(theme, _)| *theme)
        .find(|theme| theme_matches(theme, &tokens, &normalized_name))
        .map(str::to_string)
        .unwrap_or_else(|| tokens.join(" "));

    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}
