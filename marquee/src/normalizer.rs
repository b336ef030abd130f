//! Title Normalizer
//!
//! Turns raw title/year text from any source into a [`CanonicalTitle`] of the
//! form `"Title Case Title (YYYY)"`. Two sources describing the same movie
//! must land on the same canonical title, otherwise the store and the
//! aggregator treat them as different movies.
//!
//! # Algorithm
//! 1. Year from `raw_year` when it holds a 4-digit numeral, else the last
//!    4-digit numeral (optionally parenthesized) at the very end of the title
//! 2. Strip that trailing token from the title
//! 3. Capitalize every word (no minor-word stop-list)
//! 4. Reassemble as `"<Title> (<YYYY>)"`
//!
//! A title that really ends in a non-year number ("Blade Runner 2049") is
//! indistinguishable from a trailing year and is read as one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A standalone 4-digit numeral
static YEAR_IN_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year pattern"));

/// Trailing year token: `(YYYY)`, or a bare `YYYY` after whitespace, then
/// only whitespace to the end of the string
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\((\d{4})\)|(?:^|\s)(\d{4}))\s*$").expect("valid trailing year pattern")
});

/// Canonical form as produced by [`normalize`]
static CANONICAL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S(?:.*\S)? \(\d{4}\)$").expect("valid canonical pattern"));

/// Normalization failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// No year could be located, or nothing is left of the title
    #[error("cannot normalize '{raw}': {reason}")]
    Ambiguous { raw: String, reason: &'static str },
}

/// Canonical `"Title (YYYY)"` key shared across sources
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalTitle(String);

impl CanonicalTitle {
    /// Validate an already-canonical string
    ///
    /// Accepts only strings that [`normalize`] maps to themselves.
    pub fn parse(text: &str) -> Result<Self, NormalizationError> {
        if !CANONICAL_SHAPE.is_match(text) {
            return Err(NormalizationError::Ambiguous {
                raw: text.to_string(),
                reason: "not of the form 'Title (YYYY)'",
            });
        }
        let normalized = normalize(text, None)?;
        if normalized.0 != text {
            return Err(NormalizationError::Ambiguous {
                raw: text.to_string(),
                reason: "not in canonical title case",
            });
        }
        Ok(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Title text without the year suffix
    pub fn title(&self) -> &str {
        // Shape is guaranteed: "<title> (YYYY)"
        &self.0[..self.0.len() - 7]
    }

    /// Four-digit release year
    pub fn year(&self) -> &str {
        &self.0[self.0.len() - 5..self.0.len() - 1]
    }
}

impl fmt::Display for CanonicalTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalTitle {
    type Error = NormalizationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CanonicalTitle::parse(&value)
    }
}

impl From<CanonicalTitle> for String {
    fn from(value: CanonicalTitle) -> Self {
        value.0
    }
}

/// Normalize raw title/year text into a canonical title
///
/// # Errors
/// [`NormalizationError::Ambiguous`] when no 4-digit year is found in
/// `raw_year` or at the end of `raw_title`, or when the title text is empty
/// once the year is removed.
pub fn normalize(raw_title: &str, raw_year: Option<&str>) -> Result<CanonicalTitle, NormalizationError> {
    let trailing = trailing_year(raw_title);

    let explicit_year = raw_year
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .and_then(last_year_in);

    let (title_text, year) = match (explicit_year, trailing) {
        // Same year on both sides: drop the copy embedded in the title
        (Some(year), Some((before, trailing_year))) if trailing_year == year => (before, year),
        // A different trailing number belongs to the title
        (Some(year), _) => (raw_title, year),
        (None, Some((before, year))) => (before, year),
        (None, None) => {
            return Err(NormalizationError::Ambiguous {
                raw: raw_title.to_string(),
                reason: "no 4-digit year found",
            })
        }
    };

    let title = title_case(title_text);
    if title.is_empty() {
        return Err(NormalizationError::Ambiguous {
            raw: raw_title.to_string(),
            reason: "title is empty once the year is removed",
        });
    }

    Ok(CanonicalTitle(format!("{} ({})", title, year)))
}

/// Split `"Title (1941)"` into `("Title", "1941")` when the text ends in a
/// year token
fn trailing_year(text: &str) -> Option<(&str, &str)> {
    let caps = TRAILING_YEAR.captures(text)?;
    let whole = caps.get(0)?;
    let year = caps.get(1).or_else(|| caps.get(2))?;
    Some((&text[..whole.start()], year.as_str()))
}

/// Last 4-digit numeral in free text such as `"(1941)"` or `"1959 / 1960"`
fn last_year_in(text: &str) -> Option<&str> {
    YEAR_IN_TEXT.find_iter(text).last().map(|m| m.as_str())
}

/// Capitalize every whitespace-separated word and collapse whitespace
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            let mut word_out = String::with_capacity(word.len());
            if let Some(first) = chars.next() {
                // Multi-char expansions (e.g. 'ß' -> "SS") would not survive a
                // second pass, so such letters keep their original form
                if first.to_uppercase().count() == 1 {
                    word_out.extend(first.to_uppercase());
                } else {
                    word_out.push(first);
                }
            }
            word_out.extend(chars.flat_map(char::to_lowercase));
            word_out
        })
        .collect::<Vec<String>>()
        .join(" ")
}
