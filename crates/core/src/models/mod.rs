//! Shared domain models.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::watchlist::WatchlistError;

/// Highest rating a user can assign to a watched movie.
pub const MAX_USER_RATING: u8 = 10;

/// A single hit returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Catalog identifier (e.g. `tt0133093`).
    pub id: String,
    /// Movie title.
    pub title: String,
    /// Release year as reported by the catalog; may be a range for series.
    pub year: String,
    /// Poster URL, if the catalog has one.
    pub poster: Option<String>,
}

/// Full catalog record for a selected movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    /// Catalog identifier.
    pub id: String,
    /// Movie title.
    pub title: String,
    /// Release year.
    pub year: String,
    /// Poster URL, if any.
    pub poster: Option<String>,
    /// Free-text runtime such as `142 min`.
    pub runtime: String,
    /// Comma separated genres.
    pub genre: String,
    /// Plot summary.
    pub plot: String,
    /// Release date text.
    pub released: String,
    /// Comma separated cast.
    pub actors: String,
    /// Director credit.
    pub director: String,
    /// Aggregate external rating; `None` when the catalog has none.
    pub external_rating: Option<f64>,
}

impl MovieDetail {
    /// Runtime in minutes parsed from the leading number of [`Self::runtime`].
    pub fn runtime_minutes(&self) -> Option<f64> {
        parse_runtime_minutes(&self.runtime)
    }
}

/// A rated movie on the user's watch-list.
///
/// Field names on disk follow the layout the watch-list slot has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedEntry {
    /// Catalog identifier.
    #[serde(rename = "imdbID")]
    pub id: String,
    /// Movie title.
    pub title: String,
    /// Release year.
    #[serde(default)]
    pub year: String,
    /// Poster URL, if any.
    #[serde(default)]
    pub poster: Option<String>,
    /// External rating copied from the detail at creation time.
    #[serde(rename = "imdbRating", default)]
    pub external_rating: Option<f64>,
    /// Runtime in minutes.
    #[serde(default)]
    pub runtime: Option<f64>,
    /// Rating the user assigned, 1 to 10.
    #[serde(rename = "userRating", default)]
    pub user_rating: Option<u8>,
    /// When the entry was added.
    #[serde(
        rename = "watchedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub watched_at: Option<DateTime<Utc>>,
}

impl WatchedEntry {
    /// Build an entry for `detail` rated `user_rating` (1 to 10).
    pub fn from_detail(detail: &MovieDetail, user_rating: u8) -> Result<Self, WatchlistError> {
        if !(1..=MAX_USER_RATING).contains(&user_rating) {
            return Err(WatchlistError::InvalidRating(user_rating));
        }
        Ok(Self {
            id: detail.id.clone(),
            title: detail.title.clone(),
            year: detail.year.clone(),
            poster: detail.poster.clone(),
            external_rating: detail.external_rating,
            runtime: detail.runtime_minutes(),
            user_rating: Some(user_rating),
            watched_at: Some(Utc::now()),
        })
    }
}

/// Aggregate figures over the whole watch-list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WatchSummary {
    /// Number of watched movies.
    pub count: usize,
    /// Mean external rating.
    pub avg_external_rating: f64,
    /// Mean user rating.
    pub avg_user_rating: f64,
    /// Mean runtime in minutes.
    pub avg_runtime: f64,
}

/// Arithmetic mean of `values`, defined as `0.0` for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

static RUNTIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)").expect("failed to compile runtime regex"));

/// Parse the leading integer of a runtime text (`142 min` -> `142`).
pub fn parse_runtime_minutes(raw: &str) -> Option<f64> {
    RUNTIME_RE
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_detail() -> MovieDetail {
        MovieDetail {
            id: "tt0133093".to_string(),
            title: "The Matrix".to_string(),
            year: "1999".to_string(),
            poster: Some("https://example.com/matrix.jpg".to_string()),
            runtime: "136 min".to_string(),
            genre: "Action, Sci-Fi".to_string(),
            plot: "A hacker learns the truth.".to_string(),
            released: "31 Mar 1999".to_string(),
            actors: "Keanu Reeves".to_string(),
            director: "Lana Wachowski, Lilly Wachowski".to_string(),
            external_rating: Some(8.7),
        }
    }

    #[test]
    fn runtime_parses_leading_minutes() {
        assert_eq!(parse_runtime_minutes("142 min"), Some(142.0));
        assert_eq!(parse_runtime_minutes("  90"), Some(90.0));
        assert_eq!(parse_runtime_minutes("N/A"), None);
        assert_eq!(parse_runtime_minutes(""), None);
    }

    #[test]
    fn entry_from_detail_carries_rating_and_runtime() {
        let entry = WatchedEntry::from_detail(&sample_detail(), 9).unwrap();
        assert_eq!(entry.id, "tt0133093");
        assert_eq!(entry.runtime, Some(136.0));
        assert_eq!(entry.external_rating, Some(8.7));
        assert_eq!(entry.user_rating, Some(9));
        assert!(entry.watched_at.is_some());
    }

    #[test]
    fn entry_rejects_out_of_range_rating() {
        let detail = sample_detail();
        assert!(matches!(
            WatchedEntry::from_detail(&detail, 0),
            Err(WatchlistError::InvalidRating(0))
        ));
        assert!(WatchedEntry::from_detail(&detail, 11).is_err());
    }

    #[test]
    fn entry_reads_legacy_slot_layout() {
        let raw = r#"{"imdbID":"tt1","title":"X","year":"2000","poster":"p","imdbRating":5,"runtime":100,"userRating":7}"#;
        let entry: WatchedEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.id, "tt1");
        assert_eq!(entry.external_rating, Some(5.0));
        assert_eq!(entry.runtime, Some(100.0));
        assert_eq!(entry.user_rating, Some(7));
        assert!(entry.watched_at.is_none());

        let written = serde_json::to_value(&entry).unwrap();
        assert_eq!(written["imdbID"], "tt1");
        assert!(written.get("watchedAt").is_none());
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(mean(std::iter::empty::<f64>()), 0.0);
        assert_eq!(mean([2.0, 4.0]), 3.0);
    }
}
