//! Catalog wire records and their conversion into domain models.
//!
//! The service uses capitalised field names (`Title`, `Year`, ...) and the
//! literal `"N/A"` for missing values; both stop at this boundary.

use serde::Deserialize;
use tracing::debug;

use super::error::{CatalogError, NOT_FOUND_MESSAGE};
use crate::models::{MovieDetail, SearchResultItem};

const MISSING: &str = "N/A";

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<RawSearchItem>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    #[serde(rename = "imdbID", default)]
    imdb_id: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetail {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "imdbID", default)]
    imdb_id: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
    #[serde(rename = "Runtime", default)]
    runtime: Option<String>,
    #[serde(rename = "Genre", default)]
    genre: Option<String>,
    #[serde(rename = "Plot", default)]
    plot: Option<String>,
    #[serde(rename = "Released", default)]
    released: Option<String>,
    #[serde(rename = "Actors", default)]
    actors: Option<String>,
    #[serde(rename = "Director", default)]
    director: Option<String>,
    #[serde(rename = "imdbRating", default)]
    imdb_rating: Option<String>,
}

impl TryFrom<RawSearchItem> for SearchResultItem {
    type Error = CatalogError;

    fn try_from(raw: RawSearchItem) -> Result<Self, Self::Error> {
        let id = required(raw.imdb_id, "imdbID")?;
        let title = required(raw.title, "Title")?;
        Ok(SearchResultItem {
            id,
            title,
            year: present(raw.year).unwrap_or_default(),
            poster: present(raw.poster),
        })
    }
}

impl TryFrom<RawDetail> for MovieDetail {
    type Error = CatalogError;

    fn try_from(raw: RawDetail) -> Result<Self, Self::Error> {
        if !is_success(&raw.response) {
            return Err(not_found(raw.error));
        }
        Ok(MovieDetail {
            id: required(raw.imdb_id, "imdbID")?,
            title: required(raw.title, "Title")?,
            year: present(raw.year).unwrap_or_default(),
            poster: present(raw.poster),
            runtime: present(raw.runtime).unwrap_or_default(),
            genre: present(raw.genre).unwrap_or_default(),
            plot: present(raw.plot).unwrap_or_default(),
            released: present(raw.released).unwrap_or_default(),
            actors: present(raw.actors).unwrap_or_default(),
            director: present(raw.director).unwrap_or_default(),
            external_rating: present(raw.imdb_rating).and_then(|value| value.parse().ok()),
        })
    }
}

/// Decode a search response body.
pub(crate) fn parse_search(body: &[u8]) -> Result<Vec<SearchResultItem>, CatalogError> {
    let raw: RawSearchResponse =
        serde_json::from_slice(body).map_err(|err| CatalogError::Parse(err.to_string()))?;
    if !is_success(&raw.response) {
        return Err(not_found(raw.error));
    }
    let items = raw
        .search
        .into_iter()
        .filter_map(|item| match SearchResultItem::try_from(item) {
            Ok(item) => Some(item),
            Err(err) => {
                debug!(%err, "Skipping malformed search item");
                None
            }
        })
        .collect();
    Ok(items)
}

/// Decode a detail response body.
pub(crate) fn parse_detail(body: &[u8]) -> Result<MovieDetail, CatalogError> {
    let raw: RawDetail =
        serde_json::from_slice(body).map_err(|err| CatalogError::Parse(err.to_string()))?;
    MovieDetail::try_from(raw)
}

fn is_success(response: &str) -> bool {
    !response.trim().eq_ignore_ascii_case("false")
}

fn not_found(error: Option<String>) -> CatalogError {
    CatalogError::NotFound(present(error).unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string()))
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != MISSING)
}

fn required(value: Option<String>, field: &str) -> Result<String, CatalogError> {
    present(value).ok_or_else(|| CatalogError::Parse(format!("missing field {field}")))
}
