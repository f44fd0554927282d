//! Remote movie catalog access.

mod client;
mod error;
mod wire;

pub use client::OmdbClient;
pub use error::{CatalogError, FETCH_FAILED_MESSAGE, NOT_FOUND_MESSAGE};

use async_trait::async_trait;

use crate::models::{MovieDetail, SearchResultItem};

/// Request/response boundary to the movie catalog.
///
/// Controllers only depend on this trait so tests can substitute a scripted
/// catalog for the HTTP one.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Free-text title search.
    async fn search(&self, query: &str) -> Result<Vec<SearchResultItem>, CatalogError>;

    /// Full record for one identifier.
    async fn detail(&self, id: &str) -> Result<MovieDetail, CatalogError>;
}
