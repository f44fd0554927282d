#![warn(clippy::all, missing_docs)]

//! Movie search and watch-list engine behind `popcorn`.
//!
//! [`SearchController`] and [`DetailLoader`] talk to a [`Catalog`] and
//! publish their state over `tokio::sync::watch`, dropping any response
//! that a newer request has overtaken. [`Watchlist`] keeps rated movies in
//! a JSON slot through [`SlotStorage`].

pub mod catalog;
pub mod config;
pub mod detail;
pub mod models;
mod request;
pub mod search;
pub mod store;
pub mod watchlist;

pub use catalog::{Catalog, CatalogError, OmdbClient};
pub use config::AppConfig;
pub use detail::{DetailLoader, DetailState};
pub use models::{MovieDetail, SearchResultItem, WatchSummary, WatchedEntry};
pub use search::{SearchController, SearchState, MIN_QUERY_LEN};
pub use store::{FileStorage, MemoryStorage, PersistentList, SlotStorage};
pub use watchlist::{Watchlist, WatchlistError};
