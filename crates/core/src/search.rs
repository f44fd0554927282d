//! Query-driven catalog search where only the newest query may commit.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    catalog::{Catalog, CatalogError},
    models::SearchResultItem,
    request::LatestRequest,
};

/// Queries shorter than this (after trimming) never reach the catalog.
pub const MIN_QUERY_LEN: usize = 3;

/// Observable search state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Query the state belongs to.
    pub query: String,
    /// A request for `query` is in flight.
    pub loading: bool,
    /// User-facing error, empty when none.
    pub error: String,
    /// Results of the last committed request.
    pub results: Vec<SearchResultItem>,
    generation: u64,
}

impl SearchState {
    /// Whether an error message is set.
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Runs a catalog search whenever the query changes.
///
/// A new query cancels the previous request, and a response is committed
/// only if its generation still matches the state's, checked under the
/// state lock. Must be driven from within a tokio runtime.
pub struct SearchController {
    catalog: Arc<dyn Catalog>,
    state: Arc<watch::Sender<SearchState>>,
    latest: LatestRequest,
}

impl SearchController {
    /// Create a controller with an empty query.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            catalog,
            state: Arc::new(state),
            latest: LatestRequest::default(),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Replace the query, cancelling any outstanding request.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.state.borrow().query == query {
            return;
        }
        self.latest.cancel();

        if query.trim().chars().count() < MIN_QUERY_LEN {
            self.state.send_modify(|state| {
                state.generation += 1;
                state.query = query;
                state.loading = false;
                state.error.clear();
                state.results.clear();
            });
            return;
        }

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.query = query.clone();
            state.loading = true;
            state.error.clear();
        });

        let token = self.latest.begin();
        let catalog = self.catalog.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(query = %query, "Search cancelled");
                    return;
                }
                result = catalog.search(&query) => result,
            };
            let committed = state.send_if_modified(|state| {
                if token.is_cancelled() || state.generation != generation {
                    return false;
                }
                apply_outcome(state, outcome);
                true
            });
            if !committed {
                debug!(query = %query, "Discarded stale search response");
            }
        });
    }
}

fn apply_outcome(state: &mut SearchState, outcome: Result<Vec<SearchResultItem>, CatalogError>) {
    state.loading = false;
    match outcome {
        Ok(results) => {
            debug!(query = %state.query, count = results.len(), "Search committed");
            state.results = results;
            state.error.clear();
        }
        Err(err) if err.is_not_found() => {
            debug!(query = %state.query, "No matches");
            state.results.clear();
            state.error = err.user_message().to_string();
        }
        Err(err) => {
            warn!(query = %state.query, %err, "Search failed");
            state.error = err.user_message().to_string();
        }
    }
}
