//! On-demand loading of the selected movie's full record.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{catalog::Catalog, models::MovieDetail, request::LatestRequest};

/// Observable detail state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    /// Identifier currently selected, if any.
    pub selected: Option<String>,
    /// A request for `selected` is in flight.
    pub loading: bool,
    /// Loaded record for `selected`.
    pub detail: Option<MovieDetail>,
    /// User-facing message for the last failed load.
    pub error: Option<String>,
    generation: u64,
}

impl DetailState {
    /// Title of the loaded movie, if any.
    pub fn title(&self) -> Option<&str> {
        self.detail.as_ref().map(|detail| detail.title.as_str())
    }
}

/// Fetches [`MovieDetail`] for the selected identifier.
///
/// Selecting a new identifier cancels the previous fetch, so a late
/// response can never overwrite a newer selection.
pub struct DetailLoader {
    catalog: Arc<dyn Catalog>,
    state: Arc<watch::Sender<DetailState>>,
    latest: LatestRequest,
}

impl DetailLoader {
    /// Create a loader with nothing selected.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            catalog,
            state: Arc::new(state),
            latest: LatestRequest::default(),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Currently selected identifier.
    pub fn selected(&self) -> Option<String> {
        self.state.borrow().selected.clone()
    }

    /// Receiver notified whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    /// Select the identifier under the cursor, or deselect it when it is
    /// already selected.
    pub fn toggle(&mut self, id: &str) {
        if self.state.borrow().selected.as_deref() == Some(id) {
            self.select(None);
        } else {
            self.select(Some(id.to_string()));
        }
    }

    /// Drop the selection and any loaded detail.
    pub fn clear(&mut self) {
        self.select(None);
    }

    /// Change the selection. `None` clears the detail.
    pub fn select(&mut self, id: Option<String>) {
        if self.state.borrow().selected == id {
            return;
        }
        self.latest.cancel();

        let Some(id) = id else {
            self.state.send_modify(|state| {
                state.generation += 1;
                state.selected = None;
                state.loading = false;
                state.detail = None;
                state.error = None;
            });
            return;
        };

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.selected = Some(id.clone());
            state.loading = true;
            state.detail = None;
            state.error = None;
        });

        let token = self.latest.begin();
        let catalog = self.catalog.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(id = %id, "Detail fetch cancelled");
                    return;
                }
                result = catalog.detail(&id) => result,
            };
            state.send_if_modified(|state| {
                if token.is_cancelled() || state.generation != generation {
                    debug!(id = %id, "Discarded stale detail response");
                    return false;
                }
                state.loading = false;
                match outcome {
                    Ok(detail) => {
                        info!(id = %id, title = %detail.title, "Detail loaded");
                        state.detail = Some(detail);
                    }
                    Err(err) => {
                        warn!(id = %id, %err, "Detail fetch failed");
                        state.detail = None;
                        state.error = Some(err.user_message().to_string());
                    }
                }
                true
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{CatalogError, FETCH_FAILED_MESSAGE},
        search::tests::ScriptedCatalog,
    };
    use std::{sync::atomic::Ordering, time::Duration};
    use tokio::time::timeout;

    fn detail(id: &str, title: &str) -> MovieDetail {
        MovieDetail {
            id: id.to_string(),
            title: title.to_string(),
            year: "1995".to_string(),
            poster: None,
            runtime: "170 min".to_string(),
            genre: "Crime".to_string(),
            plot: String::new(),
            released: String::new(),
            actors: String::new(),
            director: "Michael Mann".to_string(),
            external_rating: Some(8.3),
        }
    }

    async fn settled(rx: &mut watch::Receiver<DetailState>) -> DetailState {
        timeout(Duration::from_secs(2), rx.wait_for(|state| !state.loading))
            .await
            .expect("detail did not settle")
            .expect("loader dropped")
            .clone()
    }

    #[tokio::test]
    async fn loads_selected_detail() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let reply = catalog.expect_detail("tt1");
        let mut loader = DetailLoader::new(catalog.clone());
        let mut rx = loader.subscribe();

        loader.select(Some("tt1".to_string()));
        assert!(loader.state().loading);
        let _ = reply.send(Ok(detail("tt1", "Heat")));

        let state = settled(&mut rx).await;
        assert_eq!(state.selected.as_deref(), Some("tt1"));
        assert_eq!(state.title(), Some("Heat"));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn late_response_for_previous_selection_is_ignored() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let first = catalog.expect_detail("tt1");
        let second = catalog.expect_detail("tt2");
        let mut loader = DetailLoader::new(catalog.clone());
        let mut rx = loader.subscribe();

        loader.select(Some("tt1".to_string()));
        loader.select(Some("tt2".to_string()));
        let _ = second.send(Ok(detail("tt2", "Ronin")));
        settled(&mut rx).await;

        let _ = first.send(Ok(detail("tt1", "Heat")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = loader.state();
        assert_eq!(state.selected.as_deref(), Some("tt2"));
        assert_eq!(state.title(), Some("Ronin"));
    }

    #[tokio::test]
    async fn failure_clears_detail() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let reply = catalog.expect_detail("tt404");
        let mut loader = DetailLoader::new(catalog.clone());
        let mut rx = loader.subscribe();

        loader.select(Some("tt404".to_string()));
        let _ = reply.send(Err(CatalogError::Status { status: 500 }));
        let state = settled(&mut rx).await;
        assert_eq!(state.detail, None);
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert_eq!(state.selected.as_deref(), Some("tt404"));
    }

    #[tokio::test]
    async fn toggle_deselects_and_clear_drops_detail() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let reply = catalog.expect_detail("tt7");
        let mut loader = DetailLoader::new(catalog.clone());
        let mut rx = loader.subscribe();

        loader.toggle("tt7");
        let _ = reply.send(Ok(detail("tt7", "Thief")));
        settled(&mut rx).await;

        loader.toggle("tt7");
        let state = loader.state();
        assert_eq!(state.selected, None);
        assert_eq!(state.detail, None);
        assert!(!state.loading);

        loader.clear();
        assert_eq!(loader.selected(), None);
        assert_eq!(catalog.detail_calls.load(Ordering::SeqCst), 1);
    }
}
