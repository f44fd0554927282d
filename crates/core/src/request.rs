//! Tracks the single request a controller still cares about.

use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the newest request; starting a new one
/// cancels the previous. Dropping it cancels whatever is outstanding.
#[derive(Debug, Default)]
pub(crate) struct LatestRequest {
    token: Option<CancellationToken>,
}

impl LatestRequest {
    /// Cancel the outstanding request and return a token for the next one.
    pub(crate) fn begin(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        token
    }

    /// Cancel the outstanding request, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

impl Drop for LatestRequest {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_cancels_previous() {
        let mut latest = LatestRequest::default();
        let first = latest.begin();
        let second = latest.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        drop(latest);
        assert!(second.is_cancelled());
    }
}
