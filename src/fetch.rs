use std::sync::{Arc, Mutex};

use crate::data::{DataSource, FetchError, RegionSnapshot};

/// Identifies one fetch. Results are only applied if their ticket is still
/// the current one when they arrive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FetchTicket(u64);

type FetchResult = Result<RegionSnapshot, FetchError>;

#[derive(Default)]
struct Shared {
    current: Option<FetchTicket>,
    done: Option<(FetchTicket, FetchResult)>,
}

/// Hands fetch results from a worker back to the UI thread.
///
/// The loader is cheap to clone, clones share state. Invalidating it (on
/// close or refresh) makes any late result from an older fetch disappear.
#[derive(Clone, Default)]
pub struct Loader {
    next: Arc<Mutex<u64>>,
    shared: Arc<Mutex<Shared>>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new fetch, superseding any outstanding one.
    pub fn begin(&self) -> FetchTicket {
        let ticket = {
            let mut next = lock(&self.next);
            *next += 1;
            FetchTicket(*next)
        };
        let mut shared = lock(&self.shared);
        shared.current = Some(ticket);
        shared.done = None;
        ticket
    }

    /// Called by the worker. Returns false if the result was dropped.
    pub fn complete(&self, ticket: FetchTicket, result: FetchResult) -> bool {
        let mut shared = lock(&self.shared);
        if shared.current != Some(ticket) {
            tracing::debug!(?ticket, "dropping stale region fetch");
            return false;
        }
        shared.done = Some((ticket, result));
        true
    }

    /// Takes the finished result for the current fetch, if there is one.
    pub fn poll(&self) -> Option<FetchResult> {
        let mut shared = lock(&self.shared);
        match shared.done.take() {
            Some((ticket, result)) if shared.current == Some(ticket) => {
                shared.current = None;
                Some(result)
            }
            Some((ticket, _)) => {
                tracing::debug!(?ticket, "dropping stale region fetch");
                None
            }
            None => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.shared).current.is_some()
    }

    /// Forgets the outstanding fetch. Its result will be ignored.
    pub fn invalidate(&self) {
        let mut shared = lock(&self.shared);
        shared.current = None;
        shared.done = None;
    }

    /// Runs `source` for `ticket` and stores the result.
    pub fn run(&self, ticket: FetchTicket, source: &mut dyn DataSource) -> bool {
        tracing::info!(?ticket, "fetching regions");
        let result = source.fetch_regions();
        match &result {
            Ok(snapshot) => tracing::info!(?ticket, regions = snapshot.len(), "regions fetched"),
            Err(e) => tracing::error!(?ticket, "region fetch failed: {}", e),
        }
        self.complete(ticket, result)
    }
}

// A poisoned lock only means a worker panicked mid-fetch; the state is
// still consistent so keep going.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
