//! # Collection Handle
//!
//! The observable seam between stores and UI components. A handle wraps
//! `{models, page_state, loading, error_code}` in a settlement state
//! (pending, fulfilled or rejected) that tables and pagers watch.
//!
//! Every mutation goes through one `lock_mut()` guard, so observers see a
//! single update per fetch cycle and never a half-reset collection.
//!
//! ## Lifecycle
//!
//! ```rust,ignore
//! let handle = CollectionHandle::<Policy>::init(CollectionOptions::default(), vec![], PageState::default());
//!
//! handle.before_fetch();                 // loading = true, models = []
//! let page = store.fetch_all(&query, opts).await?;
//! handle.reset(page.models, Some(page.page_state)); // loading = false
//! ```

use crate::page::PageState;
use crate::record::{Record, RecordKey};
use crate::WardenError;
use futures_signals::signal::{Mutable, Signal};

/// Settlement of the container around the collection value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// No value yet
    Pending,
    /// A value is available
    Fulfilled,
    /// The producing operation failed
    Rejected(String),
}

/// The value a fulfilled handle carries.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionState<M> {
    /// Records of the current page
    pub models: Vec<M>,
    /// Pagination metadata of the current page
    pub page_state: PageState,
    /// A fetch is outstanding
    pub loading: bool,
    /// Code of the last failed fetch
    pub error_code: Option<String>,
}

impl<M> Default for CollectionState<M> {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            page_state: PageState::default(),
            loading: false,
            error_code: None,
        }
    }
}

/// Initial options for [`CollectionHandle::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Start in the loading state
    pub loading: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self { loading: true }
    }
}

#[derive(Clone, Debug)]
struct Snapshot<M> {
    settlement: Settlement,
    state: CollectionState<M>,
}

/// Observable remote-collection state shared between a screen and its table.
///
/// Cloning a handle shares the underlying state.
#[derive(Clone)]
pub struct CollectionHandle<M> {
    inner: Mutable<Snapshot<M>>,
}

impl<M: Clone + Send + Sync + 'static> CollectionHandle<M> {
    /// Create a fulfilled handle.
    pub fn init(options: CollectionOptions, models: Vec<M>, page_state: PageState) -> Self {
        Self {
            inner: Mutable::new(Snapshot {
                settlement: Settlement::Fulfilled,
                state: CollectionState {
                    models,
                    page_state,
                    loading: options.loading,
                    error_code: None,
                },
            }),
        }
    }

    /// Create a handle whose value is not available yet.
    pub fn pending() -> Self {
        Self {
            inner: Mutable::new(Snapshot {
                settlement: Settlement::Pending,
                state: CollectionState {
                    loading: true,
                    ..CollectionState::default()
                },
            }),
        }
    }

    /// Enter the loading state and drop stale rows. Call right before a request.
    pub fn before_fetch(&self) {
        let mut snapshot = self.inner.lock_mut();
        snapshot.state.loading = true;
        snapshot.state.models.clear();
    }

    /// Install a fetched page: set models, clear loading and any error code,
    /// and replace the page state when one is given.
    ///
    /// Settles a pending handle.
    pub fn reset(&self, models: Vec<M>, page_state: Option<PageState>) {
        let mut snapshot = self.inner.lock_mut();
        snapshot.settlement = Settlement::Fulfilled;
        snapshot.state.models = models;
        snapshot.state.loading = false;
        snapshot.state.error_code = None;
        if let Some(page_state) = page_state {
            snapshot.state.page_state = page_state;
        }
    }

    /// Record a failed fetch: stop loading, zero the page count and keep the code.
    pub fn fail(&self, error_code: Option<String>) {
        let mut snapshot = self.inner.lock_mut();
        if snapshot.settlement == Settlement::Pending {
            snapshot.settlement = Settlement::Fulfilled;
        }
        snapshot.state.loading = false;
        snapshot.state.page_state.total_pages = 0;
        snapshot.state.error_code = error_code;
    }

    /// Settle the container as rejected.
    pub fn reject(&self, reason: impl Into<String>) {
        let mut snapshot = self.inner.lock_mut();
        snapshot.settlement = Settlement::Rejected(reason.into());
        snapshot.state.loading = false;
    }

    /// Apply an arbitrary change as one transaction.
    pub fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut CollectionState<M>),
    {
        let mut snapshot = self.inner.lock_mut();
        f(&mut snapshot.state);
    }

    // ─── Accessors ───────────────────────────────────────────

    /// Current settlement.
    pub fn settlement(&self) -> Settlement {
        self.inner.lock_ref().settlement.clone()
    }

    /// No value yet.
    pub fn is_pending(&self) -> bool {
        self.inner.lock_ref().settlement == Settlement::Pending
    }

    /// A value is available.
    pub fn is_fulfilled(&self) -> bool {
        self.inner.lock_ref().settlement == Settlement::Fulfilled
    }

    /// The producing operation failed.
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.lock_ref().settlement, Settlement::Rejected(_))
    }

    /// Loading flag. Pending handles count as loading.
    pub fn is_loading(&self) -> bool {
        let snapshot = self.inner.lock_ref();
        snapshot.settlement == Settlement::Pending || snapshot.state.loading
    }

    /// Records of the current page; empty while pending.
    pub fn models(&self) -> Vec<M> {
        let snapshot = self.inner.lock_ref();
        match snapshot.settlement {
            Settlement::Pending => Vec::new(),
            _ => snapshot.state.models.clone(),
        }
    }

    /// Number of records of the current page; zero while pending.
    pub fn len(&self) -> usize {
        let snapshot = self.inner.lock_ref();
        match snapshot.settlement {
            Settlement::Pending => 0,
            _ => snapshot.state.models.len(),
        }
    }

    /// Whether the current page is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Page state; default while pending.
    pub fn page_state(&self) -> PageState {
        let snapshot = self.inner.lock_ref();
        match snapshot.settlement {
            Settlement::Pending => PageState::default(),
            _ => snapshot.state.page_state.clone(),
        }
    }

    /// Code of the last failed fetch.
    pub fn error_code(&self) -> Option<String> {
        self.inner.lock_ref().state.error_code.clone()
    }

    /// The full value, failing fast when the handle has none.
    pub fn state(&self) -> Result<CollectionState<M>, WardenError> {
        let snapshot = self.inner.lock_ref();
        match &snapshot.settlement {
            Settlement::Fulfilled => Ok(snapshot.state.clone()),
            Settlement::Pending => Err(WardenError::collection(
                "collection read while pending; await settlement before reading models",
            )),
            Settlement::Rejected(reason) => Err(WardenError::collection(format!(
                "collection read after rejection: {reason}"
            ))),
        }
    }

    // ─── Signals ─────────────────────────────────────────────

    /// Signal of the loading flag.
    pub fn loading_signal(&self) -> impl Signal<Item = bool> + Send + Sync + 'static {
        self.inner
            .signal_ref(|s| s.settlement == Settlement::Pending || s.state.loading)
    }

    /// Signal of the current models; empty while pending.
    pub fn models_signal(&self) -> impl Signal<Item = Vec<M>> + Send + Sync + 'static {
        self.inner.signal_ref(|s| match s.settlement {
            Settlement::Pending => Vec::new(),
            _ => s.state.models.clone(),
        })
    }

    /// Signal of the page state.
    pub fn page_state_signal(&self) -> impl Signal<Item = PageState> + Send + Sync + 'static {
        self.inner.signal_ref(|s| s.state.page_state.clone())
    }

    /// Signal of the settlement.
    pub fn settlement_signal(&self) -> impl Signal<Item = Settlement> + Send + Sync + 'static {
        self.inner.signal_ref(|s| s.settlement.clone())
    }
}

impl<M: Record> CollectionHandle<M> {
    /// Drop every record whose key equals `key`. Returns how many were removed.
    pub fn remove_by_key(&self, key: &RecordKey) -> usize {
        let mut snapshot = self.inner.lock_mut();
        let before = snapshot.state.models.len();
        snapshot
            .state
            .models
            .retain(|m| m.key().as_ref() != Some(key));
        before - snapshot.state.models.len()
    }
}

impl<M: Clone + Send + Sync + 'static> Default for CollectionHandle<M> {
    fn default() -> Self {
        Self::init(CollectionOptions::default(), Vec::new(), PageState::default())
    }
}

impl<M: std::fmt::Debug> std::fmt::Debug for CollectionHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.lock_ref();
        f.debug_struct("CollectionHandle")
            .field("settlement", &snapshot.settlement)
            .field("loading", &snapshot.state.loading)
            .field("models", &snapshot.state.models.len())
            .finish()
    }
}
