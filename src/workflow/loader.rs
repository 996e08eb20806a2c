use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::refresh::RefreshKey;
use crate::services::CollectionSource;

/// What to do with a response that arrives after a newer fetch already
/// replaced the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Whichever response resolves last overwrites the collection.
    #[default]
    LastResponseWins,
    /// Responses older than the applied one are dropped.
    DiscardStale,
}

impl StalePolicy {
    pub fn from_flag(discard_stale: bool) -> Self {
        if discard_stale {
            StalePolicy::DiscardStale
        } else {
            StalePolicy::LastResponseWins
        }
    }
}

#[derive(Debug)]
pub struct LoadState<T> {
    /// True after the latest completed fetch succeeded.
    pub ready: bool,
    /// Last successfully decoded collection. Empty until the first success.
    pub items: Arc<Vec<T>>,
    /// Fetch counter value of the response currently held in `items`.
    pub applied_generation: u64,
    /// Number of fetches that resolved, successfully or not.
    pub fetches_completed: u64,
    /// Highest refresh key sequence whose fetch has resolved.
    pub newest_key_completed: u64,
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self {
            ready: false,
            items: Arc::new(Vec::new()),
            applied_generation: 0,
            fetches_completed: 0,
            newest_key_completed: 0,
        }
    }
}

impl<T> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        Self {
            ready: self.ready,
            items: Arc::clone(&self.items),
            applied_generation: self.applied_generation,
            fetches_completed: self.fetches_completed,
            newest_key_completed: self.newest_key_completed,
        }
    }
}

/// Keeps a remote collection in memory and fetches it again for every
/// refresh key it receives. In-flight fetches are never cancelled.
pub struct RemoteCollectionLoader<T> {
    state: watch::Receiver<LoadState<T>>,
    watcher: JoinHandle<()>,
}

impl<T> RemoteCollectionLoader<T>
where
    T: Send + Sync + 'static,
{
    /// Starts listening on `keys`. The first fetch is issued immediately and
    /// each received key schedules exactly one more.
    pub fn spawn(
        source: Arc<dyn CollectionSource<T>>,
        keys: mpsc::UnboundedReceiver<RefreshKey>,
        policy: StalePolicy,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(LoadState::default());
        let watcher = tokio::spawn(watch_keys(source, keys, Arc::new(state_tx), policy));
        Self {
            state: state_rx,
            watcher,
        }
    }

    /// Loads the collection a single time, with no refresh key attached.
    pub fn once(source: Arc<dyn CollectionSource<T>>) -> Self {
        let (_keys_tx, keys_rx) = mpsc::unbounded_channel();
        Self::spawn(source, keys_rx, StalePolicy::default())
    }

    pub fn snapshot(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.state.borrow().items)
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<T>> {
        self.state.clone()
    }

    /// Waits until at least `count` fetches have resolved.
    pub async fn wait_for_fetches(&self, count: u64) -> LoadState<T> {
        self.wait_until(|state| state.fetches_completed >= count).await
    }

    /// Waits until the fetch triggered by `key` (or a newer one) resolved.
    pub async fn wait_for_key(&self, key: &RefreshKey) -> LoadState<T> {
        let sequence = key.sequence();
        self.wait_until(|state| {
            state.fetches_completed > 0 && state.newest_key_completed >= sequence
        })
        .await
    }

    async fn wait_until(&self, predicate: impl FnMut(&LoadState<T>) -> bool) -> LoadState<T> {
        let mut state = self.state.clone();
        match state.wait_for(predicate).await {
            Ok(settled) => settled.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl<T> Drop for RemoteCollectionLoader<T> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

async fn watch_keys<T>(
    source: Arc<dyn CollectionSource<T>>,
    mut keys: mpsc::UnboundedReceiver<RefreshKey>,
    state: Arc<watch::Sender<LoadState<T>>>,
    policy: StalePolicy,
) where
    T: Send + Sync + 'static,
{
    let mut generation = 0u64;
    let mut key = RefreshKey::default();
    loop {
        generation += 1;
        debug!(url = source.location(), generation, key = %key, "scheduling fetch");
        tokio::spawn(fetch_into(
            Arc::clone(&source),
            Arc::clone(&state),
            generation,
            key,
            policy,
        ));

        match keys.recv().await {
            Some(next) => key = next,
            None => {
                debug!(url = source.location(), "refresh key dropped, no further fetches");
                break;
            }
        }
    }
}

async fn fetch_into<T>(
    source: Arc<dyn CollectionSource<T>>,
    state: Arc<watch::Sender<LoadState<T>>>,
    generation: u64,
    key: RefreshKey,
    policy: StalePolicy,
) where
    T: Send + Sync + 'static,
{
    let result = source.fetch().await;

    state.send_modify(|current| {
        current.fetches_completed += 1;
        current.newest_key_completed = current.newest_key_completed.max(key.sequence());

        let stale = generation < current.applied_generation;
        if stale && policy == StalePolicy::DiscardStale {
            debug!(url = source.location(), generation, "discarding stale response");
            return;
        }

        match result {
            Ok(items) => {
                info!(
                    url = source.location(),
                    generation,
                    key = %key,
                    count = items.len(),
                    stale,
                    "collection loaded"
                );
                current.items = Arc::new(items);
                current.ready = true;
                current.applied_generation = generation;
            }
            Err(err) => {
                error!(
                    url = source.location(),
                    generation,
                    key = %key,
                    "error fetching data: {err}"
                );
                current.ready = false;
            }
        }
    });
}
