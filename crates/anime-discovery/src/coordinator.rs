//! Per-slot request tracking with supersession.
//!
//! Every fetch takes a fresh generation number for its slot. A completing
//! request commits only if its generation is still the slot's current one, so
//! the last request to start is the only one whose outcome becomes visible,
//! whatever order the responses arrive in. Superseded requests are not
//! aborted at the transport level; their results are dropped.

use crate::error::FetchError;
use crate::slot::{SlotKey, SlotState};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Slot<T> {
    state: SlotState<T>,
    generation: u64,
}

struct Table<T> {
    slots: HashMap<SlotKey, Slot<T>>,
    /// Shared by all slots so a cleared slot never reuses a generation
    next_generation: u64,
}

struct Inner<T> {
    table: Mutex<Table<T>>,
    revision: watch::Sender<u64>,
}

/// Owns the `{data, loading, error}` state of a family of slots
///
/// Cloning yields another handle to the same slots.
pub struct RequestCoordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RequestCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for RequestCoordinator<T>
where
    T: Clone + Default + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestCoordinator<T>
where
    T: Clone + Default + Send + 'static,
{
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(Table {
                    slots: HashMap::new(),
                    next_generation: 0,
                }),
                revision,
            }),
        }
    }

    /// Start a fetch whose result replaces the slot's data
    pub fn fetch<Fut>(&self, key: SlotKey, request: Fut) -> JoinHandle<()>
    where
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.fetch_with(key, request, |_, fresh| fresh)
    }

    /// Start a fetch whose result is combined with the slot's current data
    ///
    /// `merge` receives the data committed by the last successful fetch, or
    /// `None` if the slot has none. `loading` and the cleared `error` are
    /// visible before this returns; the request itself runs on a spawned
    /// task whose handle is returned.
    pub fn fetch_with<V, Fut, M>(&self, key: SlotKey, request: Fut, merge: M) -> JoinHandle<()>
    where
        V: Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
        M: FnOnce(Option<T>, V) -> T + Send + 'static,
    {
        let generation = self.begin(&key);
        debug!(slot = %key, generation, "Fetch started");

        let coordinator = self.clone();
        tokio::spawn(async move {
            // The request runs in its own task so a panic still ends in a commit
            let result = match tokio::spawn(request).await {
                Ok(result) => result,
                Err(err) => Err(FetchError::Transport(format!("request task failed: {}", err))),
            };
            coordinator.commit(&key, generation, result, merge);
        })
    }

    /// Snapshot of a slot; never-requested slots read as idle
    pub fn state(&self, key: &SlotKey) -> SlotState<T> {
        self.table()
            .slots
            .get(key)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    /// Whether the slot has been requested since creation or its last clear
    pub fn contains(&self, key: &SlotKey) -> bool {
        self.table().slots.contains_key(key)
    }

    pub fn is_loading(&self, key: &SlotKey) -> bool {
        self.table()
            .slots
            .get(key)
            .is_some_and(|slot| slot.state.loading)
    }

    /// Forget a slot; a response still in flight for it is discarded
    pub fn clear(&self, key: &SlotKey) -> bool {
        let removed = self.table().slots.remove(key).is_some();
        if removed {
            debug!(slot = %key, "Slot cleared");
            self.notify();
        }
        removed
    }

    /// Receiver bumped after every state change of any slot
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Wait until the slot is no longer loading and return its state
    pub async fn settled(&self, key: &SlotKey) -> SlotState<T> {
        let mut changes = self.subscribe();
        loop {
            let state = self.state(key);
            if !state.loading || changes.changed().await.is_err() {
                return state;
            }
        }
    }

    fn begin(&self, key: &SlotKey) -> u64 {
        let generation = {
            let mut table = self.table();
            table.next_generation += 1;
            let generation = table.next_generation;

            let slot = table.slots.entry(key.clone()).or_insert_with(|| Slot {
                state: SlotState::default(),
                generation,
            });
            slot.generation = generation;
            slot.state.loading = true;
            slot.state.error = None;
            generation
        };
        self.notify();
        generation
    }

    fn commit<V, M>(&self, key: &SlotKey, generation: u64, result: Result<V, FetchError>, merge: M)
    where
        M: FnOnce(Option<T>, V) -> T,
    {
        {
            let mut table = self.table();
            let Some(slot) = table.slots.get_mut(key) else {
                debug!(slot = %key, generation, "Discarding response for cleared slot");
                return;
            };

            if slot.generation != generation {
                debug!(
                    slot = %key,
                    generation,
                    current = slot.generation,
                    "Discarding superseded response"
                );
                return;
            }

            let state = &mut slot.state;
            match result {
                Ok(value) => {
                    let existing = state.committed.then(|| std::mem::take(&mut state.data));
                    state.data = merge(existing, value);
                    state.committed = true;
                    state.error = None;
                    debug!(slot = %key, generation, "Fetch committed");
                }
                Err(err) => {
                    warn!(slot = %key, error = %err, "Fetch failed");
                    state.data = T::default();
                    state.committed = false;
                    state.error = Some(err.to_string());
                }
            }
            state.loading = false;
        }
        self.notify();
    }

    fn table(&self) -> MutexGuard<'_, Table<T>> {
        // State is only mutated in short synchronous sections, so a poisoned
        // lock still holds consistent data
        self.inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankingCategory;
    use crate::slot::SlotPhase;
    use tokio::sync::oneshot;

    type Reply = Result<Vec<u32>, FetchError>;

    fn pending() -> (oneshot::Sender<Reply>, impl Future<Output = Reply> + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let request = async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::Transport("dropped".to_string())))
        };
        (tx, request)
    }

    fn assert_consistent(state: &SlotState<Vec<u32>>) {
        assert!(
            !(state.loading && state.error.is_some()),
            "loading and error set together: {:?}",
            state
        );
    }

    #[tokio::test]
    async fn test_loading_is_visible_before_the_request_runs() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx, request) = pending();

        let handle = coordinator.fetch(SlotKey::SearchQuery, request);
        let state = coordinator.state(&SlotKey::SearchQuery);
        assert!(state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.phase(), SlotPhase::Loading);

        tx.send(Ok(vec![1, 2, 3])).unwrap();
        handle.await.unwrap();

        let state = coordinator.state(&SlotKey::SearchQuery);
        assert_eq!(state.data, vec![1, 2, 3]);
        assert!(!state.loading);
        assert_eq!(state.phase(), SlotPhase::Success);
    }

    #[tokio::test]
    async fn test_failure_sets_message_and_neutral_data() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        coordinator
            .fetch(SlotKey::Listing, async { Ok(vec![7]) })
            .await
            .unwrap();

        coordinator
            .fetch(SlotKey::Listing, async {
                Err(FetchError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                })
            })
            .await
            .unwrap();

        let state = coordinator.state(&SlotKey::Listing);
        assert!(state.data.is_empty());
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("Request failed with status 500: Internal Server Error")
        );
        assert_eq!(state.phase(), SlotPhase::Failed);
    }

    #[tokio::test]
    async fn test_new_fetch_clears_previous_error() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        coordinator
            .fetch(SlotKey::Listing, async { Err(FetchError::RateLimited) })
            .await
            .unwrap();
        assert!(coordinator.state(&SlotKey::Listing).error.is_some());

        let (_tx, request) = pending();
        let _handle = coordinator.fetch(SlotKey::Listing, request);
        let state = coordinator.state(&SlotKey::Listing);
        assert!(state.loading);
        assert_eq!(state.error, None);
    }

    fn broken_page() -> Reply {
        panic!("page decoder blew up")
    }

    #[tokio::test]
    async fn test_panicking_request_ends_in_failure() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        coordinator
            .fetch(SlotKey::Listing, async { broken_page() })
            .await
            .unwrap();

        let state = coordinator.state(&SlotKey::Listing);
        assert!(!state.loading);
        assert!(state.error.unwrap().contains("request task failed"));

        let settled = coordinator.settled(&SlotKey::Listing).await;
        assert_eq!(settled.phase(), SlotPhase::Failed);
    }

    #[tokio::test]
    async fn test_late_older_response_never_overwrites_newer() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx_a, request_a) = pending();
        let (tx_b, request_b) = pending();

        let handle_a = coordinator.fetch(SlotKey::SearchQuery, request_a);
        let handle_b = coordinator.fetch(SlotKey::SearchQuery, request_b);

        tx_b.send(Ok(vec![2])).unwrap();
        handle_b.await.unwrap();
        assert_eq!(coordinator.state(&SlotKey::SearchQuery).data, vec![2]);

        tx_a.send(Ok(vec![1])).unwrap();
        handle_a.await.unwrap();

        let state = coordinator.state(&SlotKey::SearchQuery);
        assert_eq!(state.data, vec![2]);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_late_older_failure_is_ignored() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx_a, request_a) = pending();
        let (tx_b, request_b) = pending();

        let handle_a = coordinator.fetch(SlotKey::SearchQuery, request_a);
        let handle_b = coordinator.fetch(SlotKey::SearchQuery, request_b);

        tx_b.send(Ok(vec![2])).unwrap();
        handle_b.await.unwrap();
        tx_a.send(Err(FetchError::RateLimited)).unwrap();
        handle_a.await.unwrap();

        let state = coordinator.state(&SlotKey::SearchQuery);
        assert_eq!(state.data, vec![2]);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_older_response_does_not_end_newer_loading() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx_a, request_a) = pending();
        let (tx_b, request_b) = pending();

        let handle_a = coordinator.fetch(SlotKey::SearchQuery, request_a);
        let handle_b = coordinator.fetch(SlotKey::SearchQuery, request_b);

        tx_a.send(Ok(vec![1])).unwrap();
        handle_a.await.unwrap();
        let state = coordinator.state(&SlotKey::SearchQuery);
        assert!(state.loading);
        assert!(state.data.is_empty());

        tx_b.send(Ok(vec![2])).unwrap();
        handle_b.await.unwrap();
        assert_eq!(coordinator.state(&SlotKey::SearchQuery).data, vec![2]);
    }

    #[tokio::test]
    async fn test_cleared_slot_ignores_in_flight_response() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx, request) = pending();
        let handle = coordinator.fetch(SlotKey::SearchQuery, request);

        assert!(coordinator.clear(&SlotKey::SearchQuery));
        assert!(!coordinator.contains(&SlotKey::SearchQuery));

        tx.send(Ok(vec![1])).unwrap();
        handle.await.unwrap();

        let state = coordinator.state(&SlotKey::SearchQuery);
        assert!(state.data.is_empty());
        assert_eq!(state.phase(), SlotPhase::Idle);
        assert!(!coordinator.contains(&SlotKey::SearchQuery));
    }

    #[tokio::test]
    async fn test_slots_fail_independently() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let airing = SlotKey::Ranking(RankingCategory::Airing);
        let upcoming = SlotKey::Ranking(RankingCategory::Upcoming);

        let ok = coordinator.fetch(airing.clone(), async { Ok(vec![1, 2]) });
        let failed = coordinator.fetch(upcoming.clone(), async {
            Err(FetchError::Transport("connection reset".to_string()))
        });
        ok.await.unwrap();
        failed.await.unwrap();

        let airing_state = coordinator.state(&airing);
        assert_eq!(airing_state.data, vec![1, 2]);
        assert_eq!(airing_state.error, None);
        assert!(coordinator.state(&upcoming).error.is_some());
    }

    #[tokio::test]
    async fn test_merge_sees_committed_data_only() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();

        coordinator
            .fetch_with(SlotKey::Listing, async { Ok(vec![1]) }, |existing, page| {
                assert!(existing.is_none());
                page
            })
            .await
            .unwrap();

        coordinator
            .fetch_with(SlotKey::Listing, async { Ok(vec![2]) }, |existing, page| {
                let mut merged = existing.unwrap_or_default();
                merged.extend(page);
                merged
            })
            .await
            .unwrap();

        assert_eq!(coordinator.state(&SlotKey::Listing).data, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_loading_and_error_never_coexist() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let key = SlotKey::Listing;

        for round in 0..4u32 {
            let (tx, request) = pending();
            let handle = coordinator.fetch(key.clone(), request);
            assert_consistent(&coordinator.state(&key));

            let reply = if round % 2 == 0 {
                Err(FetchError::RateLimited)
            } else {
                Ok(vec![round])
            };
            tx.send(reply).unwrap();
            handle.await.unwrap();
            assert_consistent(&coordinator.state(&key));
        }
    }

    #[tokio::test]
    async fn test_settled_waits_for_completion() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let (tx, request) = pending();
        let _handle = coordinator.fetch(SlotKey::Listing, request);

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.settled(&SlotKey::Listing).await })
        };
        tx.send(Ok(vec![9])).unwrap();

        let state = waiter.await.unwrap();
        assert_eq!(state.data, vec![9]);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_change() {
        let coordinator = RequestCoordinator::<Vec<u32>>::new();
        let mut changes = coordinator.subscribe();

        coordinator
            .fetch(SlotKey::Listing, async { Ok(vec![1]) })
            .await
            .unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 2);
    }
}
