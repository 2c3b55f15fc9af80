use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

type InFlight<T> = Option<(u64, Shared<BoxFuture<'static, T>>)>;

/// Collapses concurrent runs of the same operation into one.
///
/// While a run is in flight, every further caller awaits the same future and
/// receives a clone of its output. The next call after it completes starts a
/// fresh run.
pub struct Coalescer<T: Clone> {
    in_flight: Mutex<InFlight<T>>,
    next_id: AtomicU64,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight run, or start one with `start`.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, shared) = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some((id, shared)) => (*id, shared.clone()),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let shared = start().boxed().shared();
                    *slot = Some((id, shared.clone()));
                    (id, shared)
                }
            }
        };

        let output = shared.await;

        let mut slot = self.lock();
        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
            *slot = None;
        }
        output
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, InFlight<T>> {
        // The slot is always left consistent, so a poisoned lock is still usable
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
