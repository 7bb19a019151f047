//! Coalesced async operation: at most one underlying call runs at a time and
//! every concurrent caller shares its outcome. Used to guarantee that N
//! requests hitting a stale credential in the same tick issue exactly one
//! token refresh.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Mutex;

pub struct Singleflight<T: Clone> {
    in_flight: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone> Default for Singleflight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Singleflight<T> {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(None),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Singleflight<T> {
    /// Runs `op`, or joins the in-flight run if one exists. All waiters are
    /// released together with the same value once the single run resolves.
    pub async fn run<F, Fut>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut slot = self.in_flight.lock().expect("singleflight lock");
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let shared = op().boxed().shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        let out = shared.clone().await;

        // Clear the slot once this run settles so the next caller starts a
        // fresh run instead of observing a stale cached outcome.
        let mut slot = self.in_flight.lock().expect("singleflight lock");
        if slot
            .as_ref()
            .is_some_and(|current| Shared::ptr_eq(current, &shared))
        {
            *slot = None;
        }
        out
    }
}
