//! One-shot lazy builder for the derived choseong key vector.
//!
//! Three states: empty, building, ready. At most one build is ever in
//! flight; readers either observe the ready value or wait on a condition
//! variable that is broadcast exactly when the state becomes ready.
//! Spurious wakeups re-check the state.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

#[derive(Debug)]
enum BuildState {
    Empty,
    Building,
    Ready(Arc<Vec<String>>),
}

#[derive(Debug)]
struct Inner {
    state: Mutex<BuildState>,
    ready: Condvar,
}

/// Lazily materialized key vector shared between the index and any
/// background builder thread.
#[derive(Debug, Clone)]
pub struct LazyKeys {
    inner: Arc<Inner>,
}

impl LazyKeys {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BuildState::Empty),
                ready: Condvar::new(),
            }),
        }
    }

    /// Spawn a worker that computes the keys, unless a build already
    /// started or finished. No-op otherwise.
    pub fn start_background_build<F>(&self, build: F)
    where
        F: FnOnce() -> Vec<String> + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                BuildState::Empty => *state = BuildState::Building,
                _ => return,
            }
        }
        let keys = self.clone();
        thread::spawn(move || {
            let values = build();
            keys.store_built_keys_if_needed(values);
        });
    }

    /// The built keys, iff the state is ready.
    pub fn ready_keys(&self) -> Option<Arc<Vec<String>>> {
        match &*self.inner.state.lock().unwrap() {
            BuildState::Ready(values) => Some(Arc::clone(values)),
            _ => None,
        }
    }

    /// Return the keys, building inline when nothing has started and
    /// waiting for the in-flight build otherwise.
    pub fn get_or_build<F>(&self, build: F) -> Arc<Vec<String>>
    where
        F: FnOnce() -> Vec<String>,
    {
        {
            let mut state = self.inner.state.lock().unwrap();
            loop {
                match &*state {
                    BuildState::Ready(values) => return Arc::clone(values),
                    BuildState::Building => {
                        state = self.inner.ready.wait(state).unwrap();
                    }
                    BuildState::Empty => {
                        *state = BuildState::Building;
                        break;
                    }
                }
            }
        }
        // Compute outside the lock; the Building state keeps this the only
        // builder.
        let values = build();
        self.store_built_keys_if_needed(values);
        match self.ready_keys() {
            Some(values) => values,
            // Unreachable: the store above transitions to Ready.
            None => Arc::new(Vec::new()),
        }
    }

    /// Idempotently transition to ready and release every waiter.
    pub fn store_built_keys_if_needed(&self, values: Vec<String>) {
        let mut state = self.inner.state.lock().unwrap();
        if !matches!(*state, BuildState::Ready(_)) {
            *state = BuildState::Ready(Arc::new(values));
            self.inner.ready.notify_all();
        }
    }
}

impl Default for LazyKeys {
    fn default() -> Self {
        Self::new()
    }
}
