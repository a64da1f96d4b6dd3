//! Bounded worker pool used by the concurrent closure engine.

use std::sync::{Arc, Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, instrument};

use crate::domain::error::{TreeError, TreeResult};

#[derive(Debug)]
enum PoolState {
    Idle,
    Running(Arc<ThreadPool>),
    Closed,
}

/// Lazily started `rayon` thread pool with an explicit, one-shot shutdown.
///
/// The pool is built on first use; `close` releases the threads. A closed pool
/// refuses further work.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    /// Pool with `size` worker threads; 0 picks the rayon default (one per CPU).
    pub fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(PoolState::Idle),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Running pool, starting it if this is the first request.
    #[instrument(level = "debug", skip(self), fields(size = self.size))]
    pub fn get(&self) -> TreeResult<Arc<ThreadPool>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            PoolState::Running(pool) => Ok(Arc::clone(pool)),
            PoolState::Closed => Err(TreeError::Pool("pool already closed".to_string())),
            PoolState::Idle => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(self.size)
                    .thread_name(|i| format!("hiertree-worker-{i}"))
                    .build()
                    .map_err(|e| TreeError::Pool(e.to_string()))?;
                let pool = Arc::new(pool);
                debug!("started worker pool with {} threads", pool.current_num_threads());
                *state = PoolState::Running(Arc::clone(&pool));
                Ok(pool)
            }
        }
    }

    /// Shut the pool down. Returns false if it was already closed.
    #[instrument(level = "debug", skip(self))]
    pub fn close(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, PoolState::Closed) {
            PoolState::Closed => false,
            PoolState::Running(_) => {
                debug!("worker pool closed");
                true
            }
            PoolState::Idle => true,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            PoolState::Closed
        )
    }
}
