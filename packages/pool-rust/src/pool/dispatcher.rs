//! Submission surface: correlation ids, callback table, load-aware routing.
//!
//! The dispatcher is owned by the host's control context; every method
//! takes `&mut self`, so the correlation counter, the callback table, and
//! the per-worker pending counts are single-threaded by ownership and
//! need no locks. Workers signal produced output through the notification
//! channel handed out by [`Dispatcher::init`]; the host calls
//! [`Dispatcher::drain`] with each received index.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use sqlbus_core::{classify_params, QueryResult, Request, WorkerCommand};

use crate::ops::{op_names, OperationRegistry};
use crate::store::{Credentials, StoreConnector};

use super::config::PoolConfig;
use super::worker::{Worker, WorkerHandle};

/// Poll interval while `close()` waits for pending counts to reach zero.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resolves with the operation's result on success.
pub type SuccessCallback = Box<dyn FnOnce(QueryResult) + Send>;
/// Resolves with the rendered error on failure.
pub type FailureCallback = Box<dyn FnOnce(String) + Send>;

struct CallbackEntry {
    on_success: Option<SuccessCallback>,
    on_fail: Option<FailureCallback>,
}

// ---------------------------------------------------------------------------
// Worker selection
// ---------------------------------------------------------------------------

/// Load-aware round robin over `(busy, pending)` worker loads.
///
/// Prefers the fewest-pending not-busy worker, excluding the previous
/// pick so bursts spread instead of hammering one worker. When no such
/// candidate exists the least-pending worker overall wins, previous pick
/// included. Ties break toward the lowest index.
fn select_target(loads: &[(bool, u64)], last: Option<usize>) -> usize {
    let mut best: Option<(usize, u64)> = None;
    for (index, &(busy, pending)) in loads.iter().enumerate() {
        if busy || Some(index) == last {
            continue;
        }
        if best.map_or(true, |(_, lowest)| pending < lowest) {
            best = Some((index, pending));
        }
    }
    if let Some((index, _)) = best {
        return index;
    }
    loads
        .iter()
        .enumerate()
        .min_by_key(|&(_, &(_, pending))| pending)
        .map_or(0, |(index, _)| index)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes submitted operations to workers and resolves their callbacks.
pub struct Dispatcher {
    workers: Vec<WorkerHandle>,
    callbacks: HashMap<u64, CallbackEntry>,
    registry: Arc<OperationRegistry>,
    config: PoolConfig,
    next_id: u64,
    last_picked: Option<usize>,
    closed: bool,
}

impl Dispatcher {
    /// Construct and start the pool.
    ///
    /// Spawns `config.worker_count` workers, waits until every one has
    /// confirmed it is running, and issues an initial schema version
    /// check whose outcome is logged. The returned receiver is the
    /// notification channel: the host must call [`Dispatcher::drain`]
    /// with every index it yields.
    ///
    /// # Errors
    ///
    /// Fails when `worker_count` is zero or a worker task dies before
    /// confirming startup.
    pub async fn init(
        connector: Arc<dyn StoreConnector>,
        credentials: Credentials,
        config: PoolConfig,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<usize>)> {
        anyhow::ensure!(config.worker_count >= 1, "worker_count must be at least 1");

        let registry = Arc::new(OperationRegistry::with_builtins());
        let credentials = Arc::new(credentials);
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();

        let mut workers = Vec::with_capacity(config.worker_count);
        let mut confirmations = Vec::with_capacity(config.worker_count);
        for index in 0..config.worker_count {
            let (handle, ready) = Worker::spawn(
                index,
                Arc::clone(&connector),
                Arc::clone(&credentials),
                Arc::clone(&registry),
                wake_tx.clone(),
                config.reconnect_backoff,
            );
            workers.push(handle);
            confirmations.push(ready);
        }
        for (index, ready) in confirmations.into_iter().enumerate() {
            ready
                .await
                .with_context(|| format!("worker {index} exited before confirming startup"))?;
        }
        info!(workers = config.worker_count, "dispatcher started");

        let mut dispatcher = Self {
            workers,
            callbacks: HashMap::new(),
            registry,
            config,
            next_id: 0,
            last_picked: None,
            closed: false,
        };
        dispatcher.check_schema_version();
        Ok((dispatcher, wake_rx))
    }

    /// The operation registry, for registering embedder-defined operations.
    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    fn check_schema_version(&mut self) {
        self.submit(
            op_names::SCHEMA_VERSION_CHECK,
            Vec::new(),
            Some(Box::new(|result| {
                info!(version = ?result, "store version verified");
            })),
            Some(Box::new(|message| {
                error!(%message, "store version check failed");
            })),
        );
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit a named operation. Never blocks.
    ///
    /// Allocates the next correlation id, classifies `params` (rejecting
    /// unsupported value kinds through `on_fail` before anything crosses a
    /// thread boundary), stores the callbacks, and enqueues the request on
    /// the selected worker. Returns the correlation id.
    pub fn submit(
        &mut self,
        operation: impl Into<String>,
        params: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;

        if self.closed {
            deliver_failure(id, on_fail, "dispatcher is closed".to_string());
            return id;
        }

        let params = match classify_params(params) {
            Ok(params) => params,
            Err(err) => {
                warn!(id, error = %err, "operation rejected before dispatch");
                deliver_failure(id, on_fail, err.to_string());
                return id;
            }
        };

        let target = self.pick_worker();
        if on_success.is_some() || on_fail.is_some() {
            self.callbacks
                .insert(id, CallbackEntry { on_success, on_fail });
        }

        let request = Request::new(id, operation, params);
        if self.workers[target]
            .commands
            .send(WorkerCommand::Execute(request))
            .is_err()
        {
            // Worker task is gone; resolve the failure on the spot.
            let entry = self.callbacks.remove(&id);
            deliver_failure(
                id,
                entry.and_then(|entry| entry.on_fail),
                format!("worker {target} unavailable"),
            );
            return id;
        }

        self.workers[target].pending += 1;
        self.last_picked = Some(target);
        id
    }

    /// Row-returning statement; resolves with [`QueryResult::Rows`].
    pub fn select(
        &mut self,
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.submit(
            op_names::RAW_SELECT,
            Self::statement_params(query, args),
            on_success,
            on_fail,
        )
    }

    /// Single-row statement; resolves with [`QueryResult::Row`].
    pub fn select_one(
        &mut self,
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.submit(
            op_names::RAW_SELECT_ONE,
            Self::statement_params(query, args),
            on_success,
            on_fail,
        )
    }

    /// Insert; resolves with [`QueryResult::Insert`].
    pub fn insert(
        &mut self,
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.submit(
            op_names::RAW_INSERT,
            Self::statement_params(query, args),
            on_success,
            on_fail,
        )
    }

    /// Update/delete; resolves with [`QueryResult::Change`].
    pub fn change(
        &mut self,
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.submit(
            op_names::RAW_CHANGE,
            Self::statement_params(query, args),
            on_success,
            on_fail,
        )
    }

    /// Any other statement; resolves with [`QueryResult::Generic`].
    pub fn generic(
        &mut self,
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
        on_success: Option<SuccessCallback>,
        on_fail: Option<FailureCallback>,
    ) -> u64 {
        self.submit(
            op_names::RAW_GENERIC,
            Self::statement_params(query, args),
            on_success,
            on_fail,
        )
    }

    fn statement_params(
        query: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Vec<serde_json::Value> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(serde_json::Value::String(query.into()));
        params.extend(args);
        params
    }

    fn pick_worker(&self) -> usize {
        let loads: Vec<(bool, u64)> = self
            .workers
            .iter()
            .map(|worker| (worker.state.is_busy(), worker.pending))
            .collect();
        select_target(&loads, self.last_picked)
    }

    // -----------------------------------------------------------------------
    // Draining
    // -----------------------------------------------------------------------

    /// Resolve every response the given worker has produced so far.
    ///
    /// Each response removes its callback entry and invokes at most one of
    /// the registered callbacks; a panicking callback is caught and logged
    /// so the remaining responses still resolve.
    pub fn drain(&mut self, worker: usize) {
        let Some(handle) = self.workers.get_mut(worker) else {
            warn!(worker, "drain for unknown worker index");
            return;
        };

        while let Ok(response) = handle.responses.try_recv() {
            handle.pending = handle.pending.saturating_sub(1);
            let Some(entry) = self.callbacks.remove(&response.id) else {
                // Nothing registered for this id: discard silently.
                continue;
            };
            if response.is_error {
                deliver_failure(response.id, entry.on_fail, response.error_message);
            } else if let Some(callback) = entry.on_success {
                match response.result {
                    Some(result) => deliver_success(response.id, callback, result),
                    None => warn!(id = response.id, "success response carried no result"),
                }
            }
        }
    }

    /// Drain every worker once, in index order.
    pub fn drain_all(&mut self) {
        for index in 0..self.workers.len() {
            self.drain(index);
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Broadcast the housekeeping hint to every worker. Fire-and-forget.
    pub fn trigger_gc(&self) {
        for worker in &self.workers {
            let _ = worker.commands.send(WorkerCommand::CollectGarbage);
        }
    }

    /// Drain in-flight work to completion, then stop every worker.
    ///
    /// Polls until every pending count reaches zero (bounded by
    /// `drain_timeout`), so submitted operations resolve their callbacks
    /// before their worker goes away. Calling this a second time is a
    /// no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        loop {
            self.drain_all();
            let outstanding: u64 = self.workers.iter().map(|worker| worker.pending).sum();
            if outstanding == 0 {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(outstanding, "drain timed out, closing with unresolved operations");
                break;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        for worker in &mut self.workers {
            worker.state.set_running(false);
            let _ = worker.shutdown.send(true);
            if let Some(join) = worker.join.take() {
                if join.await.is_err() {
                    error!(worker = worker.index, "worker task panicked during shutdown");
                }
            }
        }
        info!("dispatcher closed");
    }
}

// ---------------------------------------------------------------------------
// Callback delivery
// ---------------------------------------------------------------------------

fn deliver_success(id: u64, callback: SuccessCallback, result: QueryResult) {
    if catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
        error!(id, "success callback panicked");
    }
}

fn deliver_failure(id: u64, callback: Option<FailureCallback>, message: String) {
    let Some(callback) = callback else { return };
    if catch_unwind(AssertUnwindSafe(move || callback(message))).is_err() {
        error!(id, "failure callback panicked");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
