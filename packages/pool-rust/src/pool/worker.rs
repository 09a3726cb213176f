//! Connection worker: pulls commands, executes operations, self-heals.
//!
//! Each worker is a tokio task that owns its [`StoreConnection`] outright.
//! Requests are processed strictly FIFO in batches: the worker drains
//! everything queued, then blocks until woken by a new command or the
//! shutdown signal. An execution failure closes the connection and aborts
//! the rest of the batch; the leftover queue is resumed on the next loop
//! pass, after reconnection, so a wedged transaction can never silently
//! block the statements behind it.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sqlbus_core::{format_params, OperationError, QueryResult, Request, Response, WorkerCommand};

use crate::ops::OperationRegistry;
use crate::store::{Credentials, StoreConnection, StoreConnector};

// ---------------------------------------------------------------------------
// WorkerState
// ---------------------------------------------------------------------------

/// Flags shared between a worker task and the dispatcher.
///
/// `running` transitions true -> false exactly once; `busy` is set for the
/// duration of each batch and read by the routing policy.
pub(crate) struct WorkerState {
    running: AtomicBool,
    busy: AtomicBool,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            busy: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Dispatcher-side handle to one spawned worker.
pub(crate) struct WorkerHandle {
    pub(crate) index: usize,
    pub(crate) commands: mpsc::UnboundedSender<WorkerCommand>,
    pub(crate) responses: mpsc::UnboundedReceiver<Response>,
    pub(crate) state: Arc<WorkerState>,
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) join: Option<JoinHandle<()>>,
    /// Requests enqueued but not yet drained. Owned by the control thread;
    /// a brief overcount while a response is in flight is expected.
    pub(crate) pending: u64,
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

enum BatchOutcome {
    /// Queue empty; block until woken.
    Drained,
    /// Execution failure mid-batch; reconnect and resume the leftovers.
    Aborted,
    /// Inbound channel gone; the dispatcher was dropped.
    Disconnected,
}

pub(crate) struct Worker {
    index: usize,
    connection: StoreConnection,
    registry: Arc<OperationRegistry>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    responses: mpsc::UnboundedSender<Response>,
    wake: mpsc::UnboundedSender<usize>,
    state: Arc<WorkerState>,
    shutdown: watch::Receiver<bool>,
    reconnect_backoff: Duration,
    /// Command pulled while idle, executed at the head of the next batch.
    stashed: Option<WorkerCommand>,
    /// Requests handled since the last housekeeping hint.
    processed: u64,
}

impl Worker {
    /// Spawn a worker task and return its dispatcher-side handle plus a
    /// receiver resolved once the task is running.
    pub(crate) fn spawn(
        index: usize,
        connector: Arc<dyn StoreConnector>,
        credentials: Arc<Credentials>,
        registry: Arc<OperationRegistry>,
        wake: mpsc::UnboundedSender<usize>,
        reconnect_backoff: Duration,
    ) -> (WorkerHandle, oneshot::Receiver<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();
        let state = Arc::new(WorkerState::new());

        let worker = Worker {
            index,
            connection: StoreConnection::new(connector, credentials),
            registry,
            commands: command_rx,
            responses: response_tx,
            wake,
            state: Arc::clone(&state),
            shutdown: shutdown_rx,
            reconnect_backoff,
            stashed: None,
            processed: 0,
        };
        let join = tokio::spawn(worker.run(ready_tx));

        (
            WorkerHandle {
                index,
                commands: command_tx,
                responses: response_rx,
                state,
                shutdown: shutdown_tx,
                join: Some(join),
                pending: 0,
            },
            ready_rx,
        )
    }

    async fn run(mut self, ready: oneshot::Sender<()>) {
        let _ = ready.send(());
        info!(worker = self.index, "worker started");

        while self.state.is_running() {
            // Self-heal before touching the queue; this is the only retry
            // loop in the system.
            if let Err(error) = self.connection.ensure_live().await {
                warn!(worker = self.index, %error, "store unreachable, backing off");
                tokio::select! {
                    () = tokio::time::sleep(self.reconnect_backoff) => {}
                    _ = self.shutdown.changed() => {}
                }
                continue;
            }

            self.state.set_busy(true);
            let outcome = self.process_queued().await;
            self.state.set_busy(false);

            match outcome {
                BatchOutcome::Drained => {}
                BatchOutcome::Aborted => continue,
                BatchOutcome::Disconnected => break,
            }

            tokio::select! {
                _ = self.shutdown.changed() => {}
                command = self.commands.recv() => match command {
                    Some(command) => self.stashed = Some(command),
                    None => break,
                },
            }
        }

        self.connection.close().await;
        self.state.set_running(false);
        info!(worker = self.index, "worker stopped");
    }

    /// Drain everything currently queued, FIFO.
    async fn process_queued(&mut self) -> BatchOutcome {
        loop {
            let command = match self.stashed.take() {
                Some(command) => command,
                None => match self.commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => return BatchOutcome::Drained,
                    Err(TryRecvError::Disconnected) => return BatchOutcome::Disconnected,
                },
            };

            match command {
                WorkerCommand::CollectGarbage => self.housekeep(),
                WorkerCommand::Execute(request) => {
                    let started = Instant::now();
                    // A panicking operation must not take the worker down;
                    // it resolves the caller's failure callback like any
                    // other error and forces a reconnect.
                    let execution = AssertUnwindSafe(self.run_operation(&request))
                        .catch_unwind()
                        .await;
                    let Ok(execution) = execution else {
                        error!(
                            worker = self.index,
                            id = request.id,
                            operation = %request.operation,
                            "operation panicked"
                        );
                        self.push_response(Response::failure(
                            request.id,
                            format!("operation `{}` panicked", request.operation),
                        ));
                        self.connection.close().await;
                        return BatchOutcome::Aborted;
                    };
                    match execution {
                        Ok(result) => {
                            self.processed += 1;
                            debug!(
                                worker = self.index,
                                id = request.id,
                                operation = %request.operation,
                                params = %format_params(&request.params),
                                kind = result.kind(),
                                elapsed_ms =
                                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                                "operation succeeded"
                            );
                            self.push_response(Response::success(request.id, result));
                        }
                        Err(operation_error) => {
                            error!(
                                worker = self.index,
                                id = request.id,
                                operation = %request.operation,
                                params = %format_params(&request.params),
                                error = %operation_error,
                                "operation failed"
                            );
                            let reconnect = operation_error.forces_reconnect();
                            self.push_response(Response::failure(
                                request.id,
                                operation_error.to_string(),
                            ));
                            if reconnect {
                                self.connection.close().await;
                                return BatchOutcome::Aborted;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn run_operation(&mut self, request: &Request) -> Result<QueryResult, OperationError> {
        let operation = self.registry.resolve(&request.operation)?;
        operation.execute(&mut self.connection, &request.params).await
    }

    /// Housekeeping hint: nothing to collect in Rust, so this surfaces the
    /// batch counters and resets them.
    fn housekeep(&mut self) {
        debug!(
            worker = self.index,
            processed = self.processed,
            "housekeeping hint"
        );
        self.processed = 0;
    }

    fn push_response(&mut self, response: Response) {
        if self.responses.send(response).is_err() {
            warn!(worker = self.index, "response channel closed, dropping response");
            return;
        }
        let _ = self.wake.send(self.index);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
