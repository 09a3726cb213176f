//! Scriptable in-memory store used across the crate's tests.
//!
//! One [`FakeStore`] stands in for the backing database: it counts dials
//! and closes, records every executed statement, and can be told to
//! refuse connections, fail the next liveness probe, or fail the next
//! statement — enough to exercise every reconnect path without a real
//! driver.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use sqlbus_core::{Param, Row, StoreError};

use super::credentials::Credentials;
use super::handle::{StatementMode, StatementOutcome, StoreConnector, StoreHandle};

/// Canned results every statement returns.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub insert_id: u64,
}

#[derive(Default)]
struct SharedState {
    script: Mutex<FakeScript>,
    opens: AtomicU32,
    closes: AtomicU32,
    refuse_connect: AtomicBool,
    fail_ping_once: AtomicBool,
    fail_execute_once: Mutex<Option<StoreError>>,
    statements: Mutex<Vec<String>>,
}

/// Handle-counting fake store shared between a test and its connector.
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<SharedState>,
}

impl FakeStore {
    pub fn new(script: FakeScript) -> Self {
        let state = SharedState {
            script: Mutex::new(script),
            ..SharedState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        Arc::new(FakeConnector {
            state: Arc::clone(&self.state),
        })
    }

    /// Build a row from column/value pairs.
    pub fn row(columns: &[(&str, serde_json::Value)]) -> Row {
        let mut row = Row::new();
        for (name, value) in columns {
            row.insert((*name).to_string(), value.clone());
        }
        row
    }

    pub fn opens(&self) -> u32 {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Statements seen so far, oldest first, prefixed `direct:`/`prepared:`.
    pub fn statements(&self) -> Vec<String> {
        self.state.statements.lock().clone()
    }

    /// Fail the next liveness probe; the handle dialed afterwards probes fine.
    pub fn kill_ping(&self) {
        self.state.fail_ping_once.store(true, Ordering::SeqCst);
    }

    /// Fail the next statement (direct or prepared) with the given error.
    pub fn fail_next_execute(&self, error: StoreError) {
        *self.state.fail_execute_once.lock() = Some(error);
    }

    /// While set, every dial attempt fails.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    /// Replace the canned row set.
    pub fn set_rows(&self, rows: Vec<Row>) {
        self.state.script.lock().rows = rows;
    }
}

struct FakeConnector {
    state: Arc<SharedState>,
}

#[async_trait]
impl StoreConnector for FakeConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn StoreHandle>, StoreError> {
        if self.state.refuse_connect.load(Ordering::SeqCst) {
            return Err(StoreError::new(2002, "store unreachable"));
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeHandle {
    state: Arc<SharedState>,
}

impl FakeHandle {
    fn run(&self, kind: &str, sql: &str) -> Result<StatementOutcome, StoreError> {
        if let Some(error) = self.state.fail_execute_once.lock().take() {
            return Err(error);
        }
        self.state.statements.lock().push(format!("{kind}:{sql}"));
        let script = self.state.script.lock();
        Ok(StatementOutcome {
            rows: script.rows.clone(),
            affected_rows: script.affected_rows,
            insert_id: script.insert_id,
        })
    }
}

#[async_trait]
impl StoreHandle for FakeHandle {
    async fn query(
        &mut self,
        _mode: StatementMode,
        sql: &str,
    ) -> Result<StatementOutcome, StoreError> {
        self.run("direct", sql)
    }

    async fn query_prepared(
        &mut self,
        _mode: StatementMode,
        sql: &str,
        _params: &[Param],
    ) -> Result<StatementOutcome, StoreError> {
        self.run("prepared", sql)
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        if self.state.fail_ping_once.swap(false, Ordering::SeqCst) {
            return Err(StoreError::new(2006, "server has gone away"));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}
