//! Opaque driver boundary for the backing relational store.
//!
//! The pool never speaks a wire protocol itself. The embedder supplies a
//! [`StoreConnector`] that dials handles, and each handle executes
//! statements, answers liveness probes, and closes. The statement mode is
//! passed down explicitly so the driver reads the right native accessors
//! (affected rows, insert id) before the handle state is disturbed by the
//! next call.

use async_trait::async_trait;

use sqlbus_core::{Param, Row, StoreError};

use super::credentials::Credentials;

// ---------------------------------------------------------------------------
// StatementMode
// ---------------------------------------------------------------------------

/// What kind of statement is being executed, and therefore which native
/// accessors carry its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementMode {
    /// Row-returning statement.
    Select,
    /// Insert; the driver must surface affected rows and the insert id.
    Insert,
    /// Update/delete; the driver must surface affected rows.
    Change,
    /// Anything else; success or failure only.
    Generic,
}

// ---------------------------------------------------------------------------
// StatementOutcome
// ---------------------------------------------------------------------------

/// Raw per-statement result reported by the driver.
///
/// Only the fields relevant to the statement mode need to be populated;
/// the rest stay at their defaults.
#[derive(Debug, Clone, Default)]
pub struct StatementOutcome {
    /// Matched rows, in result-set order. Empty for non-select modes.
    pub rows: Vec<Row>,
    /// Rows affected by an insert/update/delete.
    pub affected_rows: u64,
    /// Generated id of the last insert, `0` if none.
    pub insert_id: u64,
}

// ---------------------------------------------------------------------------
// StoreHandle / StoreConnector
// ---------------------------------------------------------------------------

/// One live handle to the backing store.
///
/// A handle is owned by exactly one worker and never shared; implementors
/// do not need interior locking. Used as `Box<dyn StoreHandle>`.
#[async_trait]
pub trait StoreHandle: Send {
    /// Execute a statement directly, without prepared-statement machinery.
    ///
    /// # Errors
    ///
    /// Returns the native [`StoreError`] on failure.
    async fn query(&mut self, mode: StatementMode, sql: &str)
        -> Result<StatementOutcome, StoreError>;

    /// Prepare the statement, bind `params` in order, and execute.
    ///
    /// # Errors
    ///
    /// Returns the native [`StoreError`] from prepare, bind, or execute.
    async fn query_prepared(
        &mut self,
        mode: StatementMode,
        sql: &str,
        params: &[Param],
    ) -> Result<StatementOutcome, StoreError>;

    /// Cheap round-trip liveness probe.
    ///
    /// # Errors
    ///
    /// Any error means "not live"; the caller reconnects.
    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Release the handle. Must be safe to call on an already-broken handle.
    async fn close(&mut self);
}

/// Dials new [`StoreHandle`]s. Shared by every worker as
/// `Arc<dyn StoreConnector>`.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Open a fresh handle for the given credentials.
    ///
    /// # Errors
    ///
    /// Returns the native [`StoreError`] when the store is unreachable or
    /// rejects the credentials.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn StoreHandle>, StoreError>;
}
