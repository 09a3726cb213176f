//! Persistent, self-healing connection to the backing store.

use std::sync::Arc;

use sqlbus_core::{OperationError, Param, QueryResult, StoreError};

use super::credentials::Credentials;
use super::handle::{StatementMode, StoreConnector, StoreHandle};

/// Owns one store handle on behalf of a single worker.
///
/// Connects lazily on first use; every statement re-verifies liveness
/// first, so a handle that died between batches is replaced before the
/// statement runs instead of failing it.
pub struct StoreConnection {
    connector: Arc<dyn StoreConnector>,
    credentials: Arc<Credentials>,
    handle: Option<Box<dyn StoreHandle>>,
}

impl StoreConnection {
    /// Create an unconnected instance; the first statement dials.
    #[must_use]
    pub fn new(connector: Arc<dyn StoreConnector>, credentials: Arc<Credentials>) -> Self {
        Self {
            connector,
            credentials,
            handle: None,
        }
    }

    /// Whether a handle currently exists (it may still be dead).
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Drop any existing handle and dial a fresh one.
    ///
    /// # Errors
    ///
    /// [`OperationError::Connection`] with the native code/message when the
    /// dial fails.
    pub async fn connect(&mut self) -> Result<(), OperationError> {
        if let Some(mut stale) = self.handle.take() {
            stale.close().await;
        }
        let handle = self
            .connector
            .connect(&self.credentials)
            .await
            .map_err(OperationError::Connection)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Make sure a live handle exists, reconnecting when the probe fails.
    ///
    /// A probe error is treated as "not live", never propagated.
    ///
    /// # Errors
    ///
    /// [`OperationError::Connection`] when reconnecting fails.
    pub async fn ensure_live(&mut self) -> Result<(), OperationError> {
        if let Some(handle) = self.handle.as_mut() {
            if handle.ping().await.is_ok() {
                return Ok(());
            }
        }
        self.connect().await
    }

    /// Execute one statement and shape its outcome per mode.
    ///
    /// Empty `params` run the statement directly; otherwise it is
    /// prepared and the parameters bound in order.
    ///
    /// # Errors
    ///
    /// [`OperationError::Connection`] when no live handle could be
    /// established, or [`OperationError::Query`] carrying the literal
    /// statement and parameters when the driver fails it.
    pub async fn execute(
        &mut self,
        mode: StatementMode,
        query: &str,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        self.ensure_live().await?;
        let handle = self.handle.as_mut().ok_or_else(|| {
            OperationError::Connection(StoreError::new(0, "no live handle after reconnect"))
        })?;

        let outcome = if params.is_empty() {
            handle.query(mode, query).await
        } else {
            handle.query_prepared(mode, query, params).await
        }
        .map_err(|source| OperationError::query(source, query, params))?;

        Ok(match mode {
            StatementMode::Select => QueryResult::Rows(outcome.rows),
            StatementMode::Insert => QueryResult::Insert {
                affected_rows: outcome.affected_rows,
                insert_id: outcome.insert_id,
            },
            StatementMode::Change => QueryResult::Change {
                affected_rows: outcome.affected_rows,
            },
            StatementMode::Generic => QueryResult::Generic,
        })
    }

    /// Release the handle if present. Idempotent; errors are swallowed by
    /// the driver's `close`.
    pub async fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
