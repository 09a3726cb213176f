//! Built-in raw statement operations.
//!
//! Each raw operation takes the statement text as its first parameter and
//! binds the remainder in order. Result shaping is the only logic here;
//! liveness, preparation, and error diagnostics all live in
//! [`StoreConnection`].

use async_trait::async_trait;

use sqlbus_core::{OperationError, Param, QueryResult};

use crate::store::{StatementMode, StoreConnection};

use super::operation::Operation;

/// Statement the version check issues against the store.
const VERSION_QUERY: &str = "SELECT VERSION() AS version";

/// Split a raw parameter list into statement text and bind arguments.
fn split_statement<'p>(
    operation: &str,
    params: &'p [Param],
) -> Result<(&'p str, &'p [Param]), OperationError> {
    match params.split_first() {
        Some((Param::Str(query), args)) => Ok((query, args)),
        Some(_) => Err(OperationError::InvalidParams {
            operation: operation.to_string(),
            reason: "first parameter must be the statement text".to_string(),
        }),
        None => Err(OperationError::InvalidParams {
            operation: operation.to_string(),
            reason: "missing statement text".to_string(),
        }),
    }
}

/// Row-returning statement; resolves to [`QueryResult::Rows`].
pub struct RawSelect;

#[async_trait]
impl Operation for RawSelect {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let (query, args) = split_statement(super::op_names::RAW_SELECT, params)?;
        connection.execute(StatementMode::Select, query, args).await
    }
}

/// Select that keeps only the first row; resolves to [`QueryResult::Row`].
pub struct RawSelectOne;

#[async_trait]
impl Operation for RawSelectOne {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let rows = RawSelect
            .execute(connection, params)
            .await?
            .into_rows()
            .unwrap_or_default();
        Ok(QueryResult::Row(rows.into_iter().next()))
    }
}

/// Insert; resolves to [`QueryResult::Insert`] with the generated id.
pub struct RawInsert;

#[async_trait]
impl Operation for RawInsert {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let (query, args) = split_statement(super::op_names::RAW_INSERT, params)?;
        connection.execute(StatementMode::Insert, query, args).await
    }
}

/// Update/delete; resolves to [`QueryResult::Change`].
pub struct RawChange;

#[async_trait]
impl Operation for RawChange {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let (query, args) = split_statement(super::op_names::RAW_CHANGE, params)?;
        connection.execute(StatementMode::Change, query, args).await
    }
}

/// Fire-and-check statement; resolves to [`QueryResult::Generic`].
pub struct RawGeneric;

#[async_trait]
impl Operation for RawGeneric {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let (query, args) = split_statement(super::op_names::RAW_GENERIC, params)?;
        connection.execute(StatementMode::Generic, query, args).await
    }
}

/// Startup probe reporting the store's server version as a scalar.
pub struct SchemaVersionCheck;

#[async_trait]
impl Operation for SchemaVersionCheck {
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        _params: &[Param],
    ) -> Result<QueryResult, OperationError> {
        let rows = connection
            .execute(StatementMode::Select, VERSION_QUERY, &[])
            .await?
            .into_rows()
            .unwrap_or_default();
        let version = rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("version"))
            .unwrap_or(serde_json::Value::Null);
        Ok(QueryResult::Scalar(version))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
