//! The operation contract and the built-in operation names.

use async_trait::async_trait;

use sqlbus_core::{OperationError, Param, QueryResult};

use crate::store::StoreConnection;

/// Names of the built-in operations, as registered and as sent on the wire.
pub mod op_names {
    pub const RAW_SELECT: &str = "raw_select";
    pub const RAW_SELECT_ONE: &str = "raw_select_one";
    pub const RAW_INSERT: &str = "raw_insert";
    pub const RAW_CHANGE: &str = "raw_change";
    pub const RAW_GENERIC: &str = "raw_generic";
    pub const SCHEMA_VERSION_CHECK: &str = "schema_version_check";
}

/// One named, stateless unit of work.
///
/// Implementations are constructed fresh per request by their registered
/// factory, so they carry no state between executions. The connection is
/// exclusively borrowed for the duration of the call; liveness is the
/// connection's concern, not the operation's.
#[async_trait]
pub trait Operation: Send {
    /// Run the operation against the worker's connection.
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidParams`] when the parameter list does not
    /// match the operation's shape, or whatever the statement execution
    /// reports.
    async fn execute(
        &self,
        connection: &mut StoreConnection,
        params: &[Param],
    ) -> Result<QueryResult, OperationError>;
}
