//! Error taxonomy shared between the control thread and workers.
//!
//! Failures inside a worker never cross the thread boundary as panics;
//! they are rendered into a failure [`Response`](crate::Response) carrying
//! the `Display` form of one of these errors. The variant decides whether
//! the owning worker tears down its connection afterwards.

use crate::param::Param;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Native error reported by the backing store driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} [{code}]")]
pub struct StoreError {
    /// Driver-specific error code, `0` when the driver reports none.
    pub code: u32,
    /// Driver-provided error text.
    pub message: String,
}

impl StoreError {
    /// Create a new store error from a native code and message.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while dispatching or executing an operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// The backing handle could not be established or verified. Retried by
    /// the worker loop; surfaced per-operation only when it happens
    /// mid-statement.
    #[error("connection error: {0}")]
    Connection(StoreError),

    /// Prepare, bind, or execute failed on an otherwise-live connection.
    /// Carries the literal statement and rendered parameters for diagnostics.
    #[error("query error: {source} (query=`{query}`,{params})")]
    Query {
        source: StoreError,
        query: String,
        params: String,
    },

    /// The requested operation name is not registered.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// A parameter value outside the supported string/float/integer set.
    #[error("unsupported parameter type `{0}`")]
    UnsupportedParameterType(&'static str),

    /// A registered operation received a parameter list it cannot interpret.
    #[error("invalid parameters for `{operation}`: {reason}")]
    InvalidParams {
        operation: String,
        reason: String,
    },
}

impl OperationError {
    /// Whether the worker must drop its connection after this failure.
    ///
    /// Execution failures force a reconnect so a wedged transaction cannot
    /// silently block every later statement on the same handle; lookup and
    /// parameter failures never touched the handle.
    #[must_use]
    pub fn forces_reconnect(&self) -> bool {
        matches!(
            self,
            OperationError::Connection(_) | OperationError::Query { .. }
        )
    }

    /// Build a [`OperationError::Query`] with the standard diagnostic rendering.
    #[must_use]
    pub fn query(source: StoreError, query: &str, params: &[Param]) -> Self {
        OperationError::Query {
            source,
            query: query.to_string(),
            params: format!(
                "types={},args={}",
                crate::param::type_tags(params),
                crate::param::format_params(params)
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_includes_code() {
        let err = StoreError::new(1045, "access denied");
        assert_eq!(err.to_string(), "access denied [1045]");
    }

    #[test]
    fn query_error_carries_statement_and_params() {
        let err = OperationError::query(
            StoreError::new(1064, "syntax error"),
            "SELECT * FROM t WHERE v = ?",
            &[Param::Int(5)],
        );
        let rendered = err.to_string();
        assert!(rendered.contains("SELECT * FROM t WHERE v = ?"));
        assert!(rendered.contains("types=i"));
        assert!(rendered.contains("args=0:5;"));
        assert!(rendered.contains("[1064]"));
    }

    #[test]
    fn reconnect_policy_per_variant() {
        assert!(OperationError::Connection(StoreError::new(2002, "down")).forces_reconnect());
        assert!(
            OperationError::query(StoreError::new(0, "bad"), "SELECT 1", &[]).forces_reconnect()
        );
        assert!(!OperationError::UnknownOperation("nope".to_string()).forces_reconnect());
        assert!(!OperationError::UnsupportedParameterType("bool").forces_reconnect());
        assert!(!OperationError::InvalidParams {
            operation: "raw_select".to_string(),
            reason: "missing statement text".to_string(),
        }
        .forces_reconnect());
    }
}
