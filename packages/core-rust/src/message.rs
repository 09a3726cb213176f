//! Request/response envelope crossing the worker thread boundary.
//!
//! Both directions travel as owned, immutable values through the queues;
//! nothing in an envelope is ever shared by reference between threads.
//! The types also derive `Serialize`/`Deserialize` so the same envelope
//! can cross a process boundary unchanged.

use serde::{Deserialize, Serialize};

use crate::param::Param;
use crate::result::QueryResult;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One submitted operation, created by the dispatcher and consumed by
/// exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id, globally unique and never reused.
    pub id: u64,
    /// Registered operation name to resolve on the worker.
    pub operation: String,
    /// Ordered, already-classified bind parameters.
    pub params: Vec<Param>,
}

impl Request {
    /// Create a request envelope.
    pub fn new(id: u64, operation: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            id,
            operation: operation.into(),
            params,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Outcome of one request, created by a worker and consumed by the
/// dispatcher's drain pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the originating request.
    pub id: u64,
    /// Present on success, absent on failure.
    pub result: Option<QueryResult>,
    /// Whether this response resolves the failure callback.
    pub is_error: bool,
    /// Failure detail; empty on success.
    pub error_message: String,
}

impl Response {
    /// Successful outcome for the given correlation id.
    #[must_use]
    pub fn success(id: u64, result: QueryResult) -> Self {
        Self {
            id,
            result: Some(result),
            is_error: false,
            error_message: String::new(),
        }
    }

    /// Failed outcome carrying the error text.
    pub fn failure(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            is_error: true,
            error_message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerCommand
// ---------------------------------------------------------------------------

/// Everything a worker can pull off its inbound queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerCommand {
    /// Execute a submitted request and produce a response.
    Execute(Request),
    /// Housekeeping hint; processed without producing a response.
    CollectGarbage,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
