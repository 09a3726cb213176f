//! `sqlbus` core — the cross-thread protocol for the store access layer.
//!
//! Everything that crosses the boundary between the control thread and a
//! worker lives here as plain owned data: the [`Request`]/[`Response`]
//! envelope, the typed statement parameters ([`Param`]) with their wire
//! tags, the closed per-mode result type ([`QueryResult`]), and the error
//! taxonomy ([`OperationError`]).

pub mod error;
pub mod message;
pub mod param;
pub mod result;

pub use error::{OperationError, StoreError};
pub use message::{Request, Response, WorkerCommand};
pub use param::{classify_params, format_params, type_tags, Param};
pub use result::{QueryResult, Row};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
