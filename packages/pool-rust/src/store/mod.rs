//! Store boundary: the driver traits, dial credentials, and the
//! per-worker persistent connection.
//!
//! - [`StoreHandle`] / [`StoreConnector`]: the opaque driver interface the
//!   embedder implements for its relational store
//! - [`Credentials`]: read-only dial configuration shared by every worker
//! - [`StoreConnection`]: owns one handle, self-heals it before every
//!   statement

pub mod connection;
pub mod credentials;
pub mod handle;

pub use connection::StoreConnection;
pub use credentials::Credentials;
pub use handle::{StatementMode, StatementOutcome, StoreConnector, StoreHandle};

#[cfg(test)]
pub(crate) mod testing;
