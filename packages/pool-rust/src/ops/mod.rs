//! Named operations executed by workers against their store connection.
//!
//! An operation translates its parameter list into exactly one
//! [`StoreConnection::execute`](crate::store::StoreConnection::execute)
//! call and shapes the return value; it performs no other I/O. Operations
//! are resolved by name through the [`OperationRegistry`], constructed
//! fresh per request, and an embedder can register its own.

pub mod operation;
pub mod raw;
pub mod registry;

pub use operation::{op_names, Operation};
pub use registry::{OperationFactory, OperationRegistry};
