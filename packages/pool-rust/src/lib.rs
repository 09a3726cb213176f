//! `sqlbus` pool — asynchronous access layer over a relational store.
//!
//! Callers submit named operations with parameters from a single control
//! context; a pool of workers executes them against private store
//! connections and resolves a success or failure callback exactly once
//! per operation.
//!
//! The moving parts, leaves first:
//!
//! - **Store handle** ([`store::StoreHandle`] / [`store::StoreConnector`]):
//!   the embedder-supplied driver boundary
//! - **`StoreConnection`** ([`store::StoreConnection`]): one persistent,
//!   liveness-checked handle owned by exactly one worker
//! - **Operations** ([`ops`]): named, stateless units of work resolved
//!   through a registry
//! - **Worker / Dispatcher** ([`pool`]): the concurrency core — queues,
//!   correlation ids, load-aware routing, reconnection

pub mod ops;
pub mod pool;
pub mod store;

pub use ops::{op_names, Operation, OperationRegistry};
pub use pool::{Credentials, Dispatcher, FailureCallback, PoolConfig, SuccessCallback};
pub use sqlbus_core::{
    OperationError, Param, QueryResult, Request, Response, Row, StoreError, WorkerCommand,
};
pub use store::{StatementMode, StatementOutcome, StoreConnection, StoreConnector, StoreHandle};
