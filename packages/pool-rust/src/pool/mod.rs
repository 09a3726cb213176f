//! The concurrency core: connection workers and the dispatching control
//! surface.
//!
//! 1. **Submission** (`dispatcher`): correlation ids, callback table,
//!    load-aware worker selection
//! 2. **Execution** (`worker`): per-worker FIFO batches against a private
//!    store connection, reconnect-on-failure
//! 3. **Configuration** (`config`): pool sizing and timing knobs

pub mod config;
pub mod dispatcher;
pub mod worker;

pub use config::PoolConfig;
pub use dispatcher::{Dispatcher, FailureCallback, SuccessCallback};

pub use crate::store::Credentials;
