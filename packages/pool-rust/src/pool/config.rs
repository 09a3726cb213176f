use std::time::Duration;

/// Pool-level configuration passed to the dispatcher at construction.
///
/// There is deliberately no process-wide state; everything the pool needs
/// to know arrives through this object.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of connection workers. Must be at least 1.
    pub worker_count: usize,
    /// Fixed sleep between reconnect attempts while the store is down.
    pub reconnect_backoff: Duration,
    /// Upper bound on how long `close()` waits for in-flight operations.
    pub drain_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            reconnect_backoff: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    /// Convenience constructor for the common "just pick a pool size" case.
    #[must_use]
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }
}
