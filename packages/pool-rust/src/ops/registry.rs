//! Name-to-constructor registry for operations.

use std::sync::Arc;

use dashmap::DashMap;

use sqlbus_core::OperationError;

use super::operation::{op_names, Operation};
use super::raw::{
    RawChange, RawGeneric, RawInsert, RawSelect, RawSelectOne, SchemaVersionCheck,
};

/// Builds one fresh [`Operation`] per request.
pub type OperationFactory = Arc<dyn Fn() -> Box<dyn Operation> + Send + Sync>;

/// Registry mapping operation names to their constructors.
///
/// Shared by every worker as `Arc<OperationRegistry>`; an embedder can
/// extend it with custom operations at any time. Lookup misses fail with
/// [`OperationError::UnknownOperation`] rather than panicking a worker.
pub struct OperationRegistry {
    factories: DashMap<String, OperationFactory>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Creates a registry pre-populated with the built-in raw operations
    /// and the startup version check.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(op_names::RAW_SELECT, || Box::new(RawSelect));
        registry.register(op_names::RAW_SELECT_ONE, || Box::new(RawSelectOne));
        registry.register(op_names::RAW_INSERT, || Box::new(RawInsert));
        registry.register(op_names::RAW_CHANGE, || Box::new(RawChange));
        registry.register(op_names::RAW_GENERIC, || Box::new(RawGeneric));
        registry.register(op_names::SCHEMA_VERSION_CHECK, || {
            Box::new(SchemaVersionCheck)
        });
        registry
    }

    /// Register a constructor under `name`.
    ///
    /// An empty name is rejected at registration time. Re-registering an
    /// existing name replaces the previous constructor; the last
    /// registration wins.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Operation> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            tracing::warn!("ignoring operation registration with empty name");
            return;
        }
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(operation = %name, "operation registration replaced");
        }
    }

    /// Construct a fresh operation for `name`.
    ///
    /// # Errors
    ///
    /// [`OperationError::UnknownOperation`] when no constructor is
    /// registered under that name.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Operation>, OperationError> {
        // Clone the factory out so the map shard is not held while the
        // operation is constructed.
        let factory = self
            .factories
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| OperationError::UnknownOperation(name.to_string()))?;
        Ok(factory())
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use sqlbus_core::{Param, QueryResult};

    use crate::store::StoreConnection;

    use super::*;

    struct Marker(&'static str);

    #[async_trait]
    impl Operation for Marker {
        async fn execute(
            &self,
            _connection: &mut StoreConnection,
            _params: &[Param],
        ) -> Result<QueryResult, OperationError> {
            Ok(QueryResult::Scalar(serde_json::Value::String(
                self.0.to_string(),
            )))
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = OperationRegistry::with_builtins();
        for name in [
            op_names::RAW_SELECT,
            op_names::RAW_SELECT_ONE,
            op_names::RAW_INSERT,
            op_names::RAW_CHANGE,
            op_names::RAW_GENERIC,
            op_names::SCHEMA_VERSION_CHECK,
        ] {
            assert!(registry.resolve(name).is_ok(), "missing builtin {name}");
        }
    }

    #[test]
    fn unknown_name_fails_resolution() {
        let registry = OperationRegistry::new();
        match registry.resolve("nope") {
            Err(OperationError::UnknownOperation(name)) => assert_eq!(name, "nope"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("resolution unexpectedly succeeded"),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let registry = OperationRegistry::new();
        registry.register("", || Box::new(Marker("never")));
        assert!(registry.resolve("").is_err());
    }

    #[tokio::test]
    async fn replacement_takes_the_last_registration() {
        use crate::store::testing::{FakeScript, FakeStore};
        use crate::store::Credentials;

        let registry = OperationRegistry::new();
        registry.register("custom", || Box::new(Marker("first")));
        registry.register("custom", || Box::new(Marker("second")));

        let store = FakeStore::new(FakeScript::default());
        let mut connection = StoreConnection::new(
            store.connector(),
            Arc::new(Credentials::new("h", 1, "u", "p", "d")),
        );
        let operation = registry.resolve("custom").unwrap();
        let result = operation.execute(&mut connection, &[]).await.unwrap();
        assert_eq!(
            result,
            QueryResult::Scalar(serde_json::Value::String("second".to_string()))
        );
    }
}
