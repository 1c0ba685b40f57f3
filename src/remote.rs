//! Remote data actor interface
//!
//! The remote actor owns authoritative survey state. This core only needs
//! the shape of its CRUD surface: enough to refetch invalidated views and to
//! wrap writes in the retry policy. Record schemas are opaque JSON.
//!
//! `MockRemote` is the in-memory test implementation, with failure
//! injection for exercising the retry classification paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FieldfareError, Result};

/// The kinds of survey entity the remote actor stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Species,
    Location,
    Media,
    Team,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Species => write!(f, "species"),
            EntityKind::Location => write!(f, "location"),
            EntityKind::Media => write!(f, "media"),
            EntityKind::Team => write!(f, "team"),
        }
    }
}

impl From<EntityKind> for crate::cache::Topic {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Species => crate::cache::Topic::Species,
            EntityKind::Location => crate::cache::Topic::Location,
            EntityKind::Media => crate::cache::Topic::Media,
            EntityKind::Team => crate::cache::Topic::Team,
        }
    }
}

/// Asynchronous CRUD surface of the remote data actor.
///
/// All operations can fail with permission or transport errors; transport
/// failures are transient and the retry policy may re-issue the call, so
/// writes are expected to be idempotent per key.
#[async_trait]
pub trait RemoteActor: Send + Sync {
    /// List all records of a kind.
    async fn list(&self, kind: EntityKind) -> Result<Value>;

    /// Fetch one record by key.
    async fn get(&self, kind: EntityKind, key: &str) -> Result<Value>;

    /// Create or update one record.
    async fn put(&self, kind: EntityKind, key: &str, record: Value) -> Result<Value>;

    /// Delete one record by key.
    async fn delete(&self, kind: EntityKind, key: &str) -> Result<()>;
}

/// In-memory remote actor for tests.
///
/// Failure injection: `fail_writes` arms the next N write operations to
/// fail with the given raw message, which is classified the same way a real
/// transport's messages would be.
#[derive(Default)]
pub struct MockRemote {
    records: RwLock<HashMap<(EntityKind, String), Value>>,
    failures_left: AtomicU64,
    failure_message: Mutex<Option<String>>,
    list_calls: AtomicU64,
    get_calls: AtomicU64,
    put_calls: AtomicU64,
    delete_calls: AtomicU64,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing failure injection.
    pub fn insert(&self, kind: EntityKind, key: impl Into<String>, record: Value) {
        self.records
            .write()
            .expect("records lock poisoned")
            .insert((kind, key.into()), record);
    }

    /// Arm the next `count` write operations to fail with `message`.
    pub fn fail_writes(&self, count: u64, message: impl Into<String>) {
        self.failures_left.store(count, Ordering::SeqCst);
        *self.failure_message.lock().expect("failure lock poisoned") = Some(message.into());
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u64 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<()> {
        loop {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(());
            }
            if self
                .failures_left
                .compare_exchange(left, left - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let message = self
                    .failure_message
                    .lock()
                    .expect("failure lock poisoned")
                    .clone()
                    .unwrap_or_else(|| "injected failure".to_string());
                return Err(FieldfareError::from_remote_message(message));
            }
        }
    }
}

#[async_trait]
impl RemoteActor for MockRemote {
    async fn list(&self, kind: EntityKind) -> Result<Value> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().expect("records lock poisoned");
        let mut values: Vec<(&String, &Value)> = records
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, key), value)| (key, value))
            .collect();
        values.sort_by(|a, b| a.0.cmp(b.0));
        Ok(Value::Array(
            values.into_iter().map(|(_, v)| v.clone()).collect(),
        ))
    }

    async fn get(&self, kind: EntityKind, key: &str) -> Result<Value> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .read()
            .expect("records lock poisoned")
            .get(&(kind, key.to_string()))
            .cloned()
            .ok_or_else(|| FieldfareError::Remote(format!("{} not found: {}", kind, key)))
    }

    async fn put(&self, kind: EntityKind, key: &str, record: Value) -> Result<Value> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        self.records
            .write()
            .expect("records lock poisoned")
            .insert((kind, key.to_string()), record.clone());
        Ok(record)
    }

    async fn delete(&self, kind: EntityKind, key: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        self.records
            .write()
            .expect("records lock poisoned")
            .remove(&(kind, key.to_string()));
        Ok(())
    }
}
