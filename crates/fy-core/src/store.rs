//! Enablement Store
//!
//! One persisted boolean, `enabled`, in the local (non-synced) storage area.
//! An absent key reads as `true`. The store is the only place that knows the
//! key and the default, so every context that needs the flag goes through it
//! rather than reading storage directly.
//!
//! The backend is a trait so the browser's `storage.local` and an in-memory
//! map can be swapped freely. Change notifications carry the storage area,
//! and the store drops events from other areas or for other keys.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

/// Storage key of the enabled flag.
pub const ENABLED_KEY: &str = "enabled";

/// Value used when the flag is absent or unreadable.
pub const DEFAULT_ENABLED: bool = true;

/// Error type for storage access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid stored value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

// =============================================================================
// Storage Backend
// =============================================================================

/// Storage area a change event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Sync,
    Session,
    Managed,
}

impl StorageArea {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "local" => Some(Self::Local),
            "sync" => Some(Self::Sync),
            "session" => Some(Self::Session),
            "managed" => Some(Self::Managed),
            _ => None,
        }
    }
}

/// One key's change, as reported by the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

pub type StorageListener = Rc<dyn Fn(StorageArea, &[StorageChange])>;

/// Key-value storage shared between execution contexts.
#[async_trait(?Send)]
pub trait StorageBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Register for change events from every area.
    fn subscribe(&self, listener: StorageListener);
}

// =============================================================================
// In-Memory Backend
// =============================================================================

/// Local-area storage kept in memory.
///
/// Fires change events only when a value actually changes, like the
/// browser's storage does.
#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, Value>>,
    listeners: RefCell<Vec<StorageListener>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without firing change events.
    pub fn with_value(self, key: &str, value: Value) -> Self {
        self.values.borrow_mut().insert(key.to_string(), value);
        self
    }

    /// Deliver a change event as if it came from another context or area.
    pub fn emit(&self, area: StorageArea, changes: &[StorageChange]) {
        if area == StorageArea::Local {
            let mut values = self.values.borrow_mut();
            for change in changes {
                match &change.new_value {
                    Some(value) => values.insert(change.key.clone(), value.clone()),
                    None => values.remove(&change.key),
                };
            }
        }
        self.notify(area, changes);
    }

    fn notify(&self, area: StorageArea, changes: &[StorageChange]) {
        let listeners: Vec<StorageListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(area, changes);
        }
    }
}

#[async_trait(?Send)]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let old_value = self.values.borrow_mut().insert(key.to_string(), value.clone());
        if old_value.as_ref() == Some(&value) {
            return Ok(());
        }
        let change = StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value),
        };
        self.notify(StorageArea::Local, std::slice::from_ref(&change));
        Ok(())
    }

    fn subscribe(&self, listener: StorageListener) {
        self.listeners.borrow_mut().push(listener);
    }
}

// =============================================================================
// Enablement Store
// =============================================================================

/// Typed access to the persisted enabled flag.
#[derive(Clone)]
pub struct EnablementStore {
    backend: Rc<dyn StorageBackend>,
}

impl EnablementStore {
    pub fn new(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Current flag. Absent or unreadable storage reads as enabled.
    pub async fn get(&self) -> bool {
        match self.stored().await {
            Ok(Some(enabled)) => enabled,
            Ok(None) => DEFAULT_ENABLED,
            Err(err) => {
                warn!(target: "store", "Could not read storage; assuming enabled: {}", err);
                DEFAULT_ENABLED
            }
        }
    }

    /// Raw stored flag, `None` when the key was never written.
    pub async fn stored(&self) -> Result<Option<bool>, StoreError> {
        let value = self.backend.get(ENABLED_KEY).await?;
        Ok(value.as_ref().map(flag_from_value))
    }

    pub async fn set(&self, enabled: bool) -> Result<(), StoreError> {
        self.backend.set(ENABLED_KEY, Value::Bool(enabled)).await
    }

    /// Call `callback` with the new flag whenever the local `enabled` key
    /// changes, from this context or any other.
    pub fn on_change(&self, callback: impl Fn(bool) + 'static) {
        self.backend.subscribe(Rc::new(move |area: StorageArea, changes: &[StorageChange]| {
            if let Some(enabled) = Self::interpret_change(area, changes) {
                callback(enabled);
            }
        }));
    }

    /// New flag carried by a change event, or `None` when the event is for
    /// another area or another key.
    pub fn interpret_change(area: StorageArea, changes: &[StorageChange]) -> Option<bool> {
        if area != StorageArea::Local {
            debug!(target: "store", "Ignoring {:?} storage change", area);
            return None;
        }
        let change = changes.iter().find(|c| c.key == ENABLED_KEY)?;
        Some(
            change
                .new_value
                .as_ref()
                .map_or(DEFAULT_ENABLED, flag_from_value),
        )
    }
}

/// Anything but an explicit `false` counts as enabled.
fn flag_from_value(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct UnavailableStorage;

    #[async_trait(?Send)]
    impl StorageBackend for UnavailableStorage {
        async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("storage offline".into()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("storage offline".into()))
        }

        fn subscribe(&self, _listener: StorageListener) {}
    }

    fn change(key: &str, new_value: Option<Value>) -> StorageChange {
        StorageChange {
            key: key.to_string(),
            old_value: None,
            new_value,
        }
    }

    #[tokio::test]
    async fn fresh_install_reads_enabled() {
        let store = EnablementStore::new(Rc::new(MemoryStorage::new()));
        assert!(store.get().await);
        assert_eq!(store.stored().await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_false_then_get() {
        let store = EnablementStore::new(Rc::new(MemoryStorage::new()));
        store.set(false).await.unwrap();
        assert!(!store.get().await);
        assert_eq!(store.stored().await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn listener_fires_once_with_new_value() {
        let store = EnablementStore::new(Rc::new(MemoryStorage::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.on_change(move |enabled| sink.borrow_mut().push(enabled));

        store.set(false).await.unwrap();
        assert_eq!(*seen.borrow(), vec![false]);
    }

    #[tokio::test]
    async fn unchanged_write_does_not_notify() {
        let backend = Rc::new(MemoryStorage::new().with_value(ENABLED_KEY, Value::Bool(true)));
        let store = EnablementStore::new(backend);
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        store.on_change(move |_| counter.set(counter.get() + 1));

        store.set(true).await.unwrap();
        assert_eq!(count.get(), 0);
    }

    #[tokio::test]
    async fn changes_from_another_context_are_observed() {
        let backend = Rc::new(MemoryStorage::new());
        let store = EnablementStore::new(backend.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.on_change(move |enabled| sink.borrow_mut().push(enabled));

        backend.emit(StorageArea::Local, &[change(ENABLED_KEY, Some(Value::Bool(false)))]);
        assert_eq!(*seen.borrow(), vec![false]);
        assert!(!store.get().await);
    }

    #[tokio::test]
    async fn other_areas_and_keys_are_ignored() {
        let backend = Rc::new(MemoryStorage::new());
        let store = EnablementStore::new(backend.clone());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        store.on_change(move |_| counter.set(counter.get() + 1));

        backend.emit(StorageArea::Sync, &[change(ENABLED_KEY, Some(Value::Bool(false)))]);
        backend.emit(StorageArea::Local, &[change("theme", Some(Value::from("dark")))]);
        assert_eq!(count.get(), 0);
        assert!(store.get().await);
    }

    #[tokio::test]
    async fn unavailable_storage_defaults_to_enabled() {
        let store = EnablementStore::new(Rc::new(UnavailableStorage));
        assert!(store.get().await);
        assert!(store.set(false).await.is_err());
    }

    #[test]
    fn removed_key_reads_as_enabled() {
        let enabled = EnablementStore::interpret_change(StorageArea::Local, &[change(ENABLED_KEY, None)]);
        assert_eq!(enabled, Some(true));
    }

    #[test]
    fn non_boolean_values_count_as_enabled() {
        assert!(flag_from_value(&Value::Null));
        assert!(flag_from_value(&Value::from(0)));
        assert!(!flag_from_value(&Value::Bool(false)));
    }

    #[test]
    fn area_names() {
        assert_eq!(StorageArea::from_name("local"), Some(StorageArea::Local));
        assert_eq!(StorageArea::from_name("sync"), Some(StorageArea::Sync));
        assert_eq!(StorageArea::from_name("bogus"), None);
    }
}
