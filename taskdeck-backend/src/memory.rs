//! In-memory document store.
//!
//! Backs tests and the demo binary with the same [`DocumentStore`]
//! surface the hosted database exposes: JSON documents per collection,
//! atomic batches, and subscriptions that push the full matching result
//! set on every relevant change (and once at registration).
//!
//! Writes can be made to fail on demand via
//! [`set_fail_writes`](MemoryStore::set_fail_writes), which is how the
//! rollback path is exercised without a real backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Document, DocumentStore, Filter, Sort, StoreError, Subscription};

struct Subscriber {
    id: u64,
    collection: String,
    filter: Filter,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

struct Inner {
    /// Collection name -> (record id -> field object). `BTreeMap` keeps
    /// snapshot iteration deterministic.
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_subscriber_id: AtomicU64,
    fail_writes: AtomicBool,
}

/// In-memory [`DocumentStore`] implementation.
///
/// Cheap to clone; clones share the same underlying state, so a test can
/// keep one handle for assertions while the session under test owns
/// another.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                subscribers: RwLock::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(0),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`]
    /// until switched back off. Reads and subscriptions are unaffected.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a record's current fields, if it exists.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.inner
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of records in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether a collection holds no records.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }

    /// Current result set for one subscriber's filter, in id order.
    fn snapshot_for(
        collections: &HashMap<String, BTreeMap<String, Value>>,
        collection: &str,
        filter: &Filter,
    ) -> Vec<Document> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| filter.matches(fields))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pushes fresh snapshots to every subscriber whose result set the
    /// touched documents could have changed (matching before or after
    /// the write). Dead subscribers are pruned as a side effect.
    fn notify(&self, collection: &str, touched: &[(Option<Value>, Value)]) {
        let collections = self.inner.collections.read();
        let mut subscribers = self.inner.subscribers.write();
        subscribers.retain(|sub| {
            if sub.collection != collection {
                return true;
            }
            let relevant = touched.iter().any(|(before, after)| {
                before.as_ref().is_some_and(|b| sub.filter.matches(b)) || sub.filter.matches(after)
            });
            if !relevant {
                return true;
            }
            let snapshot = Self::snapshot_for(&collections, collection, &sub.filter);
            sub.tx.send(snapshot).is_ok()
        });
    }

    fn remove_subscriber(&self, id: u64) {
        self.inner.subscribers.write().retain(|sub| sub.id != id);
    }

    /// Number of live subscribers, for tests.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        self.ensure_writable()?;
        if !fields.is_object() {
            return Err(StoreError::MalformedPayload(
                "create fields must be a JSON object".to_string(),
            ));
        }

        let id = Uuid::now_v7().to_string();
        {
            let mut collections = self.inner.collections.write();
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields.clone());
        }
        tracing::debug!(collection, id, "record created");
        self.notify(collection, &[(None, fields)]);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let Some(patch_obj) = patch.as_object() else {
            return Err(StoreError::MalformedPayload(
                "update patch must be a JSON object".to_string(),
            ));
        };

        let (before, after) = {
            let mut collections = self.inner.collections.write();
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            let before = doc.clone();
            if let Some(obj) = doc.as_object_mut() {
                for (key, value) in patch_obj {
                    obj.insert(key.clone(), value.clone());
                }
            }
            (before, doc.clone())
        };
        tracing::debug!(collection, id, "record updated");
        self.notify(collection, &[(Some(before), after)]);
        Ok(())
    }

    async fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        if updates.is_empty() {
            return Ok(());
        }

        let touched = {
            let mut collections = self.inner.collections.write();
            let docs =
                collections
                    .get_mut(collection)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: collection.to_string(),
                        id: updates[0].0.clone(),
                    })?;

            // Validate the whole batch before touching anything, so a
            // failed batch leaves every record unchanged.
            for (id, patch) in &updates {
                if !patch.is_object() {
                    return Err(StoreError::MalformedPayload(
                        "batch patch must be a JSON object".to_string(),
                    ));
                }
                if !docs.contains_key(id) {
                    return Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        id: id.clone(),
                    });
                }
            }

            let mut touched = Vec::with_capacity(updates.len());
            for (id, patch) in &updates {
                if let Some(doc) = docs.get_mut(id) {
                    let before = doc.clone();
                    if let (Some(obj), Some(patch_obj)) = (doc.as_object_mut(), patch.as_object()) {
                        for (key, value) in patch_obj {
                            obj.insert(key.clone(), value.clone());
                        }
                    }
                    touched.push((Some(before), doc.clone()));
                }
            }
            touched
        };
        tracing::debug!(collection, count = updates.len(), "batch applied");
        self.notify(collection, &touched);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &Sort,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.inner.collections.read();
        let mut results = Self::snapshot_for(&collections, collection, filter);
        drop(collections);
        results.sort_by(|a, b| sort.compare(&a.fields, &b.fields));
        Ok(results)
    }

    fn subscribe(&self, collection: &str, filter: Filter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);

        // Initial snapshot fires immediately, like the hosted store's
        // listeners.
        let initial = {
            let collections = self.inner.collections.read();
            Self::snapshot_for(&collections, collection, &filter)
        };
        let _ = tx.send(initial);

        self.inner.subscribers.write().push(Subscriber {
            id,
            collection: collection.to_string(),
            filter,
            tx,
        });

        let store = self.clone();
        Subscription::new(rx, Box::new(move || store.remove_subscriber(id)))
    }
}
