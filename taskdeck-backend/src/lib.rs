//! Backend capabilities for Taskdeck.
//!
//! Defines the [`DocumentStore`] trait that all storage backends must
//! satisfy. The hosted document database sits behind this seam in
//! production; [`memory::MemoryStore`] is the in-process implementation
//! used by tests and the demo binary.
//!
//! The store never inspects domain meaning: documents are opaque JSON
//! objects keyed by an id the store assigns. Typed task handling happens
//! at higher layers.

pub mod auth;
pub mod memory;

use std::cmp::Ordering;

use serde_json::Value;
use tokio::sync::mpsc;

/// A stored record: the store-assigned id plus the JSON field object.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned record id.
    pub id: String,
    /// The document's fields. Always a JSON object.
    pub fields: Value,
}

/// Errors surfaced by a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the write (rules, auth).
    #[error("permission denied")]
    PermissionDenied,

    /// The referenced record does not exist.
    #[error("record not found: {collection}/{id}")]
    NotFound {
        /// Collection that was addressed.
        collection: String,
        /// Record id that was addressed.
        id: String,
    },

    /// The backend is unreachable or failed transiently.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A patch or field object was not a JSON object.
    #[error("malformed document payload: {0}")]
    MalformedPayload(String),
}

/// A field-equality predicate, the only filter shape the hosted store's
/// queries use here (`where field == value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    equals: Value,
}

impl Filter {
    /// Matches documents whose `field` equals `value`.
    #[must_use]
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: value.into(),
        }
    }

    /// Evaluates the predicate against a document's field object.
    #[must_use]
    pub fn matches(&self, fields: &Value) -> bool {
        fields.get(&self.field) == Some(&self.equals)
    }
}

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// A multi-key sort descriptor for one-shot queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, Direction)>,
}

impl Sort {
    /// Starts a sort with an ascending key.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), Direction::Ascending)],
        }
    }

    /// Appends an ascending key.
    #[must_use]
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), Direction::Ascending));
        self
    }

    /// Appends a descending key.
    #[must_use]
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), Direction::Descending));
        self
    }

    /// Compares two field objects under this descriptor.
    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.keys {
            let ord = compare_values(a.get(field), b.get(field));
            let ord = match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Total order over JSON scalar values: missing < null < bool < number
/// < string. Mixed-type fields stay deterministic instead of panicking.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A live result-set subscription.
///
/// The store pushes the full matching result set on registration and
/// again after every matching change. Dropping the subscription (or
/// calling [`unsubscribe`](Self::unsubscribe)) detaches it from the
/// store.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Builds a subscription from a snapshot channel and a cancel hook.
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<Vec<Document>>,
        cancel: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            rx,
            cancel: Some(cancel),
        }
    }

    /// Waits for the next full result-set snapshot.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn recv(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Returns an already-delivered snapshot without waiting, if one is
    /// queued.
    pub fn try_recv(&mut self) -> Option<Vec<Document>> {
        self.rx.try_recv().ok()
    }

    /// Explicitly detaches the subscription from the store.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Async document-store capability.
///
/// Mirrors the hosted database's client surface: single-record create
/// and update, an atomic multi-record batch, one-shot queries, and
/// snapshot-pushing subscriptions.
///
/// # Invariant
///
/// `batch_update` is all-or-nothing: a failed batch leaves every
/// addressed record unchanged. The core relies on this and never
/// reimplements it.
pub trait DocumentStore: Send + Sync {
    /// Creates a record and returns its store-assigned id.
    ///
    /// `fields` must be a JSON object; fields the caller left unset are
    /// simply absent from it.
    fn create(
        &self,
        collection: &str,
        fields: Value,
    ) -> impl std::future::Future<Output = Result<String, StoreError>> + Send;

    /// Applies a partial update to one record. Fields absent from the
    /// patch are left untouched; a `null` value clears the field.
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Applies partial updates to several records atomically.
    fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// One-shot query: all documents matching `filter`, ordered by
    /// `sort`.
    fn query(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &Sort,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, StoreError>> + Send;

    /// Registers a live subscription for documents matching `filter`.
    fn subscribe(&self, collection: &str, filter: Filter) -> Subscription;
}
