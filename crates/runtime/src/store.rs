//! Opaque document store boundary.
//!
//! Persistence and synchronization of sheet data live outside the core; the
//! engine only sees this trait. Patches are applied atomically per call with
//! no cross-call transaction, so the engine always re-derives from its own
//! in-memory state rather than reading back what it just wrote.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Result, RuntimeError};

/// Key of a stored document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocId(pub String);

impl DocId {
    pub fn actor(id: rules_core::ActorId) -> Self {
        Self(format!("actor:{}", id.0))
    }
}

/// The store contract: plain structured records in, patches out.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &DocId) -> Result<Option<Value>>;

    /// Merge a patch into the document, creating it if absent. `null` values
    /// in the patch delete the corresponding key.
    async fn update(&self, id: &DocId, patch: Value) -> Result<()>;

    /// Append embedded records under the given collection key.
    async fn create_embedded(&self, id: &DocId, kind: &str, records: Vec<Value>) -> Result<()>;

    /// Remove embedded records whose `"id"` field matches one of `keys`.
    async fn delete_embedded(&self, id: &DocId, kind: &str, keys: Vec<String>) -> Result<()>;
}

/// In-memory store used by tests and single-process tables.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocId, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &DocId) -> Result<Option<Value>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn update(&self, id: &DocId, patch: Value) -> Result<()> {
        let mut documents = self.documents.write().await;
        let entry = documents
            .entry(id.clone())
            .or_insert_with(|| Value::Object(Default::default()));
        merge_patch(entry, patch);
        Ok(())
    }

    async fn create_embedded(&self, id: &DocId, kind: &str, records: Vec<Value>) -> Result<()> {
        let mut documents = self.documents.write().await;
        let entry = documents
            .entry(id.clone())
            .or_insert_with(|| Value::Object(Default::default()));
        let object = entry
            .as_object_mut()
            .ok_or_else(|| RuntimeError::StoreError(format!("{} is not an object", id.0)))?;
        let collection = object
            .entry(kind.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let array = collection
            .as_array_mut()
            .ok_or_else(|| RuntimeError::StoreError(format!("{}.{kind} is not an array", id.0)))?;
        array.extend(records);
        Ok(())
    }

    async fn delete_embedded(&self, id: &DocId, kind: &str, keys: Vec<String>) -> Result<()> {
        let mut documents = self.documents.write().await;
        let Some(array) = documents
            .get_mut(id)
            .and_then(|entry| entry.get_mut(kind))
            .and_then(Value::as_array_mut)
        else {
            // Deleting from a missing document or collection is the same
            // stale-reference tolerance the engine applies everywhere.
            return Ok(());
        };
        array.retain(|record| {
            record
                .get("id")
                .and_then(Value::as_str)
                .is_none_or(|key| !keys.iter().any(|candidate| candidate == key))
        });
        Ok(())
    }
}

/// RFC 7396 style merge: objects merge recursively, `null` deletes, anything
/// else replaces.
fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(Default::default());
            }
            let object = target.as_object_mut().expect("just ensured object");
            for (key, value) in entries {
                if value.is_null() {
                    object.remove(&key);
                } else {
                    merge_patch(
                        object.entry(key).or_insert(Value::Null),
                        value,
                    );
                }
            }
        }
        other => *target = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_merges_and_null_deletes() {
        let store = MemoryStore::new();
        let id = DocId("actor:1".into());
        store
            .update(&id, json!({"hp": {"value": 10, "max": 12}}))
            .await
            .unwrap();
        store
            .update(&id, json!({"hp": {"value": 8}, "name": "Bran"}))
            .await
            .unwrap();
        store.update(&id, json!({"name": null})).await.unwrap();

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc, json!({"hp": {"value": 8, "max": 12}}));
    }

    #[tokio::test]
    async fn embedded_records_append_and_delete_by_id() {
        let store = MemoryStore::new();
        let id = DocId("actor:1".into());
        store
            .create_embedded(
                &id,
                "items",
                vec![json!({"id": "sword", "qty": 1}), json!({"id": "potion", "qty": 3})],
            )
            .await
            .unwrap();
        store
            .delete_embedded(&id, "items", vec!["potion".into()])
            .await
            .unwrap();

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc["items"], json!([{"id": "sword", "qty": 1}]));
    }

    #[tokio::test]
    async fn deleting_from_a_missing_document_is_a_no_op() {
        let store = MemoryStore::new();
        let id = DocId("actor:9".into());
        store
            .delete_embedded(&id, "items", vec!["sword".into()])
            .await
            .unwrap();
        assert_eq!(store.get(&id).await.unwrap(), None);
    }
}
