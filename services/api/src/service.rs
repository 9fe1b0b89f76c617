//! Generic collection service
//!
//! One service instance per entity type wraps the document store and
//! carries the full write pipeline: validation, read-only field
//! sanitisation, lifecycle hooks, and private field stripping. Route
//! handlers stay thin; they extract, authorise, and delegate here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use common::store::{DocumentStore, FilterClause, ListQuery};

use crate::error::{ApiError, ApiResult};

/// An entity type stored in its own collection
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table the documents live in
    const COLLECTION: &'static str;
    /// Singular name used in responses and error messages
    const SINGULAR: &'static str;
    /// Fields a client patch may never touch
    const READ_ONLY_FIELDS: &'static [&'static str];
    /// Fields stripped from every outgoing document
    const PRIVATE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;

    /// Owning principal, when the type has one
    fn owner(&self) -> Option<Uuid> {
        None
    }

    /// Parent entity, when the type is a child in an aggregate relation
    fn parent(&self) -> Option<Uuid> {
        None
    }

    fn validate(&self) -> ApiResult<()> {
        Ok(())
    }
}

/// Lifecycle hooks fired around writes. Hooks run after the primary write
/// commits; a hook failure surfaces to the caller but does not roll the
/// write back.
#[async_trait]
pub trait WriteHooks<R: Resource>: Send + Sync {
    /// Runs after validation, before the insert
    async fn before_create(&self, store: &DocumentStore, entity: &mut R) -> ApiResult<()> {
        let _ = (store, entity);
        Ok(())
    }

    /// Runs after a create or update persisted
    async fn after_write(&self, store: &DocumentStore, entity: &R) -> ApiResult<()> {
        let _ = (store, entity);
        Ok(())
    }

    /// Runs after a delete persisted, with the removed entity
    async fn after_delete(&self, store: &DocumentStore, entity: &R) -> ApiResult<()> {
        let _ = (store, entity);
        Ok(())
    }
}

/// Inline expansion of a relation when fetching a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    None,
    /// Embed child documents under `key`, matched by their foreign key
    Children {
        collection: &'static str,
        foreign_key: &'static str,
        key: &'static str,
    },
    /// Replace the id under `field` with the parent document, narrowed
    /// to the selected fields
    Parent {
        collection: &'static str,
        field: &'static str,
        select: &'static [&'static str],
    },
}

/// Hook set for types with no write side effects
pub struct NoHooks;

#[async_trait]
impl<R: Resource> WriteHooks<R> for NoHooks {}

/// CRUD service over one collection
pub struct CollectionService<R: Resource> {
    store: DocumentStore,
    hooks: Arc<dyn WriteHooks<R>>,
}

impl<R: Resource> Clone for CollectionService<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<R: Resource> CollectionService<R> {
    pub fn new(store: DocumentStore, hooks: impl WriteHooks<R> + 'static) -> Self {
        Self {
            store,
            hooks: Arc::new(hooks),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Execute a list query, stripping private fields from the results
    pub async fn list(&self, query: &ListQuery) -> ApiResult<Vec<Value>> {
        let mut docs = self.store.find(R::COLLECTION, query).await?;
        for doc in &mut docs {
            strip_private::<R>(doc);
        }
        Ok(docs)
    }

    /// Fetch one entity by id
    pub async fn get(&self, id: Uuid) -> ApiResult<R> {
        let doc = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound(R::SINGULAR))?;
        decode_stored(doc)
    }

    /// Fetch one document by id for the response body, optionally
    /// embedding its children
    pub async fn get_doc(&self, id: Uuid, populate: Populate) -> ApiResult<Value> {
        let mut doc = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound(R::SINGULAR))?;
        strip_private::<R>(&mut doc);

        match populate {
            Populate::None => {}
            Populate::Children {
                collection,
                foreign_key,
                key,
            } => {
                let children = self
                    .store
                    .find_where(collection, &[FilterClause::eq_id(foreign_key, id)])
                    .await?;
                if let Value::Object(map) = &mut doc {
                    map.insert(key.to_string(), Value::Array(children));
                }
            }
            Populate::Parent {
                collection,
                field,
                select,
            } => {
                let parent_id = doc
                    .get(field)
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<Uuid>().ok());
                if let Some(parent_id) = parent_id {
                    if let Some(mut parent) = self.store.find_by_id(collection, parent_id).await? {
                        if let Value::Object(map) = &mut parent {
                            map.retain(|k, _| k == "id" || select.contains(&k.as_str()));
                        }
                        if let Value::Object(map) = &mut doc {
                            map.insert(field.to_string(), parent);
                        }
                    }
                }
            }
        }
        Ok(doc)
    }

    /// Validate and insert a new entity, running create hooks
    pub async fn create(&self, mut entity: R) -> ApiResult<Value> {
        entity.validate()?;
        self.hooks.before_create(&self.store, &mut entity).await?;
        entity.validate()?;

        let doc = encode(&entity)?;
        let mut stored = self.store.insert(R::COLLECTION, entity.id(), &doc).await?;
        self.hooks.after_write(&self.store, &entity).await?;

        strip_private::<R>(&mut stored);
        Ok(stored)
    }

    /// Merge a client patch into an existing entity. Read-only fields are
    /// silently dropped from the patch; the merged result is decoded back
    /// through the entity type, so unknown fields do not persist either.
    pub async fn update(&self, id: Uuid, patch: Value) -> ApiResult<Value> {
        let patch = sanitize_patch::<R>(patch)?;
        let current = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound(R::SINGULAR))?;

        let merged = merge(current, patch);
        let entity: R = serde_json::from_value(merged)
            .map_err(|e| ApiError::Validation(format!("Invalid input data: {e}")))?;
        entity.validate()?;

        let doc = encode(&entity)?;
        let mut stored = self
            .store
            .replace(R::COLLECTION, id, &doc)
            .await?
            .ok_or(ApiError::NotFound(R::SINGULAR))?;
        self.hooks.after_write(&self.store, &entity).await?;

        strip_private::<R>(&mut stored);
        Ok(stored)
    }

    /// Delete an entity, running delete hooks with the removed value
    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let entity = self.get(id).await?;
        if !self.store.delete(R::COLLECTION, id).await? {
            return Err(ApiError::NotFound(R::SINGULAR));
        }
        self.hooks.after_delete(&self.store, &entity).await?;
        Ok(())
    }

    /// Merge a patch into every entity matching the filters, then fire the
    /// write hook for each affected entity. Affected ids are captured
    /// before the mutation, so entities that stop matching still get their
    /// hooks.
    pub async fn update_many(&self, filters: &[FilterClause], patch: Value) -> ApiResult<u64> {
        let patch = sanitize_patch::<R>(patch)?;
        let ids = self.store.update_where(R::COLLECTION, filters, &patch).await?;
        for id in &ids {
            let entity = self.get(*id).await?;
            self.hooks.after_write(&self.store, &entity).await?;
        }
        Ok(ids.len() as u64)
    }
}

fn encode<R: Resource>(entity: &R) -> ApiResult<Value> {
    serde_json::to_value(entity).map_err(|e| ApiError::Internal(e.into()))
}

fn decode_stored<R: Resource>(doc: Value) -> ApiResult<R> {
    serde_json::from_value(doc).map_err(|e| ApiError::Internal(e.into()))
}

/// Remove private fields from an outgoing document
pub fn strip_private<R: Resource>(doc: &mut Value) {
    if R::PRIVATE_FIELDS.is_empty() {
        return;
    }
    if let Value::Object(map) = doc {
        map.retain(|key, _| !R::PRIVATE_FIELDS.contains(&key.as_str()));
    }
}

/// Drop read-only fields from a client patch; rejects non-object bodies
fn sanitize_patch<R: Resource>(patch: Value) -> ApiResult<Value> {
    let Value::Object(mut map) = patch else {
        return Err(ApiError::Validation(
            "Invalid input data: expected a JSON object".to_string(),
        ));
    };
    map.retain(|key, _| !R::READ_ONLY_FIELDS.contains(&key.as_str()));
    Ok(Value::Object(map))
}

/// Shallow merge of a patch into a document
fn merge(mut doc: Value, patch: Value) -> Value {
    if let (Value::Object(base), Value::Object(fields)) = (&mut doc, patch) {
        for (key, value) in fields {
            base.insert(key, value);
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Widget {
        id: Uuid,
        name: String,
        secret: String,
    }

    impl Resource for Widget {
        const COLLECTION: &'static str = "widgets";
        const SINGULAR: &'static str = "widget";
        const READ_ONLY_FIELDS: &'static [&'static str] = &["id", "secret"];
        const PRIVATE_FIELDS: &'static [&'static str] = &["secret"];

        fn id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn patch_drops_read_only_fields() {
        let patch = sanitize_patch::<Widget>(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "updated",
            "secret": "hacked"
        }))
        .unwrap();
        assert_eq!(patch, json!({ "name": "updated" }));
    }

    #[test]
    fn non_object_patch_is_rejected() {
        assert!(sanitize_patch::<Widget>(json!("text")).is_err());
        assert!(sanitize_patch::<Widget>(json!([1, 2])).is_err());
    }

    #[test]
    fn merge_is_shallow_and_overwrites() {
        let merged = merge(
            json!({ "name": "old", "kept": true }),
            json!({ "name": "new" }),
        );
        assert_eq!(merged, json!({ "name": "new", "kept": true }));
    }

    #[test]
    fn private_fields_never_leave_the_service() {
        let mut doc = json!({ "id": "x", "name": "w", "secret": "hash" });
        strip_private::<Widget>(&mut doc);
        assert_eq!(doc, json!({ "id": "x", "name": "w" }));
    }

    #[test]
    fn defaults_leave_ownerless_types_alone() {
        let widget = Widget {
            id: Uuid::new_v4(),
            name: "w".to_string(),
            secret: "s".to_string(),
        };
        assert_eq!(widget.owner(), None);
        assert_eq!(widget.parent(), None);
        assert!(widget.validate().is_ok());
    }
}
