//! Generic JSONB document store over PostgreSQL
//!
//! Each collection is a table of `(id UUID, doc JSONB)` rows. The store
//! exposes a narrow set of operations the service layer composes: point
//! reads and writes, directive-driven list queries, filtered bulk
//! mutations, and a mean aggregate. Collection names are compile-time
//! constants supplied by the caller; document field names are sanitised
//! before being spliced into JSONB path expressions and values always bind
//! as query parameters.

use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Comparison operator of a filter clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            // `In` renders through the ANY() form, never through this path
            FilterOp::In => "=",
        }
    }
}

/// Value a document field is compared against
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

/// A single predicate on a document field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterClause {
    /// Equality on a text field
    pub fn eq(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: FilterValue::Text(value.into()),
        }
    }

    /// Equality on a field holding an entity id
    pub fn eq_id(field: &str, id: Uuid) -> Self {
        Self::eq(field, id.to_string())
    }
}

/// Sort directive for a list query
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Fully configured list query, ready for execution. Produced by the query
/// feature builder; this type carries directives only and performs no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<FilterClause>,
    pub sort: Vec<SortKey>,
    /// Fields to include in returned documents; `None` keeps everything
    pub select: Option<Vec<String>>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: vec![SortKey {
                field: "createdAt".to_string(),
                descending: true,
            }],
            select: None,
            offset: 0,
            limit: 10,
        }
    }
}

/// Strip a field name down to characters safe inside a JSONB path
/// expression. Values still bind as parameters; this only guards the
/// identifier position.
fn sanitize_field(field: &str) -> String {
    field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[FilterClause]) {
    for clause in filters {
        let field = sanitize_field(&clause.field);
        if field.is_empty() {
            continue;
        }
        qb.push(" AND ");
        match &clause.value {
            FilterValue::List(values) => {
                qb.push(format!("doc->>'{field}' = ANY("));
                qb.push_bind(values.clone());
                qb.push(")");
            }
            FilterValue::Number(n) => {
                // Guard the cast: rows holding a non-numeric value yield
                // NULL and drop out instead of aborting the whole query
                qb.push(format!(
                    "(CASE WHEN jsonb_typeof(doc->'{field}') = 'number' \
                     THEN (doc->>'{field}')::float8 END) {} ",
                    clause.op.sql()
                ));
                qb.push_bind(*n);
            }
            FilterValue::Text(s) => {
                qb.push(format!("doc->>'{field}' {} ", clause.op.sql()));
                qb.push_bind(s.clone());
            }
        }
    }
}

/// Build the SELECT statement for a list query. Sorting goes through the
/// `doc->'field'` JSONB value so numeric fields order numerically rather
/// than lexically.
fn build_find(collection: &str, query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT doc FROM {collection} WHERE TRUE"));
    push_filters(&mut qb, &query.filters);

    let keys: Vec<String> = query
        .sort
        .iter()
        .filter_map(|key| {
            let field = sanitize_field(&key.field);
            if field.is_empty() {
                return None;
            }
            let direction = if key.descending { "DESC" } else { "ASC" };
            Some(format!("doc->'{field}' {direction} NULLS LAST"))
        })
        .collect();
    if !keys.is_empty() {
        qb.push(format!(" ORDER BY {}", keys.join(", ")));
    }

    qb.push(" LIMIT ");
    qb.push_bind(query.limit);
    qb.push(" OFFSET ");
    qb.push_bind(query.offset);
    qb
}

/// Keep only the selected fields of a document. The `id` field always
/// survives projection.
fn project(doc: &mut Value, fields: &[String]) {
    if let Value::Object(map) = doc {
        map.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
    }
}

/// Handle to the document store
#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    /// Create a new store over an initialized pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (health checks, migrations)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a document and return it as persisted
    pub async fn insert(&self, collection: &str, id: Uuid, doc: &Value) -> StoreResult<Value> {
        let row = sqlx::query(&format!(
            "INSERT INTO {collection} (id, doc) VALUES ($1, $2) RETURNING doc"
        ))
        .bind(id)
        .bind(doc)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_query)?;

        Ok(row.get("doc"))
    }

    /// Fetch a document by id
    pub async fn find_by_id(&self, collection: &str, id: Uuid) -> StoreResult<Option<Value>> {
        let row = sqlx::query(&format!("SELECT doc FROM {collection} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(row.map(|r| r.get("doc")))
    }

    /// Execute a list query
    pub async fn find(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Value>> {
        let mut qb = build_find(collection, query);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        let mut docs: Vec<Value> = rows.into_iter().map(|r| r.get("doc")).collect();
        if let Some(fields) = &query.select {
            for doc in &mut docs {
                project(doc, fields);
            }
        }
        Ok(docs)
    }

    /// Fetch every document of a collection
    pub async fn find_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let rows = sqlx::query(&format!("SELECT doc FROM {collection}"))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(rows.into_iter().map(|r| r.get("doc")).collect())
    }

    /// Fetch every document matching the filters, without pagination
    pub async fn find_where(
        &self,
        collection: &str,
        filters: &[FilterClause],
    ) -> StoreResult<Vec<Value>> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {collection} WHERE TRUE"));
        push_filters(&mut qb, filters);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(rows.into_iter().map(|r| r.get("doc")).collect())
    }

    /// Fetch the first document matching the filters
    pub async fn find_one(
        &self,
        collection: &str,
        filters: &[FilterClause],
    ) -> StoreResult<Option<Value>> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {collection} WHERE TRUE"));
        push_filters(&mut qb, filters);
        qb.push(" LIMIT 1");

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(row.map(|r| r.get("doc")))
    }

    /// Replace a document wholesale. Returns the stored document, or `None`
    /// if the id is absent. Last writer wins.
    pub async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        doc: &Value,
    ) -> StoreResult<Option<Value>> {
        let row = sqlx::query(&format!(
            "UPDATE {collection} SET doc = $2 WHERE id = $1 RETURNING doc"
        ))
        .bind(id)
        .bind(doc)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_query)?;

        Ok(row.map(|r| r.get("doc")))
    }

    /// Overwrite a single field of a document. A single-statement write, so
    /// it relies only on per-document atomicity.
    pub async fn set_field(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        value: &Value,
    ) -> StoreResult<bool> {
        let field = sanitize_field(field);
        let result = sqlx::query(&format!(
            "UPDATE {collection} SET doc = jsonb_set(doc, $2, $3, true) WHERE id = $1"
        ))
        .bind(id)
        .bind(vec![field])
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    /// Merge a patch into every document matching the filters. Matching ids
    /// are captured before the mutation runs, since rows may stop matching
    /// the filter afterward; the captured ids are returned so callers can
    /// fire their post-write obligations.
    pub async fn update_where(
        &self,
        collection: &str,
        filters: &[FilterClause],
        patch: &Value,
    ) -> StoreResult<Vec<Uuid>> {
        let mut qb = QueryBuilder::new(format!("SELECT id FROM {collection} WHERE TRUE"));
        push_filters(&mut qb, filters);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_query)?;
        let ids: Vec<Uuid> = rows.into_iter().map(|r| r.get("id")).collect();

        if ids.is_empty() {
            return Ok(ids);
        }

        sqlx::query(&format!(
            "UPDATE {collection} SET doc = doc || $2 WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .bind(patch)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_query)?;

        Ok(ids)
    }

    /// Delete a document by id. Returns whether a row was removed.
    pub async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {collection} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every document matching the filters
    pub async fn delete_where(
        &self,
        collection: &str,
        filters: &[FilterClause],
    ) -> StoreResult<u64> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {collection} WHERE TRUE"));
        push_filters(&mut qb, filters);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(result.rows_affected())
    }

    /// Check whether any document matches the filters
    pub async fn exists(&self, collection: &str, filters: &[FilterClause]) -> StoreResult<bool> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT EXISTS(SELECT 1 FROM {collection} WHERE TRUE"
        ));
        push_filters(&mut qb, filters);
        qb.push(")");

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(row.get(0))
    }

    /// Count documents matching the filters
    pub async fn count(&self, collection: &str, filters: &[FilterClause]) -> StoreResult<i64> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {collection} WHERE TRUE"));
        push_filters(&mut qb, filters);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(row.get(0))
    }

    /// Arithmetic mean of a numeric field across matching documents.
    /// `None` when no document matches.
    pub async fn mean(
        &self,
        collection: &str,
        field: &str,
        filters: &[FilterClause],
    ) -> StoreResult<Option<f64>> {
        let field = sanitize_field(field);
        let mut qb = QueryBuilder::new(format!(
            "SELECT AVG((doc->>'{field}')::float8) FROM {collection} WHERE TRUE"
        ));
        push_filters(&mut qb, filters);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_query)?;

        Ok(row.get(0))
    }
}
