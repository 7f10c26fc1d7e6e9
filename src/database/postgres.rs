use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::postgres::PgArguments;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::collection::Collection;
use crate::database::manager::DatabaseError;
use crate::database::query::{is_valid_field, DocQuery, FilterOp, SortKind};
use crate::database::store::DocumentStore;

/// Document store backed by one JSONB table per collection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Bound parameter for a compiled statement.
#[derive(Debug, Clone, PartialEq)]
enum Param {
    Json(Value),
    Text(String),
}

#[derive(Debug)]
struct SqlResult {
    query: String,
    params: Vec<Param>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create every collection table and its indexes. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            for statement in migration_statements(collection) {
                sqlx::query(&statement).execute(&self.pool).await?;
            }
            debug!("Migrated table {}", collection.table_name());
        }
        info!("Schema ready ({} collections)", Collection::ALL.len());
        Ok(())
    }

    fn map_error(collection: Collection, error: sqlx::Error) -> DatabaseError {
        if let sqlx::Error::Database(db) = &error {
            if db.code().as_deref() == Some("23505") {
                let field = db
                    .constraint()
                    .map(|name| constraint_field(collection, name))
                    .unwrap_or_else(|| "id".to_string());
                return DatabaseError::Duplicate {
                    collection: collection.to_string(),
                    field,
                };
            }
        }
        DatabaseError::Sqlx(error)
    }
}

fn migration_statements(collection: Collection) -> Vec<String> {
    let table = collection.table_name();
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\
            id UUID PRIMARY KEY, \
            data JSONB NOT NULL, \
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now())"
    )];
    for field in collection.unique_fields() {
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_{field}_key\" ON \"{table}\" ((data->>'{field}'))"
        ));
    }
    for field in collection.indexed_fields() {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS \"{table}_{field}_idx\" ON \"{table}\" ((data->>'{field}'))"
        ));
    }
    statements
}

/// Recover the document field from a `{table}_{field}_key` index name.
fn constraint_field(collection: Collection, constraint: &str) -> String {
    let prefix = format!("{}_", collection.table_name());
    constraint
        .strip_prefix(&prefix)
        .and_then(|rest| rest.strip_suffix("_key"))
        .unwrap_or("id")
        .to_string()
}

fn where_clause(query: &DocQuery, params: &mut Vec<Param>) -> Result<String, DatabaseError> {
    let mut clauses = Vec::with_capacity(query.conditions.len());

    for condition in &query.conditions {
        let field = &condition.field;
        if !is_valid_field(field) {
            return Err(DatabaseError::QueryError(format!("Invalid field name: {}", field)));
        }

        let clause = match condition.op {
            FilterOp::Eq => {
                params.push(Param::Json(condition.value.clone()));
                format!("data->'{}' = ${}", field, params.len())
            }
            FilterOp::In => {
                if !condition.value.is_array() {
                    return Err(DatabaseError::QueryError(format!(
                        "{} on '{}' expects an array",
                        condition.op.as_str(),
                        field
                    )));
                }
                params.push(Param::Json(condition.value.clone()));
                format!("${} @> COALESCE(data->'{}', 'null'::jsonb)", params.len(), field)
            }
            FilterOp::Any => {
                params.push(Param::Json(json!([condition.value])));
                format!("data->'{}' @> ${}", field, params.len())
            }
            FilterOp::Gte | FilterOp::Lte => {
                let bound = condition.value.as_str().ok_or_else(|| {
                    DatabaseError::QueryError(format!(
                        "{} on '{}' expects a timestamp string",
                        condition.op.as_str(),
                        field
                    ))
                })?;
                params.push(Param::Text(bound.to_string()));
                let cmp = if condition.op == FilterOp::Gte { ">=" } else { "<=" };
                format!("(data->>'{}')::timestamptz {} ${}::timestamptz", field, cmp, params.len())
            }
        };
        clauses.push(clause);
    }

    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

fn select_sql(collection: Collection, query: &DocQuery) -> Result<SqlResult, DatabaseError> {
    let mut params = Vec::new();
    let mut sql = format!("SELECT data FROM \"{}\"", collection.table_name());
    sql.push_str(&where_clause(query, &mut params)?);

    let mut order = Vec::with_capacity(query.order.len() + 1);
    for key in &query.order {
        if !is_valid_field(&key.field) {
            return Err(DatabaseError::QueryError(format!("Invalid sort field: {}", key.field)));
        }
        let expr = match key.kind {
            SortKind::Text => format!("data->>'{}'", key.field),
            SortKind::Timestamp => format!("(data->>'{}')::timestamptz", key.field),
        };
        order.push(format!("{} {}", expr, key.direction.to_sql()));
    }
    order.push("created_at ASC".to_string());
    sql.push_str(&format!(" ORDER BY {}", order.join(", ")));

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = query.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    Ok(SqlResult { query: sql, params })
}

fn count_sql(collection: Collection, query: &DocQuery) -> Result<SqlResult, DatabaseError> {
    let mut params = Vec::new();
    let mut sql = format!("SELECT COUNT(*) AS count FROM \"{}\"", collection.table_name());
    sql.push_str(&where_clause(query, &mut params)?);
    Ok(SqlResult { query: sql, params })
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, Postgres, PgArguments>,
    params: &'q [Param],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match param {
            Param::Json(value) => q.bind(Json(value)),
            Param::Text(text) => q.bind(text.as_str()),
        };
    }
    q
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, collection: Collection, id: Uuid, document: Value) -> Result<(), DatabaseError> {
        let sql = format!("INSERT INTO \"{}\" (id, data) VALUES ($1, $2)", collection.table_name());
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_error(collection, e))?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let sql = format!("SELECT data FROM \"{}\" WHERE id = $1", collection.table_name());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let Json(data): Json<Value> = row.try_get("data")?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn find(&self, collection: Collection, query: &DocQuery) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = select_sql(collection, query)?;
        let rows = bind_params(sqlx::query(&sql_result.query), &sql_result.params)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<Value, DatabaseError> {
                let Json(data): Json<Value> = row.try_get("data")?;
                Ok(data)
            })
            .collect()
    }

    async fn count(&self, collection: Collection, query: &DocQuery) -> Result<u64, DatabaseError> {
        let sql_result = count_sql(collection, query)?;
        let row = bind_params(sqlx::query(&sql_result.query), &sql_result.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn replace(&self, collection: Collection, id: Uuid, document: Value) -> Result<bool, DatabaseError> {
        let sql = format!(
            "UPDATE \"{}\" SET data = $2, updated_at = now() WHERE id = $1",
            collection.table_name()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_error(collection, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1 RETURNING data", collection.table_name());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let Json(data): Json<Value> = row.try_get("data")?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_filters_into_jsonb_predicates() {
        let q = DocQuery::new()
            .eq("student", "s1")
            .any("parents", json!({"parent": "p1"}))
            .gte("date", "2024-01-01T00:00:00Z")
            .newest_first("date")
            .limit(10)
            .offset(20);

        let sql = select_sql(Collection::SchoolFees, &q).unwrap();
        assert_eq!(
            sql.query,
            "SELECT data FROM \"school_fees\" WHERE data->'student' = $1 AND data->'parents' @> $2 \
             AND (data->>'date')::timestamptz >= $3::timestamptz \
             ORDER BY (data->>'date')::timestamptz DESC, created_at ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params[0], Param::Json(json!("s1")));
        assert_eq!(sql.params[1], Param::Json(json!([{"parent": "p1"}])));
        assert_eq!(sql.params[2], Param::Text("2024-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn count_ignores_order_and_window() {
        let q = DocQuery::new().is_in("academicStatus", &["Active"]);
        let sql = count_sql(Collection::Students, &q).unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"students\" WHERE $1 @> COALESCE(data->'academicStatus', 'null'::jsonb)"
        );
    }

    #[test]
    fn rejects_unsafe_field_names() {
        let q = DocQuery::new().eq("name'; DROP TABLE users; --", "x");
        assert!(matches!(
            select_sql(Collection::Users, &q),
            Err(DatabaseError::QueryError(_))
        ));
    }

    #[test]
    fn unique_index_names_map_back_to_fields() {
        assert_eq!(constraint_field(Collection::Classes, "school_classes_shortName_key"), "shortName");
        assert_eq!(constraint_field(Collection::Users, "users_pkey"), "id");

        let statements = migration_statements(Collection::Classes);
        assert_eq!(statements.len(), 3);
        assert!(statements[1].contains("UNIQUE INDEX IF NOT EXISTS \"school_classes_name_key\""));
    }
}
