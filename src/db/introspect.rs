use serde_json::{json, Value};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::db::convert::row_to_json;
use crate::error::GuardError;

/// List user-visible relations. System schemas and TOAST tables are never
/// shown to the agent.
pub async fn list_tables(pool: &PgPool) -> Result<Value, GuardError> {
    let sql = "SELECT n.nspname AS schema, c.relname AS name, \
               CASE c.relkind \
                    WHEN 'r' THEN 'table' \
                    WHEN 'v' THEN 'view' \
                    WHEN 'm' THEN 'materialized_view' \
                    WHEN 'p' THEN 'partitioned_table' \
               END AS type \
               FROM pg_catalog.pg_class c \
               JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
               WHERE c.relkind IN ('r', 'v', 'm', 'p') \
                 AND n.nspname NOT IN ('pg_catalog', 'information_schema') \
                 AND n.nspname NOT LIKE 'pg_toast%' \
               ORDER BY n.nspname, c.relname";

    let rows = sqlx::query(sql).fetch_all(pool).await?;
    let tables: Vec<Value> = rows.iter().map(row_to_json).collect();
    Ok(json!({ "tables": tables }))
}

/// Describe one table: columns (with primary-key and foreign-key info),
/// index definitions, and constraint definitions.
pub async fn describe_table(
    pool: &PgPool,
    schema: Option<&str>,
    name: &str,
) -> Result<Value, GuardError> {
    let schema = schema.unwrap_or("public");

    let columns_sql = "SELECT c.column_name AS name, c.data_type AS type, \
               c.is_nullable AS nullable, c.column_default AS default_value, \
               CASE WHEN tc.constraint_type = 'PRIMARY KEY' THEN 'YES' ELSE 'NO' END AS primary_key \
               FROM information_schema.columns c \
               LEFT JOIN information_schema.key_column_usage kcu \
                 ON c.table_schema = kcu.table_schema \
                 AND c.table_name = kcu.table_name \
                 AND c.column_name = kcu.column_name \
               LEFT JOIN information_schema.table_constraints tc \
                 ON kcu.constraint_name = tc.constraint_name \
                 AND kcu.table_schema = tc.table_schema \
                 AND tc.constraint_type = 'PRIMARY KEY' \
               WHERE c.table_schema = $1 AND c.table_name = $2 \
               ORDER BY c.ordinal_position";

    let rows = sqlx::query(columns_sql)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(GuardError::Other(format!(
            "Table '{schema}.{name}' not found"
        )));
    }

    // FK info per column
    let fk_sql = "SELECT kcu.column_name, \
               ccu.table_schema || '.' || ccu.table_name || '.' || ccu.column_name AS references_col \
               FROM information_schema.key_column_usage kcu \
               JOIN information_schema.referential_constraints rc \
                 ON kcu.constraint_name = rc.constraint_name \
                 AND kcu.constraint_schema = rc.constraint_schema \
               JOIN information_schema.constraint_column_usage ccu \
                 ON rc.unique_constraint_name = ccu.constraint_name \
                 AND rc.unique_constraint_schema = ccu.constraint_schema \
               WHERE kcu.table_schema = $1 AND kcu.table_name = $2";

    let fk_rows = sqlx::query(fk_sql)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await
        .unwrap_or_default();

    let fk_map: std::collections::HashMap<String, String> = fk_rows
        .iter()
        .filter_map(|r| {
            let col: String = r.try_get("column_name").ok()?;
            let refs: String = r.try_get("references_col").ok()?;
            Some((col, refs))
        })
        .collect();

    let mut columns: Vec<Value> = rows.iter().map(row_to_json).collect();
    for col in &mut columns {
        if let Value::Object(map) = col {
            let col_name = map.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let fk = fk_map
                .get(col_name)
                .map(|s| Value::String(s.clone()))
                .unwrap_or(Value::Null);
            map.insert("foreign_key".to_string(), fk);
        }
    }

    let indexes_sql = "SELECT indexname AS name, indexdef AS definition \
               FROM pg_catalog.pg_indexes \
               WHERE schemaname = $1 AND tablename = $2 \
               ORDER BY indexname";
    let index_rows = sqlx::query(indexes_sql)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await?;
    let indexes: Vec<Value> = index_rows.iter().map(row_to_json).collect();

    let constraints_sql = "SELECT con.conname AS name, \
               pg_get_constraintdef(con.oid) AS definition \
               FROM pg_catalog.pg_constraint con \
               JOIN pg_catalog.pg_class c ON c.oid = con.conrelid \
               JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
               WHERE n.nspname = $1 AND c.relname = $2 \
               ORDER BY con.conname";
    let constraint_rows = sqlx::query(constraints_sql)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await?;
    let constraints: Vec<Value> = constraint_rows.iter().map(row_to_json).collect();

    Ok(json!({
        "schema": schema,
        "name": name,
        "columns": columns,
        "indexes": indexes,
        "constraints": constraints,
    }))
}
