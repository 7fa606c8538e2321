use std::time::Duration;

use serde_json::{json, Value};
use sqlx::postgres::PgPool;
use tokio::time::timeout;

use crate::config::GuardConfig;
use crate::db::convert::{column_names, row_to_json};
use crate::error::GuardError;
use crate::hooks::HookChain;
use crate::protect::ProtectionChecker;
use crate::sanitize::Sanitizer;
use crate::timeouts::TimeoutResolver;

/// The path one submitted statement travels: length gate, before-query
/// hooks, protection check on the final SQL, deadline resolution, execution,
/// result-size gate, sanitization, after-query hooks.
pub struct QueryPipeline {
    pool: PgPool,
    checker: ProtectionChecker,
    timeouts: TimeoutResolver,
    sanitizer: Sanitizer,
    before: HookChain,
    after: HookChain,
    max_sql_length: usize,
    max_result_length: usize,
}

impl QueryPipeline {
    pub fn new(pool: PgPool, config: &GuardConfig) -> Result<Self, GuardError> {
        let default_hook_timeout = Duration::from_secs(config.default_hook_timeout_seconds);
        Ok(Self {
            pool,
            checker: ProtectionChecker::new(config.protection.clone(), config.read_only),
            timeouts: TimeoutResolver::from_config(&config.query)?,
            sanitizer: Sanitizer::from_config(&config.sanitization)?,
            before: HookChain::from_config(
                "before_query",
                &config.server_hooks.before_query,
                default_hook_timeout,
            )?,
            after: HookChain::from_config(
                "after_query",
                &config.server_hooks.after_query,
                default_hook_timeout,
            )?,
            max_sql_length: config.query.max_sql_length,
            max_result_length: config.query.max_result_length,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run one statement through the whole admission and post-processing
    /// chain. Returns the serialized `{columns, rows}` payload (possibly
    /// rewritten by after-query hooks).
    pub async fn execute(&self, sql: &str) -> Result<String, GuardError> {
        if sql.len() > self.max_sql_length {
            return Err(GuardError::SqlTooLarge {
                len: sql.len(),
                max: self.max_sql_length,
            });
        }

        // Hooks may rewrite the statement; everything downstream sees the
        // rewritten text, including the protection checker.
        let sql = self.before.run(sql.to_string()).await?;
        self.checker.check(&sql)?;

        let deadline = self.timeouts.resolve(&sql);
        tracing::debug!(timeout_secs = deadline.as_secs(), "executing query");

        let rows = timeout(deadline, sqlx::query(&sql).fetch_all(&self.pool))
            .await
            .map_err(|_| GuardError::QueryTimeout(deadline.as_secs()))??;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let mut json_rows: Vec<Value> = rows.iter().map(row_to_json).collect();

        let serialized_rows = serde_json::to_string(&json_rows)
            .map_err(|e| GuardError::Other(format!("result serialization failed: {e}")))?;
        let length = serialized_rows.chars().count();
        if length > self.max_result_length {
            return Err(GuardError::ResultTooLarge {
                len: length,
                max: self.max_result_length,
            });
        }

        self.sanitizer.sanitize_rows(&mut json_rows);

        let payload = serde_json::to_string(&json!({
            "columns": columns,
            "rows": json_rows,
        }))
        .map_err(|e| GuardError::Other(format!("result serialization failed: {e}")))?;

        if self.after.is_empty() {
            return Ok(payload);
        }
        self.after.run(payload).await
    }
}
