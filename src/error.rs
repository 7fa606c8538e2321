use rmcp::model::ErrorData;

use crate::prompts::PromptMatcher;

/// Every failure a tool call can surface, from admission to post-processing.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("SQL parse error: {0}")]
    Parse(String),

    #[error("empty query")]
    EmptyQuery,

    #[error("multi-statement queries are not allowed (got {0} statements)")]
    MultiStatement(usize),

    #[error("{message}")]
    Denied { category: String, message: String },

    #[error("query exceeds the maximum allowed length ({len} > {max} bytes)")]
    SqlTooLarge { len: usize, max: usize },

    #[error("rejected by {hook}: {reason}")]
    HookRejected { hook: String, reason: String },

    #[error("hook timed out: {hook} did not finish within {seconds}s")]
    HookTimeout { hook: String, seconds: u64 },

    #[error("hook failed: {hook}: {detail}")]
    HookFailed { hook: String, detail: String },

    #[error("unparseable response from {hook}: {detail}")]
    HookUnparseable { hook: String, detail: String },

    #[error("query timed out after {0} seconds")]
    QueryTimeout(u64),

    #[error("result exceeds the maximum allowed length ({len} > {max} characters)")]
    ResultTooLarge { len: usize, max: usize },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl GuardError {
    /// Stable machine-readable kind identifier.
    pub fn kind(&self) -> String {
        match self {
            GuardError::Parse(_) => "parse-error".to_string(),
            GuardError::EmptyQuery => "empty-query".to_string(),
            GuardError::MultiStatement(_) => "multi-statement".to_string(),
            GuardError::Denied { category, .. } => format!("denied:{category}"),
            GuardError::SqlTooLarge { .. } => "sql-too-large".to_string(),
            GuardError::HookRejected { .. } => "hook-rejected".to_string(),
            GuardError::HookTimeout { .. } => "hook-timeout".to_string(),
            GuardError::HookFailed { .. } => "hook-failed".to_string(),
            GuardError::HookUnparseable { .. } => "hook-unparseable".to_string(),
            GuardError::QueryTimeout(_) => "query-timeout".to_string(),
            GuardError::ResultTooLarge { .. } => "result-too-large".to_string(),
            GuardError::Database(_) => "db-error".to_string(),
            GuardError::Config(_) => "config-error".to_string(),
            GuardError::Other(_) => "other".to_string(),
        }
    }

    /// Rejections are expected agent feedback; infrastructure failures are not.
    pub fn log(&self) {
        match self {
            GuardError::Parse(_)
            | GuardError::EmptyQuery
            | GuardError::MultiStatement(_)
            | GuardError::Denied { .. }
            | GuardError::SqlTooLarge { .. }
            | GuardError::HookRejected { .. }
            | GuardError::ResultTooLarge { .. } => {
                tracing::warn!(kind = %self.kind(), "{self}");
            }
            GuardError::HookTimeout { .. }
            | GuardError::HookFailed { .. }
            | GuardError::HookUnparseable { .. }
            | GuardError::Config(_) => {
                tracing::error!(kind = %self.kind(), "{self}");
            }
            GuardError::QueryTimeout(_) | GuardError::Database(_) | GuardError::Other(_) => {
                tracing::info!(kind = %self.kind(), "{self}");
            }
        }
    }

    /// Convert to an RPC error, attaching any matching guidance prompt.
    pub fn to_mcp_error(&self, prompts: &PromptMatcher) -> ErrorData {
        let message = self.to_string();
        let mut data = serde_json::Map::new();
        data.insert("kind".to_string(), serde_json::Value::String(self.kind()));
        let prompt = prompts.guidance(&message);
        if !prompt.is_empty() {
            data.insert("prompt".to_string(), serde_json::Value::String(prompt));
        }
        let data = Some(serde_json::Value::Object(data));

        match self {
            GuardError::Parse(_)
            | GuardError::EmptyQuery
            | GuardError::MultiStatement(_)
            | GuardError::Denied { .. }
            | GuardError::SqlTooLarge { .. }
            | GuardError::HookRejected { .. }
            | GuardError::ResultTooLarge { .. } => ErrorData::invalid_params(message, data),
            GuardError::HookTimeout { .. }
            | GuardError::HookFailed { .. }
            | GuardError::HookUnparseable { .. }
            | GuardError::QueryTimeout(_)
            | GuardError::Database(_)
            | GuardError::Config(_)
            | GuardError::Other(_) => ErrorData::internal_error(message, data),
        }
    }
}
