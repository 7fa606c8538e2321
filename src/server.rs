use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;

use crate::config::GuardConfig;
use crate::db::introspect;
use crate::error::GuardError;
use crate::pipeline::QueryPipeline;
use crate::prompts::PromptMatcher;

const DEFAULT_INSTRUCTIONS: &str =
    "Gatekept PostgreSQL access. Use list_tables to see what exists, \
     describe_table for columns, indexes, and constraints, and execute_query \
     to run a single SQL statement. Statements are policy-checked before \
     execution and results may be redacted; rejections explain which \
     construct was refused.";

#[derive(Clone)]
pub struct GuardServer {
    pipeline: Arc<QueryPipeline>,
    prompts: Arc<PromptMatcher>,
    instructions: String,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DescribeTableParams {
    #[schemars(description = "Schema name (defaults to public)")]
    #[serde(default)]
    pub schema: Option<String>,

    #[schemars(description = "Table name to describe")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExecuteQueryParams {
    #[schemars(description = "A single SQL statement to execute")]
    pub sql: String,
}

impl GuardServer {
    pub fn new(pipeline: QueryPipeline, config: &GuardConfig) -> Result<Self, GuardError> {
        let prompts = PromptMatcher::from_config(&config.error_prompts)?;
        let instructions = config
            .server
            .instructions
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
        Ok(Self {
            pipeline: Arc::new(pipeline),
            prompts: Arc::new(prompts),
            instructions,
            tool_router: Self::tool_router(),
        })
    }

    fn err(&self, e: GuardError) -> ErrorData {
        e.log();
        e.to_mcp_error(&self.prompts)
    }
}

#[tool_router]
impl GuardServer {
    #[tool(
        name = "list_tables",
        description = "List tables, views, materialized views, and partitioned tables with their schemas"
    )]
    async fn list_tables(&self) -> Result<CallToolResult, ErrorData> {
        let tables = introspect::list_tables(self.pipeline.pool())
            .await
            .map_err(|e| self.err(e))?;

        let text = serde_json::to_string_pretty(&tables).unwrap_or_else(|_| "{}".to_string());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "describe_table",
        description = "Describe a table: columns (with type, nullable, default, primary and foreign keys), indexes, and constraints"
    )]
    async fn describe_table(
        &self,
        Parameters(params): Parameters<DescribeTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let detail = introspect::describe_table(
            self.pipeline.pool(),
            params.schema.as_deref(),
            &params.name,
        )
        .await
        .map_err(|e| self.err(e))?;

        let text = serde_json::to_string_pretty(&detail).unwrap_or_else(|_| "{}".to_string());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "execute_query",
        description = "Execute a single SQL statement and return {columns, rows} as JSON. \
                       Statements are vetted against the server's protection policy; \
                       results are size-limited and may be redacted."
    )]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let payload = self
            .pipeline
            .execute(&params.sql)
            .await
            .map_err(|e| self.err(e))?;

        Ok(CallToolResult::success(vec![Content::text(payload)]))
    }
}

#[tool_handler]
impl ServerHandler for GuardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pg-mcp-guard".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(self.instructions.clone()),
        }
    }
}
