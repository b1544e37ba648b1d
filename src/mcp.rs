//! MCP tool server management for the research agent.
//!
//! The agent's tools (web search, page fetch, persistent memory) are external
//! MCP servers spawned as stdio child processes. The manager owns the client
//! connections and exposes namespaced `server_tool` names to the agent loop.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rmcp::model::CallToolRequestParams;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::RwLock;

use crate::core::config::{config_str, AppPaths};
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpToolsConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerStatus {
    pub status: String,
    pub tools_count: usize,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub last_connected: Option<String>,
}

#[derive(Debug, Clone)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
}

#[derive(Clone)]
struct McpClientEntry {
    service: Arc<RunningService<RoleClient, ()>>,
    tools: Vec<Value>,
}

#[derive(Clone)]
pub struct McpManager {
    paths: Arc<AppPaths>,
    clients: Arc<RwLock<HashMap<String, McpClientEntry>>>,
    status: Arc<RwLock<HashMap<String, McpServerStatus>>>,
    initialized: Arc<AtomicBool>,
}

impl McpManager {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            clients: Arc::new(RwLock::new(HashMap::new())),
            status: Arc::new(RwLock::new(HashMap::new())),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn config_path(&self) -> PathBuf {
        self.paths
            .user_data_dir
            .join("config")
            .join("mcp_tools_config.json")
    }

    /// Connects every enabled server. A server that fails to spawn is recorded
    /// as errored and skipped; startup itself never fails for that reason.
    pub async fn initialize(&self, app_config: &Value) -> Result<(), ApiError> {
        let tools_config = self.load_tools_config(app_config)?;
        self.connect_all(&tools_config).await;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn status_snapshot(&self) -> HashMap<String, McpServerStatus> {
        self.status.read().await.clone()
    }

    pub async fn connected_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn list_tools(&self) -> Vec<McpToolInfo> {
        let clients = self.clients.read().await;
        let mut result = Vec::new();

        for (server_name, entry) in clients.iter() {
            for tool_value in &entry.tools {
                let name = tool_value
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                if name.is_empty() {
                    continue;
                }
                let description = tool_value
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                result.push(McpToolInfo {
                    name: format!("{}_{}", server_name, name),
                    description,
                });
            }
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    pub async fn execute_tool(&self, tool_name: &str, args: &Value) -> Result<String, ApiError> {
        let (server_name, short_name) = self.resolve_tool_name(tool_name).await?;
        let entry = {
            let clients = self.clients.read().await;
            clients.get(&server_name).cloned().ok_or_else(|| {
                ApiError::NotFound(format!("MCP server '{}' not connected", server_name))
            })?
        };

        let params = CallToolRequestParams {
            name: short_name.into(),
            arguments: build_tool_arguments(args),
            meta: None,
            task: None,
        };

        let result = entry
            .service
            .call_tool(params)
            .await
            .map_err(ApiError::internal)?;

        Ok(format_tool_result(&result))
    }

    async fn resolve_tool_name(&self, tool_name: &str) -> Result<(String, String), ApiError> {
        let clients = self.clients.read().await;
        let mut match_name: Option<String> = None;
        for server_name in clients.keys() {
            let prefix = format!("{}_", server_name);
            if tool_name.starts_with(&prefix) {
                let is_better = match_name
                    .as_ref()
                    .map(|current| server_name.len() > current.len())
                    .unwrap_or(true);
                if is_better {
                    match_name = Some(server_name.clone());
                }
            }
        }

        let Some(server_name) = match_name else {
            return Err(ApiError::NotFound(format!(
                "Unknown MCP tool: {}",
                tool_name
            )));
        };

        let short_name = tool_name
            .strip_prefix(&format!("{}_", server_name))
            .unwrap_or(tool_name)
            .to_string();
        Ok((server_name, short_name))
    }

    async fn connect_all(&self, tools_config: &McpToolsConfig) {
        let mut new_clients = HashMap::new();
        let mut new_status = HashMap::new();

        for (name, server) in tools_config.mcp_servers.iter() {
            if !server.enabled {
                new_status.insert(
                    name.clone(),
                    McpServerStatus {
                        status: "disconnected".to_string(),
                        tools_count: 0,
                        error_message: None,
                        last_connected: None,
                    },
                );
                continue;
            }

            match connect_server(name, server).await {
                Ok(entry) => {
                    new_status.insert(
                        name.clone(),
                        McpServerStatus {
                            status: "connected".to_string(),
                            tools_count: entry.tools.len(),
                            error_message: None,
                            last_connected: Some(Utc::now().to_rfc3339()),
                        },
                    );
                    new_clients.insert(name.clone(), entry);
                }
                Err(err) => {
                    tracing::warn!("MCP server '{}' unavailable: {}", name, err);
                    new_status.insert(
                        name.clone(),
                        McpServerStatus {
                            status: "error".to_string(),
                            tools_count: 0,
                            error_message: Some(err),
                            last_connected: None,
                        },
                    );
                }
            }
        }

        *self.clients.write().await = new_clients;
        *self.status.write().await = new_status;
    }

    fn load_tools_config(&self, app_config: &Value) -> Result<McpToolsConfig, ApiError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            let defaults = self.default_research_servers(app_config);
            self.save_tools_config(&defaults)?;
            return Ok(defaults);
        }

        let contents = fs::read_to_string(&config_path).unwrap_or_default();
        if contents.trim().is_empty() {
            return Ok(self.default_research_servers(app_config));
        }
        Ok(serde_json::from_str::<McpToolsConfig>(&contents).unwrap_or_default())
    }

    fn save_tools_config(&self, config: &McpToolsConfig) -> Result<(), ApiError> {
        let config_path = self.config_path();
        if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let data = serde_json::to_string_pretty(config).map_err(ApiError::internal)?;
        fs::write(config_path, data).map_err(ApiError::internal)?;
        Ok(())
    }

    /// Default research server set: Brave web search, page fetch, and a
    /// per-session libsql memory store.
    fn default_research_servers(&self, app_config: &Value) -> McpToolsConfig {
        let mut servers = HashMap::new();

        let brave_key = config_str(app_config, "tools.brave_api_key")
            .map(str::to_string)
            .or_else(|| std::env::var("BRAVE_API_KEY").ok());
        if let Some(key) = brave_key {
            servers.insert(
                "web_search".to_string(),
                McpServerConfig {
                    command: "npx".to_string(),
                    args: vec![
                        "-y".to_string(),
                        "@modelcontextprotocol/server-brave-search".to_string(),
                    ],
                    env: HashMap::from([("BRAVE_API_KEY".to_string(), key)]),
                    enabled: true,
                },
            );
        }

        servers.insert(
            "fetch".to_string(),
            McpServerConfig {
                command: "uvx".to_string(),
                args: vec!["mcp-server-fetch".to_string()],
                env: HashMap::new(),
                enabled: true,
            },
        );

        let session_id = config_str(app_config, "agent.session_id").unwrap_or("default");
        let memory_db = self.paths.memory_dir.join(format!("{}.db", session_id));
        servers.insert(
            "memory".to_string(),
            McpServerConfig {
                command: "npx".to_string(),
                args: vec!["-y".to_string(), "mcp-memory-libsql".to_string()],
                env: HashMap::from([(
                    "LIBSQL_URL".to_string(),
                    format!("file:{}", memory_db.display()),
                )]),
                enabled: true,
            },
        );

        McpToolsConfig {
            mcp_servers: servers,
        }
    }
}

async fn connect_server(name: &str, server: &McpServerConfig) -> Result<McpClientEntry, String> {
    let command = server.command.trim();
    if command.is_empty() {
        return Err("MCP command is required".to_string());
    }

    let mut cmd = Command::new(command);
    cmd.args(&server.args);
    if !server.env.is_empty() {
        cmd.envs(&server.env);
    }

    let transport = TokioChildProcess::new(cmd.configure(|cmd| {
        let _ = cmd;
    }))
    .map_err(|err| format!("Failed to spawn MCP server '{}': {}", name, err))?;

    let service = ()
        .serve(transport)
        .await
        .map_err(|err| format!("Failed to connect MCP server '{}': {}", name, err))?;

    let tools_result = service
        .list_tools(Default::default())
        .await
        .map_err(|err| format!("Failed to list tools for '{}': {}", name, err))?;
    let tool_values = serde_json::to_value(&tools_result)
        .ok()
        .and_then(|value| value.get("tools").cloned())
        .and_then(|value| value.as_array().cloned())
        .unwrap_or_default();

    Ok(McpClientEntry {
        service: Arc::new(service),
        tools: tool_values,
    })
}

fn default_enabled() -> bool {
    true
}

fn build_tool_arguments(args: &Value) -> Option<Map<String, Value>> {
    match args {
        Value::Object(map) => Some(map.clone()),
        Value::Null => None,
        _ => {
            let mut map = Map::new();
            map.insert("input".to_string(), args.clone());
            Some(map)
        }
    }
}

fn format_tool_result(result: &impl Serialize) -> String {
    let value = serde_json::to_value(result).unwrap_or(Value::Null);
    let mut parts = Vec::new();
    if let Some(content) = value.get("content").and_then(|v| v.as_array()) {
        for item in content {
            let item_type = item.get("type").and_then(|v| v.as_str()).unwrap_or("");
            if item_type == "text" {
                if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
                    if !text.trim().is_empty() {
                        parts.push(text.to_string());
                        continue;
                    }
                }
            }
            parts.push(item.to_string());
        }
    }

    if parts.is_empty() {
        return serde_json::to_string_pretty(&value).unwrap_or_default();
    }

    let mut output = parts.join("\n");
    let is_error = value
        .get("is_error")
        .or_else(|| value.get("isError"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if is_error {
        output = format!("Tool error: {}", output);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn default_servers_include_fetch_and_memory() {
        let dir = tempdir().unwrap();
        std::env::remove_var("BRAVE_API_KEY");
        let paths = AppPaths {
            project_root: dir.path().to_path_buf(),
            user_data_dir: dir.path().to_path_buf(),
            log_dir: dir.path().join("logs"),
            uploads_dir: dir.path().join("uploads"),
            memory_dir: dir.path().join("memory"),
            knowledge_db_path: dir.path().join("knowledge.db"),
            secrets_path: dir.path().join("secrets.yml"),
        };
        let manager = McpManager::new(Arc::new(paths));

        let config = manager.default_research_servers(&json!({}));
        assert!(config.mcp_servers.contains_key("fetch"));
        assert!(config.mcp_servers.contains_key("memory"));
        // No Brave key configured, so no web search server.
        assert!(!config.mcp_servers.contains_key("web_search"));

        let with_key =
            manager.default_research_servers(&json!({"tools": {"brave_api_key": "bk-test"}}));
        let search = with_key.mcp_servers.get("web_search").unwrap();
        assert_eq!(search.env.get("BRAVE_API_KEY").unwrap(), "bk-test");
    }

    #[test]
    fn tool_result_formatting_extracts_text_blocks() {
        let result = json!({
            "content": [
                {"type": "text", "text": "first result"},
                {"type": "text", "text": "second result"}
            ],
            "isError": false
        });
        assert_eq!(format_tool_result(&result), "first result\nsecond result");

        let error = json!({
            "content": [{"type": "text", "text": "boom"}],
            "isError": true
        });
        assert_eq!(format_tool_result(&error), "Tool error: boom");
    }

    #[test]
    fn scalar_tool_arguments_are_wrapped() {
        let wrapped = build_tool_arguments(&json!("fleet safety")).unwrap();
        assert_eq!(wrapped.get("input").unwrap(), "fleet safety");
        assert!(build_tool_arguments(&Value::Null).is_none());
    }
}
