use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod barista;
pub mod fraud;
pub mod sdr;
pub mod shop;
pub mod tutor;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Invalid tool parameters: {0}")]
    InvalidParameters(String),
    #[error("Tool execution was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Ok,                 // Completed successfully, no additional information required
    Response(String),   // Completed successfully with some message for the LLM
    Escalation(String), // Unable to complete goal, reason explains for LLM
}

impl ToolResult {
    /// Text handed back to the model
    pub fn for_llm(&self, tool_name: &str) -> String {
        match self {
            ToolResult::Ok => format!("Tool '{}' completed successfully", tool_name),
            ToolResult::Response(msg) => format!("Tool '{}' returned: {}", tool_name, msg),
            ToolResult::Escalation(reason) => format!(
                "Tool '{}' failed or cannot fulfill goal: {}",
                tool_name, reason
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl Tool {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A group of tools sharing one piece of session state
#[async_trait::async_trait]
pub trait Toolbox: Send + Sync {
    /// Definitions of every tool this toolbox answers to
    fn tools(&self) -> Vec<Tool>;

    async fn call(
        &self,
        name: &str,
        arguments: Value,
        cancel_token: CancellationToken,
    ) -> Result<ToolResult, ToolError>;
}

pub struct ToolRegistry {
    tools: Vec<Tool>,
    toolboxes: Vec<Arc<dyn Toolbox>>,
    routes: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            toolboxes: Vec::new(),
            routes: HashMap::new(),
        }
    }

    /// Register every tool of a toolbox and route their calls to it
    pub fn register_toolbox(&mut self, toolbox: Arc<dyn Toolbox>) {
        let index = self.toolboxes.len();
        for tool in toolbox.tools() {
            if self.routes.insert(tool.name.clone(), index).is_some() {
                log::warn!("⚠️  Tool '{}' registered twice, last one wins", tool.name);
                self.tools.retain(|t| t.name != tool.name);
            }
            self.tools.push(tool);
        }
        self.toolboxes.push(toolbox);
    }

    pub fn get_tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Execute a tool by name with cancellation support
    pub async fn execute_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel_token: CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        if cancel_token.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let toolbox = self
            .routes
            .get(name)
            .and_then(|&index| self.toolboxes.get(index))
            .ok_or_else(|| ToolError::NotFound(format!("Tool '{}' not found", name)))?;

        // Models sometimes send null for parameterless tools
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };

        toolbox.call(name, arguments, cancel_token).await
    }

    /// Get tool definitions for LLM function calling
    pub fn get_tool_definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters
                    }
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON schema for a tool without parameters
pub fn no_parameters() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Optional trimmed, non-empty string argument
pub fn opt_str_arg(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn str_arg(arguments: &Value, key: &str) -> Result<String, ToolError> {
    opt_str_arg(arguments, key).ok_or_else(|| {
        ToolError::InvalidParameters(format!("Missing required '{}' parameter", key))
    })
}

/// Optional non-negative integer argument; numeric strings ("2") are accepted too
pub fn opt_u64_arg(arguments: &Value, key: &str) -> Result<Option<u64>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(Some)
            .ok_or_else(|| {
                ToolError::InvalidParameters(format!("'{}' must be a non-negative number", key))
            }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| {
            ToolError::InvalidParameters(format!("'{}' must be a non-negative number", key))
        }),
        Some(_) => Err(ToolError::InvalidParameters(format!(
            "'{}' must be a non-negative number",
            key
        ))),
    }
}

/// Optional boolean argument; "yes"/"no" style strings are accepted too
pub fn opt_bool_arg(arguments: &Value, key: &str) -> Option<bool> {
    match arguments.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// String list argument; a single comma-separated string is split
pub fn str_list_arg(arguments: &Value, key: &str) -> Option<Vec<String>> {
    match arguments.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
        ),
        _ => None,
    }
}

pub(crate) fn check_cancelled(cancel_token: &CancellationToken) -> Result<(), ToolError> {
    if cancel_token.is_cancelled() {
        Err(ToolError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoToolbox;

    #[async_trait::async_trait]
    impl Toolbox for EchoToolbox {
        fn tools(&self) -> Vec<Tool> {
            vec![Tool::new(
                "echo",
                "Repeat the input",
                json!({
                    "type": "object",
                    "properties": {"input": {"type": "string"}},
                    "required": ["input"]
                }),
            )]
        }

        async fn call(
            &self,
            _name: &str,
            arguments: Value,
            cancel_token: CancellationToken,
        ) -> Result<ToolResult, ToolError> {
            check_cancelled(&cancel_token)?;
            Ok(ToolResult::Response(str_arg(&arguments, "input")?))
        }
    }

    #[test]
    fn test_tool_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.get_tools().len(), 0);
    }

    #[test]
    fn test_tool_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register_toolbox(Arc::new(EchoToolbox));

        let definitions = registry.get_tool_definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0]["type"], "function");
        assert_eq!(definitions[0]["function"]["name"], "echo");
        assert_eq!(
            definitions[0]["function"]["parameters"]["required"][0],
            "input"
        );
    }

    #[tokio::test]
    async fn test_execute_routes_to_toolbox() {
        let mut registry = ToolRegistry::new();
        registry.register_toolbox(Arc::new(EchoToolbox));

        let result = registry
            .execute_tool("echo", json!({"input": "namaste"}), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, ToolResult::Response("namaste".into()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let mut registry = ToolRegistry::new();
        registry.register_toolbox(Arc::new(EchoToolbox));

        assert!(registry.find_tool("advertised_only").is_none());
        let result = registry
            .execute_tool("advertised_only", json!({}), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register_toolbox(Arc::new(EchoToolbox));
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        let result = registry
            .execute_tool("echo", json!({"input": "x"}), cancel_token)
            .await;
        assert!(matches!(result, Err(ToolError::Cancelled)));
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({
            "name": "  Asha ",
            "blank": "   ",
            "qty": "2",
            "n": 3,
            "neg": -1,
            "flag": "yes",
            "extras": "sugar, cinnamon ,",
            "list": ["oat", ""]
        });

        assert_eq!(opt_str_arg(&args, "name").as_deref(), Some("Asha"));
        assert!(opt_str_arg(&args, "blank").is_none());
        assert!(matches!(str_arg(&args, "missing"), Err(ToolError::InvalidParameters(_))));
        assert_eq!(opt_u64_arg(&args, "qty").unwrap(), Some(2));
        assert_eq!(opt_u64_arg(&args, "n").unwrap(), Some(3));
        assert!(opt_u64_arg(&args, "neg").is_err());
        assert_eq!(opt_u64_arg(&args, "missing").unwrap(), None);
        assert_eq!(opt_bool_arg(&args, "flag"), Some(true));
        assert_eq!(
            str_list_arg(&args, "extras").unwrap(),
            vec!["sugar".to_string(), "cinnamon".to_string()]
        );
        assert_eq!(str_list_arg(&args, "list").unwrap(), vec!["oat".to_string()]);
    }
}
