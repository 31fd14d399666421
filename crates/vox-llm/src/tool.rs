use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use vox_foundation::error::VoxError;

/// A callable tool exposed to the model (spec §6 `Function`).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// The JSON schema describing this tool's call signature, included in
    /// the chat request's tools field.
    fn schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String, VoxError>;
}

/// Looks tools up by name for the turn orchestrator's tool-call loop.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The tools schema array sent alongside a chat request.
    pub fn schema(&self) -> Value {
        Value::Array(self.tools.values().map(|t| t.schema()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn schema(&self) -> Value {
            json!({"name": "echo"})
        }

        async fn execute(&self, args: Value) -> Result<String, VoxError> {
            Ok(args.to_string())
        }
    }

    #[tokio::test]
    async fn registry_resolves_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let tool = registry.get("echo").expect("registered");
        let out = tool.execute(json!({"q": 1})).await.unwrap();
        assert_eq!(out, "{\"q\":1}");
        assert!(registry.get("missing").is_none());
    }
}
