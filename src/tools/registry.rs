//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! 由 ToolRegistry 按名注册与查找；执行返回 JSON 结果对象（约定含 `response` 字段，
//! 可选 `images` / `files`），ToolExecutor 在调用时加超时、过滤参数并统一转错误。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolSpec;

/// 会话上下文：工具可据此定位有状态资源（每会话工作目录等）
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub workspace: PathBuf,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            workspace: workspace.into(),
        }
    }

    /// 本会话的工作目录（懒创建由工具自行负责）
    pub fn session_dir(&self) -> PathBuf {
        self.workspace.join(&self.session_id)
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（工具调用中的 name 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能与依赖）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；properties 的键集即参数白名单
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 超时覆盖；None 时用执行器的全局超时。预算比全局大的慢工具（如沙箱）据此声明
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// 执行工具；返回 JSON 结果对象
    async fn execute(&self, args: Value, ctx: &SessionContext) -> Result<Value, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 单个工具的描述符
    pub fn spec(&self, name: &str) -> Option<ToolSpec> {
        self.tools.get(name).map(|tool| ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        })
    }

    /// 按名称列表生成描述符集（专家的许可工具集）；未注册的名字跳过
    pub fn specs_for(&self, names: &[String]) -> Vec<ToolSpec> {
        names.iter().filter_map(|n| self.spec(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo back the input text."
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(&self, args: Value, _ctx: &SessionContext) -> Result<Value, String> {
            Ok(serde_json::json!({
                "response": args.get("text").and_then(|v| v.as_str()).unwrap_or_default()
            }))
        }
    }

    #[test]
    fn test_register_and_spec() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert!(registry.contains("echo"));
        let spec = registry.spec("echo").unwrap();
        assert_eq!(spec.name, "echo");
        assert!(spec.parameters["properties"].get("text").is_some());
        assert!(registry.spec("missing").is_none());
    }

    #[test]
    fn test_specs_for_skips_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let specs = registry.specs_for(&["echo".to_string(), "ghost".to_string()]);
        assert_eq!(specs.len(), 1);
    }
}
