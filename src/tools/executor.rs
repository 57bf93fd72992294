//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时：execute 前先把调用方参数按工具声明的参数集做严格白名单
//! 过滤（未知键静默丢弃——有界但宽容的策略），再在超时内调用；超时或失败转为
//! OrchestratorError（ToolTimeout / ToolFailed）；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::OrchestratorError;
use crate::tools::{SessionContext, ToolRegistry};

/// 工具执行器：参数过滤 + 超时 + 审计
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 按工具声明的 properties 键集过滤参数；未知键丢弃并记 debug 日志
    pub fn filter_args(&self, tool_name: &str, args: Value) -> Value {
        let Some(tool) = self.registry.get(tool_name) else {
            return args;
        };
        let schema = tool.parameters_schema();
        let Some(allowed) = schema.get("properties").and_then(|p| p.as_object()) else {
            return args;
        };
        let Value::Object(map) = args else {
            return Value::Object(serde_json::Map::new());
        };

        let mut filtered = serde_json::Map::new();
        for (key, value) in map {
            if allowed.contains_key(&key) {
                filtered.insert(key, value);
            } else {
                tracing::debug!(tool = %tool_name, arg = %key, "dropping undeclared tool argument");
            }
        }
        Value::Object(filtered)
    }

    /// 执行指定工具；未知名返回 UnknownTool，超时返回 ToolTimeout，工具 Err 转 ToolFailed
    pub async fn execute(
        &self,
        tool_name: &str,
        args: Value,
        ctx: &SessionContext,
    ) -> Result<Value, OrchestratorError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| OrchestratorError::UnknownTool(tool_name.to_string()))?;

        let args = self.filter_args(tool_name, args);
        let args_preview = args_preview(&args);
        let start = Instant::now();

        // 工具自带的超时覆盖优先于全局超时
        let budget = tool.timeout().unwrap_or(self.timeout);
        let result = timeout(budget, tool.execute(args, ctx)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "session": ctx.session_id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OrchestratorError::ToolFailed(e)),
            Err(_) => Err(OrchestratorError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Sleeps longer than the executor timeout."
        }
        async fn execute(&self, _args: Value, _ctx: &SessionContext) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(serde_json::json!({ "response": "late" }))
        }
    }

    struct ArgEchoTool;

    #[async_trait]
    impl Tool for ArgEchoTool {
        fn name(&self) -> &str {
            "arg_echo"
        }
        fn description(&self) -> &str {
            "Echoes the filtered arguments back."
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })
        }
        async fn execute(&self, args: Value, _ctx: &SessionContext) -> Result<Value, String> {
            Ok(serde_json::json!({ "response": args }))
        }
    }

    fn ctx() -> SessionContext {
        SessionContext::new("test", std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_unknown_keys_silently_dropped() {
        let mut registry = ToolRegistry::new();
        registry.register(ArgEchoTool);
        let executor = ToolExecutor::new(registry, 5);

        let args = serde_json::json!({ "query": "x", "state": { "huge": true }, "extra": 1 });
        let result = executor.execute("arg_echo", args, &ctx()).await.unwrap();
        assert_eq!(result["response"], serde_json::json!({ "query": "x" }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error() {
        let executor = ToolExecutor::new(ToolRegistry::new(), 5);
        let err = executor
            .execute("ghost", serde_json::json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownTool(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_tool_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);
        let executor = ToolExecutor::new(registry, 1);
        let err = executor
            .execute("slow", serde_json::json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolTimeout(_)));
    }

    struct SlowToolWithBudget;

    #[async_trait]
    impl Tool for SlowToolWithBudget {
        fn name(&self) -> &str {
            "slow_budgeted"
        }
        fn description(&self) -> &str {
            "Sleeps past the global timeout but within its own budget."
        }
        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_secs(10))
        }
        async fn execute(&self, _args: Value, _ctx: &SessionContext) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(serde_json::json!({ "response": "finished" }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_override_beats_global() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowToolWithBudget);
        // 全局 1 秒，但工具声明了 10 秒预算
        let executor = ToolExecutor::new(registry, 1);
        let result = executor
            .execute("slow_budgeted", serde_json::json!({}), &ctx())
            .await
            .unwrap();
        assert_eq!(result["response"], "finished");
    }
}
