//! 运行时装配：从配置构建 LLM、工具集、专家表与编排器
//!
//! LLM 工厂按 provider 与凭证可用性选择后端：openai 且持有 API Key 时走真实端点，
//! 否则回落到脚本化 Mock（离线与测试场景）。SQL 后端未配置数据库文件时用内存库。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::config::AppConfig;
use crate::core::{EventSink, Orchestrator, RunContext, RunState};
use crate::llm::{LlmClient, OpenAiClient, ScriptedLlm};
use crate::prompts::PromptSet;
use crate::specialists;
use crate::tools::{
    LiteratureSearchTool, PythonSandboxTool, SearchNameTool, SqlGetSchemaTool, SqlListTablesTool,
    SqlQueryTool, SqlStore, ToolExecutor, ToolRegistry,
};

/// 名称消歧的可检索列 → 所在表
fn searchable_name_columns() -> HashMap<String, String> {
    let mut columns = HashMap::new();
    columns.insert("field_name".to_string(), "fields".to_string());
    columns.insert("institution_name".to_string(), "institutions".to_string());
    columns
}

/// 按配置与凭证选择 LLM 后端
pub fn create_llm(cfg: &AppConfig, api_key: Option<&str>) -> Arc<dyn LlmClient> {
    let key = api_key
        .map(String::from)
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    if cfg.llm.provider == "openai" && key.is_some() {
        tracing::info!(model = %cfg.llm.model, "using OpenAI-compatible backend");
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            key.as_deref(),
        ))
    } else {
        tracing::warn!("no usable LLM credentials, falling back to scripted mock");
        Arc::new(ScriptedLlm::new())
    }
}

/// 会话工作目录根
pub fn workspace_root(cfg: &AppConfig) -> PathBuf {
    cfg.app
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("./workspace"))
}

/// 从配置装配编排器
pub fn build_orchestrator(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> anyhow::Result<Orchestrator> {
    let store = match &cfg.tools.sql.database_path {
        Some(path) => Arc::new(
            SqlStore::open(path)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("opening database {}", path.display()))?,
        ),
        None => Arc::new(SqlStore::open_in_memory().map_err(anyhow::Error::msg)?),
    };

    let mut registry = ToolRegistry::new();
    registry.register(SqlListTablesTool::new(store.clone()));
    registry.register(SqlGetSchemaTool::new(store.clone()));
    registry.register(SqlQueryTool::new(store.clone()));
    registry.register(SearchNameTool::new(store, searchable_name_columns()));
    registry.register(PythonSandboxTool::new(
        cfg.tools.sandbox.python_bin.as_str(),
        cfg.tools.sandbox.timeout_secs,
    ));
    if let Some(endpoint) = &cfg.tools.literature.endpoint {
        registry.register(LiteratureSearchTool::new(
            endpoint.as_str(),
            cfg.tools.literature.timeout_secs,
            cfg.tools.literature.max_result_chars,
        ));
    } else {
        tracing::warn!("literature search endpoint not configured, search_literature disabled");
    }

    let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);
    let specialists = specialists::builtin();
    let prompts = PromptSet::load(cfg.app.prompt_dir.as_deref(), &specialists.names());

    Ok(
        Orchestrator::new(llm, specialists, executor, prompts, workspace_root(cfg))
            .with_max_steps(cfg.router.max_steps),
    )
}

/// 驱动一次请求到终态；返回最终答案与完整运行状态（含消息日志）
pub async fn run_request(
    orchestrator: &Orchestrator,
    question: &str,
    context: RunContext,
    events: EventSink,
) -> anyhow::Result<(String, RunState)> {
    let mut state = RunState::new(question, context, events);
    let answer = orchestrator
        .run(&mut state)
        .await
        .context("orchestration run failed")?;
    Ok((answer, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fallback_without_credentials() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let llm = create_llm(&cfg, None);
        // Mock 的 token 统计恒为零
        assert_eq!(llm.token_usage(), (0, 0, 0));
    }

    #[test]
    fn test_build_orchestrator_with_defaults() {
        let cfg = AppConfig::default();
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new());
        assert!(build_orchestrator(&cfg, llm).is_ok());
    }

    #[tokio::test]
    async fn test_run_request_reaches_terminal() {
        let cfg = AppConfig::default();
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("the answer");
        let orchestrator = build_orchestrator(&cfg, llm).unwrap();

        let (answer, state) = run_request(
            &orchestrator,
            "a question",
            RunContext::default(),
            EventSink::disabled(),
        )
        .await
        .unwrap();
        assert_eq!(answer, "the answer");
        assert!(state.next.is_terminal());
    }
}
