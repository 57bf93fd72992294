//! CLI 入口：读取配置，把命令行参数作为用户问题跑一次编排

use anyhow::Context as _;
use hive::core::{EventSink, StateEvent};
use hive::{config, observability, runtime, RunContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    anyhow::ensure!(!question.trim().is_empty(), "usage: hive <question>");

    let cfg = config::load_config(None).context("loading configuration")?;
    let llm = runtime::create_llm(&cfg, None);
    let orchestrator = runtime::build_orchestrator(&cfg, llm.clone())?;

    // 事件快照 → 进度日志
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<StateEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(current = %event.current, next = %event.next, by = %event.name, "state snapshot");
        }
    });

    let context = RunContext {
        model: cfg.llm.model.clone(),
        api_key: None,
        session_id: uuid::Uuid::new_v4().to_string(),
    };
    let (answer, _state) = runtime::run_request(&orchestrator, &question, context, EventSink::new(tx)).await?;

    let (prompt, completion, total) = llm.token_usage();
    tracing::info!(prompt, completion, total, "token usage");

    println!("{}", answer);
    Ok(())
}
