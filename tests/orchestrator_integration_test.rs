//! 端到端编排集成测试：脚本化 LLM 驱动完整的 管理者→专家→工具→评估 回路

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use hive::core::{EvalKind, EventSink, Orchestrator, RunContext, RunState, Stage};
use hive::llm::{LlmReply, ScriptedLlm};
use hive::prompts::PromptSet;
use hive::specialists;
use hive::tools::{SessionContext, Tool, ToolExecutor, ToolRegistry};

struct TableListTool;

#[async_trait]
impl Tool for TableListTool {
    fn name(&self) -> &str {
        "sql_list_tables"
    }
    fn description(&self) -> &str {
        "Lists database tables."
    }
    async fn execute(&self, _args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        Ok(json!({ "response": "| TableName |\n| papers |\n| institutions |" }))
    }
}

struct PlotTool;

#[async_trait]
impl Tool for PlotTool {
    fn name(&self) -> &str {
        "python"
    }
    fn description(&self) -> &str {
        "Runs python and returns a figure."
    }
    async fn execute(&self, _args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        Ok(json!({
            "response": "figure saved",
            "images": [{
                "name": "trend.png",
                "mime_type": "image/png",
                "download_link": "https://example.org/trend.png",
            }]
        }))
    }
}

fn orchestrator(llm: Arc<ScriptedLlm>) -> Orchestrator {
    let mut registry = ToolRegistry::new();
    registry.register(TableListTool);
    registry.register(PlotTool);
    let specialists = specialists::builtin();
    let prompts = PromptSet::defaults(&specialists.names());
    Orchestrator::new(
        llm,
        specialists,
        ToolExecutor::new(registry, 5),
        prompts,
        std::env::temp_dir(),
    )
}

fn stage_route(state: &RunState) -> Vec<String> {
    state
        .store
        .all()
        .iter()
        .map(|m| m.metadata.current.to_string())
        .collect()
}

#[tokio::test]
async fn full_database_workflow_reaches_final_answer() {
    let llm = Arc::new(ScriptedLlm::new());
    // 管理者指派 → 专家查表 → 工具评估 → 专家收尾 → 任务评估 → 管理者合成
    llm.push_tool_call("database", json!({ "task": "list all tables", "memory": false }));
    llm.push_tool_call("sql_list_tables", json!({}));
    llm.push_text("<reflection>table list looks complete</reflection><reward>0.9</reward>");
    llm.push_reply(LlmReply {
        text: "The database exposes papers and institutions tables.".to_string(),
        tool_calls: vec![hive::history::ToolCall::new("evaluation", json!({}))],
    });
    llm.push_text("<thinking>t</thinking><reflection>task done</reflection><reward>0.9</reward>");
    llm.push_text("The database has two tables: papers and institutions.");

    let mut state = RunState::new(
        "what tables does the database have?",
        RunContext::default(),
        EventSink::disabled(),
    );
    let answer = orchestrator(llm.clone()).run(&mut state).await.unwrap();

    assert_eq!(answer, "The database has two tables: papers and institutions.");
    assert_eq!(
        stage_route(&state),
        vec![
            "start",
            "manager",
            "specialist_dispatch",
            "specialist:database",
            "tool_dispatch",
            "evaluation:tool_eval",
            "specialist:database",
            "evaluation:task_eval",
            "manager",
        ]
    );

    // 专家回合收到许可工具 + evaluation 收尾工具，评估回合不绑定工具
    let calls = llm.recorded_calls();
    assert!(calls[1].tool_names.contains(&"evaluation".to_string()));
    assert!(calls[2].tool_names.is_empty());
    assert!(calls[2].tags.contains(&"evaluation:tool_eval".to_string()));
}

#[tokio::test]
async fn image_payload_routes_through_visual_eval() {
    let llm = Arc::new(ScriptedLlm::new());
    llm.push_tool_call("analytics", json!({ "task": "plot the trend", "memory": false }));
    llm.push_tool_call("python", json!({ "query": "plot()" }));
    llm.push_text("<caption>an upward trend</caption><reflection>legible</reflection><reward>1.0</reward>");
    llm.push_text("Trend plotted and verified."); // 专家收尾（纯文本）
    llm.push_text("<reflection>figure delivered</reflection><reward>1.0</reward>");
    llm.push_text("Here is the trend figure.");

    let mut state = RunState::new("plot it", RunContext::default(), EventSink::disabled());
    orchestrator(llm.clone()).run(&mut state).await.unwrap();

    let route = stage_route(&state);
    assert!(route.contains(&"evaluation:visual_eval".to_string()));
    assert!(!route.contains(&"evaluation:tool_eval".to_string()));

    // visual_eval 输入 = 任务指令 + 多模态化的工具结果
    let calls = llm.recorded_calls();
    assert_eq!(calls[2].message_count, 2);
}

#[tokio::test]
async fn unknown_specialist_is_contained_and_run_still_terminates() {
    let llm = Arc::new(ScriptedLlm::new());
    llm.push_tool_call("geology", json!({ "task": "dig", "memory": false }));
    llm.push_text("<reflection>no such specialist</reflection><reward>0.0</reward>");
    llm.push_text("I cannot route that task; no geology specialist exists.");

    let mut state = RunState::new("analyze rocks", RunContext::default(), EventSink::disabled());
    let answer = orchestrator(llm).run(&mut state).await.unwrap();

    assert_eq!(answer, "I cannot route that task; no geology specialist exists.");
    let diagnostic = state
        .store
        .all()
        .iter()
        .find(|m| m.text().contains("UnknownSpecialistError"))
        .expect("diagnostic message in log");
    assert_eq!(diagnostic.metadata.current, Stage::SpecialistDispatch);
    assert_eq!(diagnostic.metadata.next, Stage::Evaluation(EvalKind::Task));
}

#[tokio::test]
async fn snapshots_grow_monotonically_and_match_final_log() {
    let llm = Arc::new(ScriptedLlm::new());
    llm.push_tool_call("database", json!({ "task": "t", "memory": false }));
    llm.push_text("done");
    llm.push_text("<reflection>r</reflection><reward>1.0</reward>");
    llm.push_text("final");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut state = RunState::new("q", RunContext::default(), EventSink::new(tx));
    orchestrator(llm).run(&mut state).await.unwrap();

    let mut lengths = Vec::new();
    let mut last_snapshot = Vec::new();
    while let Ok(event) = rx.try_recv() {
        lengths.push(event.messages.len());
        last_snapshot = event.messages;
    }
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(last_snapshot.len(), state.store.len());
    assert_eq!(
        last_snapshot.last().unwrap().text(),
        state.store.last().unwrap().text()
    );
}

#[tokio::test]
async fn llm_outage_degrades_to_diagnostic_answer() {
    let llm = Arc::new(ScriptedLlm::new());
    llm.push_error("upstream unavailable");

    let mut state = RunState::new("q", RunContext::default(), EventSink::disabled());
    let answer = orchestrator(llm).run(&mut state).await.unwrap();
    assert!(answer.starts_with("LlmError:"));
    assert!(state.next.is_terminal());
}
