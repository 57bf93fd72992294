//! 派发阶段：专家派发与工具派发
//!
//! 专家派发校验管理者指派的专家名并产出接通确认（工具结果消息）；
//! 工具派发取最近 assistant 消息的首个工具调用交给执行器，按结果载荷是否含
//! `images` 决定走视觉评估还是工具评估。两者的故障都转成诊断消息并路由到评估，
//! 让评估环节消化故障而非中断运行。

use crate::core::{EvalKind, OrchestratorError, RunState, Stage, StageOutcome};
use crate::history::{value_contains_images, Message};
use crate::specialists::SpecialistRegistry;
use crate::tools::{SessionContext, ToolExecutor};

/// 校验指派的专家名；合法则接通，未知则以诊断消息回给任务评估
pub fn call_specialist_dispatch(
    specialists: &SpecialistRegistry,
    state: &RunState,
) -> StageOutcome {
    let Some(call) = state.store.last().and_then(|m| m.first_tool_call().cloned()) else {
        let diag = OrchestratorError::MissingToolCall.diagnostic_text();
        tracing::error!(stage = "specialist_dispatch", error = %diag, "stage fault");
        return StageOutcome {
            current: Stage::SpecialistDispatch,
            name: "call_specialist_dispatch",
            messages: vec![Message::assistant(diag)],
            next: Stage::Evaluation(EvalKind::Task),
        };
    };

    if specialists.contains(&call.name) {
        let ack = serde_json::json!({
            "response": format!("Connected to the {} specialist.", call.name)
        });
        StageOutcome {
            current: Stage::SpecialistDispatch,
            name: "call_specialist_dispatch",
            messages: vec![Message::tool_result(ack.to_string(), call.call_id)],
            next: Stage::Specialist(call.name),
        }
    } else {
        let diag = OrchestratorError::UnknownSpecialist(call.name.clone()).diagnostic_text();
        tracing::error!(stage = "specialist_dispatch", error = %diag, "stage fault");
        let payload = serde_json::json!({ "response": diag });
        StageOutcome {
            current: Stage::SpecialistDispatch,
            name: "call_specialist_dispatch",
            messages: vec![Message::tool_result(payload.to_string(), call.call_id)],
            next: Stage::Evaluation(EvalKind::Task),
        }
    }
}

/// 执行专家请求的工具调用；结果载荷含 `images` 时路由到视觉评估
pub async fn call_tool_dispatch(
    executor: &ToolExecutor,
    state: &RunState,
    session: &SessionContext,
) -> StageOutcome {
    let Some(call) = state.store.last().and_then(|m| m.first_tool_call().cloned()) else {
        let diag = OrchestratorError::MissingToolCall.diagnostic_text();
        tracing::error!(stage = "tool_dispatch", error = %diag, "stage fault");
        return StageOutcome {
            current: Stage::ToolDispatch,
            name: "call_tool_dispatch",
            messages: vec![Message::assistant(diag)],
            next: Stage::Evaluation(EvalKind::Tool),
        };
    };

    match executor
        .execute(&call.name, call.arguments.clone(), session)
        .await
    {
        Ok(value) => {
            let next = if value_contains_images(&value) {
                Stage::Evaluation(EvalKind::Visual)
            } else {
                Stage::Evaluation(EvalKind::Tool)
            };
            StageOutcome {
                current: Stage::ToolDispatch,
                name: "call_tool_dispatch",
                messages: vec![Message::tool_result(value.to_string(), call.call_id)],
                next,
            }
        }
        Err(e) => {
            let diag = e.diagnostic_text();
            tracing::error!(stage = "tool_dispatch", tool = %call.name, error = %diag, "stage fault");
            let payload = serde_json::json!({ "response": diag });
            StageOutcome {
                current: Stage::ToolDispatch,
                name: "call_tool_dispatch",
                messages: vec![Message::tool_result(payload.to_string(), call.call_id)],
                next: Stage::Evaluation(EvalKind::Tool),
            }
        }
    }
}
