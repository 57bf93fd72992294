//! 评估阶段
//!
//! 三个变体共用一个入口，差异在输入构造、抽取的结论分段与成功后的去向：
//! - task_eval：（memory 开关下的）历史工作流 + 最新工作流，抽 thinking/reflection/reward，回管理者；
//! - tool_eval：最新工作流，抽 reflection/reward，回当前专家；
//! - visual_eval：任务指令 + 多模态展开后的最新工具结果，抽 caption/reflection/reward，回当前专家。
//! 缺失分段得到空字段（哨兵占位），LLM 故障转诊断消息但沿用相同去向。

use crate::core::{EvalKind, OrchestratorError, RunState, Stage, StageOutcome};
use crate::history::{
    extract_assignment, extract_tags_from_text, extract_workflows, flatten_workflows,
    format_workflow, into_multimodal, Message,
};
use crate::llm::LlmClient;
use crate::prompts::PromptSet;

pub async fn call_evaluation(
    llm: &dyn LlmClient,
    prompts: &PromptSet,
    state: &RunState,
    kind: EvalKind,
) -> StageOutcome {
    let current = Stage::Evaluation(kind);

    let Some(assignment) = extract_assignment(state.store.all()) else {
        let diag = OrchestratorError::MissingAssignment.diagnostic_text();
        tracing::error!(stage = "evaluation", error = %diag, "stage fault");
        return StageOutcome {
            current,
            name: "call_evaluation",
            messages: vec![Message::assistant(diag)],
            next: Stage::Manager,
        };
    };
    let specialist = assignment.specialist.clone();

    // 成功与故障共用同一去向：task_eval 回管理者，其余回当前专家
    let next = match kind {
        EvalKind::Task => Stage::Manager,
        EvalKind::Tool | EvalKind::Visual => Stage::Specialist(specialist.clone()),
    };

    let mut workflows = extract_workflows(state.store.all(), &specialist);
    let Some(newest) = workflows.pop() else {
        let diag = OrchestratorError::MissingAssignment.diagnostic_text();
        tracing::error!(stage = "evaluation", error = %diag, "stage fault");
        return StageOutcome {
            current,
            name: "call_evaluation",
            messages: vec![Message::assistant(diag)],
            next: Stage::Manager,
        };
    };

    let (system, messages, tags): (&str, Vec<Message>, &[&str]) = match kind {
        EvalKind::Task => {
            let mut messages = Vec::new();
            if assignment.memory {
                let historical: Vec<Vec<Message>> =
                    workflows.iter().map(format_workflow).collect();
                messages.extend(flatten_workflows(&historical));
            }
            messages.extend(format_workflow(&newest));
            (
                prompts.task_eval.as_str(),
                messages,
                &["thinking", "reflection", "reward"],
            )
        }
        EvalKind::Tool => (
            prompts.tool_eval.as_str(),
            format_workflow(&newest),
            &["reflection", "reward"],
        ),
        EvalKind::Visual => {
            let formatted = format_workflow(&newest);
            let mut messages = Vec::new();
            if let Some(head) = formatted.first() {
                messages.push(head.clone());
            }
            if let Some(last) = newest.last() {
                messages.push(into_multimodal(last).await);
            }
            (
                prompts.visual_eval.as_str(),
                messages,
                &["caption", "reflection", "reward"],
            )
        }
    };

    let stage_token = current.to_string();
    match llm
        .chat(system, &messages, &[], &["evaluation", &stage_token])
        .await
    {
        Ok(reply) => {
            let conclusion = extract_tags_from_text(&reply.text, tags);
            StageOutcome {
                current,
                name: "call_evaluation",
                messages: vec![Message::assistant(conclusion)],
                next,
            }
        }
        Err(e) => {
            let diag = OrchestratorError::Llm(e).diagnostic_text();
            tracing::error!(stage = "evaluation", error = %diag, "stage fault");
            StageOutcome {
                current,
                name: "call_evaluation",
                messages: vec![Message::assistant(diag)],
                next,
            }
        }
    }
}
