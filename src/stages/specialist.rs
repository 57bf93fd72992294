//! 专家阶段
//!
//! 输入：最新工作流（格式化为任务指令 + 中间消息），memory 开关打开时前置该专家的
//! 全部历史工作流；可用工具 = 许可名单解析出的描述符 + 收尾用 evaluation 工具。
//! 产出普通工具调用进入工具派发，调用 evaluation（或纯文本）则进入任务评估。

use crate::core::{EvalKind, OrchestratorError, RunState, Stage, StageOutcome};
use crate::history::{
    extract_assignment, extract_workflows, flatten_workflows, format_workflow, Message,
};
use crate::llm::LlmClient;
use crate::prompts::PromptSet;
use crate::specialists::{evaluation_tool_spec, SpecialistRegistry};
use crate::tools::ToolExecutor;

pub async fn call_specialist(
    llm: &dyn LlmClient,
    specialists: &SpecialistRegistry,
    executor: &ToolExecutor,
    prompts: &PromptSet,
    state: &RunState,
    specialist_name: &str,
) -> StageOutcome {
    let fault = |error: OrchestratorError| {
        let diag = error.diagnostic_text();
        tracing::error!(stage = "specialist", specialist = %specialist_name, error = %diag, "stage fault");
        StageOutcome {
            current: Stage::Specialist(specialist_name.to_string()),
            name: "call_specialist",
            messages: vec![Message::assistant(diag)],
            next: Stage::Evaluation(EvalKind::Task),
        }
    };

    let Some(specialist) = specialists.get(specialist_name) else {
        return fault(OrchestratorError::UnknownSpecialist(
            specialist_name.to_string(),
        ));
    };
    let Some(assignment) = extract_assignment(state.store.all()) else {
        return fault(OrchestratorError::MissingAssignment);
    };

    let mut workflows = extract_workflows(state.store.all(), specialist_name);
    let Some(newest) = workflows.pop() else {
        return fault(OrchestratorError::MissingAssignment);
    };

    let mut messages = Vec::new();
    if assignment.memory {
        let historical: Vec<Vec<Message>> = workflows.iter().map(format_workflow).collect();
        messages.extend(flatten_workflows(&historical));
    }
    messages.extend(format_workflow(&newest));

    let mut tools = executor.registry().specs_for(&specialist.tools);
    tools.push(evaluation_tool_spec());

    let system = prompts.specialist_prompt(specialist_name);
    match llm
        .chat(&system, &messages, &tools, &["specialist", specialist_name])
        .await
    {
        Ok(mut reply) => {
            // 每轮只尊重第一个工具调用
            reply.tool_calls.truncate(1);
            let current = Stage::Specialist(specialist_name.to_string());
            let concludes = reply
                .tool_calls
                .first()
                .map(|call| call.name == "evaluation")
                .unwrap_or(true);
            if concludes {
                // evaluation 调用即宣告收尾：丢弃调用本身，文本进入任务评估；
                // 文本为空时什么都不追加，只做路由转移
                let messages = if reply.text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Message::assistant(reply.text)]
                };
                StageOutcome {
                    current,
                    name: "call_specialist",
                    messages,
                    next: Stage::Evaluation(EvalKind::Task),
                }
            } else {
                StageOutcome {
                    current,
                    name: "call_specialist",
                    messages: vec![Message::assistant_with_calls(reply.text, reply.tool_calls)],
                    next: Stage::ToolDispatch,
                }
            }
        }
        Err(e) => fault(OrchestratorError::Llm(e)),
    }
}
