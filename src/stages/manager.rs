//! 管理者阶段
//!
//! 输入：剥离内部推理标注后的完整消息日志 + 末尾的引导消息；可用工具 = 全部专家描述符。
//! 产出带工具调用的 assistant 消息则进入专家派发，纯文本则视为最终合成答案直达终态。
//! LLM 故障转诊断消息并安全终止。

use crate::core::{OrchestratorError, RunState, Stage, StageOutcome};
use crate::history::{strip_tags_from_messages, Message};
use crate::llm::LlmClient;
use crate::prompts::PromptSet;
use crate::specialists::SpecialistRegistry;

pub async fn call_manager(
    llm: &dyn LlmClient,
    specialists: &SpecialistRegistry,
    prompts: &PromptSet,
    state: &RunState,
) -> StageOutcome {
    let mut messages = strip_tags_from_messages(state.store.all(), &["thinking"]);
    messages.push(Message::user(prompts.steering.clone()));
    let tools = specialists.descriptors();

    match llm
        .chat(&prompts.manager, &messages, &tools, &["manager"])
        .await
    {
        Ok(mut reply) => {
            // 每轮只尊重第一个工具调用
            reply.tool_calls.truncate(1);
            if reply.tool_calls.is_empty() {
                StageOutcome {
                    current: Stage::Manager,
                    name: "call_manager",
                    messages: vec![Message::assistant(reply.text)],
                    next: Stage::Terminal,
                }
            } else {
                StageOutcome {
                    current: Stage::Manager,
                    name: "call_manager",
                    messages: vec![Message::assistant_with_calls(reply.text, reply.tool_calls)],
                    next: Stage::SpecialistDispatch,
                }
            }
        }
        Err(e) => {
            let diag = OrchestratorError::Llm(e).diagnostic_text();
            tracing::error!(stage = "manager", error = %diag, "stage fault");
            StageOutcome {
                current: Stage::Manager,
                name: "call_manager",
                messages: vec![Message::assistant(diag)],
                next: Stage::Terminal,
            }
        }
    }
}
