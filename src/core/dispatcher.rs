//! 编排器：按消息元数据里的 next 指针驱动阶段状态机
//!
//! 循环读取 RunState 的 next 投影，调用对应阶段函数并应用其产出，直到终态。
//! 携带步数上限（防失控循环）与协作式取消；两者触发时都先把诊断消息追加进
//! 日志再返回错误，使日志自身可解释运行为何中止。

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{OrchestratorError, RunState, Stage, StageOutcome};
use crate::history::Message;
use crate::llm::LlmClient;
use crate::prompts::PromptSet;
use crate::specialists::SpecialistRegistry;
use crate::stages;
use crate::tools::{SessionContext, ToolExecutor};

/// 默认步数上限（一步 = 一次阶段转移）
pub const DEFAULT_MAX_STEPS: usize = 500;

/// 阶段状态机的驱动器
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    specialists: SpecialistRegistry,
    tools: ToolExecutor,
    prompts: PromptSet,
    workspace: PathBuf,
    max_steps: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        specialists: SpecialistRegistry,
        tools: ToolExecutor,
        prompts: PromptSet,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            specialists,
            tools,
            prompts,
            workspace: workspace.into(),
            max_steps: DEFAULT_MAX_STEPS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// 取消令牌：外部持有者可据此中止进行中的运行
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 驱动一次请求直到终态；返回最终答案文本
    pub async fn run(&self, state: &mut RunState) -> Result<String, OrchestratorError> {
        let session = SessionContext::new(state.context.session_id.clone(), &self.workspace);
        let mut steps = 0usize;

        loop {
            let stage = state.next.clone();
            if stage.is_terminal() || stage == Stage::Start {
                break;
            }
            if self.cancel.is_cancelled() {
                let err = OrchestratorError::Cancelled;
                self.abort(state, &err);
                return Err(err);
            }
            if steps >= self.max_steps {
                let err = OrchestratorError::StepLimitExceeded(steps);
                self.abort(state, &err);
                return Err(err);
            }

            tracing::info!(stage = %stage, step = steps, "stage transition");
            let outcome = match &stage {
                Stage::Manager => {
                    stages::call_manager(
                        self.llm.as_ref(),
                        &self.specialists,
                        &self.prompts,
                        state,
                    )
                    .await
                }
                Stage::SpecialistDispatch => {
                    stages::call_specialist_dispatch(&self.specialists, state)
                }
                Stage::Specialist(name) => {
                    stages::call_specialist(
                        self.llm.as_ref(),
                        &self.specialists,
                        &self.tools,
                        &self.prompts,
                        state,
                        name,
                    )
                    .await
                }
                Stage::ToolDispatch => {
                    stages::call_tool_dispatch(&self.tools, state, &session).await
                }
                Stage::Evaluation(kind) => {
                    stages::call_evaluation(self.llm.as_ref(), &self.prompts, state, *kind).await
                }
                Stage::Start | Stage::Terminal => unreachable!("handled above"),
            };
            state.apply(outcome);
            steps += 1;
        }

        tracing::info!(steps, "run reached terminal stage");
        Ok(state.final_answer())
    }

    /// 运行中止：诊断消息入日志、路由置终态，再由调用方返回错误
    fn abort(&self, state: &mut RunState, error: &OrchestratorError) {
        let diag = error.diagnostic_text();
        tracing::error!(error = %diag, "run aborted");
        state.apply(StageOutcome {
            current: state.next.clone(),
            name: "orchestrator",
            messages: vec![Message::assistant(diag)],
            next: Stage::Terminal,
        });
    }
}
