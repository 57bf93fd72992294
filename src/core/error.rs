//! 编排错误类型
//!
//! 所有阶段函数以 StageOutcome 显式返回成功/故障后的路由，不让异常跨阶段传播；
//! 故障在阶段边界被转成诊断消息（kind + 描述）追加进日志，状态机强制走向安全的恢复阶段。

use thiserror::Error;

/// 编排过程中的错误（路由故障、调用故障、资源耗尽等）
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("tool execution failed: {0}")]
    ToolFailed(String),

    #[error("tool timed out: {0}")]
    ToolTimeout(String),

    #[error("unknown specialist: {0}")]
    UnknownSpecialist(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("no tool call in the latest message")]
    MissingToolCall,

    #[error("no pending assignment found in the message log")]
    MissingAssignment,

    #[error("malformed assignment: {0}")]
    MalformedAssignment(String),

    #[error("step limit exceeded after {0} transitions")]
    StepLimitExceeded(usize),

    #[error("run cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// 错误类别名（诊断消息的前缀，相当于异常类名）
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Llm(_) => "LlmError",
            OrchestratorError::ToolFailed(_) => "ToolExecutionError",
            OrchestratorError::ToolTimeout(_) => "ToolTimeoutError",
            OrchestratorError::UnknownSpecialist(_) => "UnknownSpecialistError",
            OrchestratorError::UnknownTool(_) => "UnknownToolError",
            OrchestratorError::MissingToolCall => "MissingToolCallError",
            OrchestratorError::MissingAssignment => "MissingAssignmentError",
            OrchestratorError::MalformedAssignment(_) => "MalformedAssignmentError",
            OrchestratorError::StepLimitExceeded(_) => "StepLimitExceededError",
            OrchestratorError::Cancelled => "CancelledError",
            OrchestratorError::Config(_) => "ConfigError",
        }
    }

    /// 诊断文本：`<Kind>: <描述>`，作为失败阶段的替身输出
    pub fn diagnostic_text(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
