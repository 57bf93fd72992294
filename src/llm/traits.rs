//! 推理能力抽象
//!
//! 外部协作者：接受 system 提示、有序消息列表、可选的工具描述集与观测标签，
//! 返回一条回复（文本和/或请求的工具调用）。空工具集即「不绑定工具」模式，供评估调用使用。

use async_trait::async_trait;
use serde_json::Value;

use crate::history::{Message, ToolCall};

/// 可调用工具/专家的描述符（名称、说明、参数 JSON Schema）
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 一次推理调用的回复
#[derive(Clone, Debug, Default)]
pub struct LlmReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// LLM 客户端 trait：chat（一次完成）+ 累计 token 统计
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 一次推理调用；tools 为空时不绑定任何工具；tags 仅用于观测
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        tags: &[&str],
    ) -> Result<LlmReply, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
