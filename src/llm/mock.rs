//! 脚本化 Mock LLM 客户端（用于测试，无需 API）
//!
//! 预先压入一串回复（文本 / 工具调用 / 错误），chat 按序弹出；
//! 同时记录每次调用收到的工具名集合与标签，便于断言路由行为。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::history::{Message, ToolCall};
use crate::llm::{LlmClient, LlmReply, ToolSpec};

/// 一次被记录的调用：提供给 LLM 的工具名与观测标签
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub tool_names: Vec<String>,
    pub tags: Vec<String>,
    pub message_count: usize,
}

/// 脚本化客户端：按压入顺序回放回复
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<LlmReply, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted llm lock")
            .push_back(Ok(LlmReply::text_only(text)));
    }

    pub fn push_tool_call(&self, name: impl Into<String>, arguments: Value) {
        self.replies
            .lock()
            .expect("scripted llm lock")
            .push_back(Ok(LlmReply {
                text: String::new(),
                tool_calls: vec![ToolCall::new(name, arguments)],
            }));
    }

    pub fn push_reply(&self, reply: LlmReply) {
        self.replies
            .lock()
            .expect("scripted llm lock")
            .push_back(Ok(reply));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted llm lock")
            .push_back(Err(message.into()));
    }

    /// 已发生的调用记录
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("scripted llm lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        _system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        tags: &[&str],
    ) -> Result<LlmReply, String> {
        self.calls.lock().expect("scripted llm lock").push(RecordedCall {
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            message_count: messages.len(),
        });
        self.replies
            .lock()
            .expect("scripted llm lock")
            .pop_front()
            .unwrap_or_else(|| Err("scripted llm exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let llm = ScriptedLlm::new();
        llm.push_text("first");
        llm.push_error("boom");

        let r1 = llm.chat("", &[], &[], &[]).await.unwrap();
        assert_eq!(r1.text, "first");
        let r2 = llm.chat("", &[], &[], &[]).await;
        assert_eq!(r2.unwrap_err(), "boom");
        // 脚本耗尽后继续报错而非 panic
        assert!(llm.chat("", &[], &[], &[]).await.is_err());
    }
}
