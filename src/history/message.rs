//! 消息模型：角色、内容分段、工具调用与路由元数据
//!
//! 每条消息在追加进 MessageStore 时一次性打上 {current, next, name} 元数据，之后不再修改；
//! ensure_content 保证格式化后内容非空（空文本替换为哨兵占位），下游消费者永远不会看到空内容。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Stage;

/// 空文本哨兵：格式化后内容为空时的占位
pub const EMPTY_MESSAGE_SENTINEL: &str = "EMPTY MESSAGE";

/// 消息角色（与 LLM API 对齐）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

/// 内容分段：文本或图像引用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// 图像引用：download_link 可为本地路径、http(s) URL 或 data URL
    ImageRef {
        name: String,
        mime_type: String,
        download_link: String,
    },
}

/// 请求下游调用的工具调用（仅 assistant 消息携带）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub call_id: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            call_id: uuid::Uuid::new_v4().to_string(),
            arguments,
        }
    }
}

/// 路由元数据：产出阶段、选定的下一阶段、产出组件名
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub current: Stage,
    pub next: Stage,
    pub name: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            current: Stage::Start,
            next: Stage::Start,
            name: String::new(),
        }
    }
}

/// 对话/动作的原子单元
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// 工具结果消息对应的请求 call_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: Vec::new(),
            tool_call_id: None,
            metadata: Metadata::default(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: Vec::new(),
            tool_call_id: None,
            metadata: Metadata::default(),
        }
    }

    pub fn assistant_with_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(text)
        }
    }

    pub fn tool_result(text: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
            metadata: Metadata::default(),
        }
    }

    /// 所有文本分段拼接后的纯文本视图
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageRef { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 首个请求的工具调用（每轮只尊重第一个，其余丢弃）
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }

    /// 内容非空不变量：首段缺失或为空文本时，前插哨兵文本
    pub fn ensure_content(mut self) -> Self {
        let blank_head = match self.content.first() {
            None => true,
            Some(ContentPart::Text { text }) => text.trim().is_empty(),
            Some(ContentPart::ImageRef { .. }) => true,
        };
        if blank_head {
            self.content.insert(
                0,
                ContentPart::Text {
                    text: EMPTY_MESSAGE_SENTINEL.to_string(),
                },
            );
        }
        self
    }
}
