//! 消息仓库：带路由元数据的 append-only 有序日志
//!
//! 只有 append；没有删除与原位修改。每条消息在插入前打上 {current, next, name} 并补齐
//! 非空内容哨兵，之后任何组件都只读它。

use crate::core::Stage;
use crate::history::{Message, Metadata};

/// append-only 消息日志
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一批消息，逐条打上元数据并保证非空内容
    pub fn append(
        &mut self,
        messages: Vec<Message>,
        current: &Stage,
        next: &Stage,
        name: &str,
    ) {
        for mut msg in messages {
            msg.metadata = Metadata {
                current: current.clone(),
                next: next.clone(),
                name: name.to_string(),
            };
            self.messages.push(msg.ensure_content());
        }
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 克隆全部消息（事件快照用）
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
