//! 状态变更事件：每次追加后向外部观察者推送完整快照
//!
//! fire-and-forget：接收端关闭或缺失都不影响路由正确性，emit 永不阻塞、永不报错。

use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::Stage;
use crate::history::Message;

/// 序列化快照：{current, next, name, messages}
#[derive(Clone, Debug, Serialize)]
pub struct StateEvent {
    pub current: Stage,
    pub next: Stage,
    pub name: String,
    pub messages: Vec<Message>,
}

/// 事件接收端（可选注入）：核心只调用、不依赖
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<StateEvent>>,
}

impl EventSink {
    /// 不向任何地方推送的空接收端
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(tx: mpsc::UnboundedSender<StateEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// 推送一次快照；发送失败只记 debug 日志
    pub fn emit(&self, event: StateEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("state event receiver dropped, snapshot discarded");
            }
        }
    }
}
