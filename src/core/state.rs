//! 运行状态：消息仓库 + 路由投影 + 运行配置
//!
//! 每个阶段函数是 (当前日志, 当前阶段) 的纯函数，产出 StageOutcome{消息, 下一阶段}；
//! RunState::apply 统一负责打元数据、追加、投影 current/next/name 并推送事件快照。

use serde::{Deserialize, Serialize};

use crate::core::{EventSink, Stage, StateEvent};
use crate::history::{Message, MessageStore};

/// 透传的运行配置：模型、可选 API 凭证、会话标识（限定沙箱等有状态资源的作用域）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunContext {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub session_id: String,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            api_key: None,
            session_id: "test".to_string(),
        }
    }
}

/// 一个阶段的产出：谁产出的（current/name）、产出了什么消息、下一步去哪
#[derive(Debug)]
pub struct StageOutcome {
    pub current: Stage,
    pub name: &'static str,
    pub messages: Vec<Message>,
    pub next: Stage,
}

/// 单次请求的完整运行状态
pub struct RunState {
    pub store: MessageStore,
    pub current: Stage,
    pub next: Stage,
    pub name: String,
    pub context: RunContext,
    events: EventSink,
}

impl RunState {
    /// 以用户问题初始化：追加首条 user 消息并推送首个快照
    pub fn new(question: impl Into<String>, context: RunContext, events: EventSink) -> Self {
        let mut state = Self {
            store: MessageStore::new(),
            current: Stage::Start,
            next: Stage::Manager,
            name: "user".to_string(),
            context,
            events,
        };
        state.store.append(
            vec![Message::user(question)],
            &Stage::Start,
            &Stage::Manager,
            "user",
        );
        state.emit_snapshot();
        state
    }

    /// 应用阶段产出：追加消息、更新投影、推送快照
    pub fn apply(&mut self, outcome: StageOutcome) {
        self.store.append(
            outcome.messages,
            &outcome.current,
            &outcome.next,
            outcome.name,
        );
        self.current = outcome.current;
        self.next = outcome.next;
        self.name = outcome.name.to_string();
        self.emit_snapshot();
    }

    /// 最终答案 = 最后一条消息的文本内容（成功合成或诊断说明）
    pub fn final_answer(&self) -> String {
        self.store.last().map(|m| m.text()).unwrap_or_default()
    }

    fn emit_snapshot(&self) {
        self.events.emit(StateEvent {
            current: self.current.clone(),
            next: self.next.clone(),
            name: self.name.clone(),
            messages: self.store.snapshot(),
        });
    }
}
