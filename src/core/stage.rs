//! 阶段标识：路由状态机的节点
//!
//! 用 enum 替代字符串路由键，转移表在编译期穷尽检查；
//! Display/FromStr 仍保留 `component[:sub_mode]` 的文本形式（如 `evaluation:task_eval`、
//! `specialist:database`），用于消息元数据序列化与事件快照。

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// 评估子模式：任务级 / 工具结果级 / 可视化结果级
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalKind {
    Task,
    Tool,
    Visual,
}

impl EvalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalKind::Task => "task_eval",
            EvalKind::Tool => "tool_eval",
            EvalKind::Visual => "visual_eval",
        }
    }
}

/// 路由阶段：每条消息的 current/next 元数据即此类型
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// 初始态（用户消息的 current）
    Start,
    /// 研究管理者：分派任务或合成最终答案
    Manager,
    /// 专家派发：校验专家名并确认交接
    SpecialistDispatch,
    /// 某个具体专家（携带专家名）
    Specialist(String),
    /// 工具派发：校验工具名、过滤参数并执行
    ToolDispatch,
    /// 评估（携带子模式）
    Evaluation(EvalKind),
    /// 终态：本次请求结束
    Terminal,
}

impl Stage {
    /// 分隔符前的组件名（决定「谁来跑」）
    pub fn component(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Manager => "manager",
            Stage::SpecialistDispatch => "specialist_dispatch",
            Stage::Specialist(_) => "specialist",
            Stage::ToolDispatch => "tool_dispatch",
            Stage::Evaluation(_) => "evaluation",
            Stage::Terminal => "terminal",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Terminal)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Specialist(name) => write!(f, "specialist:{}", name),
            Stage::Evaluation(kind) => write!(f, "evaluation:{}", kind.as_str()),
            other => f.write_str(other.component()),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, sub) = match s.split_once(':') {
            Some((h, t)) => (h, Some(t)),
            None => (s, None),
        };
        match (head, sub) {
            ("start", None) => Ok(Stage::Start),
            ("manager", None) => Ok(Stage::Manager),
            ("specialist_dispatch", None) => Ok(Stage::SpecialistDispatch),
            ("specialist", Some(name)) if !name.is_empty() => {
                Ok(Stage::Specialist(name.to_string()))
            }
            ("tool_dispatch", None) => Ok(Stage::ToolDispatch),
            ("evaluation", Some("task_eval")) => Ok(Stage::Evaluation(EvalKind::Task)),
            ("evaluation", Some("tool_eval")) => Ok(Stage::Evaluation(EvalKind::Tool)),
            ("evaluation", Some("visual_eval")) => Ok(Stage::Evaluation(EvalKind::Visual)),
            ("terminal", None) => Ok(Stage::Terminal),
            _ => Err(format!("unknown stage token: {}", s)),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Stage::from_str(&s).map_err(de::Error::custom)
    }
}
