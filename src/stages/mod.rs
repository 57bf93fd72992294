//! 阶段函数：每个阶段是 (消息日志) → StageOutcome 的纯函数（外加 LLM / 工具副作用）
//!
//! 路由选择权在产出消息的阶段手里：StageOutcome::next 即下一跳，由编排器忠实执行。

pub mod dispatch;
pub mod evaluation;
pub mod manager;
pub mod specialist;

pub use dispatch::{call_specialist_dispatch, call_tool_dispatch};
pub use evaluation::call_evaluation;
pub use manager::call_manager;
pub use specialist::call_specialist;
