//! Hive - 分层多专家研究编排系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 阶段状态机、运行状态、错误、事件快照与编排循环
//! - **history**: 消息模型、append-only 日志、工作流重建、修剪与多模态展开
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / 脚本化 Mock）
//! - **observability**: tracing 初始化
//! - **prompts**: 系统提示集（内置默认 + 文件覆盖）
//! - **runtime**: 从配置装配 LLM、工具、专家与编排器
//! - **specialists**: 专家定义与注册表
//! - **stages**: 管理者、派发、专家、评估四类阶段函数
//! - **tools**: 工具注册表、执行器与内置工具（SQL / Python 沙箱 / 文献检索）

pub mod config;
pub mod core;
pub mod history;
pub mod llm;
pub mod observability;
pub mod prompts;
pub mod runtime;
pub mod specialists;
pub mod stages;
pub mod tools;

pub use core::{Orchestrator, OrchestratorError, RunContext, RunState};
