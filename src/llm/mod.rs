//! LLM 层：推理能力抽象与实现（OpenAI 兼容 / 脚本化 Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::ScriptedLlm;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmReply, ToolSpec};
