//! 历史层：消息模型、append-only 仓库、工作流抽取、修剪与多模态展开

pub mod images;
pub mod message;
pub mod pruning;
pub mod store;
pub mod workflow;

pub use images::{into_multimodal, message_contains_images, value_contains_images};
pub use message::{ContentPart, Message, Metadata, Role, ToolCall, EMPTY_MESSAGE_SENTINEL};
pub use pruning::{
    extract_tag_from_text, extract_tags_from_text, flatten_workflows, format_workflow,
    strip_tags_from_messages,
};
pub use store::MessageStore;
pub use workflow::{
    assignment_from_message, extract_assignment, extract_workflows, newest_workflow, Assignment,
    Workflow,
};
