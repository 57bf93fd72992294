//! 历史修剪与重排：把工作流变成适合推理调用的扁平消息列表
//!
//! 两个独立、可组合的变换：
//! 1. 标注剥离：从 assistant 文本中移除内部推理标注（如 `<thinking>` 内联段），只作用于副本，
//!    仓库里的原消息不动；
//! 2. 工作流格式化：用任务描述合成一条指令消息替换开头的指派消息，并丢弃只做转发的派发消息。
//!
//! 另含评估结论的命名分段抽取：缺失的分段得到空字段而非报错。

use regex::Regex;

use crate::core::Stage;
use crate::history::workflow::{assignment_from_message, Workflow};
use crate::history::{ContentPart, Message, Role};

fn span_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{0}>.*?</{0}>", regex::escape(tag))).expect("tag span pattern")
}

fn capture_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{0}>(.*?)</{0}>", regex::escape(tag))).expect("tag capture pattern")
}

/// 从 assistant 消息文本中剥离给定标注段；返回副本，原列表不变
pub fn strip_tags_from_messages(messages: &[Message], tags: &[&str]) -> Vec<Message> {
    let patterns: Vec<Regex> = tags.iter().map(|t| span_pattern(t)).collect();
    messages
        .iter()
        .map(|message| {
            let mut message = message.clone();
            if message.role == Role::Assistant {
                for part in &mut message.content {
                    if let ContentPart::Text { text } = part {
                        for pattern in &patterns {
                            *text = pattern.replace_all(text, "").trim().to_string();
                        }
                    }
                }
            }
            message.ensure_content()
        })
        .collect()
}

/// 抽取单个命名分段的内部文本；找不到时返回空串
pub fn extract_tag_from_text(text: &str, tag: &str) -> String {
    capture_pattern(tag)
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// 按给定顺序抽取多个命名分段，重新包装为 `<tag>…</tag>` 行；全部缺失时为空串
pub fn extract_tags_from_text(text: &str, tags: &[&str]) -> String {
    tags.iter()
        .filter_map(|tag| {
            let value = extract_tag_from_text(text, tag);
            if value.is_empty() {
                None
            } else {
                Some(format!("<{0}>{1}</{0}>", tag, value))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 格式化工作流：开头的指派消息替换为由任务文本合成的指令消息，派发确认消息被丢弃。
///
/// 幂等：不含指派消息的（已格式化）工作流原样返回，不会重复合成指令消息。
pub fn format_workflow(workflow: &Workflow) -> Vec<Message> {
    let Some(assignment) = workflow.iter().find_map(assignment_from_message) else {
        return workflow.clone();
    };

    let mut messages = vec![Message::user(assignment.task).ensure_content()];
    for message in workflow {
        if assignment_from_message(message).is_some() {
            continue;
        }
        // 只丢例行的接通确认（去向为专家本体）；派发阶段的诊断消息（去向为评估）保留，
        // 评估需要看到失败原因
        if message.metadata.current == Stage::SpecialistDispatch
            && matches!(message.metadata.next, Stage::Specialist(_))
        {
            continue;
        }
        messages.push(message.clone());
    }
    messages
}

/// 扁平化多个（已格式化的）历史工作流
pub fn flatten_workflows(workflows: &[Vec<Message>]) -> Vec<Message> {
    workflows.iter().flatten().cloned().collect()
}
