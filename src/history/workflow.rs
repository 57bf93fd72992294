//! 工作流抽取：从交错增长的消息日志中重建某专家的任务片段
//!
//! 一个工作流 = 从管理者的任务指派消息起、到匹配的 task_eval 完成标记为止（含）的连续切片；
//! 日志在工作流中途结束时仍构成一个（截断的）开放工作流，不会被丢弃。

use crate::core::{EvalKind, Stage};
use crate::history::{Message, Role};

/// 管理者派给专家的任务指派（从带工具调用的 assistant 消息中逻辑抽取，不单独存储）
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub specialist: String,
    pub task: String,
    /// 专家是否可见自己历史上的既往任务
    pub memory: bool,
}

/// 一个工作流即一段消息切片（按出现顺序）
pub type Workflow = Vec<Message>;

/// 从单条消息抽取任务指派：仅管理者产出、带工具调用的 assistant 消息
pub fn assignment_from_message(message: &Message) -> Option<Assignment> {
    if message.role != Role::Assistant || message.metadata.current != Stage::Manager {
        return None;
    }
    let call = message.first_tool_call()?;
    Some(Assignment {
        specialist: call.name.clone(),
        task: call
            .arguments
            .get("task")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        memory: call
            .arguments
            .get("memory")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    })
}

/// 从日志尾部向前找最近一次任务指派
pub fn extract_assignment(messages: &[Message]) -> Option<Assignment> {
    messages.iter().rev().find_map(assignment_from_message)
}

/// 工作流的闭合标记：task_eval 阶段产出的消息
fn is_completion_marker(message: &Message) -> bool {
    message.metadata.current == Stage::Evaluation(EvalKind::Task)
}

/// 抽取指定专家的全部工作流（按出现顺序，可能多个、互不相交）
///
/// 从左到右扫描：遇到指派给该专家的管理者消息即开启一个工作流，
/// 持续收集直到 task_eval 标记（含）；未闭合的尾部工作流保持开放。
pub fn extract_workflows(messages: &[Message], specialist: &str) -> Vec<Workflow> {
    let mut workflows = Vec::new();
    let mut start = 0;
    while start < messages.len() {
        let matched = assignment_from_message(&messages[start])
            .map(|a| a.specialist == specialist)
            .unwrap_or(false);
        if !matched {
            start += 1;
            continue;
        }

        let mut workflow = Vec::new();
        let mut end = start;
        for msg in &messages[start..] {
            workflow.push(msg.clone());
            end += 1;
            if is_completion_marker(msg) {
                break;
            }
        }
        workflows.push(workflow);
        start = end;
    }
    workflows
}

/// 仅取最新工作流（进行中的，或刚完成的）；没有任何工作流时返回 None 而非错误
pub fn newest_workflow(messages: &[Message], specialist: &str) -> Option<Workflow> {
    extract_workflows(messages, specialist).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{MessageStore, ToolCall};
    use serde_json::json;

    fn assignment_msg(specialist: &str, task: &str) -> Message {
        Message::assistant_with_calls(
            "",
            vec![ToolCall::new(
                specialist,
                json!({ "task": task, "memory": false }),
            )],
        )
    }

    fn log_with_two_database_workflows() -> MessageStore {
        let mut store = MessageStore::new();
        store.append(
            vec![Message::user("question")],
            &Stage::Start,
            &Stage::Manager,
            "user",
        );
        // 第一个 database 工作流（闭合）
        store.append(
            vec![assignment_msg("database", "list tables")],
            &Stage::Manager,
            &Stage::SpecialistDispatch,
            "call_manager",
        );
        store.append(
            vec![Message::assistant("working")],
            &Stage::Specialist("database".into()),
            &Stage::Evaluation(EvalKind::Task),
            "call_specialist",
        );
        store.append(
            vec![Message::assistant("<reward>0.8</reward>")],
            &Stage::Evaluation(EvalKind::Task),
            &Stage::Manager,
            "call_evaluation",
        );
        // analytics 的工作流，不应混入 database 的结果
        store.append(
            vec![assignment_msg("analytics", "plot data")],
            &Stage::Manager,
            &Stage::SpecialistDispatch,
            "call_manager",
        );
        store.append(
            vec![Message::assistant("<reward>0.9</reward>")],
            &Stage::Evaluation(EvalKind::Task),
            &Stage::Manager,
            "call_evaluation",
        );
        // 第二个 database 工作流（开放，日志在中途结束）
        store.append(
            vec![assignment_msg("database", "count rows")],
            &Stage::Manager,
            &Stage::SpecialistDispatch,
            "call_manager",
        );
        store.append(
            vec![Message::assistant("counting")],
            &Stage::Specialist("database".into()),
            &Stage::ToolDispatch,
            "call_specialist",
        );
        store
    }

    #[test]
    fn test_extracts_only_target_specialist() {
        let store = log_with_two_database_workflows();
        let workflows = extract_workflows(store.all(), "database");
        assert_eq!(workflows.len(), 2);
        for w in &workflows {
            let a = assignment_from_message(&w[0]).unwrap();
            assert_eq!(a.specialist, "database");
        }
    }

    #[test]
    fn test_newest_is_open_suffix() {
        let store = log_with_two_database_workflows();
        let newest = newest_workflow(store.all(), "database").unwrap();
        let a = assignment_from_message(&newest[0]).unwrap();
        assert_eq!(a.task, "count rows");
        // 开放工作流一直延伸到日志末尾
        assert_eq!(newest.last().unwrap().text(), "counting");
    }

    #[test]
    fn test_closed_workflow_includes_completion_marker() {
        let store = log_with_two_database_workflows();
        let workflows = extract_workflows(store.all(), "database");
        let closed = &workflows[0];
        assert_eq!(
            closed.last().unwrap().metadata.current,
            Stage::Evaluation(EvalKind::Task)
        );
    }

    #[test]
    fn test_no_workflows_yields_empty() {
        let store = log_with_two_database_workflows();
        assert!(extract_workflows(store.all(), "literature").is_empty());
        assert!(newest_workflow(store.all(), "literature").is_none());
    }

    #[test]
    fn test_extract_assignment_finds_newest() {
        let store = log_with_two_database_workflows();
        let a = extract_assignment(store.all()).unwrap();
        assert_eq!(a.specialist, "database");
        assert_eq!(a.task, "count rows");
    }
}
