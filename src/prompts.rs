//! 提示词集
//!
//! 所有系统提示内置默认文本，并支持从提示目录按文件名覆盖
//! （manager.txt / specialist_<name>.txt / task_eval.txt / tool_eval.txt /
//! visual_eval.txt / steering.txt）。覆盖缺失时静默回落到内置默认。

use std::collections::HashMap;
use std::path::Path;

const MANAGER_PROMPT: &str = "\
You are the manager of a team of research specialists. You decompose the user's request \
into well-defined tasks, assign each task to the most suitable specialist, and synthesize \
their results into a final answer.

Guidelines:
- Assign exactly one task at a time, to exactly one specialist.
- Write each task so it is self-contained: include all names, file paths, and constraints \
the specialist needs.
- Set `memory` to true only when the task builds directly on a specialist's earlier work.
- When the user's request has been fully addressed, reply with the final answer instead of \
another assignment.";

const TASK_EVAL_PROMPT: &str = "\
You are reviewing a specialist's completed workflow against its assigned task.

Respond with exactly these sections:
<thinking>Walk through what the specialist did and whether each step served the task.</thinking>
<reflection>Summarize what was accomplished, what is missing, and any concerns about \
correctness or completeness.</reflection>
<reward>A single score from 0.0 to 1.0 for how well the workflow fulfilled the task.</reward>";

const TOOL_EVAL_PROMPT: &str = "\
You are reviewing the most recent tool result inside a specialist's workflow.

Respond with exactly these sections:
<reflection>Assess whether the tool call succeeded, whether the output is what the \
specialist needed, and what the specialist should do next.</reflection>
<reward>A single score from 0.0 to 1.0 for the usefulness of this tool result.</reward>";

const VISUAL_EVAL_PROMPT: &str = "\
You are reviewing a figure produced inside a specialist's workflow. The images are attached \
to the last message.

Respond with exactly these sections:
<caption>Describe what the figure shows.</caption>
<reflection>Assess whether the figure is correct, legible, and appropriate for the task, \
and what should change if not.</reflection>
<reward>A single score from 0.0 to 1.0 for the quality of the figure.</reward>";

/// 专家默认系统提示（按名生成）
fn default_specialist_prompt(name: &str) -> String {
    format!(
        "You are the {name} specialist on a research team. You receive one well-defined task \
         at a time from the manager.\n\n\
         Guidelines:\n\
         - Work strictly within the assigned task; do not expand its scope.\n\
         - Use your tools to gather evidence; never fabricate data or results.\n\
         - Call one tool at a time and wait for its result before deciding the next step.\n\
         - When the task is complete, or you are blocked and cannot proceed, call the \
         `evaluation` tool to conclude the workflow, then state your findings."
    )
}

/// 管理者回合末尾追加的引导消息内容
fn steering_text(specialist_names: &[String]) -> String {
    format!(
        "1. If further work is needed, assign a task to one of the following specialists: \
         {}. 2. If the user request has been fully addressed, synthesize the relevant \
         information and provide a clear, definite answer.",
        specialist_names.join(", ")
    )
}

/// 全部系统提示与引导文本
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub manager: String,
    pub specialist: HashMap<String, String>,
    pub task_eval: String,
    pub tool_eval: String,
    pub visual_eval: String,
    pub steering: String,
}

impl PromptSet {
    /// 内置默认提示集
    pub fn defaults(specialist_names: &[String]) -> Self {
        let specialist = specialist_names
            .iter()
            .map(|n| (n.clone(), default_specialist_prompt(n)))
            .collect();
        Self {
            manager: MANAGER_PROMPT.to_string(),
            specialist,
            task_eval: TASK_EVAL_PROMPT.to_string(),
            tool_eval: TOOL_EVAL_PROMPT.to_string(),
            visual_eval: VISUAL_EVAL_PROMPT.to_string(),
            steering: steering_text(specialist_names),
        }
    }

    /// 加载提示集：prompt_dir 下存在同名文件则覆盖默认
    pub fn load(prompt_dir: Option<&Path>, specialist_names: &[String]) -> Self {
        let mut set = Self::defaults(specialist_names);
        let Some(dir) = prompt_dir else {
            return set;
        };

        set.manager = read_override(dir, "manager.txt").unwrap_or(set.manager);
        set.task_eval = read_override(dir, "task_eval.txt").unwrap_or(set.task_eval);
        set.tool_eval = read_override(dir, "tool_eval.txt").unwrap_or(set.tool_eval);
        set.visual_eval = read_override(dir, "visual_eval.txt").unwrap_or(set.visual_eval);
        set.steering = read_override(dir, "steering.txt").unwrap_or(set.steering);
        for name in specialist_names {
            if let Some(text) = read_override(dir, &format!("specialist_{}.txt", name)) {
                set.specialist.insert(name.clone(), text);
            }
        }
        set
    }

    /// 指定专家的系统提示；未登记的名字回落到按名生成的默认
    pub fn specialist_prompt(&self, name: &str) -> String {
        self.specialist
            .get(name)
            .cloned()
            .unwrap_or_else(|| default_specialist_prompt(name))
    }
}

fn read_override(dir: &Path, file: &str) -> Option<String> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!(path = %path.display(), "loaded prompt override");
            Some(text)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["database".to_string(), "analytics".to_string()]
    }

    #[test]
    fn test_defaults_cover_all_specialists() {
        let set = PromptSet::defaults(&names());
        assert!(set.specialist_prompt("database").contains("database specialist"));
        assert!(set.steering.contains("database, analytics"));
        assert!(set.task_eval.contains("<reward>"));
        assert!(set.visual_eval.contains("<caption>"));
    }

    #[test]
    fn test_file_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("manager.txt"), "custom manager prompt").unwrap();
        std::fs::write(tmp.path().join("specialist_database.txt"), "custom db prompt").unwrap();

        let set = PromptSet::load(Some(tmp.path()), &names());
        assert_eq!(set.manager, "custom manager prompt");
        assert_eq!(set.specialist_prompt("database"), "custom db prompt");
        // 未覆盖的保持默认
        assert!(set.specialist_prompt("analytics").contains("analytics specialist"));
    }

    #[test]
    fn test_missing_dir_falls_back_to_defaults() {
        let set = PromptSet::load(Some(Path::new("/nonexistent/prompts")), &names());
        assert_eq!(set.manager, PromptSet::defaults(&names()).manager);
    }
}
