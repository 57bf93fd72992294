//! 专家层：专家定义与注册表
//!
//! 每个专家 = 名称 + 描述 + 许可工具名单。对管理者而言，专家以工具描述符的形式
//! 暴露（参数固定为 task + memory 两项），由调度阶段按名校验后接通。

use std::collections::HashMap;

use crate::llm::ToolSpec;

/// 专家定义：许可工具以名单表达，运行期经注册表解析成描述符
#[derive(Clone, Debug)]
pub struct Specialist {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
}

impl Specialist {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tools: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tools: tools.into_iter().collect(),
        }
    }

    /// 作为管理者可见的工具描述符；参数固定为 task + memory
    pub fn descriptor(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "A well-defined, self-contained task description with all the context the specialist needs."
                    },
                    "memory": {
                        "type": "boolean",
                        "description": "Whether the specialist should also see the full history of its previous workflows. Set true only when the task builds on earlier work."
                    }
                },
                "required": ["task", "memory"]
            }),
        }
    }
}

/// 专家工作流内的收尾工具：无参数，调用即宣告任务完成
pub fn evaluation_tool_spec() -> ToolSpec {
    ToolSpec {
        name: "evaluation".to_string(),
        description: "Call this tool when the assigned task is complete (or cannot proceed \
                      further) to conclude the workflow and report back."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

/// 专家注册表：按名存取，顺序稳定（注册序）
#[derive(Default, Clone)]
pub struct SpecialistRegistry {
    order: Vec<String>,
    specialists: HashMap<String, Specialist>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, specialist: Specialist) {
        if !self.specialists.contains_key(&specialist.name) {
            self.order.push(specialist.name.clone());
        }
        self.specialists.insert(specialist.name.clone(), specialist);
    }

    pub fn get(&self, name: &str) -> Option<&Specialist> {
        self.specialists.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specialists.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// 全部专家的描述符（管理者的可用工具集）
    pub fn descriptors(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|n| self.specialists.get(n))
            .map(|s| s.descriptor())
            .collect()
    }
}

/// 内置专家集：数据库 / 分析 / 文献
pub fn builtin() -> SpecialistRegistry {
    let mut registry = SpecialistRegistry::new();
    registry.register(Specialist::new(
        "database",
        "A data specialist that navigates the scholarly SQL database: discovering tables, \
         inspecting schemas, disambiguating entity names, running SQL queries, and exporting \
         result files for downstream analysis.",
        vec![
            "sql_list_tables".to_string(),
            "sql_get_schema".to_string(),
            "search_name".to_string(),
            "sql_query".to_string(),
        ],
    ));
    registry.register(Specialist::new(
        "analytics",
        "An analytics specialist that performs statistical analysis, modeling, and \
         visualization with Python over files in the session workspace, producing figures \
         and quantitative findings.",
        vec!["python".to_string()],
    ));
    registry.register(Specialist::new(
        "literature",
        "A literature specialist that searches the science-of-science research corpus to \
         ground tasks in prior work, summarize findings, and recommend relevant papers.",
        vec!["search_literature".to_string()],
    ));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_has_task_and_memory() {
        let registry = builtin();
        let spec = registry.get("database").unwrap().descriptor();
        assert_eq!(spec.name, "database");
        let props = spec.parameters["properties"].as_object().unwrap();
        assert!(props.contains_key("task"));
        assert!(props.contains_key("memory"));
    }

    #[test]
    fn test_builtin_names_stable_order() {
        let registry = builtin();
        assert_eq!(registry.names(), vec!["database", "analytics", "literature"]);
        assert_eq!(registry.descriptors().len(), 3);
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_evaluation_tool_has_no_parameters() {
        let spec = evaluation_tool_spec();
        assert_eq!(spec.name, "evaluation");
        assert!(spec.parameters["properties"].as_object().unwrap().is_empty());
    }
}
