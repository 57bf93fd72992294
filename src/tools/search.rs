//! 文献检索工具
//!
//! 经 HTTP 访问外部文献检索服务（语义检索端点），返回截断后的文本结果。
//! 网络失败作为工具错误向上传递，由评估环节消化。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{SessionContext, Tool};

/// 文献语义检索：GET endpoint?query=...&limit=...
pub struct LiteratureSearchTool {
    client: reqwest::Client,
    endpoint: String,
    max_result_chars: usize,
}

impl LiteratureSearchTool {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64, max_result_chars: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            max_result_chars,
        }
    }
}

#[async_trait]
impl Tool for LiteratureSearchTool {
    fn name(&self) -> &str {
        "search_literature"
    }

    fn description(&self) -> &str {
        "Function: Search the research literature corpus for papers relevant to a topic. \
         Input: a natural-language query and an optional number of results. \
         Output: the most relevant papers with titles and abstracts."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A natural-language description of the topic to search for."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of papers to return (default 5)."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument: query".to_string())?;
        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(5);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query), ("limit", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| format!("literature search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("literature search returned status {}", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("literature search response unreadable: {}", e))?;

        let truncated: String = if body.chars().count() > self.max_result_chars {
            let mut cut: String = body.chars().take(self.max_result_chars).collect();
            cut.push_str("\n... (truncated)");
            cut
        } else {
            body
        };

        Ok(serde_json::json!({ "response": truncated }))
    }
}
