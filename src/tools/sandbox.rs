//! Python 沙箱工具
//!
//! 把代码写入会话工作目录中的 cell 文件，经 tokio::process 子进程执行，合并
//! stdout/stderr 作为响应；执行前后对比目录中的 .png 文件，新增图片以 `images`
//! 字段回报（下游据此切换视觉评估）。

use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::tools::{SessionContext, Tool};

/// Python 代码执行沙箱：有状态资源限定在会话工作目录内
pub struct PythonSandboxTool {
    python_bin: String,
    timeout_secs: u64,
}

impl PythonSandboxTool {
    pub fn new(python_bin: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            python_bin: python_bin.into(),
            timeout_secs,
        }
    }
}

/// 目录内全部 .png 文件名
async fn png_files(dir: &Path) -> HashSet<String> {
    let mut found = HashSet::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".png") {
            found.insert(name);
        }
    }
    found
}

#[async_trait]
impl Tool for PythonSandboxTool {
    fn name(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Function: Execute Python code in a persistent session workspace for data analysis \
         and visualization. \
         Input: a self-contained Python script. \
         Output: combined stdout/stderr of the run; figures saved as .png files in the \
         workspace are returned as images. \
         Notes: always `print()` the values you need to see; save plots with \
         `plt.savefig(...)` instead of `plt.show()`."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The Python code to execute."
                }
            },
            "required": ["query"]
        })
    }

    /// 覆盖执行器的全局超时：沙箱有自己的运行预算，外层再留清场余量
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.timeout_secs.saturating_add(5)))
    }

    async fn execute(&self, args: Value, ctx: &SessionContext) -> Result<Value, String> {
        let code = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument: query".to_string())?;

        let dir = ctx.session_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| e.to_string())?;

        let cell_name = format!("cell_{}.py", uuid::Uuid::new_v4());
        let cell_path = dir.join(&cell_name);
        tokio::fs::write(&cell_path, code)
            .await
            .map_err(|e| e.to_string())?;

        let before = png_files(&dir).await;

        let child = Command::new(&self.python_bin)
            .arg(&cell_name)
            .current_dir(&dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to launch {}: {}", self.python_bin, e))?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| format!("python execution exceeded {}s", self.timeout_secs))?
        .map_err(|e| e.to_string())?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut response = String::new();
        if !stdout.trim().is_empty() {
            response.push_str(stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            if !response.is_empty() {
                response.push('\n');
            }
            response.push_str(stderr.trim_end());
        }
        if response.is_empty() {
            response = format!("(no output, exit status: {})", output.status);
        }

        let after = png_files(&dir).await;
        let new_images: Vec<Value> = after
            .difference(&before)
            .map(|name| {
                let path = dir.join(name);
                serde_json::json!({
                    "name": name,
                    "id": uuid::Uuid::new_v4().to_string(),
                    "mime_type": "image/png",
                    "download_link": path.to_string_lossy(),
                })
            })
            .collect();

        let mut result = serde_json::json!({ "response": response });
        if !new_images.is_empty() {
            result["images"] = Value::Array(new_images);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(dir: &Path) -> SessionContext {
        SessionContext::new("test", dir)
    }

    #[tokio::test]
    async fn test_stdout_captured() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = PythonSandboxTool::new("python3", 10);
        let out = tool
            .execute(
                serde_json::json!({ "query": "print('hello from sandbox')" }),
                &ctx(tmp.path()),
            )
            .await
            .unwrap();
        assert!(out["response"]
            .as_str()
            .unwrap()
            .contains("hello from sandbox"));
        assert!(out.get("images").is_none());
    }

    #[tokio::test]
    async fn test_new_png_reported_as_image() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = PythonSandboxTool::new("python3", 10);
        let code = "open('figure.png', 'wb').write(b'\\x89PNG')\nprint('saved')";
        let out = tool
            .execute(serde_json::json!({ "query": code }), &ctx(tmp.path()))
            .await
            .unwrap();
        let images = out["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["name"], "figure.png");
        assert_eq!(images[0]["mime_type"], "image/png");
    }

    #[test]
    fn test_budget_exceeds_internal_timeout() {
        let tool = PythonSandboxTool::new("python3", 120);
        assert!(tool.timeout().unwrap() > Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_stderr_included_in_response() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = PythonSandboxTool::new("python3", 10);
        let out = tool
            .execute(
                serde_json::json!({ "query": "raise ValueError('broken input')" }),
                &ctx(tmp.path()),
            )
            .await
            .unwrap();
        assert!(out["response"].as_str().unwrap().contains("broken input"));
    }
}
