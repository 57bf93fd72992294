//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，
//! 如 `HIVE__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：应用名、会话工作目录根、提示词覆盖目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话工作目录根，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
    /// 提示词覆盖目录（manager.txt 等），未设置时全用内置默认
    pub prompt_dir: Option<PathBuf>,
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock；API Key 缺失时自动回落到 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

// serde 的字段级 default 只在反序列化时生效，缺失整段时走这里
impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

/// [router] 段：状态机行为
#[derive(Debug, Clone, Deserialize)]
pub struct RouterSection {
    /// 单次请求的阶段转移上限
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    500
}

/// [tools] 段：工具超时与各工具后端
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub sql: SqlSection,
    #[serde(default)]
    pub sandbox: SandboxSection,
    #[serde(default)]
    pub literature: LiteratureSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            sql: SqlSection::default(),
            sandbox: SandboxSection::default(),
            literature: LiteratureSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [tools.sql] 段：数据库文件位置（未设置时用内存库）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SqlSection {
    pub database_path: Option<PathBuf>,
}

/// [tools.sandbox] 段：Python 解释器与执行超时
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxSection {
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    #[serde(default = "default_sandbox_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            timeout_secs: default_sandbox_timeout_secs(),
        }
    }
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_sandbox_timeout_secs() -> u64 {
    120
}

/// [tools.literature] 段：文献检索端点与结果上限
#[derive(Debug, Clone, Deserialize)]
pub struct LiteratureSection {
    pub endpoint: Option<String>,
    #[serde(default = "default_literature_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
}

impl Default for LiteratureSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_literature_timeout_secs(),
            max_result_chars: default_max_result_chars(),
        }
    }
}

fn default_literature_timeout_secs() -> u64 {
    15
}

fn default_max_result_chars() -> usize {
    8000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            router: RouterSection::default(),
            tools: ToolsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.router.max_steps, 500);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.tools.sandbox.python_bin, "python3");
        assert!(cfg.tools.sql.database_path.is_none());
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o");
    }

    #[test]
    fn test_missing_sections_get_fn_defaults() {
        // 整段缺失时走 Default impl，字段默认值必须与反序列化路径一致
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("minimal.toml");
        std::fs::write(&path, "[app]\nname = \"hive\"\n").unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.router.max_steps, 500);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("override.toml");
        std::fs::write(
            &path,
            "[router]\nmax_steps = 42\n\n[llm]\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.router.max_steps, 42);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        // 未覆盖的键保持默认
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
    }
}
