//! 工具层：注册表、执行器与内置工具集
//!
//! 内置工具覆盖三个专家域：SQL（列表 / schema / 查询 / 名称消歧）、Python 沙箱、
//! 文献检索。统一经 ToolExecutor 执行（参数白名单过滤 + 超时 + 审计日志）。

pub mod executor;
pub mod registry;
pub mod sandbox;
pub mod search;
pub mod sql;

pub use executor::ToolExecutor;
pub use registry::{SessionContext, Tool, ToolRegistry};
pub use sandbox::PythonSandboxTool;
pub use search::LiteratureSearchTool;
pub use sql::{SearchNameTool, SqlGetSchemaTool, SqlListTablesTool, SqlQueryTool, SqlStore};
