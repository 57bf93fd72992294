//! SQL 工具集：列表、取 schema、执行查询、名称消歧
//!
//! 后端为进程级单例的 SQLite 连接（Mutex 保护，跨请求复用）；查询在 spawn_blocking
//! 中执行避免阻塞运行时。sql_query 返回结果表头部预览，完整结果写入会话工作目录的
//! CSV 文件并通过 `files` 字段回报。

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use crate::tools::{SessionContext, Tool};

/// 查询结果：列名 + 字符串化的行
#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 进程级 SQLite 后端：互斥由本层持有，编排核心将其视为无状态服务
pub struct SqlStore {
    conn: Mutex<Connection>,
}

impl SqlStore {
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| e.to_string())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| e.to_string())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 全部用户表名（按名排序）
    pub fn table_names(&self) -> Result<Vec<String>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| e.to_string())?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        Ok(names)
    }

    /// 表的建表语句（schema 描述）
    pub fn table_ddl(&self, table: &str) -> Result<String, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, String>(0),
        )
        .map_err(|e| format!("table {}: {}", table, e))
    }

    /// 执行任意只读/读写查询，所有值字符串化
    pub fn query(&self, sql: &str) -> Result<QueryResult, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(|e| e.to_string())?;
                record.push(render_value(value));
            }
            out.push(record);
        }
        Ok(QueryResult { columns, rows: out })
    }

    /// LIKE 名称检索；table/column 来自调用方持有的固定映射，value 走绑定参数
    pub fn search_like(
        &self,
        table: &str,
        column: &str,
        value: &str,
        limit: usize,
    ) -> Result<QueryResult, String> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} LIKE ?1 LIMIT {}",
            table, column, limit
        );
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let pattern = format!("%{}%", value);
        let mut rows = stmt.query([pattern]).map_err(|e| e.to_string())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(|e| e.to_string())?;
                record.push(render_value(value));
            }
            out.push(record);
        }
        Ok(QueryResult { columns, rows: out })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format!("{:.4}", f),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// 渲染 markdown 表格（最多 max_rows 行，超出时注明总行数）
pub fn render_markdown_table(result: &QueryResult, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return "(no result)".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", result.columns.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        " --- |".repeat(result.columns.len())
    ));
    for row in result.rows.iter().take(max_rows) {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    if result.rows.len() > max_rows {
        out.push_str(&format!(
            "\n({} of {} rows shown)",
            max_rows,
            result.rows.len()
        ));
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_csv(result: &QueryResult, path: &Path) -> Result<(), String> {
    let mut content = result
        .columns
        .iter()
        .map(|c| csv_escape(c))
        .collect::<Vec<_>>()
        .join(",");
    content.push('\n');
    for row in &result.rows {
        content.push_str(
            &row.iter()
                .map(|f| csv_escape(f))
                .collect::<Vec<_>>()
                .join(","),
        );
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| e.to_string())
}

/// 列出数据库全部表
pub struct SqlListTablesTool {
    store: Arc<SqlStore>,
}

impl SqlListTablesTool {
    pub fn new(store: Arc<SqlStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SqlListTablesTool {
    fn name(&self) -> &str {
        "sql_list_tables"
    }

    fn description(&self) -> &str {
        "Function: List all available tables in the SQL database. \
         Input: none. \
         Output: the names of all tables with their column lists."
    }

    async fn execute(&self, _args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        let store = self.store.clone();
        let rendered = tokio::task::spawn_blocking(move || -> Result<String, String> {
            let names = store.table_names()?;
            let mut result = QueryResult {
                columns: vec!["TableName".to_string(), "Columns".to_string()],
                rows: Vec::new(),
            };
            for name in names {
                let header = store
                    .query(&format!("SELECT * FROM {} LIMIT 0", name))?
                    .columns
                    .join(", ");
                result.rows.push(vec![name, header]);
            }
            Ok(render_markdown_table(&result, 200))
        })
        .await
        .map_err(|e| e.to_string())??;

        Ok(serde_json::json!({ "response": rendered }))
    }
}

/// 取指定表的 schema 与样例行
pub struct SqlGetSchemaTool {
    store: Arc<SqlStore>,
    sample_rows: usize,
}

impl SqlGetSchemaTool {
    pub fn new(store: Arc<SqlStore>) -> Self {
        Self {
            store,
            sample_rows: 3,
        }
    }
}

#[async_trait]
impl Tool for SqlGetSchemaTool {
    fn name(&self) -> &str {
        "sql_get_schema"
    }

    fn description(&self) -> &str {
        "Function: Retrieve detailed schema information and sample rows for the specified tables. \
         Input: a comma-separated list of table names; empty for all tables. \
         Output: per table, the CREATE statement plus a few sample rows. \
         Dependencies: use `sql_list_tables` first to discover table names."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A comma-separated list of table names, e.g. `table1, table2`. Empty string selects all tables."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let store = self.store.clone();
        let sample_rows = self.sample_rows;

        let rendered = tokio::task::spawn_blocking(move || -> Result<String, String> {
            let tables: Vec<String> = if query.trim().is_empty() {
                store.table_names()?
            } else {
                query.split(',').map(|s| s.trim().to_string()).collect()
            };

            let mut sections = Vec::new();
            for table in tables {
                let ddl = store.table_ddl(&table)?;
                let sample =
                    store.query(&format!("SELECT * FROM {} LIMIT {}", table, sample_rows))?;
                sections.push(format!(
                    "{}\n\n/*\n{} rows from {} table:\n{}\n*/",
                    ddl,
                    sample.rows.len(),
                    table,
                    render_markdown_table(&sample, sample_rows)
                ));
            }
            Ok(sections.join("\n\n"))
        })
        .await
        .map_err(|e| e.to_string())??;

        Ok(serde_json::json!({ "response": rendered }))
    }
}

/// 执行 SQL 查询：预览头部，完整结果落盘
pub struct SqlQueryTool {
    store: Arc<SqlStore>,
    preview_rows: usize,
}

impl SqlQueryTool {
    pub fn new(store: Arc<SqlStore>) -> Self {
        Self {
            store,
            preview_rows: 10,
        }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "sql_query"
    }

    fn description(&self) -> &str {
        "Function: Execute a SQL query against the database. \
         Output: (1) the header of the result table (top rows); (2) the file path where the \
         complete result is stored. \
         Dependencies: use `sql_get_schema` / `sql_list_tables` to confirm tables and columns \
         exist; use `search_name` for accurate name matching when filtering by names."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A valid SQL query compatible with the SQLite dialect."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &SessionContext) -> Result<Value, String> {
        let sql = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument: query".to_string())?
            .to_string();

        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || store.query(&sql))
            .await
            .map_err(|e| e.to_string())??;

        let dir = ctx.session_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| e.to_string())?;
        let file_id = uuid::Uuid::new_v4().to_string();
        let file_name = format!("{}.csv", file_id);
        let file_path = dir.join(&file_name);
        write_csv(&result, &file_path)?;

        Ok(serde_json::json!({
            "response": render_markdown_table(&result, self.preview_rows),
            "files": [{
                "name": file_name,
                "id": file_id,
                "file_path": file_path.to_string_lossy(),
                "download_link": file_path.to_string_lossy(),
                "mime_type": "text/csv",
            }],
            "note": "`response`: header of the SQL query result (may not be complete). \
                     `files`: the file of complete SQL query results. Load this file to get the complete result.",
        }))
    }
}

/// 名称消歧：在固定的列→表映射内做模糊匹配
pub struct SearchNameTool {
    store: Arc<SqlStore>,
    /// 可检索列 → 所在表（固定映射，防止任意表名注入）
    columns: HashMap<String, String>,
}

impl SearchNameTool {
    pub fn new(store: Arc<SqlStore>, columns: HashMap<String, String>) -> Self {
        Self { store, columns }
    }
}

#[async_trait]
impl Tool for SearchNameTool {
    fn name(&self) -> &str {
        "search_name"
    }

    fn description(&self) -> &str {
        "Function: Search for the closest matches of institution or field names in the database, \
         for name disambiguation and finding standardized names. \
         Input: `column` (one of the searchable name columns) and `value` (the name to look for). \
         Output: a markdown table of the best-matching rows."
    }

    fn parameters_schema(&self) -> Value {
        let options: Vec<&String> = self.columns.keys().collect();
        serde_json::json!({
            "type": "object",
            "properties": {
                "column": {
                    "type": "string",
                    "description": format!("The database column to search within. Valid options: {:?}.", options)
                },
                "value": {
                    "type": "string",
                    "description": "The name to search for within the specified column."
                }
            },
            "required": ["column", "value"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &SessionContext) -> Result<Value, String> {
        let column = args
            .get("column")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument: column".to_string())?
            .to_string();
        let value = args
            .get("value")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument: value".to_string())?
            .to_string();

        let table = self
            .columns
            .get(&column)
            .ok_or_else(|| {
                format!(
                    "invalid column: {}. Only {:?} are searchable.",
                    column,
                    self.columns.keys().collect::<Vec<_>>()
                )
            })?
            .clone();

        let store = self.store.clone();
        let result =
            tokio::task::spawn_blocking(move || store.search_like(&table, &column, &value, 10))
                .await
                .map_err(|e| e.to_string())??;

        Ok(serde_json::json!({ "response": render_markdown_table(&result, 10) }))
    }
}
