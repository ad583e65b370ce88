//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / validate_input / execute），由 ToolRegistry 按名注册与查找，
//! 名称查找不区分大小写。ToolExecutor 在调用时负责缓存与错误包装。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// 工具调用结果：成功（工具自定义载荷）或软失败（工具自行报告，不算异常）
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure {
        error: String,
        suggestion: Option<String>,
    },
}

impl ToolOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            error: error.into(),
            suggestion: None,
        }
    }

    pub fn failure_with_suggestion(error: impl Into<String>, suggestion: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            error: error.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// 线上格式：`{"success": true, ...payload}` 或 `{"success": false, "error": .., "suggestion"?: ..}`
    pub fn to_value(&self) -> Value {
        match self {
            ToolOutcome::Success(payload) => {
                let mut map = match payload {
                    Value::Object(m) => m.clone(),
                    other => {
                        let mut m = Map::new();
                        m.insert("result".to_string(), other.clone());
                        m
                    }
                };
                map.insert("success".to_string(), Value::Bool(true));
                Value::Object(map)
            }
            ToolOutcome::Failure { error, suggestion } => {
                let mut map = Map::new();
                map.insert("success".to_string(), Value::Bool(false));
                map.insert("error".to_string(), Value::String(error.clone()));
                if let Some(s) = suggestion {
                    map.insert("suggestion".to_string(), Value::String(s.clone()));
                }
                Value::Object(map)
            }
        }
    }

    /// to_value 的逆过程（用于读取缓存）
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        match map.remove("success")?.as_bool()? {
            true => Some(ToolOutcome::Success(Value::Object(map))),
            false => {
                let error = map.get("error")?.as_str()?.to_string();
                let suggestion = map
                    .get("suggestion")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(ToolOutcome::Failure { error, suggestion })
            }
        }
    }
}

impl Serialize for ToolOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// 工具 trait：名称、描述、输入校验、异步执行
///
/// execute 返回 Err 表示工具内部异常，会被包装为 ToolExecutionFailed；
/// 可预期的失败（如表达式非法）应返回 `Ok(ToolOutcome::Failure { .. })`。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（注册键，查找时不区分大小写）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 输入校验，默认全部通过
    fn validate_input(&self, _input: &str) -> bool {
        true
    }

    async fn execute(&self, input: &str, session_id: &str) -> Result<ToolOutcome, String>;
}

/// 工具列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

/// 工具注册表：按小写名称存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_lowercase();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name.to_lowercase()).cloned()
    }

    /// 未注册的工具一律校验失败
    pub fn validate(&self, name: &str, input: &str) -> bool {
        self.get(name).is_some_and(|t| t.validate_input(input))
    }

    /// 按名称排序的工具列表
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut list: Vec<ToolInfo> = self
            .tools
            .iter()
            .map(|(name, tool)| ToolInfo {
                name: name.clone(),
                description: tool.description().to_string(),
                enabled: true,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.list().into_iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
