//! 会话：偏好、当前任务、对话记录
//!
//! 会话按 session_id 惰性创建，由 SessionStore 统一持有；容量有上限，按 EvictionPolicy 淘汰。

mod store;

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dialogue::{Strategy, Task};

pub use store::{EvictionPolicy, SessionStore};

/// 会话 ID（由调用方提供的不透明字符串）
pub type SessionId = String;

/// 用户偏好：JSON 对象，浅合并，不校验未知键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(Map<String, Value>);

impl Default for Preferences {
    fn default() -> Self {
        let mut map = Map::new();
        map.insert("personalizedMode".to_string(), Value::Bool(true));
        map.insert("stepByStep".to_string(), Value::Bool(true));
        map.insert("learningMode".to_string(), Value::Bool(true));
        Self(map)
    }
}

impl Preferences {
    /// 浅合并：partial 中的键覆盖现有值
    pub fn merge(&mut self, partial: Map<String, Value>) {
        for (key, value) in partial {
            self.0.insert(key, value);
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// 一轮对话记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    pub message: String,
    pub strategy: Strategy,
}

/// 单个会话
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub preferences: Preferences,
    /// 当前进行中的分步任务（每个会话至多一个）
    pub current_task: Option<Task>,
    pub chat_history: VecDeque<ChatExchange>,
    /// 学习进度（预留）
    pub learning_progress: Map<String, Value>,
    pub last_active: Instant,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            preferences: Preferences::default(),
            current_task: None,
            chat_history: VecDeque::new(),
            learning_progress: Map::new(),
            last_active: Instant::now(),
        }
    }

    /// 追加对话记录，超过 max_history 时丢弃最旧的
    pub fn record_exchange(&mut self, exchange: ChatExchange, max_history: usize) {
        self.chat_history.push_back(exchange);
        while self.chat_history.len() > max_history {
            self.chat_history.pop_front();
        }
    }

    pub fn has_task(&self) -> bool {
        self.current_task.is_some()
    }
}
