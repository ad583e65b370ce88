//! 键值缓存（带 TTL）
//!
//! 工具结果与任务步骤模板都经由 Cache trait 缓存；默认实现 MemoryCache 为进程内存储，
//! 过期条目对 get 不可见，惰性删除，purge_expired 由后台清理任务定期调用。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tokio::sync::RwLock;

/// 缓存能力：get / set（带过期时间）
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    /// 删除所有已过期条目，返回删除数量；自行管理过期的后端保持默认实现
    async fn purge_expired(&self) -> usize {
        0
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// 进程内 TTL 缓存
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前条目数（含尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(e) if e.expires_at > Instant::now() => return Some(e.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

/// 工具结果指纹：工具名（小写）+ 序列化输入的 base64
pub fn tool_fingerprint(tool_name: &str, input: &str) -> String {
    let serialized = serde_json::to_string(input).unwrap_or_else(|_| input.to_string());
    format!(
        "tool_{}_{}",
        tool_name.to_lowercase(),
        STANDARD.encode(serialized.as_bytes())
    )
}

/// 步骤模板缓存键：任务类型 + 消息 base64 编码的前 20 个字符
pub fn steps_cache_key(task_type: &str, message: &str) -> String {
    let encoded = STANDARD.encode(message.as_bytes());
    let prefix: String = encoded.chars().take(20).collect();
    format!("task_steps_{}_{}", task_type, prefix)
}
