//! 会话存储
//!
//! 进程内 session_id -> Session 映射，容量有上限。满额插入时按 EvictionPolicy 淘汰；
//! Ttl 策略下 sweep_expired 定期清理空闲会话。
//!
//! 同一会话的并发请求不做串行化：每次 with_session 内部的修改是原子的，
//! 但一轮对话若跨越多次 with_session（中间有 await），两轮之间可能交错。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::{Session, SessionId};

/// 会话淘汰策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// 满额时淘汰最久未活跃的会话；不做定期过期
    Lru,
    /// 空闲超过给定时长即过期；满额时先丢弃过期会话，再退回 LRU
    Ttl(Duration),
}

/// 会话存储
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl SessionStore {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            policy,
        }
    }

    /// 获取或创建会话，返回快照
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        self.with_session(session_id, |s| s.clone()).await
    }

    /// 获取会话快照（不创建）
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// 对会话执行修改（不存在则先创建），并刷新活跃时间
    pub async fn with_session<F, R>(&self, session_id: &str, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            self.make_room(&mut sessions);
        }
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session = %session_id, "session created");
            Session::new(session_id)
        });
        session.last_active = Instant::now();
        f(session)
    }

    /// 移除会话，返回被移除的会话
    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        self.sessions.write().await.remove(session_id)
    }

    /// 清理过期会话（仅 Ttl 策略），返回清理数量
    pub async fn sweep_expired(&self) -> usize {
        let EvictionPolicy::Ttl(idle) = self.policy else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active.elapsed() <= idle);
        before - sessions.len()
    }

    /// 当前会话数
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// 为新会话腾出位置，保证 len <= capacity
    fn make_room(&self, sessions: &mut HashMap<SessionId, Session>) {
        if sessions.len() < self.capacity {
            return;
        }

        if let EvictionPolicy::Ttl(idle) = self.policy {
            sessions.retain(|_, s| s.last_active.elapsed() <= idle);
        }

        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_active)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    tracing::info!(session = %id, "session evicted (capacity {})", self.capacity);
                }
                None => break,
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10_000, EvictionPolicy::Lru)
    }
}
