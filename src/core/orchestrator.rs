//! 对话编排器：分类 → 分步任务 / 一次性内容；工具调用走独立路径
//!
//! 进程启动时构造一次，以 `Arc<Orchestrator>` 注入到 HTTP 与 WebSocket 处理器。

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::Cache;
use crate::core::DialogueError;
use crate::dialogue::{
    ContentGenerator, MessageClassifier, MessageTags, Response, Strategy, TaskEngine,
};
use crate::session::{ChatExchange, Preferences, Session, SessionStore};
use crate::tools::{ToolExecutor, ToolInfo, ToolOutcome};

/// 对话编排器
pub struct Orchestrator {
    classifier: Arc<dyn MessageClassifier>,
    tasks: TaskEngine,
    content: ContentGenerator,
    tools: ToolExecutor,
    sessions: Arc<SessionStore>,
    cache: Arc<dyn Cache>,
    max_history: usize,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<dyn MessageClassifier>,
        tasks: TaskEngine,
        content: ContentGenerator,
        tools: ToolExecutor,
        sessions: Arc<SessionStore>,
        cache: Arc<dyn Cache>,
        max_history: usize,
    ) -> Self {
        Self {
            classifier,
            tasks,
            content,
            tools,
            sessions,
            cache,
            max_history,
        }
    }

    pub fn classify(&self, message: &str) -> MessageTags {
        self.classifier.classify(message)
    }

    /// 处理一条用户消息：仅明确的技术类走分步引导，其余（含两类都命中/都未命中）走完整输出
    pub async fn classify_and_respond(&self, message: &str, session_id: &str) -> Response {
        let tags = self.classify(message);
        let strategy = Strategy::from_tags(&tags);
        tracing::debug!(
            session = %session_id,
            technical = tags.is_technical,
            content = tags.is_content,
            ?strategy,
            "message classified"
        );

        let exchange = ChatExchange {
            message: message.to_string(),
            strategy,
        };
        let max_history = self.max_history;
        self.sessions
            .with_session(session_id, |s| s.record_exchange(exchange, max_history))
            .await;

        match strategy {
            Strategy::StepByStep => self
                .tasks
                .advance(&self.sessions, session_id, message)
                .await
                .into(),
            Strategy::CompleteOutput => self.content.generate(message).await.into(),
        }
    }

    /// 确认当前步骤并返回下一轮；会话没有进行中的任务时返回 None
    pub async fn confirm_step(&self, session_id: &str, step_result: Option<Value>) -> Option<Response> {
        self.tasks
            .confirm(&self.sessions, session_id, step_result)
            .await
            .map(Response::from)
    }

    pub async fn use_tool(
        &self,
        tool_name: &str,
        input: &str,
        session_id: &str,
    ) -> Result<ToolOutcome, DialogueError> {
        self.tools.execute(tool_name, input, session_id).await
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools.list()
    }

    pub fn validate_tool(&self, tool_name: &str, input: &str) -> bool {
        self.tools.validate(tool_name, input)
    }

    /// 获取会话快照（不存在则以默认偏好创建）
    pub async fn get_session(&self, session_id: &str) -> Session {
        self.sessions.get_or_create(session_id).await
    }

    /// 浅合并偏好，返回合并后的完整偏好；未知键原样保留
    pub async fn set_preferences(&self, session_id: &str, partial: Map<String, Value>) -> Preferences {
        self.sessions
            .with_session(session_id, |s| {
                s.preferences.merge(partial);
                s.preferences.clone()
            })
            .await
    }

    pub async fn remove_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id).await
    }

    pub async fn sweep_expired(&self) -> usize {
        self.sessions.sweep_expired().await
    }

    /// 清理工具结果与步骤模板缓存中的过期条目；与 sweep_expired 一起由后台任务定期调用
    pub async fn purge_cache(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }
}
