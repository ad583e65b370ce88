//! 工具执行器
//!
//! 持有 ToolRegistry 与缓存：execute(tool_name, input, session_id) 先按指纹查缓存，命中则直接返回
//! （不触发工具逻辑及其外部调用）；未命中时调用工具，正常返回的结果写入缓存，工具报错则包装为
//! DialogueError::ToolExecutionFailed 且不缓存。每次调用输出结构化审计日志（JSON）。
//! 不设超时，外部调用依赖底层 HTTP 客户端的默认行为。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{tool_fingerprint, Cache};
use crate::core::DialogueError;
use crate::tools::{Tool, ToolInfo, ToolOutcome, ToolRegistry};

/// 工具执行器：查找、缓存、执行、错误包装
pub struct ToolExecutor {
    registry: ToolRegistry,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            registry,
            cache,
            ttl,
        }
    }

    pub async fn execute(
        &self,
        tool_name: &str,
        input: &str,
        session_id: &str,
    ) -> Result<ToolOutcome, DialogueError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| DialogueError::ToolNotFound(tool_name.to_string()))?;

        let start = Instant::now();
        let key = tool_fingerprint(tool_name, input);

        if let Some(outcome) = self.cache.get(&key).await.and_then(ToolOutcome::from_value) {
            audit(tool_name, session_id, "cache_hit", start, input);
            return Ok(outcome);
        }

        tracing::info!("Executing tool: {} for session: {}", tool_name, session_id);
        match tool.execute(input, session_id).await {
            Ok(outcome) => {
                let label = if outcome.is_success() { "ok" } else { "soft_failure" };
                audit(tool_name, session_id, label, start, input);
                self.cache.set(&key, outcome.to_value(), self.ttl).await;
                Ok(outcome)
            }
            Err(message) => {
                audit(tool_name, session_id, "error", start, input);
                tracing::error!("Tool execution failed: {}: {}", tool_name, message);
                Err(DialogueError::ToolExecutionFailed {
                    tool: tool_name.to_string(),
                    message,
                })
            }
        }
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.registry.list()
    }

    pub fn validate(&self, name: &str, input: &str) -> bool {
        self.registry.validate(name, input)
    }
}

fn audit(tool: &str, session_id: &str, outcome: &str, start: Instant, input: &str) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool,
        "session": session_id,
        "outcome": outcome,
        "duration_ms": start.elapsed().as_millis() as u64,
        "input_preview": input_preview(input),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

fn input_preview(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::cache::MemoryCache;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "counts invocations"
        }

        async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if input == "boom" {
                return Err("exploded".to_string());
            }
            Ok(ToolOutcome::Success(json!({ "input": input, "call": n })))
        }
    }

    fn executor(calls: Arc<AtomicUsize>) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Counting { calls });
        ToolExecutor::new(registry, Arc::new(MemoryCache::new()), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_tool() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = executor(calls.clone());

        let first = executor.execute("counting", "a", "s1").await.unwrap();
        let second = executor.execute("COUNTING", "a", "s2").await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        executor.execute("counting", "b", "s1").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_result_expires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Counting { calls: calls.clone() });
        let executor = ToolExecutor::new(registry, Arc::new(MemoryCache::new()), Duration::from_millis(10));

        executor.execute("counting", "a", "s").await.unwrap();
        executor.execute("counting", "a", "s").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let again = executor.execute("counting", "a", "s").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(again.to_value()["call"], 2);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let executor = executor(Arc::new(AtomicUsize::new(0)));
        let err = executor.execute("missing", "a", "s").await.unwrap_err();
        assert_eq!(err, DialogueError::ToolNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_errors_are_wrapped_and_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = executor(calls.clone());

        for _ in 0..2 {
            let err = executor.execute("counting", "boom", "s").await.unwrap_err();
            assert_eq!(
                err,
                DialogueError::ToolExecutionFailed {
                    tool: "counting".to_string(),
                    message: "exploded".to_string(),
                }
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_input_preview_truncates() {
        let long = "x".repeat(300);
        assert_eq!(input_preview(&long).len(), 203);
        assert_eq!(input_preview("short"), "short");
    }
}
