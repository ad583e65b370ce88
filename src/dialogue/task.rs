//! 分步任务引擎
//!
//! 会话没有进行中的任务时，根据消息识别任务类型、生成固定的四步模板（可缓存）并创建任务；
//! 之后每次 advance 发出游标处的一步并推进游标，游标到达末尾时发出完成摘要并销毁任务。
//!
//! auto_advance = false 时，发出一步后任务进入等待：再次 advance 只会重发同一步，
//! 直到 confirm 记录该步完成并发出下一步。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::{steps_cache_key, Cache};
use crate::session::SessionStore;

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Installation,
    Debugging,
    Coding,
    Configuration,
    Deployment,
    General,
}

impl TaskType {
    /// 按关键词识别任务类型（按顺序匹配，第一个命中为准）
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["install", "setup"]) {
            TaskType::Installation
        } else if has(&["debug", "fix"]) {
            TaskType::Debugging
        } else if has(&["code", "program"]) {
            TaskType::Coding
        } else if has(&["configure", "settings"]) {
            TaskType::Configuration
        } else if has(&["build", "deploy"]) {
            TaskType::Deployment
        } else {
            TaskType::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Installation => "installation",
            TaskType::Debugging => "debugging",
            TaskType::Coding => "coding",
            TaskType::Configuration => "configuration",
            TaskType::Deployment => "deployment",
            TaskType::General => "general",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个步骤（不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub instruction: String,
    pub requires_confirmation: bool,
}

impl Step {
    fn confirm(instruction: &str) -> Self {
        Self {
            instruction: instruction.to_string(),
            requires_confirmation: true,
        }
    }
}

/// 各任务类型的步骤模板（固定四步，均需确认）
pub fn step_template(task_type: TaskType) -> Vec<Step> {
    let instructions: [&str; 4] = match task_type {
        TaskType::Installation => [
            "Let's check the system requirements first. What operating system are you using?",
            "I'll help you download the necessary files. Ready to proceed?",
            "Now let's run the installation command. Make sure you're in the correct directory.",
            "Let's verify the installation was successful by testing it.",
        ],
        TaskType::Debugging => [
            "Let's first reproduce the error. What specific error message are you seeing?",
            "I'll help you analyze the error logs. Can you share the relevant code snippet?",
            "Let's implement a fix for this issue. Ready to try the solution?",
            "Now let's test if the fix resolved the issue.",
        ],
        TaskType::Coding => [
            "Let's start by setting up the project structure. What programming language are you using?",
            "I'll help you write the main functionality. Ready to begin coding?",
            "Now let's implement the core logic. Share your progress when ready.",
            "Finally, let's test the code and handle any edge cases.",
        ],
        TaskType::Configuration => [
            "Let's locate the configuration you want to change. Which file or settings panel is it?",
            "Let's back up the current configuration before editing. Ready to continue?",
            "Now apply the new values. Share the changed section when done.",
            "Finally, restart or reload the service and confirm the new settings took effect.",
        ],
        TaskType::Deployment => [
            "Let's make sure the build succeeds locally first. Which target environment are you deploying to?",
            "Now let's prepare the environment variables and secrets for that target. Ready?",
            "Let's run the deployment. Share the output if anything looks wrong.",
            "Finally, let's verify the deployed service is healthy and reachable.",
        ],
        TaskType::General => [
            "Let me break this down into manageable steps. First, let's identify the main requirements...",
            "Now, let's tackle the first part. Ready to continue?",
            "Great! Moving on to the next phase...",
            "Finally, let's review and test everything.",
        ],
    };
    instructions.iter().map(|i| Step::confirm(i)).collect()
}

/// 进行中的任务，归属唯一会话
#[derive(Debug, Clone)]
pub struct Task {
    pub task_type: TaskType,
    /// 创建时生成，生命周期内不变
    pub steps: Vec<Step>,
    /// 0 <= current_step <= steps.len()
    pub current_step: usize,
    pub completed_steps: Vec<usize>,
    pub context: Map<String, Value>,
    /// 已发出但尚未确认的步骤（仅 auto_advance = false 时使用）
    pub pending_step: Option<usize>,
}

impl Task {
    pub fn new(task_type: TaskType, steps: Vec<Step>) -> Self {
        Self {
            task_type,
            steps,
            current_step: 0,
            completed_steps: Vec::new(),
            context: Map::new(),
            pending_step: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_step >= self.steps.len()
    }

    fn step_turn(&self, index: usize) -> StepTurn {
        let step = &self.steps[index];
        StepTurn {
            step_number: index + 1,
            total_steps: self.steps.len(),
            content: step.instruction.clone(),
            requires_confirmation: step.requires_confirmation,
            context: self.context.clone(),
        }
    }

    fn completion(&self) -> CompletionTurn {
        let total = self.steps.len();
        CompletionTurn {
            content: format!(
                "🎉 Task completed successfully!\n\n**Summary:**\n- All {} steps executed\n- No errors encountered\n- Ready for your next challenge!\n\nGreat work!",
                total
            ),
            task_type: self.task_type,
            total_steps: total,
        }
    }
}

/// 发出的一步
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTurn {
    /// 从 1 开始
    pub step_number: usize,
    pub total_steps: usize,
    pub content: String,
    pub requires_confirmation: bool,
    pub context: Map<String, Value>,
}

/// 任务完成摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionTurn {
    pub content: String,
    pub task_type: TaskType,
    pub total_steps: usize,
}

/// 一轮分步引导的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnResult {
    Step(StepTurn),
    Completion(CompletionTurn),
}

/// 分步任务引擎
pub struct TaskEngine {
    cache: Arc<dyn Cache>,
    steps_ttl: Duration,
    auto_advance: bool,
}

impl TaskEngine {
    pub fn new(cache: Arc<dyn Cache>, steps_ttl: Duration, auto_advance: bool) -> Self {
        Self {
            cache,
            steps_ttl,
            auto_advance,
        }
    }

    /// 识别任务类型并生成步骤列表；模板按 (类型, 消息前缀) 缓存，缓存失效时重新生成
    pub async fn plan(&self, message: &str) -> (TaskType, Vec<Step>) {
        let task_type = TaskType::detect(message);
        let key = steps_cache_key(task_type.as_str(), message);

        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(steps) = serde_json::from_value::<Vec<Step>>(cached) {
                tracing::debug!(key = %key, "step template cache hit");
                return (task_type, steps);
            }
        }

        let steps = step_template(task_type);
        if let Ok(value) = serde_json::to_value(&steps) {
            self.cache.set(&key, value, self.steps_ttl).await;
        }
        (task_type, steps)
    }

    /// 推进会话的分步任务：无任务则先创建，然后发出下一步或完成摘要
    pub async fn advance(&self, sessions: &SessionStore, session_id: &str, message: &str) -> TurnResult {
        let has_task = sessions.with_session(session_id, |s| s.has_task()).await;
        let planned = if has_task {
            None
        } else {
            Some(self.plan(message).await)
        };

        sessions
            .with_session(session_id, |s| {
                let task = s.current_task.get_or_insert_with(|| {
                    // 两次加锁之间任务可能已被并发的一轮清除，此时直接用模板
                    let (task_type, steps) = planned.unwrap_or_else(|| {
                        let t = TaskType::detect(message);
                        (t, step_template(t))
                    });
                    tracing::info!(session = %session_id, task_type = %task_type, "task started");
                    Task::new(task_type, steps)
                });
                let turn = self.next_turn(task);
                Self::finish_turn(&mut s.current_task, turn)
            })
            .await
    }

    /// 确认当前步骤：记录完成与步骤结果，然后发出下一轮；会话无任务时返回 None
    pub async fn confirm(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        step_result: Option<Value>,
    ) -> Option<TurnResult> {
        sessions
            .with_session(session_id, |s| {
                let task = s.current_task.as_mut()?;
                let confirmed = task
                    .pending_step
                    .take()
                    .or_else(|| task.current_step.checked_sub(1));
                if let Some(index) = confirmed {
                    if !task.completed_steps.contains(&index) {
                        task.completed_steps.push(index);
                    }
                    if let Some(result) = step_result.filter(|v| !v.is_null()) {
                        task.context.insert(format!("step_{}_result", index + 1), result);
                    }
                }
                let turn = self.next_turn(task);
                Some(Self::finish_turn(&mut s.current_task, turn))
            })
            .await
    }

    fn next_turn(&self, task: &mut Task) -> TurnResult {
        if !self.auto_advance {
            if let Some(index) = task.pending_step {
                return TurnResult::Step(task.step_turn(index));
            }
        }

        if task.is_finished() {
            return TurnResult::Completion(task.completion());
        }

        let index = task.current_step;
        task.current_step += 1;
        if !self.auto_advance {
            task.pending_step = Some(index);
        }
        TurnResult::Step(task.step_turn(index))
    }

    /// 完成摘要发出后销毁任务
    fn finish_turn(slot: &mut Option<Task>, turn: TurnResult) -> TurnResult {
        if let TurnResult::Completion(done) = &turn {
            tracing::info!(task_type = %done.task_type, steps = done.total_steps, "task completed");
            *slot = None;
        }
        turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn engine(auto_advance: bool) -> TaskEngine {
        TaskEngine::new(
            Arc::new(MemoryCache::new()),
            Duration::from_secs(3600),
            auto_advance,
        )
    }

    #[test]
    fn test_detect_task_type() {
        assert_eq!(TaskType::detect("install docker on ubuntu"), TaskType::Installation);
        assert_eq!(TaskType::detect("debug my app"), TaskType::Debugging);
        assert_eq!(TaskType::detect("program a game"), TaskType::Coding);
        assert_eq!(TaskType::detect("change settings"), TaskType::Configuration);
        assert_eq!(TaskType::detect("deploy to prod"), TaskType::Deployment);
        assert_eq!(TaskType::detect(""), TaskType::General);
    }

    #[test]
    fn test_every_template_has_four_confirmed_steps() {
        for t in [
            TaskType::Installation,
            TaskType::Debugging,
            TaskType::Coding,
            TaskType::Configuration,
            TaskType::Deployment,
            TaskType::General,
        ] {
            let steps = step_template(t);
            assert_eq!(steps.len(), 4);
            assert!(steps.iter().all(|s| s.requires_confirmation));
        }
    }

    #[tokio::test]
    async fn test_full_walkthrough_then_completion() {
        let engine = engine(true);
        let store = SessionStore::default();

        for n in 1..=4 {
            let turn = engine.advance(&store, "s", "install docker on ubuntu").await;
            match turn {
                TurnResult::Step(step) => {
                    assert_eq!(step.step_number, n);
                    assert_eq!(step.total_steps, 4);
                }
                other => panic!("expected step, got {:?}", other),
            }
            let session = store.get("s").await.unwrap();
            assert_eq!(session.current_task.unwrap().steps.len(), 4);
        }

        let turn = engine.advance(&store, "s", "continue").await;
        match turn {
            TurnResult::Completion(done) => {
                assert_eq!(done.task_type, TaskType::Installation);
                assert_eq!(done.total_steps, 4);
                assert!(done.content.contains("All 4 steps"));
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(store.get("s").await.unwrap().current_task.is_none());
    }

    #[tokio::test]
    async fn test_first_step_of_installation() {
        let engine = engine(true);
        let store = SessionStore::default();
        let turn = engine.advance(&store, "s", "install docker on ubuntu").await;
        let TurnResult::Step(step) = turn else {
            panic!("expected step");
        };
        assert_eq!(step.step_number, 1);
        assert!(step.content.contains("system requirements"));
        assert!(step.requires_confirmation);
    }

    #[tokio::test]
    async fn test_task_type_fixed_by_first_message() {
        let engine = engine(true);
        let store = SessionStore::default();
        engine.advance(&store, "s", "install node").await;
        engine.advance(&store, "s", "deploy it").await;
        let task = store.get("s").await.unwrap().current_task.unwrap();
        assert_eq!(task.task_type, TaskType::Installation);
        assert_eq!(task.current_step, 2);
    }

    #[tokio::test]
    async fn test_plan_uses_cache() {
        let cache = Arc::new(MemoryCache::new());
        let engine = TaskEngine::new(cache.clone(), Duration::from_secs(3600), true);
        engine.plan("install docker").await;
        assert_eq!(cache.len().await, 1);
        let (task_type, steps) = engine.plan("install docker").await;
        assert_eq!(task_type, TaskType::Installation);
        assert_eq!(steps, step_template(TaskType::Installation));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_manual_advance_waits_for_confirmation() {
        let engine = engine(false);
        let store = SessionStore::default();

        let first = engine.advance(&store, "s", "fix my bug").await;
        let again = engine.advance(&store, "s", "fix my bug").await;
        assert_eq!(first, again);

        let next = engine
            .confirm(&store, "s", Some(serde_json::json!("done")))
            .await
            .unwrap();
        let TurnResult::Step(step) = next else {
            panic!("expected step");
        };
        assert_eq!(step.step_number, 2);
        assert_eq!(step.context.get("step_1_result"), Some(&serde_json::json!("done")));

        let task = store.get("s").await.unwrap().current_task.unwrap();
        assert_eq!(task.completed_steps, vec![0]);
    }

    #[tokio::test]
    async fn test_confirm_without_task_is_none() {
        let engine = engine(true);
        let store = SessionStore::default();
        assert!(engine.confirm(&store, "s", None).await.is_none());
    }

    #[tokio::test]
    async fn test_manual_mode_completes_after_last_confirmation() {
        let engine = engine(false);
        let store = SessionStore::default();
        engine.advance(&store, "s", "setup").await;
        for _ in 0..3 {
            engine.confirm(&store, "s", None).await.unwrap();
        }
        let last = engine.confirm(&store, "s", None).await.unwrap();
        assert!(matches!(last, TurnResult::Completion(_)));
        assert!(store.get("s").await.unwrap().current_task.is_none());
    }
}
