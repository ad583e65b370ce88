//! 对话层：消息分类、分步任务引擎、一次性内容生成
//!
//! - **classifier**：关键词策略，判定走分步引导还是完整输出
//! - **task**：会话级任务状态机（创建、推进、确认、完成）
//! - **content**：内容子类型识别与可替换的内容生产者

pub mod classifier;
pub mod content;
pub mod task;

use serde::{Deserialize, Serialize};

pub use classifier::{KeywordClassifier, MessageClassifier, MessageTags};
pub use content::{ContentGenerator, ContentKind, ContentProducer, ContentResult, TemplateContentProducer};
pub use task::{step_template, CompletionTurn, Step, StepTurn, Task, TaskEngine, TaskType, TurnResult};

/// 响应策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    StepByStep,
    CompleteOutput,
}

impl Strategy {
    /// 仅明确的技术类消息走分步；两类都命中或都未命中时按完整输出处理
    pub fn from_tags(tags: &MessageTags) -> Self {
        if tags.requires_step_by_step {
            Strategy::StepByStep
        } else {
            Strategy::CompleteOutput
        }
    }
}

/// 对话一轮的响应（不含时间戳，由传输层补充）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Step(StepTurn),
    Completion(CompletionTurn),
    Content(ContentResult),
}

impl From<TurnResult> for Response {
    fn from(turn: TurnResult) -> Self {
        match turn {
            TurnResult::Step(step) => Response::Step(step),
            TurnResult::Completion(done) => Response::Completion(done),
        }
    }
}

impl From<ContentResult> for Response {
    fn from(content: ContentResult) -> Self {
        Response::Content(content)
    }
}
