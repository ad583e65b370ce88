//! 一次性内容生成
//!
//! 按关键词识别内容子类型（笔记 / 选择题 / 摘要 / 通用），交给 ContentProducer 生成结构化产物。
//! 默认的 TemplateContentProducer 返回固定模板，接入大模型时替换 producer 即可，调用契约不变。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 内容子类型（同时作为响应的 format 标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Notes,
    Mcqs,
    Summary,
    General,
}

impl ContentKind {
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("mcq") || lower.contains("quiz") || lower.contains("multiple choice") {
            ContentKind::Mcqs
        } else if lower.contains("summary") || lower.contains("summarize") {
            ContentKind::Summary
        } else if lower.contains("note") {
            ContentKind::Notes
        } else {
            ContentKind::General
        }
    }
}

/// 内容生成结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResult {
    pub content: Value,
    pub format: ContentKind,
}

/// 内容生产能力：给定消息与子类型产出载荷
#[async_trait]
pub trait ContentProducer: Send + Sync {
    async fn produce(&self, message: &str, kind: ContentKind) -> Value;
}

/// 固定模板生产者（占位实现）
#[derive(Debug, Default)]
pub struct TemplateContentProducer;

#[async_trait]
impl ContentProducer for TemplateContentProducer {
    async fn produce(&self, message: &str, kind: ContentKind) -> Value {
        match kind {
            ContentKind::Notes => json!({
                "title": format!("Notes: {}", message),
                "content": "# Comprehensive Notes\n\n## Key Points\n- Point 1: Important information\n- Point 2: Detailed explanation\n- Point 3: Practical examples\n\n## Summary\nThis covers the main concepts and practical applications.",
                "format": "markdown",
            }),
            ContentKind::Mcqs => {
                let question = |n: u32, answer: u32| {
                    json!({
                        "question": format!("Sample question {}?", n),
                        "options": ["Option A", "Option B", "Option C", "Option D"],
                        "answer": answer,
                        "explanation": "Detailed explanation for the correct answer.",
                    })
                };
                json!({
                    "title": format!("MCQs: {}", message),
                    "questions": [question(1, 0), question(2, 1)],
                })
            }
            ContentKind::Summary => json!({
                "title": format!("Summary: {}", message),
                "content": "# Executive Summary\n\n## Main Points\n- Key point 1 with details\n- Key point 2 with examples\n- Key point 3 with applications\n\n## Conclusion\nBrief summary of the main takeaways.",
                "format": "markdown",
            }),
            ContentKind::General => json!({
                "title": format!("Content: {}", message),
                "content": format!(
                    "Here's the complete content you requested:\n\n{}\n\nThis includes all the necessary information in a ready-to-use format.",
                    message
                ),
                "format": "text",
            }),
        }
    }
}

/// 内容生成器
pub struct ContentGenerator {
    producer: Arc<dyn ContentProducer>,
}

impl ContentGenerator {
    pub fn new(producer: Arc<dyn ContentProducer>) -> Self {
        Self { producer }
    }

    pub async fn generate(&self, message: &str) -> ContentResult {
        let kind = ContentKind::detect(message);
        let content = self.producer.produce(message, kind).await;
        ContentResult {
            content,
            format: kind,
        }
    }
}

impl Default for ContentGenerator {
    fn default() -> Self {
        Self::new(Arc::new(TemplateContentProducer))
    }
}
