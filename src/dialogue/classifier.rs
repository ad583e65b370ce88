//! 消息分类
//!
//! 将用户输入映射为响应策略标签：技术类走分步引导，内容类走一次性完整输出。
//! 分类器是可替换的策略对象，后续可换成基于模型的实现，不影响任务引擎与内容生成器。

use serde::{Deserialize, Serialize};

/// 技术类关键词（子串匹配）
const TECHNICAL_KEYWORDS: &[&str] = &[
    "install",
    "setup",
    "configure",
    "debug",
    "code",
    "build",
    "deploy",
    "fix",
    "error",
    "bug",
    "troubleshoot",
];

/// 内容类关键词（子串匹配）
const CONTENT_KEYWORDS: &[&str] = &[
    "create", "write", "generate", "note", "mcq", "summary", "explain", "list", "describe",
];

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTags {
    pub is_technical: bool,
    pub is_content: bool,
    pub requires_step_by_step: bool,
    pub requires_complete_output: bool,
}

impl MessageTags {
    pub fn new(is_technical: bool, is_content: bool) -> Self {
        Self {
            is_technical,
            is_content,
            requires_step_by_step: is_technical && !is_content,
            requires_complete_output: is_content && !is_technical,
        }
    }
}

/// 分类策略 trait
pub trait MessageClassifier: Send + Sync {
    fn classify(&self, text: &str) -> MessageTags;
}

/// 关键词分类器：小写后做子串包含判断（关键词嵌在更长的词里也算命中）
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl MessageClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> MessageTags {
        let lower = text.to_lowercase();
        let is_technical = TECHNICAL_KEYWORDS.iter().any(|k| lower.contains(k));
        let is_content = CONTENT_KEYWORDS.iter().any(|k| lower.contains(k));
        MessageTags::new(is_technical, is_content)
    }
}
