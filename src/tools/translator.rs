//! 翻译工具（演示用，内置小词表）
//!
//! 输入格式：`<text> from <language> to <language>`，缺省源语言 auto、目标语言 en。

use async_trait::async_trait;
use serde_json::json;

use crate::tools::{Tool, ToolOutcome};

/// (代码, 名称)
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "Hindi"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ar", "Arabic"),
];

/// (方向, 原文, 译文)
const PHRASEBOOK: &[(&str, &str, &str)] = &[
    ("en-hi", "hello", "नमस्ते"),
    ("en-hi", "how are you", "आप कैसे हैं"),
    ("hi-en", "नमस्ते", "hello"),
    ("hi-en", "आप कैसे हैं", "how are you"),
    ("en-es", "hello", "hola"),
    ("en-es", "how are you", "cómo estás"),
    ("es-en", "hola", "hello"),
    ("es-en", "cómo estás", "how are you"),
];

/// 解析后的翻译请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub from: String,
    pub to: String,
}

/// 翻译工具
#[derive(Debug, Default)]
pub struct TranslatorTool;

impl TranslatorTool {
    pub fn parse(input: &str) -> TranslationRequest {
        let (text, rest) = match input.split_once(" from ") {
            Some((text, rest)) => (text, Some(rest)),
            None => (input, None),
        };

        let mut from = "auto".to_string();
        let mut to = "en".to_string();
        if let Some(rest) = rest {
            match rest.split_once(" to ") {
                Some((src, dst)) => {
                    from = language_code(src.trim());
                    to = language_code(dst.trim());
                }
                None => from = language_code(rest.trim()),
            }
        }

        TranslationRequest {
            text: text.trim().to_string(),
            from,
            to,
        }
    }

    fn translate(&self, request: &TranslationRequest) -> String {
        let direction = format!("{}-{}", request.from, request.to);
        let lower = request.text.to_lowercase();
        PHRASEBOOK
            .iter()
            .find(|(dir, src, _)| *dir == direction && *src == lower)
            .map(|(_, _, dst)| dst.to_string())
            .unwrap_or_else(|| format!("[Translation: {}]", request.text))
    }
}

/// 语言名转代码；未知语言取前两个字符
fn language_code(language: &str) -> String {
    let lower = language.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, name)| name.to_lowercase() == lower)
        .map(|(code, _)| code.to_string())
        .unwrap_or_else(|| lower.chars().take(2).collect())
}

fn language_name(code: &str) -> String {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[async_trait]
impl Tool for TranslatorTool {
    fn name(&self) -> &str {
        "translator"
    }

    fn description(&self) -> &str {
        "Multi-language translation service"
    }

    fn validate_input(&self, input: &str) -> bool {
        !input.is_empty() && input.chars().count() < 1000
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        let request = Self::parse(input);
        if request.text.is_empty() {
            return Ok(ToolOutcome::failure_with_suggestion(
                "Translation failed",
                "Please check your input format",
            ));
        }
        let translated = self.translate(&request);
        Ok(ToolOutcome::Success(json!({
            "original": request.text,
            "translated": translated,
            "from": language_name(&request.from),
            "to": language_name(&request.to),
            "type": "translation",
        })))
    }
}
