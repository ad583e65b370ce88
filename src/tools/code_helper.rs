//! 代码助手：识别代码片段的语言并给出简单的静态提示（不执行代码）

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::tools::{Tool, ToolOutcome};

/// (语言, 特征正则)；按顺序匹配，先命中者胜
fn signatures() -> &'static [(&'static str, Regex)] {
    static SIGS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    SIGS.get_or_init(|| {
        [
            ("rust", r"\bfn\s+\w+\s*\(|\blet\s+mut\b|\bimpl\b|::"),
            ("python", r"\bdef\s+\w+\s*\(.*\)\s*:|^\s*import\s+\w+|\bprint\("),
            ("javascript", r"\bfunction\b|\bconst\s+\w+\s*=|=>|console\.log"),
            ("java", r"\bpublic\s+(static\s+)?(class|void)\b|System\.out"),
            ("sql", r"(?i)\bselect\b.+\bfrom\b|\binsert\s+into\b"),
            ("shell", r"^#!/bin/(ba)?sh|\becho\s+\$"),
        ]
        .into_iter()
        .filter_map(|(lang, pattern)| {
            Regex::new(&format!("(?m){}", pattern))
                .ok()
                .map(|re| (lang, re))
        })
        .collect()
    })
}

pub fn detect_language(code: &str) -> &'static str {
    signatures()
        .iter()
        .find(|(_, re)| re.is_match(code))
        .map(|(lang, _)| *lang)
        .unwrap_or("unknown")
}

fn hints(code: &str, language: &str) -> Vec<String> {
    let mut hints = Vec::new();
    let opens = code.matches(['(', '[', '{']).count();
    let closes = code.matches([')', ']', '}']).count();
    if opens != closes {
        hints.push(format!(
            "Unbalanced brackets: {} opening vs {} closing",
            opens, closes
        ));
    }
    if code.lines().any(|l| l.chars().count() > 120) {
        hints.push("Some lines exceed 120 characters".to_string());
    }
    match language {
        "rust" if code.contains(".unwrap()") => {
            hints.push("Consider propagating errors with ? instead of unwrap()".to_string())
        }
        "javascript" if code.contains("var ") => {
            hints.push("Prefer let/const over var".to_string())
        }
        "python" if code.contains('\t') && code.contains("    ") => {
            hints.push("Mixed tabs and spaces in indentation".to_string())
        }
        _ => {}
    }
    hints
}

/// 代码助手工具
#[derive(Debug, Default)]
pub struct CodeHelperTool;

#[async_trait]
impl Tool for CodeHelperTool {
    fn name(&self) -> &str {
        "code"
    }

    fn description(&self) -> &str {
        "Detect the language of a code snippet and point out common issues"
    }

    fn validate_input(&self, input: &str) -> bool {
        !input.trim().is_empty() && input.len() < 20_000
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        if input.trim().is_empty() {
            return Ok(ToolOutcome::failure_with_suggestion(
                "No code provided",
                "Paste the snippet you want reviewed",
            ));
        }
        let language = detect_language(input);
        Ok(ToolOutcome::Success(json!({
            "language": language,
            "lines": input.lines().count(),
            "characters": input.chars().count(),
            "hints": hints(input, language),
            "type": "code",
        })))
    }
}
