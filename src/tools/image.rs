//! 图片生成工具：根据提示词构造生成服务的图片地址（不发起网络请求）

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use crate::tools::{Tool, ToolOutcome};

const DEFAULT_SIZE: u32 = 512;

/// 图片生成工具
pub struct ImageTool {
    base_url: String,
}

impl ImageTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn image_url(&self, prompt: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("Invalid image url: {}", e))?;
        url.path_segments_mut()
            .map_err(|_| "Image url cannot be a base".to_string())?
            .push(prompt);
        url.query_pairs_mut()
            .append_pair("width", &DEFAULT_SIZE.to_string())
            .append_pair("height", &DEFAULT_SIZE.to_string());
        Ok(url)
    }
}

#[async_trait]
impl Tool for ImageTool {
    fn name(&self) -> &str {
        "image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt"
    }

    fn validate_input(&self, input: &str) -> bool {
        let prompt = input.trim();
        !prompt.is_empty() && prompt.chars().count() < 500
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return Ok(ToolOutcome::failure_with_suggestion(
                "Prompt is empty",
                "Describe the image you want",
            ));
        }
        let url = self.image_url(prompt)?;
        Ok(ToolOutcome::Success(json!({
            "prompt": prompt,
            "url": url.as_str(),
            "width": DEFAULT_SIZE,
            "height": DEFAULT_SIZE,
            "type": "image",
        })))
    }
}
