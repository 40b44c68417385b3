//! Text-to-image tool
//!
//! Posts a prompt to a Stable-Diffusion-style `/generate` endpoint and returns
//! the URL of the generated image. The image itself is not downloaded.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Result, RoundtableError};
use crate::tools::http::RemoteClient;
use crate::tools::traits::Tool;

/// Generates an image from a text prompt
pub struct ImageGenerateTool {
    name: String,
    remote: RemoteClient,
}

impl ImageGenerateTool {
    /// Create a tool for a resolved `/generate` endpoint
    pub fn new(remote: RemoteClient) -> Self {
        Self {
            name: "generate_image".to_string(),
            remote,
        }
    }

    /// Override the registered name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Generation parameters for a prompt
    pub fn request_body(prompt: &str) -> Value {
        serde_json::json!({
            "batch_size": 1,
            "cfg_scale": 7,
            "face_detector": "face_yolov8n.pt",
            "hand_detector": "hand_yolov8n.pt",
            "height": 512,
            "negative_prompt": "",
            "override_settings": {
                "sd_model_checkpoint": "sd-v1-5-inpainting.ckpt"
            },
            "person_detector": "person_yolov8n-seg.pt",
            "prompt": prompt,
            "sampler_name": "DPM++ 2M",
            "seed": -1,
            "steps": 30,
            "width": 512
        })
    }
}

#[async_trait]
impl Tool for ImageGenerateTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt and return its URL"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Description of the image to generate"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        let prompt = arguments["prompt"]
            .as_str()
            .ok_or_else(|| RoundtableError::other("missing 'prompt' argument"))?;

        let body = self.remote.post_json(&Self::request_body(prompt)).await?;
        let image_url = body.trim();
        if image_url.is_empty() {
            return Err(RoundtableError::other("image service returned an empty response"));
        }

        Ok(format!("![generated image]({})", image_url))
    }
}
