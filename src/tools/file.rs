//! Sandboxed file writer

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Result, RoundtableError};
use crate::tools::traits::Tool;

/// Writes text files below a root directory
pub struct WriteFileTool {
    name: String,
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: "write_file".to_string(),
            root: root.into(),
        }
    }

    /// Override the registered name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve a relative path under the root, rejecting escapes
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if relative.is_empty() || escapes {
            return Err(RoundtableError::other(format!(
                "path '{}' must be relative and stay inside the workspace",
                relative
            )));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Write text content to a file in the workspace"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Text to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        let relative = arguments["path"].as_str().unwrap_or_default();
        let content = arguments["content"].as_str().unwrap_or_default();
        let target = self.resolve(relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;

        Ok(format!("Wrote {} bytes to {}", content.len(), relative))
    }
}
