//! Word cloud rendering through an external command.
//!
//! The default command is `wordcloud_cli` from the Python `wordcloud`
//! package. The tokens are written space separated to a text file next to
//! the output image, the command turns that file into a PNG, and the text
//! file is removed afterwards.

use async_trait::async_trait;
use log::{debug, warn};
use std::path::Path;
use tokio::process::Command;

use crate::pipeline::{RenderError, RenderSettings, Renderer};
use crate::twitter::sanitize_for_logging;

pub struct CommandRenderer {
    program: String,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        CommandRenderer {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(
        &self,
        tokens: &[String],
        output: &Path,
        settings: &RenderSettings,
    ) -> Result<(), RenderError> {
        let text_file = output.with_extension("txt");
        tokio::fs::write(&text_file, tokens.join(" ")).await?;

        debug!(
            "Running {} for {} ({}x{}, {} words max)",
            self.program,
            output.display(),
            settings.width,
            settings.height,
            settings.max_words
        );
        let result = Command::new(&self.program)
            .arg("--text")
            .arg(&text_file)
            .arg("--imagefile")
            .arg(output)
            .arg("--width")
            .arg(settings.width.to_string())
            .arg("--height")
            .arg(settings.height.to_string())
            .arg("--max_words")
            .arg(settings.max_words.to_string())
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&text_file).await {
            warn!("Failed to remove {}: {}", text_file.display(), e);
        }

        let out = result.map_err(|e| {
            RenderError::Failed(format!("could not start '{}': {}", self.program, e))
        })?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(RenderError::Failed(format!(
                "'{}' exited with {}: {}",
                self.program,
                out.status,
                sanitize_for_logging(&stderr, 300)
            )));
        }
        Ok(())
    }
}
