use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::app::ports::Translator;
use crate::error::TranslateError;

/// Offline backend: runs a local model CLI once per value, text on stdin,
/// translation on stdout. `{source}` and `{target}` in the arguments are
/// replaced with the language codes.
pub struct CommandTranslator {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranslator {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    fn render_args(&self, source_lang: &str, target_lang: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace("{source}", source_lang).replace("{target}", target_lang))
            .collect()
    }

    async fn run(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String, TranslateError> {
        let mut child = Command::new(&self.command)
            .args(self.render_args(source_lang, target_lang))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranslateError::Engine(format!("failed to start '{}': {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| TranslateError::Engine(format!("failed to write input: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TranslateError::Engine(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranslateError::Engine(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Translator for CommandTranslator {
    fn name(&self) -> &str {
        "command"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        tokio::time::timeout(self.timeout, self.run(text, source_lang, target_lang))
            .await
            .map_err(|_| TranslateError::Timeout(self.timeout.as_secs()))?
    }
}
