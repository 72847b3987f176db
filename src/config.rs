//! Tee configuration
//!
//! Loaded from JSON or built in code with the `with_*` helpers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// When the tee process is spawned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// At construction, before any frame is seen; the environment derived
    /// from the first frame is recorded but never reaches the child
    Immediate,
    /// On the first successful pull, after the environment is applied
    #[default]
    FirstFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeeConfig {
    /// Command line of the tee process, e.g. `ffmpeg -f s16le -i pipe:0 out.wav`
    pub command: String,
    /// Prefix for the forwarded output lines
    pub label: String,
    pub show_stdout: bool,
    pub show_stderr: bool,
    pub start: StartPolicy,
    /// Grace period between closing stdin and killing the process
    pub close_timeout_ms: u64,
}

impl Default for TeeConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            label: "tee".to_string(),
            show_stdout: false,
            show_stderr: false,
            start: StartPolicy::default(),
            close_timeout_ms: 2000,
        }
    }
}

impl TeeConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_show_stdout(mut self, show: bool) -> Self {
        self.show_stdout = show;
        self
    }

    pub fn with_show_stderr(mut self, show: bool) -> Self {
        self.show_stderr = show;
        self
    }

    pub fn with_start(mut self, start: StartPolicy) -> Self {
        self.start = start;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TeeConfig::from_json_str(r#"{"command": "cat"}"#).unwrap();
        assert_eq!(config.command, "cat");
        assert_eq!(config.label, "tee");
        assert_eq!(config.start, StartPolicy::FirstFrame);
        assert_eq!(config.close_timeout(), Duration::from_secs(2));
        assert!(!config.show_stdout && !config.show_stderr);
    }

    #[test]
    fn test_full_json() {
        let config = TeeConfig::from_json_str(
            r#"{"command": "ffmpeg -i pipe:0 out.mkv", "label": "cam", "show_stderr": true,
                "start": "immediate", "close_timeout_ms": 50}"#,
        )
        .unwrap();
        assert_eq!(config.label, "cam");
        assert!(config.show_stderr);
        assert_eq!(config.start, StartPolicy::Immediate);
        assert_eq!(config.close_timeout_ms, 50);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            TeeConfig::from_json_str(r#"{"start": "later"}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"command": "cat", "show_stdout": true}}"#).unwrap();
        let config = TeeConfig::from_file(file.path()).unwrap();
        assert!(config.show_stdout);

        assert!(matches!(
            TeeConfig::from_file("/nonexistent/tee.json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = TeeConfig::new("cat")
            .with_label("mic")
            .with_show_stdout(true)
            .with_start(StartPolicy::Immediate)
            .with_close_timeout(Duration::from_millis(300));
        assert_eq!(config.label, "mic");
        assert!(config.show_stdout);
        assert_eq!(config.start, StartPolicy::Immediate);
        assert_eq!(config.close_timeout_ms, 300);
    }
}
