use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("ripgrep ({binary}) not found. Install with: brew install ripgrep")]
    NotInstalled { binary: String },

    #[error("Search root does not exist or is not a directory: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Search timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Search output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("Search exited with {}: {}", describe_code(*code), stderr.trim())]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("Failed to spawn search: {0}")]
    Spawn(std::io::Error),

    #[error("I/O error while reading search output: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl SearchError {
    /// Missing tool is the one failure a caller can act on, so it is never
    /// folded into an empty result.
    pub fn is_missing_tool(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}
