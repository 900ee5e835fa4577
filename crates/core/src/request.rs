use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_RESULTS: usize = 100;
pub const DEFAULT_CONTEXT_LINES: usize = 2;

/// One search call: where to look, what to look for, and how much to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub root: PathBuf,
    pub query: String,
    pub max_results: usize,
    pub context_lines: usize,
    pub case_sensitive: bool,
    pub glob: Option<String>,
}

impl SearchRequest {
    pub fn new(root: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
            context_lines: DEFAULT_CONTEXT_LINES,
            case_sensitive: false,
            glob: None,
        }
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n.max(1);
        self
    }

    pub fn context_lines(mut self, n: usize) -> Self {
        self.context_lines = n;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn glob(mut self, pattern: Option<String>) -> Self {
        self.glob = pattern.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-file match cap handed to the tool: `max_results / 10`, rounded up.
    pub fn per_file_cap(&self) -> usize {
        self.max_results.div_ceil(10)
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--json".to_string(),
            format!("--max-count={}", self.per_file_cap()),
            format!("--context={}", self.context_lines),
        ];
        if !self.case_sensitive {
            args.push("--ignore-case".to_string());
        }
        if let Some(glob) = &self.glob {
            args.push(format!("--glob={glob}"));
        }
        // Patterns starting with '-' would otherwise be read as flags.
        if self.query.starts_with('-') {
            args.push(format!("--regexp={}", self.query));
        } else {
            args.push(self.query.clone());
        }
        // Without an explicit path rg may decide to read stdin.
        args.push(".".to_string());
        args
    }
}
