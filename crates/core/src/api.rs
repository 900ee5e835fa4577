//! Transport-agnostic request handling: validates raw query parameters, runs
//! the search and shapes the response or error body.

use std::path::{Path, PathBuf};

use codesearch_config::Config;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::format::FormattedMatch;
use crate::invoker::Invoker;
use crate::request::{SearchRequest, DEFAULT_CONTEXT_LINES, DEFAULT_MAX_RESULTS};

/// Raw parameters as they arrive from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: Option<String>,
    pub path: Option<String>,
    pub max_results: Option<String>,
    pub context_lines: Option<String>,
    pub case_sensitive: Option<String>,
    pub glob: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<FormattedMatch>,
    pub query: String,
    pub path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "error": self.message })
    }
}

pub struct SearchHandler {
    invoker: Invoker,
    home: Option<PathBuf>,
    default_max_results: usize,
    default_context_lines: usize,
}

impl SearchHandler {
    pub fn new(invoker: Invoker, home: Option<PathBuf>) -> Self {
        Self {
            invoker,
            home,
            default_max_results: DEFAULT_MAX_RESULTS,
            default_context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    /// Builds a handler from config. `home` is resolved here once so the
    /// handler never consults the process environment.
    pub fn from_config(config: &Config) -> Self {
        Self {
            invoker: Invoker::from_settings(&config.search),
            home: config.home_dir(),
            default_max_results: config.search.default_max_results,
            default_context_lines: config.search.default_context_lines,
        }
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn available(&self) -> AvailabilityResponse {
        AvailabilityResponse {
            available: self.invoker.is_available(),
        }
    }

    pub fn build_request(&self, params: &SearchParams) -> Result<SearchRequest, ApiError> {
        let query = params
            .query
            .as_deref()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::bad_request("Query parameter is required"))?;
        let path = params
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::bad_request("Path parameter is required"))?;

        let max_results = parse_count(params.max_results.as_deref())
            .unwrap_or(self.default_max_results);
        let context_lines = parse_count(params.context_lines.as_deref())
            .unwrap_or(self.default_context_lines);
        let case_sensitive = params
            .case_sensitive
            .as_deref()
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(
            SearchRequest::new(expand_home(path, self.home.as_deref()), query)
                .max_results(max_results)
                .context_lines(context_lines)
                .case_sensitive(case_sensitive)
                .glob(params.glob.clone()),
        )
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse, ApiError> {
        let request = self.build_request(params)?;
        let results = self.invoker.search(&request).await.map_err(|e| {
            tracing::error!(error = %e, "code search error");
            ApiError::internal(e.to_string())
        })?;

        Ok(SearchResponse {
            count: results.len(),
            results,
            query: request.query,
            path: request.root,
        })
    }
}

fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}

/// Replaces a leading `~` (alone or followed by a separator) with `home`.
/// Paths like `~user/x` and paths without a known home are left untouched.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}
