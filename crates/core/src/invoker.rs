use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use codesearch_config::SearchSettings;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::format::{format_matches, FormattedMatch};
use crate::record::{parse_output, RawMatchRecord};
use crate::request::SearchRequest;

/// What a caller sees when the tool runs but the search itself fails
/// (timeout, oversized output, unexpected exit status).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and return no results.
    #[default]
    Degrade,
    /// Return the error.
    Surface,
}

/// Runs ripgrep for a [`SearchRequest`] and normalizes its output.
#[derive(Debug, Clone)]
pub struct Invoker {
    binary: String,
    timeout: Duration,
    max_output_bytes: usize,
    policy: FailurePolicy,
}

impl Default for Invoker {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}

impl Invoker {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_output_bytes: settings.max_output_bytes,
            policy: if settings.surface_failures {
                FailurePolicy::Surface
            } else {
                FailurePolicy::Degrade
            },
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Whether the search tool can be resolved. Never fails; any lookup
    /// problem counts as unavailable.
    pub fn is_available(&self) -> bool {
        binary_exists(&self.binary)
    }

    /// Searches and formats, applying the failure policy. A missing tool is
    /// always reported as [`SearchError::NotInstalled`].
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<FormattedMatch>, SearchError> {
        match self.run(request).await {
            Ok(records) => Ok(format_matches(&records)),
            Err(e) if e.is_missing_tool() => Err(e),
            Err(e) => match self.policy {
                FailurePolicy::Surface => Err(e),
                FailurePolicy::Degrade => {
                    warn!(error = %e, query = %request.query, "search failed, returning no results");
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Runs the tool and returns the raw match records, reporting every
    /// failure as-is.
    pub async fn run(&self, request: &SearchRequest) -> Result<Vec<RawMatchRecord>, SearchError> {
        let root = request.root();
        if !root.is_dir() {
            return Err(SearchError::RootNotFound(root.to_path_buf()));
        }

        let args = request.args();
        debug!(binary = %self.binary, root = %root.display(), ?args, "running search");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    SearchError::NotInstalled {
                        binary: self.binary.clone(),
                    }
                } else {
                    SearchError::Spawn(e)
                }
            })?;

        let collected =
            tokio::time::timeout(self.timeout, collect(&mut child, self.max_output_bytes)).await;
        let (status, stdout, stderr) = match collected {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(SearchError::Timeout(self.timeout));
            }
        };

        // 1 means "no matches", not a failure.
        match status.code() {
            Some(0) | Some(1) => {}
            code => return Err(SearchError::ExitStatus { code, stderr }),
        }

        let output = String::from_utf8_lossy(&stdout);
        let records = parse_output(&output, request.max_results);
        debug!(matches = records.len(), "search finished");
        Ok(records)
    }
}

async fn collect(
    child: &mut Child,
    limit: usize,
) -> Result<(ExitStatus, Vec<u8>, String), SearchError> {
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "failed to capture stdout"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "failed to capture stderr"))?;

    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        buf
    });

    let mut out = Vec::new();
    (&mut stdout)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .await?;
    if out.len() > limit {
        let _ = child.kill().await;
        stderr_task.abort();
        return Err(SearchError::OutputTooLarge { limit });
    }

    let status = child.wait().await?;
    let stderr = stderr_task.await.unwrap_or_default();
    Ok((status, out, String::from_utf8_lossy(&stderr).into_owned()))
}

fn binary_exists(binary: &str) -> bool {
    if binary.contains('/') || binary.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(binary).is_file();
    }
    let probe = if cfg!(windows) { "where" } else { "which" };
    std::process::Command::new(probe)
        .arg(binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const MISSING: &str = "codesearch-test-no-such-binary";

    const MATCH_1: &str = r#"{"type":"match","data":{"path":{"text":"./a.rs"},"lines":{"text":"let needle = 1;\n"},"line_number":1,"absolute_offset":0,"submatches":[{"match":{"text":"needle"},"start":4,"end":10}]}}"#;
    const MATCH_2: &str = r#"{"type":"match","data":{"path":{"text":"./b/c.rs"},"lines":{"text":"Needle\n"},"line_number":9,"absolute_offset":80,"submatches":[{"match":{"text":"Needle"},"start":0,"end":6}]}}"#;
    const MATCH_BARE: &str = r#"{"type":"match","data":{"path":{"text":"./d.rs"},"lines":{"text":"x\n"},"line_number":2,"absolute_offset":5,"submatches":[]}}"#;
    const CONTEXT: &str = r#"{"type":"context","data":{"path":{"text":"./a.rs"},"lines":{"text":"\n"},"line_number":2,"absolute_offset":16,"submatches":[]}}"#;

    fn fake_rg(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-rg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn printing(dir: &Path, lines: &[&str], code: i32) -> Invoker {
        let body = format!("cat <<'EOF'\n{}\nEOF\nexit {code}", lines.join("\n"));
        Invoker::new(fake_rg(dir, &body).to_string_lossy())
    }

    #[test]
    fn missing_binary_is_unavailable() {
        assert!(!Invoker::new(MISSING).is_available());
        assert!(!Invoker::new("/nonexistent/dir/rg").is_available());
    }

    #[test]
    fn explicit_path_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Invoker::new(fake_rg(dir.path(), "exit 0").to_string_lossy());
        assert!(invoker.is_available());
    }

    #[tokio::test]
    async fn missing_binary_is_not_installed_under_any_policy() {
        let dir = tempfile::tempdir().unwrap();
        let req = SearchRequest::new(dir.path(), "needle");
        for policy in [FailurePolicy::Degrade, FailurePolicy::Surface] {
            let err = Invoker::new(MISSING)
                .with_policy(policy)
                .search(&req)
                .await
                .unwrap_err();
            assert!(matches!(err, SearchError::NotInstalled { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn formats_matches_and_skips_noise() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = printing(
            dir.path(),
            &["{oops", MATCH_1, CONTEXT, "not json at all", MATCH_2, MATCH_BARE],
            0,
        );
        let results = invoker
            .search(&SearchRequest::new(dir.path(), "needle"))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].file, "./a.rs");
        assert_eq!(results[0].column, 4);
        assert_eq!(results[0].match_text, "needle");
        assert_eq!(results[1].file, "./b/c.rs");
        assert_eq!(results[1].line, 9);
        assert_eq!(results[2].column, 0);
        assert_eq!(results[2].match_text, "");
    }

    #[tokio::test]
    async fn result_count_never_exceeds_max() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = printing(dir.path(), &[MATCH_1, MATCH_2, MATCH_1, MATCH_2, MATCH_1], 0);
        for max in [1, 2, 4, 5, 50] {
            let req = SearchRequest::new(dir.path(), "needle").max_results(max);
            let results = invoker.search(&req).await.unwrap();
            assert!(results.len() <= max);
            assert_eq!(results.len(), max.min(5));
        }
    }

    #[tokio::test]
    async fn exit_one_means_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = fake_rg(dir.path(), "exit 1");
        let req = SearchRequest::new(dir.path(), "needle");
        for policy in [FailurePolicy::Degrade, FailurePolicy::Surface] {
            let results = Invoker::new(invoker.to_string_lossy())
                .with_policy(policy)
                .search(&req)
                .await
                .unwrap();
            assert!(results.is_empty());
        }
    }

    #[tokio::test]
    async fn exit_two_depends_on_policy() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = printing(dir.path(), &[MATCH_1], 2);
        let req = SearchRequest::new(dir.path(), "needle");

        let degraded = invoker.clone().search(&req).await.unwrap();
        assert!(degraded.is_empty());

        let err = invoker
            .with_policy(FailurePolicy::Surface)
            .search(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ExitStatus { code: Some(2), .. }), "{err:?}");
    }

    #[tokio::test]
    async fn slow_search_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Invoker::new(fake_rg(dir.path(), "exec sleep 5").to_string_lossy())
            .with_timeout(Duration::from_millis(100));
        let req = SearchRequest::new(dir.path(), "needle");

        let err = invoker.run(&req).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)), "{err:?}");
        assert!(invoker.search(&req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = printing(dir.path(), &[MATCH_1, MATCH_2], 0).with_max_output_bytes(32);
        let err = invoker
            .run(&SearchRequest::new(dir.path(), "needle"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::OutputTooLarge { limit: 32 }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = printing(dir.path(), &[MATCH_1], 0).with_policy(FailurePolicy::Surface);
        let req = SearchRequest::new(dir.path().join("gone"), "needle");
        let err = invoker.search(&req).await.unwrap_err();
        assert!(matches!(err, SearchError::RootNotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn runs_in_root_with_expected_args() {
        let scripts = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let script = fake_rg(
            scripts.path(),
            "pwd -P > \"$0.cwd\"\nprintf '%s\\n' \"$@\" > \"$0.args\"\nexit 1",
        );
        let req = SearchRequest::new(root.path(), "needle").max_results(25);
        Invoker::new(script.to_string_lossy())
            .search(&req)
            .await
            .unwrap();

        let cwd = std::fs::read_to_string(scripts.path().join("fake-rg.cwd")).unwrap();
        assert_eq!(
            PathBuf::from(cwd.trim()),
            root.path().canonicalize().unwrap()
        );
        let args = std::fs::read_to_string(scripts.path().join("fake-rg.args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(
            args,
            vec!["--json", "--max-count=3", "--context=2", "--ignore-case", "needle", "."]
        );
    }

    #[test]
    fn settings_select_policy() {
        let mut settings = SearchSettings::default();
        assert_eq!(Invoker::from_settings(&settings).policy(), FailurePolicy::Degrade);
        settings.surface_failures = true;
        assert_eq!(Invoker::from_settings(&settings).policy(), FailurePolicy::Surface);
        assert_eq!(Invoker::from_settings(&settings).binary(), "rg");
    }
}
