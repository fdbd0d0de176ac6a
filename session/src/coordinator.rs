//! Session coordinator: one checker process, its caches, and the request policy.
//!
//! Every exchange with the process and every cache mutation happens under a
//! single async lock, because the line protocol pairs requests and responses
//! purely by order. Duplicate inspections are turned away before that lock
//! is taken, so repeated hovers over one location never queue behind each
//! other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tycheck_types::{
    Diagnostic, LineIndex, Location, SourceDocument, SourceId, Suggestion, TextRange,
};

use crate::diagnostics::DiagnosticParser;
use crate::error::SessionError;
use crate::pending::PendingRequests;
use crate::process::{ProcessManager, Spawner};
use crate::protocol::{self, Command};
use crate::snapshot::{SCRATCH_MODULE, SCRATCH_PATH, SnapshotCache};

/// Diagnostics for one source from one full check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the diagnostics were read from the scratch file, i.e. they
    /// describe the document's unsaved text rather than the file on disk.
    pub used_scratch: bool,
}

struct SessionState {
    process: ProcessManager,
    snapshots: SnapshotCache,
    /// Most recent answer per real location string.
    last_good: HashMap<String, String>,
    /// Reports from the latest full check, per source.
    reports: HashMap<SourceId, CheckReport>,
    /// Source whose stamp was recorded for a check that has not completed.
    /// Set until the exchange succeeds; an error or a dropped future leaves
    /// it behind for the next request to roll back.
    unconfirmed: Option<SourceId>,
}

impl SessionState {
    /// Apply the snapshot rule for `document`: dirty documents go through the
    /// scratch file, saved ones compare stamps only.
    fn needs_check<D: SourceDocument + ?Sized>(
        &mut self,
        source: &SourceId,
        document: &D,
    ) -> Result<bool, SessionError> {
        if let Some(stale) = self.unconfirmed.take() {
            tracing::debug!(source = %stale, "Previous check never completed; forgetting its stamp");
            self.snapshots.forget(&stale);
            self.reports.remove(&stale);
        }

        let check = if document.has_unsaved_changes() {
            self.snapshots
                .should_write_and_check(source, document.version(), document.text())?
        } else {
            self.snapshots.should_check(source, document.version())
        };
        if check {
            self.unconfirmed = Some(source.clone());
        }
        Ok(check)
    }

    fn reads_scratch<D: SourceDocument + ?Sized>(&self, document: &D) -> bool {
        document.has_unsaved_changes() && self.snapshots.scratch_holds(document.text())
    }

    /// Send `::run`, parse the block for `source`, and cache the report.
    ///
    /// A fresh check supersedes every cached report, not just this source's.
    async fn check(
        &mut self,
        source: &SourceId,
        used_scratch: bool,
    ) -> Result<CheckReport, SessionError> {
        let lines = self
            .process
            .ensure_running()?
            .exchange_block(&[Command::Run])
            .await?;
        self.unconfirmed = None;

        let parser = if used_scratch {
            DiagnosticParser::for_scratch(SCRATCH_PATH, SCRATCH_MODULE, source)
        } else {
            DiagnosticParser::for_source(source)
        };
        let report = CheckReport {
            diagnostics: parser.parse_output(&lines),
            used_scratch,
        };
        tracing::debug!(
            source = %source,
            lines = lines.len(),
            diagnostics = report.diagnostics.len(),
            used_scratch,
            "Check finished"
        );

        self.reports.clear();
        self.reports.insert(source.clone(), report.clone());
        Ok(report)
    }
}

/// A checker session bound to one workspace root.
pub struct Session {
    root: PathBuf,
    pending: PendingRequests,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        root: impl Into<PathBuf>,
        interpreter: Option<PathBuf>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        let root = root.into();
        Self {
            pending: PendingRequests::new(),
            state: Mutex::new(SessionState {
                process: ProcessManager::new(spawner, root.clone(), interpreter),
                snapshots: SnapshotCache::new(&root),
                last_good: HashMap::new(),
                reports: HashMap::new(),
                unconfirmed: None,
            }),
            root,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a checker process is (or can be) running.
    ///
    /// Starts the process if needed. `false` means checking is unavailable
    /// for this workspace, typically because no interpreter is configured.
    pub async fn is_available(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.process.ensure_running() {
            Ok(_) => true,
            Err(e) => {
                tracing::info!(root = %self.root.display(), "Checking unavailable: {e}");
                false
            }
        }
    }

    fn source_id(&self, path: &Path) -> Result<SourceId, SessionError> {
        SourceId::relative_to(&self.root, path)
            .ok_or_else(|| SessionError::OutsideWorkspace(path.to_path_buf()))
    }

    /// Run a full check and return the diagnostics for `document`.
    ///
    /// If nothing changed since the last check and a report for this source
    /// is still cached, no request is sent.
    pub async fn run_check<D: SourceDocument + ?Sized>(
        &self,
        document: &D,
    ) -> Result<CheckReport, SessionError> {
        let source = self.source_id(document.path())?;
        let mut state = self.state.lock().await;

        let needs_check = state.needs_check(&source, document)?;
        if !needs_check && let Some(report) = state.reports.get(&source) {
            tracing::debug!(source = %source, "Reusing cached check report");
            return Ok(report.clone());
        }

        let used_scratch = state.reads_scratch(document);
        state.check(&source, used_scratch).await
    }

    /// Type of the expression covering `range`, or `None`.
    ///
    /// `None` covers every non-result: a duplicate request already in flight,
    /// a path outside the workspace, a process failure, an empty answer with
    /// nothing to fall back on, and the checker's own "no type here" replies.
    pub async fn inspect<D: SourceDocument + ?Sized>(
        &self,
        document: &D,
        range: TextRange,
    ) -> Option<String> {
        let source = SourceId::relative_to(&self.root, document.path())?;
        let span = LineIndex::new(document.text()).span_of(range);
        let real = Location::new(source.as_str(), span);
        let key = real.to_string();

        let Some(_guard) = self.pending.try_acquire(&key) else {
            tracing::debug!(location = %key, "Inspection already in flight");
            return None;
        };

        let mut state = self.state.lock().await;
        let dirty = document.has_unsaved_changes();
        let target = if dirty {
            real.with_path(SCRATCH_PATH)
        } else {
            real
        };

        let check = match state.needs_check(&source, document) {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!(location = %key, "Inspection aborted: {e}");
                return None;
            }
        };

        if !check && let Some(previous) = state.last_good.get(&key).filter(|a| !a.is_empty()) {
            tracing::debug!(location = %key, "Reusing last answer");
            return presentable(previous.clone());
        }

        let commands = if check {
            vec![Command::Inspect(target), Command::Run]
        } else {
            vec![Command::Inspect(target)]
        };
        let raw = match state.process.ensure_running() {
            Ok(handle) => handle.exchange_answer(&commands).await,
            Err(e) => Err(e),
        };
        if check {
            // The pipelined run may have refreshed every file; cached reports are stale.
            state.reports.clear();
        }

        let mut answer = match raw {
            Ok(line) => protocol::clean_answer(line.as_deref().unwrap_or_default()).to_string(),
            Err(e) => {
                tracing::warn!(location = %key, "Inspection failed: {e}");
                return None;
            }
        };
        if check {
            state.unconfirmed = None;
        }
        if answer.is_empty()
            && let Some(previous) = state.last_good.get(&key)
        {
            answer.clone_from(previous);
        }
        state.last_good.insert(key.clone(), answer.clone());
        tracing::debug!(location = %key, check, answer = %answer, "Inspection answered");
        presentable(answer)
    }

    /// Inferred signature for the function `qualified_name` in `document`.
    ///
    /// Unsaved content is written to the scratch file and checked first; the
    /// name is then looked up in the scratch module instead.
    pub async fn suggest<D: SourceDocument + ?Sized>(
        &self,
        document: &D,
        qualified_name: &str,
    ) -> Result<Suggestion, SessionError> {
        let source = self.source_id(document.path())?;
        let mut state = self.state.lock().await;

        let needs_check = state.needs_check(&source, document)?;
        let used_scratch = state.reads_scratch(document);
        if needs_check {
            state.check(&source, used_scratch).await?;
        }

        let name = if used_scratch {
            protocol::reroot_function(qualified_name, SCRATCH_MODULE)
        } else {
            qualified_name.to_string()
        };
        let lines = state
            .process
            .ensure_running()?
            .exchange_block(&[Command::Suggest(name.clone())])
            .await?;

        let first = lines.first().ok_or(SessionError::EmptySuggestResponse)?;
        let suggestion = Suggestion::parse(first)?;
        tracing::debug!(function = %name, "Suggestion received");
        Ok(suggestion)
    }

    /// Stop the process and forget all cached state.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.process.shutdown().await;
        state.snapshots.clear();
        state.last_good.clear();
        state.reports.clear();
        state.unconfirmed = None;
    }
}

fn presentable(answer: String) -> Option<String> {
    if answer.is_empty() || protocol::is_non_answer(&answer) {
        None
    } else {
        Some(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex, split};
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};
    use tycheck_types::{Document, Severity};

    use crate::process::SessionHandle;

    /// Scripted replies for the in-process fake checker.
    #[derive(Clone, Default)]
    struct Script {
        requests: Arc<StdMutex<Vec<String>>>,
        diagnostics: Arc<StdMutex<Vec<String>>>,
        answer: Arc<StdMutex<String>>,
        suggestion: Arc<StdMutex<String>>,
        gate: Option<Arc<Notify>>,
        /// Pause before each reply.
        delay: Option<Duration>,
        /// Answer inspections with the location asked about.
        echo: bool,
        /// Close the pipes on the next request instead of replying.
        hang_up: Arc<AtomicBool>,
    }

    impl Script {
        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn set_diagnostics(&self, lines: &[&str]) {
            *self.diagnostics.lock().unwrap() = lines.iter().map(ToString::to_string).collect();
        }

        fn set_answer(&self, answer: &str) {
            *self.answer.lock().unwrap() = answer.to_string();
        }

        fn reply(&self, line: &str) -> String {
            let mut out = String::new();
            if let Some((target, _)) = line.split_once("::inspect") {
                if self.echo {
                    out.push_str(&format!("answer-for {target}"));
                } else {
                    out.push_str(&self.answer.lock().unwrap());
                }
                out.push('\n');
            } else if line.contains("::run") {
                for diagnostic in self.diagnostics.lock().unwrap().iter() {
                    out.push_str(diagnostic);
                    out.push('\n');
                }
                out.push_str("# done!\n");
            }
            if line.contains("::suggest") {
                let suggestion = self.suggestion.lock().unwrap();
                if !suggestion.is_empty() {
                    out.push_str(&suggestion);
                    out.push('\n');
                }
                out.push_str("# done!\n");
            }
            out
        }

        async fn serve(self, stream: DuplexStream) {
            let (read, mut write) = split(stream);
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                self.requests.lock().unwrap().push(line.clone());
                if self.hang_up.swap(false, Ordering::SeqCst) {
                    return;
                }
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                if let Some(delay) = self.delay {
                    sleep(delay).await;
                }
                if write.write_all(self.reply(&line).as_bytes()).await.is_err() {
                    break;
                }
            }
        }
    }

    struct FakeSpawner {
        script: Script,
        spawned: AtomicUsize,
        running: Arc<AtomicBool>,
    }

    impl Spawner for FakeSpawner {
        fn spawn(&self, _root: &Path, _interpreter: &Path) -> Result<SessionHandle, SessionError> {
            self.spawned.fetch_add(1, Ordering::SeqCst);
            self.running.store(true, Ordering::SeqCst);
            let (client, server) = duplex(4096);
            tokio::spawn(self.script.clone().serve(server));
            let (reader, writer) = split(client);
            Ok(SessionHandle::from_pipes(writer, reader, Arc::clone(&self.running)))
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        script: Script,
        spawner: Arc<FakeSpawner>,
        session: Arc<Session>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_script(Script::default())
        }

        fn with_script(script: Script) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let spawner = Arc::new(FakeSpawner {
                script: script.clone(),
                spawned: AtomicUsize::new(0),
                running: Arc::new(AtomicBool::new(true)),
            });
            let session = Arc::new(Session::new(
                dir.path(),
                Some(PathBuf::from("/usr/bin/python3")),
                Arc::clone(&spawner) as Arc<dyn Spawner>,
            ));
            Self {
                dir,
                script,
                spawner,
                session,
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn scratch(&self) -> String {
            fs::read_to_string(self.dir.path().join(SCRATCH_PATH)).unwrap()
        }
    }

    /// Range covering the first occurrence of `needle`.
    fn range_of(text: &str, needle: &str) -> TextRange {
        let start = text.find(needle).unwrap();
        TextRange::new(start, start + needle.len())
    }

    #[tokio::test]
    async fn test_saved_document_diagnostics() {
        let h = Harness::new();
        h.script.set_diagnostics(&[
            "foo.py:3:1: error: Incompatible types  [assignment]",
            "bar.py:1:1: error: Elsewhere  [misc]",
        ]);
        let doc = Document::saved(h.path("foo.py"), "a\nb\nx: int = ''\n", 1);

        let report = h.session.run_check(&doc).await.unwrap();
        assert!(!report.used_scratch);
        assert_eq!(report.diagnostics.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!((d.span().line_start, d.span().col_start), (3, 1));
        assert_eq!(d.severity(), Severity::Error);
        assert_eq!(d.message(), "Incompatible types");
        assert_eq!(d.code(), Some("assignment"));
    }

    #[tokio::test]
    async fn test_unchanged_document_checks_once() {
        let h = Harness::new();
        h.script
            .set_diagnostics(&["foo.py:1:1: error: Name \"y\" is not defined  [name-defined]"]);
        let doc = Document::saved(h.path("foo.py"), "y\n", 1);

        let first = h.session.run_check(&doc).await.unwrap();
        let second = h.session.run_check(&doc).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.script.requests(), vec!["::run"]);
    }

    #[tokio::test]
    async fn test_repeated_checks_are_identical() {
        let h = Harness::new();
        h.script.set_diagnostics(&[
            "foo.py:1:1: error: a  [misc]",
            "foo.py:2:1: note: b",
            "foo.py:1:1: error: a  [misc]",
        ]);
        let mut doc = Document::saved(h.path("foo.py"), "1\n2\n", 1);

        let first = h.session.run_check(&doc).await.unwrap();
        doc.touch();
        let second = h.session.run_check(&doc).await.unwrap();
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(first.diagnostics.len(), 2);
        assert_eq!(h.script.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_dirty_document_uses_scratch() {
        let h = Harness::new();
        h.script.set_diagnostics(&[
            ".mypy_cache/__mypy_plugin_temp__.py:2:5: error: Module \"__mypy_plugin_temp__\" has no attribute \"q\"  [attr-defined]",
            "foo.py:9:9: error: stale  [misc]",
        ]);
        let doc = Document::unsaved(h.path("foo.py"), "import foo\nfoo.q\n", 2);

        let report = h.session.run_check(&doc).await.unwrap();
        assert!(report.used_scratch);
        assert_eq!(h.scratch(), "import foo\nfoo.q\n");
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].message(),
            "Module \"foo\" has no attribute \"q\""
        );
    }

    #[tokio::test]
    async fn test_unknown_severity_drops_only_that_line() {
        let h = Harness::new();
        h.script.set_diagnostics(&[
            "foo.py:1:1: error: first",
            "foo.py:2:1: fatal: weird",
            "foo.py:3:1: warning: third",
        ]);
        let doc = Document::saved(h.path("foo.py"), "1\n2\n3\n", 1);
        let report = h.session.run_check(&doc).await.unwrap();
        let lines: Vec<u32> = report
            .diagnostics
            .iter()
            .map(|d| d.span().line_start)
            .collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_outside_workspace() {
        let h = Harness::new();
        let doc = Document::saved("/definitely/elsewhere/x.py", "x\n", 1);
        assert!(matches!(
            h.session.run_check(&doc).await,
            Err(SessionError::OutsideWorkspace(_))
        ));
        assert_eq!(h.session.inspect(&doc, TextRange::new(0, 1)).await, None);
        assert!(h.script.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_interpreter_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let spawner = Arc::new(FakeSpawner {
            script: Script::default(),
            spawned: AtomicUsize::new(0),
            running: Arc::new(AtomicBool::new(true)),
        });
        let session = Session::new(dir.path(), None, spawner as Arc<dyn Spawner>);
        assert!(!session.is_available().await);
        let doc = Document::saved(dir.path().join("a.py"), "x\n", 1);
        assert!(matches!(
            session.run_check(&doc).await,
            Err(SessionError::NoInterpreter)
        ));
    }

    #[tokio::test]
    async fn test_inspect_saved_document() {
        let h = Harness::new();
        h.script.set_answer("\"builtins.int\"");
        let text = "value = 1\nvalue\n";
        let doc = Document::saved(h.path("foo.py"), text, 1);

        let answer = h.session.inspect(&doc, TextRange::new(10, 15)).await;
        assert_eq!(answer.as_deref(), Some("builtins.int"));
        assert_eq!(h.script.requests(), vec!["foo.py:2:1:2:5::inspect ::run"]);
    }

    #[tokio::test]
    async fn test_inspect_saved_cache_hit_sends_nothing() {
        let h = Harness::new();
        h.script.set_answer("builtins.str");
        let text = "s = 'a'\n";
        let doc = Document::saved(h.path("foo.py"), text, 1);
        let range = range_of(text, "s");

        assert_eq!(
            h.session.inspect(&doc, range).await.as_deref(),
            Some("builtins.str")
        );
        h.script.set_answer("changed");
        assert_eq!(
            h.session.inspect(&doc, range).await.as_deref(),
            Some("builtins.str")
        );
        assert_eq!(h.script.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_inspect_without_check_when_no_previous_answer() {
        let h = Harness::new();
        h.script.set_answer("builtins.int");
        let text = "a = 1\nb = 2\n";
        let doc = Document::saved(h.path("foo.py"), text, 1);

        h.session.inspect(&doc, range_of(text, "a")).await;
        h.session.inspect(&doc, range_of(text, "b")).await;
        assert_eq!(
            h.script.requests(),
            vec!["foo.py:1:1:1:1::inspect ::run", "foo.py:2:1:2:1::inspect"]
        );
    }

    #[tokio::test]
    async fn test_inspect_dirty_writes_fresh_content_first() {
        let h = Harness::new();
        h.script.set_answer("builtins.int");
        let mut doc = Document::unsaved(h.path("foo.py"), "x = 1\n", 1);
        h.session.inspect(&doc, TextRange::new(0, 1)).await;
        assert_eq!(h.scratch(), "x = 1\n");

        doc.edit("x = 'changed'\n");
        h.script.set_answer("builtins.str");
        let answer = h.session.inspect(&doc, TextRange::new(0, 1)).await;
        assert_eq!(h.scratch(), "x = 'changed'\n");
        assert_eq!(answer.as_deref(), Some("builtins.str"));
        assert_eq!(
            h.script.requests().last().map(String::as_str),
            Some(".mypy_cache/__mypy_plugin_temp__.py:1:1:1:1::inspect ::run")
        );
    }

    #[tokio::test]
    async fn test_inspect_empty_answer_falls_back() {
        let h = Harness::new();
        let text = "n = 1\n";
        let mut doc = Document::saved(h.path("foo.py"), text, 1);
        let range = range_of(text, "n");

        h.script.set_answer("builtins.int");
        assert_eq!(
            h.session.inspect(&doc, range).await.as_deref(),
            Some("builtins.int")
        );

        doc.touch();
        h.script.set_answer("");
        assert_eq!(
            h.session.inspect(&doc, range).await.as_deref(),
            Some("builtins.int")
        );
        assert_eq!(h.script.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_non_answers_are_none() {
        let h = Harness::new();
        let text = "n = 1\n";
        let mut doc = Document::saved(h.path("foo.py"), text, 1);
        let range = range_of(text, "n");

        h.script.set_answer("No known type available for \"NameExpr\"");
        assert_eq!(h.session.inspect(&doc, range).await, None);
        doc.touch();
        h.script.set_answer("Can't find expression at span 1:1:1:1");
        assert_eq!(h.session.inspect(&doc, range).await, None);
        doc.touch();
        h.script.set_answer("");
        assert_eq!(h.session.inspect(&doc, range).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inspect_is_dropped() {
        let gate = Arc::new(Notify::new());
        let script = Script {
            gate: Some(Arc::clone(&gate)),
            ..Script::default()
        };
        script.set_answer("builtins.int");
        let h = Harness::with_script(script);
        let doc = Arc::new(Document::saved(h.path("foo.py"), "n = 1\n", 1));

        let first = tokio::spawn({
            let session = Arc::clone(&h.session);
            let doc = Arc::clone(&doc);
            async move { session.inspect(doc.as_ref(), TextRange::new(0, 1)).await }
        });
        while h.script.requests().is_empty() {
            sleep(Duration::from_millis(5)).await;
        }

        let duplicate = h.session.inspect(doc.as_ref(), TextRange::new(0, 1)).await;
        assert_eq!(duplicate, None);
        assert_eq!(h.script.requests().len(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap().as_deref(), Some("builtins.int"));
        assert!(h.session.pending.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_inspect_does_not_shift_answers() {
        let script = Script {
            delay: Some(Duration::from_millis(200)),
            echo: true,
            ..Script::default()
        };
        let h = Harness::with_script(script);
        let text = "a = 1\nb = 2\n";
        let doc = Document::saved(h.path("foo.py"), text, 1);

        let abandoned = timeout(
            Duration::from_millis(50),
            h.session.inspect(&doc, range_of(text, "a")),
        )
        .await;
        assert!(abandoned.is_err());

        let answer = h.session.inspect(&doc, range_of(text, "b")).await;
        assert_eq!(answer.as_deref(), Some("answer-for foo.py:2:1:2:1"));
        assert_eq!(h.spawner.spawned.load(Ordering::SeqCst), 2);
        assert!(h.session.pending.is_empty());
    }

    #[tokio::test]
    async fn test_scratch_write_failure_is_retried() {
        let h = Harness::new();
        h.script.set_diagnostics(&[
            ".mypy_cache/__mypy_plugin_temp__.py:1:1: error: from scratch",
            "foo.py:1:1: error: from disk",
        ]);
        let blocker = h.dir.path().join(".mypy_cache");
        fs::write(&blocker, "").unwrap();
        let doc = Document::unsaved(h.path("foo.py"), "x = 1\n", 1);

        assert!(matches!(
            h.session.run_check(&doc).await,
            Err(SessionError::Scratch(_))
        ));
        assert!(h.script.requests().is_empty());

        fs::remove_file(&blocker).unwrap();
        let report = h.session.run_check(&doc).await.unwrap();
        assert!(report.used_scratch);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].message(), "from scratch");
        assert_eq!(h.scratch(), "x = 1\n");
    }

    #[tokio::test]
    async fn test_failed_check_is_not_served_from_cache() {
        let h = Harness::new();
        h.script.set_diagnostics(&["foo.py:1:1: error: old"]);
        let mut doc = Document::saved(h.path("foo.py"), "x\n", 1);
        h.session.run_check(&doc).await.unwrap();

        doc.touch();
        h.script.hang_up.store(true, Ordering::SeqCst);
        let err = h.session.run_check(&doc).await.unwrap_err();
        assert!(err.is_process_failure());

        h.script.set_diagnostics(&["foo.py:1:1: error: new"]);
        let report = h.session.run_check(&doc).await.unwrap();
        assert_eq!(report.diagnostics[0].message(), "new");
        assert_eq!(h.script.requests(), vec!["::run", "::run", "::run"]);
        assert_eq!(h.spawner.spawned.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dead_process_restarts_on_next_call() {
        let h = Harness::new();
        let doc = Document::saved(h.path("foo.py"), "x\n", 1);
        assert!(h.session.is_available().await);
        h.spawner.running.store(false, Ordering::SeqCst);
        h.session.run_check(&doc).await.unwrap();
        assert_eq!(h.spawner.spawned.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_suggest_saved_document() {
        let h = Harness::new();
        *h.script.suggestion.lock().unwrap() =
            r#"[{"signature": {"arg_types": ["int"], "return_type": "str"}}]"#.to_string();
        let doc = Document::saved(h.path("pkg/mod.py"), "def f(x): return str(x)\n", 1);

        let suggestion = h.session.suggest(&doc, "pkg.mod.f").await.unwrap();
        assert_eq!(suggestion.signature.arg_types, vec!["int"]);
        assert_eq!(suggestion.return_annotation(), Some("str"));
        assert_eq!(h.script.requests(), vec!["::run", "pkg.mod.f::suggest"]);
    }

    #[tokio::test]
    async fn test_suggest_dirty_document_reroots_name() {
        let h = Harness::new();
        *h.script.suggestion.lock().unwrap() =
            r#"{"signature": {"arg_types": [], "return_type": "None"}}"#.to_string();
        let doc = Document::unsaved(h.path("pkg/mod.py"), "def g(): pass\n", 3);

        h.session.suggest(&doc, "pkg.mod.g").await.unwrap();
        assert_eq!(
            h.script.requests(),
            vec!["::run", "__mypy_plugin_temp__.g::suggest"]
        );
    }

    #[tokio::test]
    async fn test_suggest_malformed_and_empty() {
        let h = Harness::new();
        let doc = Document::saved(h.path("m.py"), "def f(): pass\n", 1);

        *h.script.suggestion.lock().unwrap() = "No guesses".to_string();
        assert!(matches!(
            h.session.suggest(&doc, "m.f").await,
            Err(SessionError::MalformedSuggestResponse(_))
        ));

        // Only the end marker comes back.
        h.script.suggestion.lock().unwrap().clear();
        assert!(matches!(
            h.session.suggest(&doc, "m.f").await,
            Err(SessionError::EmptySuggestResponse)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_forgets_state() {
        let h = Harness::new();
        let doc = Document::saved(h.path("foo.py"), "x\n", 1);
        h.session.run_check(&doc).await.unwrap();
        h.session.shutdown().await;
        h.session.run_check(&doc).await.unwrap();
        assert_eq!(h.script.requests(), vec!["::run", "::run"]);
        assert_eq!(h.spawner.spawned.load(Ordering::SeqCst), 2);
    }
}
