use crate::core::gate::{Confirmation, ConfirmationGate, Decision};
use crate::core::ledger::BackupLedger;
use crate::core::{cleanup, deployment, linker, mod_fs, scanner};
use crate::models::error::SError;
use crate::models::paths::{backup_path_for, EngineRoots};
use crate::models::task_action::{Outcome, TaskAction, TaskKind};
use crate::models::task_request::{ConfirmPolicy, TaskRequest, TaskSettings};
use crate::models::task_status::{ScanUpdate, TaskEvent};
use crate::utils::context::TaskContext;
use crate::utils::file::{format_count, format_size, FileUtils};
use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::Sender;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// A single-file operation. The wrapped path is the destination; Delete only has a source.
#[derive(Clone, Copy, Debug)]
pub enum FileOp<'a> {
    Move(&'a Utf8Path),
    Copy(&'a Utf8Path),
    Link(&'a Utf8Path),
    Delete,
}

/// Runs one TaskAction to completion on its own thread.
pub struct TaskWorker {
    pub(crate) action: TaskAction,
    pub(crate) request: TaskRequest,
    pub(crate) roots: EngineRoots,
    pub(crate) ctx: TaskContext,
    pub(crate) ledger: Option<BackupLedger>,
    /// Decision the caller asked to reuse for every later conflict.
    standing: Option<Decision>,
}

impl TaskWorker {
    pub fn new(request: TaskRequest, roots: EngineRoots, ctx: TaskContext) -> Self {
        Self {
            action: TaskAction::new(request.kind, request.target.clone()),
            request,
            roots,
            ctx,
            ledger: None,
            standing: None,
        }
    }

    pub fn spawn(
        request: TaskRequest,
        roots: EngineRoots,
        settings: TaskSettings,
        events: Sender<TaskEvent>,
    ) -> Result<TaskHandle, SError> {
        let gate = Arc::new(ConfirmationGate::new());
        let ctx = TaskContext::new(events, gate.clone(), settings);
        let worker = Self::new(request, roots, ctx);

        let id = worker.action.id();
        let kind = worker.action.kind();
        let target = worker.action.target().to_string();

        let thread = thread::Builder::new()
            .name(format!("{kind}-{target}"))
            .spawn(move || worker.run())
            .map_err(|e| SError::ThreadSpawn(e.to_string()))?;

        Ok(TaskHandle {
            id,
            kind,
            target,
            gate,
            thread,
        })
    }

    pub fn action(&self) -> &TaskAction {
        &self.action
    }

    /// Executes the action and always ends with exactly one `Completed` event.
    pub fn run(mut self) -> TaskAction {
        let kind = self.action.kind();
        let span = info_span!(
            "task",
            id = %self.action.id(),
            kind = %kind,
            target = %self.action.target()
        );
        let _enter = span.enter();

        info!("started");
        self.ctx.status(format!("{} {}", kind.processing(), self.action.target()));

        let result = match kind {
            TaskKind::Mount => deployment::mount(&mut self),
            TaskKind::Unmount => cleanup::unmount(&mut self),
            TaskKind::RescanAll => scanner::rescan_all(&mut self),
            TaskKind::ScanOne => scanner::scan_one(&mut self),
            TaskKind::ScanExternal => scanner::scan_external(&mut self),
            TaskKind::AddMod => mod_fs::add_mod(&mut self),
            TaskKind::DeleteMod => mod_fs::delete_mod(&mut self),
            TaskKind::MakeShortcut => mod_fs::make_shortcut(&mut self),
        };

        if let Err(e) = result {
            error!(error = %e, "task failed");
            self.action.fail_to_start(e.to_string());
        }

        if let Some(ledger) = self.ledger.take() {
            if let Err(e) = ledger.sync() {
                warn!(error = %e, "ledger sync failed");
            }
        }

        let summary = self.action.summary();
        let is_scan = matches!(
            kind,
            TaskKind::RescanAll | TaskKind::ScanOne | TaskKind::ScanExternal
        );
        if !is_scan || self.action.errors() {
            self.ctx.progress(summary.clone(), self.action.errors());
        }
        info!(%summary, "finished");

        self.ctx.emit(TaskEvent::Completed(self.action.clone()));
        self.action
    }

    /// Cooperative checkpoint between file operations. Blocks while paused;
    /// returns false once the task has been aborted.
    pub fn check_state(&mut self) -> bool {
        if self.ctx.gate.wait_while_paused() {
            return true;
        }
        if !self.action.aborted() {
            self.action.abort();
            info!("abort requested");
            self.ctx.progress(
                format!("{} {}: aborting", self.action.kind().processing(), self.action.target()),
                true,
            );
        }
        false
    }

    /// Applies one operation to one file and records exactly one outcome for it.
    pub fn process_file(&mut self, src: &Utf8Path, op: FileOp<'_>, log_backups: bool) -> Outcome {
        let outcome = match self.apply(src, op, log_backups) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%src, ?op, error = %e, "file operation failed");
                self.ctx.progress(format!("{src}: {e}"), true);
                Outcome::Failed
            }
        };
        self.action.record(outcome);
        outcome
    }

    fn apply(&mut self, src: &Utf8Path, op: FileOp<'_>, log_backups: bool) -> io::Result<Outcome> {
        if !FileUtils::exists_no_follow(src) {
            debug!(%src, "source vanished");
            return Ok(Outcome::Missing);
        }

        let dst = match op {
            FileOp::Delete => {
                remove_entry(src)?;
                return Ok(Outcome::Succeeded);
            }
            FileOp::Move(dst) | FileOp::Copy(dst) | FileOp::Link(dst) => dst,
        };

        if log_backups {
            if FileUtils::exists_no_follow(dst) {
                self.back_up(dst)?;
            }
            self.ledger()?.record_created(dst)?;
        }

        match op {
            FileOp::Move(dst) => FileUtils::move_file(src, dst)?,
            FileOp::Copy(dst) => {
                fs::copy(src, dst)?;
            }
            FileOp::Link(dst) => {
                linker::link_or_copy(src, dst)?;
            }
            FileOp::Delete => unreachable!("handled above"),
        }
        Ok(Outcome::Succeeded)
    }

    /// Counts a walk entry that could not be handled as one failed file.
    pub(crate) fn fail_entry(&mut self, reason: impl std::fmt::Display) {
        warn!(error = %reason, "entry skipped");
        self.ctx.progress(reason.to_string(), true);
        self.action.record(Outcome::Failed);
    }

    /// Maps a walked path below `base` onto `dest_root`. A path that is not UTF-8
    /// or not under `base` is counted as failed and yields `None`.
    pub(crate) fn map_entry(
        &mut self,
        path: &Path,
        base: &Utf8Path,
        dest_root: &Utf8Path,
    ) -> Option<(Utf8PathBuf, Utf8PathBuf)> {
        let mapped = FileUtils::to_utf8_buf(path).and_then(|src| {
            let dst = dest_root.join(src.strip_prefix(base)?);
            Ok((src, dst))
        });
        match mapped {
            Ok(pair) => Some(pair),
            Err(e) => {
                self.fail_entry(e);
                None
            }
        }
    }

    /// Moves `original` aside to its backup name, logging it first.
    pub(crate) fn back_up(&mut self, original: &Utf8Path) -> io::Result<()> {
        let backup = backup_path_for(original);
        if FileUtils::exists_no_follow(&backup) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("backup {backup} already exists"),
            ));
        }
        let entry = self.ledger()?.record_backup(original)?;
        fs::rename(original, &entry.backup)?;
        debug!(%original, backup = %entry.backup, "backed up");
        Ok(())
    }

    pub(crate) fn ledger(&mut self) -> io::Result<&mut BackupLedger> {
        self.ledger
            .as_mut()
            .ok_or_else(|| io::Error::other("backup ledger is not open"))
    }

    /// Resolves an overwrite conflict at `path`. `None` means the task was aborted
    /// while waiting for an answer.
    pub(crate) fn confirm_overwrite(&mut self, path: &Utf8Path) -> Option<Decision> {
        if let Some(decision) = self.standing {
            return Some(decision);
        }

        match self.ctx.settings.confirm {
            ConfirmPolicy::Overwrite => return Some(Decision::Overwrite),
            ConfirmPolicy::Skip => return Some(Decision::Skip),
            ConfirmPolicy::Ask => {}
        }

        let ctx = &self.ctx;
        let answer = ctx.gate.request(|| {
            ctx.emit(TaskEvent::ConfirmOverwrite {
                target: self.action.target().to_string(),
                path: path.to_owned(),
            })
        });

        match answer {
            Ok(Some(Confirmation {
                decision,
                apply_to_all,
            })) => {
                if apply_to_all {
                    self.standing = Some(decision);
                }
                Some(decision)
            }
            Ok(None) => {
                self.check_state();
                None
            }
            Err(e) => {
                warn!(%path, error = %e, "confirmation refused, skipping");
                Some(Decision::Skip)
            }
        }
    }

    pub(crate) fn scan_update(&self, name: &str, bytes: u64, files: u64) {
        self.ctx.emit(TaskEvent::ScanUpdate(ScanUpdate {
            name: name.to_string(),
            size_text: format_size(bytes),
            count_text: format_count(files),
            bytes,
            files,
        }));
    }

    pub(crate) fn throttle(&self) -> ProgressThrottle {
        ProgressThrottle::new(
            self.ctx.settings.progress_interval,
            self.ctx.settings.progress_batch,
        )
    }
}

/// Removes one filesystem entry. Links are unlinked, never followed, and
/// directories must already be empty.
fn remove_entry(path: &Utf8Path) -> io::Result<()> {
    if linker::is_link(path) {
        return linker::unlink(path);
    }
    if FileUtils::is_real_dir(path) {
        return fs::remove_dir(path);
    }
    fs::remove_file(path)
}

/// Rate limit for scan updates: due after `interval` or every `batch` items, whichever comes first.
pub(crate) struct ProgressThrottle {
    last: Instant,
    pending: u64,
    interval: Duration,
    batch: u64,
}

impl ProgressThrottle {
    pub(crate) fn new(interval: Duration, batch: u64) -> Self {
        Self {
            last: Instant::now(),
            pending: 0,
            interval,
            batch: batch.max(1),
        }
    }

    /// Counts one item and reports whether an update should go out now.
    pub(crate) fn tick(&mut self) -> bool {
        self.pending += 1;
        if self.pending >= self.batch || self.last.elapsed() >= self.interval {
            self.pending = 0;
            self.last = Instant::now();
            return true;
        }
        false
    }
}

/// Caller's side of a running worker.
pub struct TaskHandle {
    id: Uuid,
    kind: TaskKind,
    target: String,
    gate: Arc<ConfirmationGate>,
    thread: JoinHandle<TaskAction>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Takes effect at the worker's next checkpoint, or immediately if it is
    /// waiting for a confirmation.
    pub fn abort(&self) {
        self.gate.abort();
    }

    pub fn pause(&self) {
        self.gate.pause();
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Answers a pending `ConfirmOverwrite`. False when nothing was being asked.
    pub fn confirm(&self, confirmation: Confirmation) -> bool {
        self.gate.respond(confirmation)
    }

    pub fn is_waiting(&self) -> bool {
        self.gate.is_pending()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> Result<TaskAction, SError> {
        self.thread
            .join()
            .map_err(|_| SError::WorkerPanicked(self.target))
    }
}
