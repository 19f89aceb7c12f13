use crate::core::cache::ModCache;
use crate::core::ledger::{BackupLedger, LedgerSnapshot};
use crate::core::linker;
use crate::core::worker::{TaskHandle, TaskWorker};
use crate::models::error::SError;
use crate::models::mod_dto::{ModData, ModDescriptor, UNKNOWN_MOD};
use crate::models::paths::EngineRoots;
use crate::models::task_action::{TaskAction, TaskKind};
use crate::models::task_request::{TaskRequest, TaskSettings, Transfer};
use crate::models::task_status::TaskEvent;
use crate::utils::file::FileUtils;
use camino::Utf8Path;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MountReadiness {
    Ready,
    AlreadyMounted,
    OtherMounted(String),
    /// The ledger still holds a mount that never completed cleanly.
    Unfinished,
    /// Game folder missing, not a folder, or itself a link.
    Invalid,
}

/// Caller-side owner of the mount state and the mod list.
///
/// Workers never touch this. Everything they report arrives as a `TaskEvent`
/// and is folded in by `apply`, on the thread that owns the manager.
pub struct MountManager {
    roots: EngineRoots,
    settings: TaskSettings,
    mounted: Option<String>,
    mods: ModData,
    names: Vec<String>,
    tx: Sender<TaskEvent>,
    rx: Receiver<TaskEvent>,
}

impl MountManager {
    pub fn new(roots: EngineRoots, settings: TaskSettings) -> Result<Self, SError> {
        let cache = ModCache::load(&roots.state.cache);
        let mounted = detect_mounted(&roots, &cache)?;
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut manager = Self {
            roots,
            settings,
            mounted: None,
            mods: cache.mods,
            names: Vec::new(),
            tx,
            rx,
        };
        manager.reindex_from_mods();

        if let Some(name) = mounted {
            info!(%name, "found a mount from a previous session");
            if !manager.mods.contains_key(&name) {
                let index = manager.names.len();
                let descriptor = if manager.is_external(&name) {
                    ModDescriptor::external(name.clone(), index)
                } else {
                    ModDescriptor::new(name.clone(), index)
                };
                manager.mods.insert(name.clone(), descriptor);
                manager.names.push(name.clone());
            }
            manager.mounted = Some(name);
        }

        Ok(manager)
    }

    pub fn roots(&self) -> &EngineRoots {
        &self.roots
    }

    pub fn mounted(&self) -> Option<&str> {
        self.mounted.as_deref()
    }

    pub fn mods(&self) -> &ModData {
        &self.mods
    }

    /// Mod names in display order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn events(&self) -> &Receiver<TaskEvent> {
        &self.rx
    }

    pub fn mount_readiness(&self, name: &str) -> MountReadiness {
        match &self.mounted {
            Some(current) if current == name => return MountReadiness::AlreadyMounted,
            Some(other) => return MountReadiness::OtherMounted(other.clone()),
            None => {}
        }

        let game_root = &self.roots.game_root;
        let is_dir = std::fs::symlink_metadata(game_root)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir || linker::is_link(game_root) {
            return MountReadiness::Invalid;
        }
        if self.has_leftovers() {
            return MountReadiness::Unfinished;
        }
        MountReadiness::Ready
    }

    /// An unreadable ledger counts as holding entries.
    fn has_leftovers(&self) -> bool {
        BackupLedger::read(&self.roots.state)
            .map(|snapshot| !snapshot.is_empty())
            .unwrap_or(true)
    }

    /// Content under the game folder with no store entry behind it.
    pub fn is_external(&self, name: &str) -> bool {
        name == UNKNOWN_MOD || !FileUtils::exists_no_follow(&self.roots.mod_dir(name))
    }

    pub fn mount(&mut self, name: &str) -> Result<TaskHandle, SError> {
        match self.mount_readiness(name) {
            MountReadiness::Ready => {}
            MountReadiness::AlreadyMounted => {
                return Err(SError::ModAlreadyMounted(name.to_string()))
            }
            MountReadiness::OtherMounted(other) => return Err(SError::OtherModMounted(other)),
            MountReadiness::Unfinished => return Err(SError::UnfinishedMount),
            MountReadiness::Invalid => {
                return Err(SError::InvalidGameDirectory(
                    self.roots.game_root.to_string(),
                ))
            }
        }
        self.dispatch(TaskRequest::new(TaskKind::Mount, name))
    }

    /// Undoes the current mount, or whatever a failed or aborted one left in the ledger.
    pub fn unmount(&mut self) -> Result<TaskHandle, SError> {
        let name = match &self.mounted {
            Some(name) => name.clone(),
            None => {
                let snapshot = BackupLedger::read(&self.roots.state)?;
                if snapshot.is_empty() {
                    return Err(SError::NoModMounted);
                }
                trace_mount(&self.roots, &snapshot)
            }
        };
        self.dispatch(TaskRequest::new(TaskKind::Unmount, name))
    }

    /// Refuses while any mod is busy, then holds every mod until the rescan completes.
    pub fn rescan(&mut self) -> Result<TaskHandle, SError> {
        if let Some(busy) = self.mods.values().find(|d| d.busy) {
            return Err(SError::ModBusy(busy.name.clone()));
        }
        self.mods.values_mut().for_each(|d| d.busy = true);

        let request = TaskRequest::new(TaskKind::RescanAll, "")
            .with_mods(self.mods.clone())
            .with_mounted(self.mounted.clone());
        self.spawn(request).inspect_err(|_| {
            self.mods.values_mut().for_each(|d| d.busy = false);
        })
    }

    pub fn scan(&mut self, name: &str) -> Result<TaskHandle, SError> {
        if !self.mods.contains_key(name) {
            return Err(SError::ModNotFound(name.to_string()));
        }
        self.dispatch(TaskRequest::new(TaskKind::ScanOne, name))
    }

    pub fn scan_external(&mut self, name: &str, source: &Utf8Path) -> Result<TaskHandle, SError> {
        self.dispatch(TaskRequest::new(TaskKind::ScanExternal, name).with_source(source))
    }

    pub fn add_mod(
        &mut self,
        name: &str,
        source: &Utf8Path,
        transfer: Transfer,
    ) -> Result<TaskHandle, SError> {
        if self.mods.contains_key(name) {
            return Err(SError::ModExists(name.to_string()));
        }
        self.dispatch(
            TaskRequest::new(TaskKind::AddMod, name)
                .with_source(source)
                .with_transfer(transfer),
        )
    }

    pub fn delete_mod(&mut self, name: &str) -> Result<TaskHandle, SError> {
        if self.mounted.as_deref() == Some(name) {
            return Err(SError::CantDeleteMounted(name.to_string()));
        }
        if !self.mods.contains_key(name) {
            return Err(SError::ModNotFound(name.to_string()));
        }
        self.dispatch(TaskRequest::new(TaskKind::DeleteMod, name))
    }

    /// Links `destination` to `source`, or to the game folder when no source is given.
    pub fn make_shortcut(
        &mut self,
        destination: &Utf8Path,
        source: Option<&Utf8Path>,
    ) -> Result<TaskHandle, SError> {
        let target = destination.file_name().unwrap_or(destination.as_str());
        let mut request =
            TaskRequest::new(TaskKind::MakeShortcut, target).with_destination(destination);
        if let Some(source) = source {
            request = request.with_source(source);
        }
        self.spawn(request)
    }

    /// Marks `name` busy. Names without a descriptor pass.
    pub fn try_busy(&mut self, name: &str) -> Result<(), SError> {
        match self.mods.get_mut(name) {
            Some(d) if d.busy => Err(SError::ModBusy(name.to_string())),
            Some(d) => {
                d.busy = true;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn dispatch(&mut self, request: TaskRequest) -> Result<TaskHandle, SError> {
        let name = request.target.clone();
        self.try_busy(&name)?;
        self.spawn(request).inspect_err(|_| self.clear_busy(&name))
    }

    fn spawn(&self, request: TaskRequest) -> Result<TaskHandle, SError> {
        let request = if request.mods.is_empty() {
            request.with_mods(self.mods.clone())
        } else {
            request
        };
        let request = request.with_mounted(self.mounted.clone());
        debug!(kind = %request.kind, target = %request.target, "dispatching");
        TaskWorker::spawn(
            request,
            self.roots.clone(),
            self.settings.clone(),
            self.tx.clone(),
        )
    }

    fn clear_busy(&mut self, name: &str) {
        if let Some(d) = self.mods.get_mut(name) {
            d.busy = false;
        }
    }

    /// Waits up to `timeout` for the next event and folds it in before handing it out.
    pub fn next_event(&mut self, timeout: Duration) -> Option<TaskEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                self.apply(&event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Folds one worker event into the caller's state. Returns text worth showing.
    pub fn apply(&mut self, event: &TaskEvent) -> Option<String> {
        match event {
            TaskEvent::Progress { message, .. } | TaskEvent::Status(message) => {
                Some(message.clone())
            }
            TaskEvent::ScanUpdate(update) => {
                if let Some(d) = self.mods.get_mut(&update.name) {
                    d.size = update.bytes;
                    d.file_count = update.files;
                }
                None
            }
            TaskEvent::ScanDone(_) | TaskEvent::ConfirmOverwrite { .. } => None,
            TaskEvent::ModDataReady { mods, names } => {
                let mut mods = mods.clone();
                for (name, d) in mods.iter_mut() {
                    d.busy = self.mods.get(name).is_some_and(|old| old.busy);
                }
                self.mods = mods;
                self.names = names.clone();
                None
            }
            TaskEvent::ModAdded { name, row } => {
                let row = (*row).min(self.names.len());
                let mut descriptor = ModDescriptor::new(name.clone(), row);
                descriptor.busy = true;
                self.mods.insert(name.clone(), descriptor);
                self.names.insert(row, name.clone());
                self.reindex();
                None
            }
            TaskEvent::ModDeleted(name) => {
                self.mods.remove(name);
                self.names.retain(|n| n != name);
                self.reindex();
                None
            }
            TaskEvent::ShortcutReady(path) => Some(format!("Shortcut created: {path}")),
            TaskEvent::Completed(action) => {
                self.complete(action);
                Some(action.summary())
            }
        }
    }

    fn complete(&mut self, action: &TaskAction) {
        let name = action.target();
        match action.kind() {
            TaskKind::RescanAll => self.mods.values_mut().for_each(|d| d.busy = false),
            _ => self.clear_busy(name),
        }

        match action.kind() {
            TaskKind::Mount if !action.errors() => {
                self.mounted = Some(name.to_string());
            }
            TaskKind::Unmount if !action.errors() => {
                if self.is_external(name) {
                    self.mods.remove(name);
                    self.names.retain(|n| n != name);
                    self.reindex();
                }
                self.mounted = None;
            }
            TaskKind::AddMod if !action.success() && self.is_external(name) => {
                // nothing landed in the store
                self.mods.remove(name);
                self.names.retain(|n| n != name);
                self.reindex();
                return;
            }
            TaskKind::RescanAll => {}
            _ => return,
        }

        self.save_cache();
    }

    fn reindex(&mut self) {
        for (index, name) in self.names.iter().enumerate() {
            if let Some(d) = self.mods.get_mut(name) {
                d.index = index;
            }
        }
    }

    fn reindex_from_mods(&mut self) {
        let mut ordered: Vec<&ModDescriptor> = self.mods.values().collect();
        ordered.sort_by_key(|d| d.index);
        self.names = ordered.into_iter().map(|d| d.name.clone()).collect();
        self.reindex();
    }

    fn save_cache(&self) {
        let cache = ModCache {
            mounted: self.mounted.clone(),
            mods: self.mods.clone(),
        };
        if let Err(e) = cache.save(&self.roots.state.cache) {
            warn!(error = %e, "mod cache not saved");
        }
    }
}

/// Works out what is mounted from what a previous session left behind.
fn detect_mounted(roots: &EngineRoots, cache: &ModCache) -> Result<Option<String>, SError> {
    let snapshot = BackupLedger::read(&roots.state)?;
    if snapshot.created.is_empty() {
        return Ok(None);
    }

    if let Some(name) = &cache.mounted {
        return Ok(Some(name.clone()));
    }

    Ok(Some(trace_mount(roots, &snapshot)))
}

/// Names the mod behind the first logged link into the store, or `UNKNOWN_MOD`.
fn trace_mount(roots: &EngineRoots, snapshot: &LedgerSnapshot) -> String {
    snapshot
        .created
        .iter()
        .filter(|p| linker::is_link(p))
        .filter_map(|p| linker::resolve_link(p).ok())
        .find_map(|target| store_entry(&roots.mods_root, &target))
        .unwrap_or_else(|| UNKNOWN_MOD.to_string())
}

fn store_entry(mods_root: &Utf8Path, target: &Utf8Path) -> Option<String> {
    target
        .strip_prefix(mods_root)
        .ok()?
        .components()
        .next()
        .map(|c| c.as_str().to_string())
}
