#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::{Receiver, Sender};
use mod_mount_lib::core::worker::{TaskHandle, TaskWorker};
use mod_mount_lib::models::paths::EngineRoots;
use mod_mount_lib::models::task_action::TaskAction;
use mod_mount_lib::models::task_request::{ConfirmPolicy, TaskRequest, TaskSettings};
use mod_mount_lib::models::task_status::TaskEvent;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A throwaway store, game folder and state folder under one temp dir.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: Utf8PathBuf,
    pub roots: EngineRoots,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        // resolve the temp dir itself so paths compare equal to the store root
        let root = Utf8PathBuf::from_path_buf(dunce::canonicalize(tmp.path()).unwrap()).unwrap();

        let game = root.join("game");
        fs::create_dir_all(&game).unwrap();
        let roots = EngineRoots::new(&root.join("mods"), &game, &root.join("state")).unwrap();

        Self {
            _tmp: tmp,
            root,
            roots,
        }
    }

    pub fn game(&self) -> &Utf8Path {
        &self.roots.game_root
    }

    pub fn mods(&self) -> &Utf8Path {
        &self.roots.mods_root
    }
}

/// Writes `files` (relative path, contents) below `base`.
pub fn write_tree(base: &Utf8Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

pub fn create_test_mod(env: &TestEnv, name: &str, files: &[(&str, &str)]) -> Utf8PathBuf {
    let dir = env.roots.mod_dir(name);
    fs::create_dir_all(&dir).unwrap();
    write_tree(&dir, files);
    dir
}

/// Every path below `root` with file contents (folders map to `None`), links not followed.
pub fn snapshot(root: &Utf8Path) -> BTreeMap<Utf8PathBuf, Option<String>> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let path = Utf8PathBuf::from_path_buf(e.path().to_path_buf()).unwrap();
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            let contents = if e.file_type().is_dir() {
                None
            } else {
                Some(fs::read_to_string(&path).unwrap_or_default())
            };
            (rel, contents)
        })
        .collect()
}

pub fn settings(confirm: ConfirmPolicy) -> TaskSettings {
    TaskSettings {
        confirm,
        ..Default::default()
    }
}

pub fn spawn(
    env: &TestEnv,
    request: TaskRequest,
    settings: TaskSettings,
) -> (TaskHandle, Receiver<TaskEvent>) {
    let (tx, rx): (Sender<TaskEvent>, Receiver<TaskEvent>) = crossbeam_channel::unbounded();
    let handle = TaskWorker::spawn(request, env.roots.clone(), settings, tx).unwrap();
    (handle, rx)
}

/// Collects events until `Completed`, which must be the last one.
pub fn wait(rx: &Receiver<TaskEvent>) -> (Vec<TaskEvent>, TaskAction) {
    let mut events = Vec::new();
    loop {
        let event = rx.recv_timeout(TIMEOUT).expect("worker went quiet");
        if let TaskEvent::Completed(action) = &event {
            let action = action.clone();
            assert!(rx.try_recv().is_err(), "event after Completed");
            return (events, action);
        }
        events.push(event);
    }
}

pub fn run(
    env: &TestEnv,
    request: TaskRequest,
    settings: TaskSettings,
) -> (Vec<TaskEvent>, TaskAction) {
    let (handle, rx) = spawn(env, request, settings);
    let out = wait(&rx);
    handle.join().unwrap();
    out
}

pub fn last_scan(events: &[TaskEvent], name: &str) -> Option<(u64, u64)> {
    events.iter().rev().find_map(|e| match e {
        TaskEvent::ScanUpdate(u) if u.name == name => Some((u.bytes, u.files)),
        _ => None,
    })
}
