mod common;

use camino::Utf8PathBuf;
use common::{create_test_mod, last_scan, run, write_tree, TestEnv};
use mod_mount_lib::core::gate::ConfirmationGate;
use mod_mount_lib::core::worker::{FileOp, TaskWorker};
use mod_mount_lib::models::mod_dto::{ModData, ModDescriptor};
use mod_mount_lib::models::paths::STAGING_DIR;
use mod_mount_lib::models::task_action::{Outcome, TaskKind};
use mod_mount_lib::models::task_request::{TaskRequest, TaskSettings, Transfer};
use mod_mount_lib::models::task_status::TaskEvent;
use mod_mount_lib::utils::context::TaskContext;
use std::fs;
use std::io::Write;
use std::sync::Arc;

fn batch_of_one() -> TaskSettings {
    TaskSettings {
        progress_batch: 1,
        ..Default::default()
    }
}

fn source_tree(env: &TestEnv) -> Utf8PathBuf {
    let src = env.root.join("download/alpha");
    write_tree(
        &src,
        &[("readme.txt", "12345"), ("data/a.bin", "abc"), ("data/deep/b.bin", "xy")],
    );
    src
}

fn add_request(name: &str, source: &Utf8PathBuf, transfer: Transfer) -> TaskRequest {
    TaskRequest::new(TaskKind::AddMod, name)
        .with_source(source.clone())
        .with_transfer(transfer)
}

fn bare_worker(env: &TestEnv, kind: TaskKind) -> TaskWorker {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let ctx = TaskContext::new(tx, Arc::new(ConfirmationGate::new()), TaskSettings::default());
    TaskWorker::new(TaskRequest::new(kind, "alpha"), env.roots.clone(), ctx)
}

#[test]
fn test_add_by_copy_keeps_source() {
    let env = TestEnv::new();
    let src = source_tree(&env);

    let (events, action) = run(
        &env,
        add_request("alpha", &src, Transfer::Copy),
        TaskSettings::default(),
    );

    assert!(action.success(), "{}", action.summary());
    assert_eq!(action.get(Outcome::Succeeded), 3);

    let dest = env.roots.mod_dir("alpha");
    assert_eq!(fs::read_to_string(dest.join("readme.txt")).unwrap(), "12345");
    assert_eq!(fs::read_to_string(dest.join("data/deep/b.bin")).unwrap(), "xy");
    assert!(src.join("data/a.bin").exists());

    assert!(events
        .iter()
        .any(|e| matches!(e, TaskEvent::ModAdded { name, row: 0 } if name == "alpha")));
    assert_eq!(last_scan(&events, "alpha"), Some((10, 3)));
}

#[test]
fn test_add_by_move_clears_source() {
    let env = TestEnv::new();
    let src = source_tree(&env);

    let (_, action) = run(
        &env,
        add_request("alpha", &src, Transfer::Move),
        TaskSettings::default(),
    );

    assert!(action.success(), "{}", action.summary());
    assert!(!src.exists(), "emptied source folders are removed");
    assert_eq!(
        fs::read_to_string(env.roots.mod_dir("alpha").join("data/a.bin")).unwrap(),
        "abc"
    );
}

#[test]
fn test_add_from_zip_archive() {
    let env = TestEnv::new();
    let archive = env.root.join("alpha.zip");
    {
        let mut zip = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"from zip").unwrap();
        zip.add_directory("data/", options).unwrap();
        zip.start_file("data/x.bin", options).unwrap();
        zip.write_all(b"1234").unwrap();
        zip.finish().unwrap();
    }

    let (events, action) = run(
        &env,
        add_request("alpha", &archive, Transfer::Copy),
        TaskSettings::default(),
    );

    assert!(action.success(), "{}", action.summary());
    let dest = env.roots.mod_dir("alpha");
    assert_eq!(fs::read_to_string(dest.join("readme.txt")).unwrap(), "from zip");
    assert_eq!(fs::read_to_string(dest.join("data/x.bin")).unwrap(), "1234");
    assert!(archive.exists());
    assert!(!env.mods().join(STAGING_DIR).exists());
    assert_eq!(last_scan(&events, "alpha"), Some((12, 2)));
}

#[test]
fn test_add_refuses_existing_destination() {
    let env = TestEnv::new();
    create_test_mod(&env, "alpha", &[("old.txt", "old")]);
    let src = source_tree(&env);

    let (events, action) = run(
        &env,
        add_request("alpha", &src, Transfer::Move),
        TaskSettings::default(),
    );

    assert!(!action.files_processed());
    assert!(!action.success());
    assert!(action.start_error().is_some());
    assert!(src.join("readme.txt").exists());
    assert!(!events.iter().any(|e| matches!(e, TaskEvent::ModAdded { .. })));
}

#[test]
fn test_add_without_source_fails_to_start() {
    let env = TestEnv::new();

    let (_, action) = run(
        &env,
        TaskRequest::new(TaskKind::AddMod, "alpha"),
        TaskSettings::default(),
    );

    assert!(!action.files_processed());
    assert!(action.start_error().unwrap().contains("source"));
}

#[test]
fn test_delete_counts_down_and_reports_removal() {
    let env = TestEnv::new();
    create_test_mod(&env, "alpha", &[("a.txt", "aa"), ("sub/b.txt", "bbb"), ("sub/c.txt", "c")]);

    let mut mods = ModData::new();
    let mut descriptor = ModDescriptor::new("alpha", 0);
    descriptor.size = 6;
    descriptor.file_count = 3;
    mods.insert("alpha".into(), descriptor);

    let request = TaskRequest::new(TaskKind::DeleteMod, "alpha").with_mods(mods);
    let (events, action) = run(&env, request, batch_of_one());

    assert!(action.success(), "{}", action.summary());
    assert_eq!(action.get(Outcome::Succeeded), 3);
    assert!(!env.roots.mod_dir("alpha").exists());

    let counts: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::ScanUpdate(u) => Some(u.files),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![2, 1, 0]);
    assert!(events
        .iter()
        .any(|e| matches!(e, TaskEvent::ModDeleted(name) if name == "alpha")));
}

#[test]
fn test_delete_unknown_mod_fails_to_start() {
    let env = TestEnv::new();

    let (_, action) = run(
        &env,
        TaskRequest::new(TaskKind::DeleteMod, "ghost"),
        TaskSettings::default(),
    );

    assert!(!action.success());
    assert!(!action.files_processed());
}

#[cfg(unix)]
#[test]
fn test_delete_linked_entry_leaves_target_alone() {
    let env = TestEnv::new();
    let outside = env.root.join("elsewhere");
    write_tree(&outside, &[("keep.txt", "keep")]);
    std::os::unix::fs::symlink(&outside, env.roots.mod_dir("alpha")).unwrap();

    let (events, action) = run(
        &env,
        TaskRequest::new(TaskKind::DeleteMod, "alpha"),
        TaskSettings::default(),
    );

    assert!(action.success(), "{}", action.summary());
    assert_eq!(action.get(Outcome::Succeeded), 1);
    assert!(!env.roots.mod_dir("alpha").exists());
    assert_eq!(fs::read_to_string(outside.join("keep.txt")).unwrap(), "keep");
    assert!(events.iter().any(|e| matches!(e, TaskEvent::ModDeleted(_))));
}

#[test]
fn test_move_of_missing_source_is_missing_and_leaves_destination() {
    let env = TestEnv::new();
    let dst = env.root.join("dst.txt");
    fs::write(&dst, "untouched").unwrap();

    let mut worker = bare_worker(&env, TaskKind::AddMod);
    let outcome = worker.process_file(&env.root.join("gone.txt"), FileOp::Move(&dst), false);

    assert_eq!(outcome, Outcome::Missing);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "untouched");
    assert_eq!(worker.action().get(Outcome::Missing), 1);
    assert!(worker.action().errors());
}

#[test]
fn test_every_call_records_exactly_one_outcome() {
    let env = TestEnv::new();
    let a = env.root.join("a.txt");
    let b = env.root.join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::create_dir_all(env.root.join("locked")).unwrap();
    fs::write(env.root.join("locked/inner.txt"), "x").unwrap();

    let mut worker = bare_worker(&env, TaskKind::AddMod);
    let calls = [
        worker.process_file(&a, FileOp::Copy(&b), false),
        worker.process_file(&env.root.join("nope"), FileOp::Delete, false),
        // non-empty folders are never removed by a single-file delete
        worker.process_file(&env.root.join("locked"), FileOp::Delete, false),
        worker.process_file(&b, FileOp::Delete, false),
    ];

    assert_eq!(
        calls,
        [Outcome::Succeeded, Outcome::Missing, Outcome::Failed, Outcome::Succeeded]
    );
    let action = worker.action();
    let total = action.get(Outcome::Succeeded)
        + action.get(Outcome::Failed)
        + action.get(Outcome::Missing);
    assert_eq!(total, calls.len() as u64);
    assert!(action.success(), "AddMod tolerates partial failure");
}

#[cfg(unix)]
#[test]
fn test_shortcut_links_to_game_folder_by_default() {
    let env = TestEnv::new();
    let shortcut = env.root.join("desktop/Game");
    fs::create_dir_all(shortcut.parent().unwrap()).unwrap();

    let request =
        TaskRequest::new(TaskKind::MakeShortcut, "Game").with_destination(shortcut.clone());
    let (events, action) = run(&env, request, TaskSettings::default());

    assert!(action.success(), "{}", action.summary());
    assert_eq!(
        mod_mount_lib::core::linker::read_link_target(&shortcut).unwrap(),
        env.game()
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, TaskEvent::ShortcutReady(p) if *p == shortcut)));
}

#[cfg(target_os = "linux")]
#[test]
fn test_add_counts_a_non_utf8_name_as_failed_and_keeps_going() {
    use std::os::unix::ffi::OsStrExt;

    let env = TestEnv::new();
    let src = source_tree(&env);
    let bad = src.as_std_path().join(std::ffi::OsStr::from_bytes(b"m\xFF.txt"));
    fs::write(bad, "bad").unwrap();

    let (events, action) = run(
        &env,
        add_request("alpha", &src, Transfer::Copy),
        TaskSettings::default(),
    );

    assert!(action.start_error().is_none(), "{}", action.summary());
    assert_eq!(action.get(Outcome::Succeeded), 3);
    assert_eq!(action.get(Outcome::Failed), 1);
    assert!(action.success(), "AddMod tolerates partial failure");
    assert_eq!(last_scan(&events, "alpha"), Some((10, 3)));
}
