use crate::core::gate::Decision;
use crate::core::ledger::BackupLedger;
use crate::core::worker::{FileOp, TaskWorker};
use crate::models::error::SError;
use crate::models::task_action::Outcome;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Projects every file of the target mod into the game folder, one link per file.
///
/// Folders are recreated as real directories so the game never has to traverse a
/// directory link. Anything in the way is moved aside through the ledger first.
pub fn mount(worker: &mut TaskWorker) -> Result<(), SError> {
    let name = worker.action.target().to_string();
    let source = worker.roots.mod_dir(&name);
    let game_root = worker.roots.game_root.clone();

    if !FileUtils::is_real_dir(&source) {
        return Err(SError::ModNotFound(name));
    }
    if !FileUtils::is_real_dir(&game_root) {
        return Err(SError::InvalidGameDirectory(game_root.to_string()));
    }

    // entries left by an earlier mount would be overwritten and then orphaned
    if !BackupLedger::read(&worker.roots.state)?.is_empty() {
        return Err(SError::UnfinishedMount);
    }
    worker.ledger = Some(BackupLedger::open(&worker.roots.state)?);

    // paths this run created are overwritten without asking
    let mut tracked: HashSet<Utf8PathBuf> = HashSet::new();

    info!(%source, %game_root, "mounting");

    let walker = WalkDir::new(&source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        if !worker.check_state() {
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                worker.fail_entry(e);
                continue;
            }
        };

        let Some((src, dst)) = worker.map_entry(entry.path(), &source, &game_root) else {
            continue;
        };

        if entry.file_type().is_dir() {
            ensure_dir(worker, &dst, &mut tracked);
            continue;
        }

        if FileUtils::exists_no_follow(&dst) && !tracked.contains(&dst) {
            match worker.confirm_overwrite(&dst) {
                Some(Decision::Overwrite) => {}
                Some(Decision::Skip) => {
                    debug!(%dst, "kept existing file");
                    continue;
                }
                None => break,
            }
        }

        if worker.process_file(&src, FileOp::Link(&dst), true) == Outcome::Succeeded {
            tracked.insert(dst);
        }
    }

    Ok(())
}

/// Makes `dst` a real directory, logging it when this mount creates it.
/// Counters are left alone: only files count.
fn ensure_dir(worker: &mut TaskWorker, dst: &Utf8Path, tracked: &mut HashSet<Utf8PathBuf>) {
    if FileUtils::is_real_dir(dst) {
        return;
    }

    let result = (|| {
        if FileUtils::exists_no_follow(dst) {
            worker.back_up(dst)?;
        }
        worker.ledger()?.record_created(dst)?;
        std::fs::create_dir(dst)
    })();

    match result {
        Ok(()) => {
            tracked.insert(dst.to_owned());
        }
        Err(e) => {
            // the files below will each fail on their own
            warn!(%dst, error = %e, "could not create folder");
            worker.ctx.progress(format!("{dst}: {e}"), true);
        }
    }
}
