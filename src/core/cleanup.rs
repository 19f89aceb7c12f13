use crate::core::ledger::{BackupLedger, LedgerSnapshot};
use crate::core::worker::{FileOp, TaskWorker};
use crate::models::error::SError;
use crate::models::task_action::Outcome;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Rolls the last mount back from the ledger: created paths go first, newest
/// first, then every backup returns to its original place.
///
/// The logs are rewritten afterwards with whatever could not be undone, so a
/// second unmount picks up where this one stopped.
pub fn unmount(worker: &mut TaskWorker) -> Result<(), SError> {
    let game_root = worker.roots.game_root.clone();
    if !FileUtils::is_real_dir(&game_root) {
        return Err(SError::InvalidGameDirectory(game_root.to_string()));
    }

    let snapshot = BackupLedger::read(&worker.roots.state)?;
    info!(
        created = snapshot.created.len(),
        backups = snapshot.backups.len(),
        "unmounting"
    );

    let created: HashSet<&Utf8Path> = snapshot.created.iter().map(|p| p.as_path()).collect();
    let mut pruned: HashSet<Utf8PathBuf> = HashSet::new();
    let mut remaining = LedgerSnapshot::default();
    let mut stopped = false;

    for path in snapshot.created.iter().rev() {
        if stopped || !worker.check_state() {
            stopped = true;
            remaining.created.push(path.clone());
            continue;
        }

        if pruned.contains(path) {
            continue;
        }

        if FileUtils::is_real_dir(path) {
            if FileUtils::is_dir_empty(path) {
                if let Err(e) = std::fs::remove_dir(path) {
                    warn!(%path, error = %e, "could not remove folder");
                    remaining.created.push(path.clone());
                    continue;
                }
                prune_empty_parents(path, &game_root, &created, &mut pruned);
            } else {
                debug!(%path, "folder holds foreign files, left in place");
            }
            continue;
        }

        match worker.process_file(path, FileOp::Delete, false) {
            Outcome::Failed => remaining.created.push(path.clone()),
            Outcome::Succeeded | Outcome::Missing => {
                prune_empty_parents(path, &game_root, &created, &mut pruned)
            }
        }
    }

    for entry in snapshot.backups.iter().rev() {
        if stopped || !worker.check_state() {
            stopped = true;
            remaining.backups.push(entry.clone());
            continue;
        }

        if worker.process_file(&entry.backup, FileOp::Move(&entry.original), false)
            == Outcome::Failed
        {
            remaining.backups.push(entry.clone());
        }
    }

    remaining.created.reverse();
    remaining.backups.reverse();
    BackupLedger::rewrite(&worker.roots.state, &remaining)?;

    if !remaining.is_empty() {
        warn!(
            created = remaining.created.len(),
            backups = remaining.backups.len(),
            "unmount left entries behind"
        );
    }
    Ok(())
}

/// Walks up from `path` removing folders that this mount created and that are now
/// empty. Never touches `stop` or anything above it.
fn prune_empty_parents(
    path: &Utf8Path,
    stop: &Utf8Path,
    created: &HashSet<&Utf8Path>,
    pruned: &mut HashSet<Utf8PathBuf>,
) {
    for dir in path.ancestors().skip(1) {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if !created.contains(dir) || !FileUtils::is_real_dir(dir) || !FileUtils::is_dir_empty(dir) {
            break;
        }
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        debug!(%dir, "removed empty folder");
        pruned.insert(dir.to_owned());
    }
}
