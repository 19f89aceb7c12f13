use crate::core::{decompression, linker};
use crate::core::worker::{FileOp, TaskWorker};
use crate::models::error::SError;
use crate::models::paths::STAGING_DIR;
use crate::models::task_action::Outcome;
use crate::models::task_request::Transfer;
use crate::models::task_status::TaskEvent;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Copies or moves a source tree (or a `.zip`) into the store under the target name.
pub fn add_mod(worker: &mut TaskWorker) -> Result<(), SError> {
    let name = worker.action.target().to_string();
    let source = worker
        .request
        .source
        .clone()
        .ok_or(SError::MissingTaskInput("source"))?;

    if !FileUtils::exists_no_follow(&source) {
        return Err(SError::FileOrDirectoryNotFound(source.to_string()));
    }
    let dest = worker.roots.mod_dir(&name);
    if FileUtils::exists_no_follow(&dest) {
        return Err(SError::ModExists(name));
    }

    let staging = if decompression::is_archive(&source) {
        let dir = worker
            .roots
            .mods_root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string());
        worker.ctx.status(format!("Extracting {source}"));
        if let Err(e) = decompression::extract(&source, &dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }
        Some(dir)
    } else {
        None
    };

    let (tree, transfer) = match &staging {
        Some(dir) => (dir.clone(), Transfer::Move),
        None => (source, worker.request.transfer),
    };

    fs::create_dir(&dest)?;
    let row = worker.request.mods.len();
    worker.ctx.emit(TaskEvent::ModAdded {
        name: name.clone(),
        row,
    });
    info!(%tree, %dest, ?transfer, "adding");

    let (bytes, files) = transfer_tree(worker, &name, &tree, &dest, transfer);
    debug!(bytes, files, "transfer finished");

    if transfer == Transfer::Move {
        remove_emptied_dirs(&tree);
    }
    if let Some(dir) = staging {
        let _ = fs::remove_dir_all(&dir);
        if let Some(parent) = dir.parent() {
            if FileUtils::is_dir_empty(parent) {
                let _ = fs::remove_dir(parent);
            }
        }
    }

    Ok(())
}

/// Moves or copies every file under `tree` into `dest`, returning (bytes, files) added.
fn transfer_tree(
    worker: &mut TaskWorker,
    name: &str,
    tree: &Utf8Path,
    dest: &Utf8Path,
    transfer: Transfer,
) -> (u64, u64) {
    // a plain file source lands directly inside the new mod folder
    let (base, min_depth) = if FileUtils::is_real_dir(tree) {
        (tree.to_owned(), 1)
    } else {
        let parent = tree.parent().map(Utf8Path::to_owned).unwrap_or_default();
        (parent, 0)
    };

    let mut bytes = 0;
    let mut files = 0;
    let mut throttle = worker.throttle();

    let walker = WalkDir::new(tree)
        .min_depth(min_depth)
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

        let Some((src, out)) = worker.map_entry(entry.path(), &base, dest) else {
            continue;
        };

        if entry.file_type().is_dir() {
            if let Err(e) = fs::create_dir_all(&out) {
                warn!(%out, error = %e, "could not create folder");
            }
            continue;
        }

        let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let op = match transfer {
            Transfer::Copy => FileOp::Copy(&out),
            Transfer::Move => FileOp::Move(&out),
        };
        if worker.process_file(&src, op, false) == Outcome::Succeeded {
            bytes += len;
            files += 1;
        }

        if throttle.tick() {
            worker.scan_update(name, bytes, files);
        }
    }

    worker.scan_update(name, bytes, files);
    worker.ctx.emit(TaskEvent::ScanDone(name.to_string()));
    (bytes, files)
}

/// Best effort: drops folders a move left empty, deepest first.
fn remove_emptied_dirs(tree: &Utf8Path) {
    if !FileUtils::is_real_dir(tree) {
        return;
    }
    for entry in WalkDir::new(tree)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.file_type().is_dir() && fs::remove_dir(entry.path()).is_ok() {
            debug!(path = %entry.path().display(), "removed emptied folder");
        }
    }
}

/// Removes a mod from the store, contents first. There is no undo.
pub fn delete_mod(worker: &mut TaskWorker) -> Result<(), SError> {
    let name = worker.action.target().to_string();
    let dir = worker.roots.mod_dir(&name);
    if !FileUtils::exists_no_follow(&dir) {
        return Err(SError::ModNotFound(name));
    }

    // a linked entry is removed as a whole; its target belongs to someone else
    if linker::is_link(&dir) {
        worker.process_file(&dir, FileOp::Delete, false);
        if !FileUtils::exists_no_follow(&dir) {
            worker.ctx.emit(TaskEvent::ModDeleted(name));
        }
        return Ok(());
    }

    let (mut bytes, mut files) = worker
        .request
        .mods
        .get(&name)
        .map(|d| (d.size, d.file_count))
        .unwrap_or_default();
    let mut throttle = worker.throttle();
    info!(%dir, "deleting");

    let walker = WalkDir::new(&dir)
        .min_depth(1)
        .contents_first(true)
        .follow_links(false);

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
        let path = match FileUtils::to_utf8_buf(entry.path()) {
            Ok(path) => path,
            Err(e) => {
                worker.fail_entry(e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if let Err(e) = fs::remove_dir(&path) {
                warn!(%path, error = %e, "folder not removed");
            }
            continue;
        }

        let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if worker.process_file(&path, FileOp::Delete, false) == Outcome::Succeeded {
            bytes = bytes.saturating_sub(len);
            files = files.saturating_sub(1);
        }

        if throttle.tick() {
            worker.scan_update(&name, bytes, files);
        }
    }

    if !worker.action.aborted() {
        if let Err(e) = fs::remove_dir(&dir) {
            warn!(%dir, error = %e, "mod folder not removed");
        }
    }

    if FileUtils::exists_no_follow(&dir) {
        worker.scan_update(&name, bytes, files);
    } else {
        worker.ctx.emit(TaskEvent::ModDeleted(name));
    }
    Ok(())
}

/// Links `destination` to `source`, which defaults to the game folder.
pub fn make_shortcut(worker: &mut TaskWorker) -> Result<(), SError> {
    let destination: Utf8PathBuf = worker
        .request
        .destination
        .clone()
        .ok_or(SError::MissingTaskInput("destination"))?;
    let source = worker
        .request
        .source
        .clone()
        .unwrap_or_else(|| worker.roots.game_root.clone());

    if worker.process_file(&source, FileOp::Link(&destination), false) == Outcome::Succeeded {
        worker.ctx.emit(TaskEvent::ShortcutReady(destination));
    }
    Ok(())
}
