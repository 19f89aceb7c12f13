use crate::core::linker;
use crate::core::worker::TaskWorker;
use crate::models::error::SError;
use crate::models::mod_dto::{ModData, ModDescriptor};
use crate::models::paths::STAGING_DIR;
use crate::models::task_status::TaskEvent;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanTotals {
    pub bytes: u64,
    pub files: u64,
}

/// Rebuilds the mod list from the store, then scans every entry in it.
pub fn rescan_all(worker: &mut TaskWorker) -> Result<(), SError> {
    let mut names = list_store(&worker.roots.mods_root)?;
    names.sort_by_key(|n| n.to_lowercase());
    let in_store = names.len();

    let previous = &worker.request.mods;
    let mut mods = ModData::new();
    for (index, name) in names.iter().enumerate() {
        let mut descriptor = ModDescriptor::new(name.clone(), index);
        if let Some(old) = previous.get(name) {
            descriptor.size = old.size;
            descriptor.file_count = old.file_count;
        }
        mods.insert(name.clone(), descriptor);
    }

    if let Some(mounted) = worker.request.mounted.clone() {
        if !mods.contains_key(&mounted) {
            let mut descriptor = ModDescriptor::external(mounted.clone(), names.len());
            if let Some(old) = previous.get(&mounted) {
                descriptor.size = old.size;
                descriptor.file_count = old.file_count;
            }
            mods.insert(mounted.clone(), descriptor);
            names.push(mounted);
        }
    }

    info!(mods = in_store, "store enumerated");
    worker.ctx.emit(TaskEvent::ModDataReady {
        mods,
        names: names.clone(),
    });

    for name in names.iter().take(in_store) {
        if !worker.check_state() {
            break;
        }
        let dir = worker.roots.mod_dir(name);
        scan_root(worker, name, &dir)?;
    }

    Ok(())
}

pub fn scan_one(worker: &mut TaskWorker) -> Result<(), SError> {
    let name = worker.action.target().to_string();
    let dir = worker.roots.mod_dir(&name);
    if !FileUtils::exists_no_follow(&dir) {
        return Err(SError::ModNotFound(name));
    }
    scan_root(worker, &name, &dir)?;
    Ok(())
}

/// Scans content outside the store, following the source once when it is itself a link.
pub fn scan_external(worker: &mut TaskWorker) -> Result<(), SError> {
    let name = worker.action.target().to_string();
    let source = worker
        .request
        .source
        .clone()
        .ok_or(SError::MissingTaskInput("source"))?;

    let root = if linker::is_link(&source) {
        linker::resolve_link(&source)?
    } else {
        source
    };
    if !root.exists() {
        return Err(SError::FileOrDirectoryNotFound(root.to_string()));
    }

    let totals = scan_tree(worker, &name, &root)?;
    finish(worker, &name, totals);
    Ok(())
}

/// Scans one store entry. An entry that is a link reports nothing: it is never
/// scanned through.
fn scan_root(worker: &mut TaskWorker, name: &str, dir: &Utf8Path) -> Result<(), SError> {
    let totals = if linker::is_link(dir) {
        debug!(%dir, "store entry is a link, not scanned");
        Some(ScanTotals::default())
    } else {
        scan_tree(worker, name, dir)?
    };
    finish(worker, name, totals);
    Ok(())
}

fn finish(worker: &TaskWorker, name: &str, totals: Option<ScanTotals>) {
    // an aborted scan leaves the last throttled update standing
    if let Some(totals) = totals {
        worker.scan_update(name, totals.bytes, totals.files);
        worker.ctx.emit(TaskEvent::ScanDone(name.to_string()));
    }
}

/// Sums sizes and counts of regular files under `root` without following links.
/// Returns `None` if the task was aborted part way.
pub fn scan_tree(
    worker: &mut TaskWorker,
    name: &str,
    root: &Utf8Path,
) -> Result<Option<ScanTotals>, SError> {
    worker.ctx.status(format!("Scanning {name}"));
    let mut totals = ScanTotals::default();
    let mut throttle = worker.throttle();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        if !worker.check_state() {
            return Ok(None);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%root, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(meta) => {
                totals.bytes += meta.len();
                totals.files += 1;
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "no metadata");
                continue;
            }
        }

        if throttle.tick() {
            worker.scan_update(name, totals.bytes, totals.files);
        }
    }

    debug!(%root, bytes = totals.bytes, files = totals.files, "scan finished");
    Ok(Some(totals))
}

/// Store entries that can hold a mod: folders and folder links, staging excluded.
fn list_store(mods_root: &Utf8Path) -> Result<Vec<String>, SError> {
    let mut names = Vec::new();
    for entry in mods_root.read_dir_utf8()? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%mods_root, error = %e, "skipping store entry");
                continue;
            }
        };
        let name = entry.file_name();
        if name == STAGING_DIR {
            continue;
        }

        let path: Utf8PathBuf = entry.path().to_owned();
        if FileUtils::is_real_dir(&path) || (linker::is_link(&path) && path.is_dir()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
