use crate::models::error::SError;
use camino::Utf8Path;
use std::fs::{self, File};
use std::io;
use tracing::{debug, warn};

pub fn is_archive(path: &Utf8Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Unpacks `archive` below `destination` and returns how many files were written.
pub fn extract(archive: &Utf8Path, destination: &Utf8Path) -> Result<u64, SError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    fs::create_dir_all(destination)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;

        // entries that would land outside the destination are dropped
        let Some(relative) = entry.enclosed_name() else {
            warn!(%archive, name = entry.name(), "unsafe archive entry skipped");
            continue;
        };
        let out = destination.as_std_path().join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            io::copy(&mut entry, &mut File::create(&out)?)?;
            written += 1;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&out, fs::Permissions::from_mode(mode));
            }
        }
    }

    debug!(%archive, %destination, files = written, "archive extracted");
    Ok(written)
}
