use camino::{Utf8Path, Utf8PathBuf};
use file_id::FileId;
use std::fs;
use std::io;

/// How `link_or_copy` ended up placing the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Linked,
    Copied,
}

/// Creates `target` as a link to `source`.
///
/// Symlink on Unix. On Windows files become hard links and directories junctions,
/// neither of which needs elevated rights. Linking onto a link that already points
/// at `source` is a no-op; anything else at `target` is `AlreadyExists`.
pub fn link(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::symlink_metadata(target).is_ok() {
        if points_to(target, source) {
            return Ok(());
        }
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{target} exists and is not a link to {source}"),
        ));
    }

    #[cfg(windows)]
    {
        if source.is_dir() {
            junction::create(source, target)
        } else {
            fs::hard_link(source, target)
        }
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, target)
    }
}

/// Links, falling back to a plain copy for files when the volume refuses links.
pub fn link_or_copy(source: &Utf8Path, target: &Utf8Path) -> io::Result<LinkKind> {
    match link(source, target) {
        Ok(()) => Ok(LinkKind::Linked),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) if source.is_file() => {
            tracing::debug!(%source, %target, error = %e, "link refused, copying");
            fs::copy(source, target)?;
            Ok(LinkKind::Copied)
        }
        Err(e) => Err(e),
    }
}

/// Removes a link without touching what it points to. Missing targets are skipped.
pub fn unlink(target: &Utf8Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(target) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    #[cfg(windows)]
    {
        if meta.is_dir() {
            fs::remove_dir(target)
        } else {
            fs::remove_file(target)
        }
    }
    #[cfg(unix)]
    {
        if meta.is_symlink() {
            fs::remove_file(target)
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{target} is not a symlink"),
            ))
        }
    }
}

pub fn read_link_target(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    #[cfg(windows)]
    {
        if junction::exists(path).unwrap_or(false) {
            return utf8(junction::get_target(path)?);
        }
    }
    utf8(fs::read_link(path)?)
}

/// Link target resolved against the link's own folder when it is relative.
pub fn resolve_link(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let target = read_link_target(path)?;
    if target.is_absolute() {
        return Ok(target);
    }
    Ok(path
        .parent()
        .map(|p| p.join(&target))
        .unwrap_or(target))
}

/// Symlink or junction. Hard links are regular files and are not reported.
pub fn is_link(path: &Utf8Path) -> bool {
    let is_symlink = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    #[cfg(windows)]
    {
        is_symlink || junction::exists(path).unwrap_or(false)
    }
    #[cfg(not(windows))]
    {
        is_symlink
    }
}

pub fn get_id(path: &Utf8Path) -> io::Result<FileId> {
    file_id::get_file_id(path)
}

pub fn is_same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (get_id(a), get_id(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn points_to(link: &Utf8Path, source: &Utf8Path) -> bool {
    if let Ok(target) = read_link_target(link) {
        return target == source;
    }
    // hard links carry no target, only identity
    !is_link(link) && is_same_file(link, source)
}

fn utf8(path: std::path::PathBuf) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("link target is not UTF-8: {}", p.display()),
        )
    })
}
