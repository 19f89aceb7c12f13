use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::Path;

pub struct FileUtils;

impl FileUtils {
    /// True when something (file, directory or dangling link) sits at `path`.
    pub fn exists_no_follow(path: &Utf8Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    pub fn is_real_dir(path: &Utf8Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    pub fn is_dir_empty(path: &Utf8Path) -> bool {
        fs::read_dir(path)
            .map(|mut i| i.next().is_none())
            .unwrap_or(false)
    }

    pub fn to_utf8(path: &Path) -> Result<&Utf8Path, SError> {
        Utf8Path::from_path(path)
            .ok_or_else(|| SError::ParseError(format!("Invalid UTF-8 path: {:?}", path)))
    }

    pub fn to_utf8_buf(path: &Path) -> Result<Utf8PathBuf, SError> {
        Self::to_utf8(path).map(Utf8Path::to_path_buf)
    }

    /// Moves a file, falling back to copy + remove when a rename cannot cross volumes.
    /// Never replaces anything already at `dst`.
    pub fn move_file(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
        if Self::exists_no_follow(dst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{dst} already exists"),
            ));
        }
        if fs::rename(src, dst).is_ok() {
            return Ok(());
        }
        fs::copy(src, dst)?;
        fs::remove_file(src)
    }
}

/// Human-readable byte size, e.g. `"12.34 MB"`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// File count with thousands separators, e.g. `"12,345"`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_move_file_replaces_source() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();
        let src = root.join("a.txt");
        let dst = root.join("b.txt");
        fs::write(&src, "payload").unwrap();

        FileUtils::move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst).unwrap(), "payload");
    }

    #[test]
    fn test_move_file_keeps_an_occupied_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();
        let src = root.join("a.txt");
        let dst = root.join("b.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = FileUtils::move_file(&src, &dst).unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&src).unwrap(), "new");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    }
}
