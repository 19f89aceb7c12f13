use crate::models::error::SError;
use crate::models::paths::{backup_path_for, StatePaths};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupEntry {
    pub original: Utf8PathBuf,
    pub backup: Utf8PathBuf,
    /// Position in the backup log, counted from the first line.
    pub sequence: usize,
}

impl BackupEntry {
    pub fn new(original: Utf8PathBuf, sequence: usize) -> Self {
        Self {
            backup: backup_path_for(&original),
            original,
            sequence,
        }
    }
}

/// Contents of both logs, in the order the entries were written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub created: Vec<Utf8PathBuf>,
    pub backups: Vec<BackupEntry>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.backups.is_empty()
    }
}

/// Append-only logs of paths a mount created and files it moved aside.
///
/// Each line is written and flushed before the filesystem step it describes,
/// so after a crash the logs can only be ahead of the disk, never behind it.
pub struct BackupLedger {
    created: File,
    backups: File,
    next_sequence: usize,
}

impl BackupLedger {
    pub fn open(paths: &StatePaths) -> Result<Self, SError> {
        let open = |path: &Utf8Path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SError::Ledger(format!("{path}: {e}")))
        };

        let next_sequence = read_lines(&paths.backup_files)?.len();
        Ok(Self {
            created: open(&paths.out_files)?,
            backups: open(&paths.backup_files)?,
            next_sequence,
        })
    }

    pub fn record_created(&mut self, path: &Utf8Path) -> std::io::Result<()> {
        append_line(&mut self.created, path)
    }

    pub fn record_backup(&mut self, original: &Utf8Path) -> std::io::Result<BackupEntry> {
        append_line(&mut self.backups, original)?;
        let entry = BackupEntry::new(original.to_owned(), self.next_sequence);
        self.next_sequence += 1;
        Ok(entry)
    }

    pub fn sync(&self) -> std::io::Result<()> {
        self.created.sync_data()?;
        self.backups.sync_data()
    }

    /// Reads both logs. Missing log files read as empty.
    pub fn read(paths: &StatePaths) -> Result<LedgerSnapshot, SError> {
        let created = read_lines(&paths.out_files)?;
        let backups = read_lines(&paths.backup_files)?
            .into_iter()
            .enumerate()
            .map(|(sequence, original)| BackupEntry::new(original, sequence))
            .collect();
        Ok(LedgerSnapshot { created, backups })
    }

    /// Replaces both logs with `remaining`. Used once a rollback has finished
    /// with the entries it could not undo.
    pub fn rewrite(paths: &StatePaths, remaining: &LedgerSnapshot) -> Result<(), SError> {
        write_lines(&paths.out_files, remaining.created.iter().map(|p| p.as_path()))?;
        write_lines(
            &paths.backup_files,
            remaining.backups.iter().map(|e| e.original.as_path()),
        )?;
        debug!(
            created = remaining.created.len(),
            backups = remaining.backups.len(),
            "ledger rewritten"
        );
        Ok(())
    }
}

fn append_line(file: &mut File, path: &Utf8Path) -> std::io::Result<()> {
    file.write_all(format!("{path}\n").as_bytes())?;
    file.flush()
}

fn read_lines(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SError::Ledger(format!("{path}: {e}"))),
    };

    BufReader::new(file)
        .lines()
        .filter_map(|line| match line {
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(Ok(Utf8PathBuf::from(l.trim_end()))),
            Err(e) => Some(Err(SError::Ledger(format!("{path}: {e}")))),
        })
        .collect()
}

fn write_lines<'a>(
    path: &Utf8Path,
    lines: impl Iterator<Item = &'a Utf8Path>,
) -> Result<(), SError> {
    let mut file = File::create(path).map_err(|e| SError::Ledger(format!("{path}: {e}")))?;
    for line in lines {
        append_line(&mut file, line).map_err(|e| SError::Ledger(format!("{path}: {e}")))?;
    }
    file.sync_data()
        .map_err(|e| SError::Ledger(format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entries_hit_disk_immediately_and_in_order() {
        let tmp = tempdir().unwrap();
        let paths = StatePaths::new(Utf8Path::from_path(tmp.path()).unwrap());

        let mut ledger = BackupLedger::open(&paths).unwrap();
        ledger.record_created(Utf8Path::new("/game/a")).unwrap();
        let first = ledger.record_backup(Utf8Path::new("/game/x.dll")).unwrap();
        ledger.record_created(Utf8Path::new("/game/a/b")).unwrap();
        let second = ledger.record_backup(Utf8Path::new("/game/y.dll")).unwrap();

        // Read while the ledger is still open: nothing is buffered.
        let snapshot = BackupLedger::read(&paths).unwrap();
        assert_eq!(
            snapshot.created,
            vec![Utf8PathBuf::from("/game/a"), Utf8PathBuf::from("/game/a/b")]
        );
        assert_eq!(snapshot.backups, vec![first.clone(), second.clone()]);
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(first.backup, Utf8PathBuf::from("/game/x.dll.mmbak"));
    }

    #[test]
    fn test_reopen_appends_and_continues_sequence() {
        let tmp = tempdir().unwrap();
        let paths = StatePaths::new(Utf8Path::from_path(tmp.path()).unwrap());

        {
            let mut ledger = BackupLedger::open(&paths).unwrap();
            ledger.record_backup(Utf8Path::new("/game/one")).unwrap();
        }
        let mut ledger = BackupLedger::open(&paths).unwrap();
        let entry = ledger.record_backup(Utf8Path::new("/game/two")).unwrap();

        assert_eq!(entry.sequence, 1);
        assert_eq!(BackupLedger::read(&paths).unwrap().backups.len(), 2);
    }

    #[test]
    fn test_missing_logs_read_as_empty() {
        let tmp = tempdir().unwrap();
        let paths = StatePaths::new(Utf8Path::from_path(tmp.path()).unwrap());
        assert!(BackupLedger::read(&paths).unwrap().is_empty());
    }

    #[test]
    fn test_rewrite_keeps_only_remaining_entries() {
        let tmp = tempdir().unwrap();
        let paths = StatePaths::new(Utf8Path::from_path(tmp.path()).unwrap());

        let mut ledger = BackupLedger::open(&paths).unwrap();
        for p in ["/g/a", "/g/b", "/g/c"] {
            ledger.record_created(Utf8Path::new(p)).unwrap();
        }
        drop(ledger);

        let remaining = LedgerSnapshot {
            created: vec![Utf8PathBuf::from("/g/b")],
            backups: Vec::new(),
        };
        BackupLedger::rewrite(&paths, &remaining).unwrap();

        assert_eq!(BackupLedger::read(&paths).unwrap(), remaining);
    }
}
