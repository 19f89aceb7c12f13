use crate::models::mod_dto::ModData;
use crate::models::task_action::TaskKind;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transfer {
    #[default]
    Copy,
    Move,
}

/// What to do when a mount would overwrite a file already in the game folder.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfirmPolicy {
    #[default]
    Ask,
    Overwrite,
    Skip,
}

#[derive(Clone, Debug)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub target: String,
    pub source: Option<Utf8PathBuf>,
    pub destination: Option<Utf8PathBuf>,
    pub transfer: Transfer,
    /// Caller's descriptors at dispatch time.
    pub mods: ModData,
    pub mounted: Option<String>,
}

impl TaskRequest {
    pub fn new(kind: TaskKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            source: None,
            destination: None,
            transfer: Transfer::default(),
            mods: ModData::new(),
            mounted: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<Utf8PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<Utf8PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_mods(mut self, mods: ModData) -> Self {
        self.mods = mods;
        self
    }

    pub fn with_mounted(mut self, mounted: Option<String>) -> Self {
        self.mounted = mounted;
        self
    }
}

#[derive(Clone, Debug)]
pub struct TaskSettings {
    /// Minimum time between two scan updates for the same task.
    pub progress_interval: Duration,
    /// Files handled before a scan update is sent regardless of time.
    pub progress_batch: u64,
    pub confirm: ConfirmPolicy,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(200),
            progress_batch: 500,
            confirm: ConfirmPolicy::Ask,
        }
    }
}
