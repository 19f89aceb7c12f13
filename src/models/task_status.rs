use crate::models::mod_dto::ModData;
use crate::models::task_action::TaskAction;
use camino::Utf8PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct ScanUpdate {
    pub name: String,
    pub size_text: String,
    pub count_text: String,
    pub bytes: u64,
    pub files: u64,
}

/// Everything a worker tells its caller. `Completed` is always the last event of a task.
#[derive(Clone, Debug)]
pub enum TaskEvent {
    Progress { message: String, error: bool },
    Status(String),
    ScanUpdate(ScanUpdate),
    ScanDone(String),
    ModDataReady { mods: ModData, names: Vec<String> },
    ModAdded { name: String, row: usize },
    ModDeleted(String),
    /// The worker is parked on its confirmation gate until the caller answers.
    ConfirmOverwrite { target: String, path: Utf8PathBuf },
    ShortcutReady(Utf8PathBuf),
    Completed(TaskAction),
}
