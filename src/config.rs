use crate::models::error::SError;
use crate::models::paths::EngineRoots;
use crate::models::task_request::{ConfirmPolicy, TaskSettings};
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const APP_NAME: &str = "mod_mount";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub version: u8,
    pub mods_root: Utf8PathBuf,
    pub game_root: Option<Utf8PathBuf>,
    /// Where the ledger and the mod cache live. Next to the executable when unset.
    pub state_dir: Option<Utf8PathBuf>,
    pub progress_interval_ms: u64,
    pub progress_batch: u64,
    pub confirm_overwrite: ConfirmPolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        let base_dir = exe_dir()
            .or_else(|| {
                ProjectDirs::from("com", "martes", APP_NAME)
                    .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok())
            })
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let task = TaskSettings::default();
        Self {
            version: 0,
            mods_root: base_dir.join("mods"),
            game_root: None,
            state_dir: None,
            progress_interval_ms: task.progress_interval.as_millis() as u64,
            progress_batch: task.progress_batch,
            confirm_overwrite: task.confirm,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<AppSettings, SError> {
        Ok(confy::load(APP_NAME, None)?)
    }

    pub fn save(&self) -> Result<(), SError> {
        Ok(confy::store(APP_NAME, None, self)?)
    }

    /// Resolves the two roots and the state folder. Fails until a game folder is configured.
    pub fn roots(&self) -> Result<EngineRoots, SError> {
        let game_root = self
            .game_root
            .as_ref()
            .ok_or_else(|| SError::Config("game folder is not set".into()))?;
        let state_dir = self
            .state_dir
            .clone()
            .or_else(exe_dir)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        EngineRoots::new(&self.mods_root, game_root, &state_dir)
    }

    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            progress_batch: self.progress_batch,
            confirm: self.confirm_overwrite,
        }
    }
}

fn exe_dir() -> Option<Utf8PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roots_need_a_game_folder() {
        let settings = AppSettings::default();
        assert!(matches!(settings.roots(), Err(SError::Config(_))));
    }

    #[test]
    fn test_roots_create_store_and_state() {
        let tmp = tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let settings = AppSettings {
            mods_root: base.join("mods"),
            game_root: Some(base.join("game")),
            state_dir: Some(base.join("state")),
            ..Default::default()
        };

        let roots = settings.roots().unwrap();
        assert!(roots.mods_root.is_dir());
        assert!(roots.state.out_files.parent().unwrap().is_dir());
        assert_eq!(roots.game_root, base.join("game"));
    }

    #[test]
    fn test_task_settings_follow_config() {
        let settings = AppSettings {
            progress_interval_ms: 50,
            progress_batch: 7,
            confirm_overwrite: ConfirmPolicy::Skip,
            ..Default::default()
        };
        let task = settings.task_settings();
        assert_eq!(task.progress_interval, Duration::from_millis(50));
        assert_eq!(task.progress_batch, 7);
        assert_eq!(task.confirm, ConfirmPolicy::Skip);
    }
}
