use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use dunce::canonicalize;

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

define_paths!(StatePaths {
    out_files: "out_files.txt",
    backup_files: "backup_files.txt",
    cache: "mod_cache.toml",
});

/// Suffix of a file moved aside before a mount overwrote it.
pub const BACKUP_EXT: &str = ".mmbak";

/// Directory inside the mods store used to unpack archives before they are added.
pub const STAGING_DIR: &str = ".staging";

pub fn backup_path_for(original: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{original}{BACKUP_EXT}"))
}

/// The two fixed roots the engine works between, plus where its logs live.
#[derive(Clone, Debug)]
pub struct EngineRoots {
    pub mods_root: Utf8PathBuf,
    pub game_root: Utf8PathBuf,
    pub state: StatePaths,
}

impl EngineRoots {
    /// Creates the mods store and state folder when missing and resolves the store,
    /// so links written into the game folder carry absolute targets. The game root is
    /// kept as given: resolving it would hide a linked game folder from the mount check.
    pub fn new(
        mods_root: &Utf8Path,
        game_root: &Utf8Path,
        state_dir: &Utf8Path,
    ) -> Result<Self, SError> {
        std::fs::create_dir_all(mods_root)?;
        std::fs::create_dir_all(state_dir)?;

        Ok(Self {
            mods_root: Utf8PathBuf::try_from(canonicalize(mods_root)?)?,
            game_root: game_root.to_owned(),
            state: StatePaths::new(&Utf8PathBuf::try_from(canonicalize(state_dir)?)?),
        })
    }

    pub fn mod_dir(&self, name: &str) -> Utf8PathBuf {
        self.mods_root.join(name)
    }
}
