use crate::models::error::SError;
use crate::models::mod_dto::ModData;
use crate::utils::toml::Toml;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Descriptors and the last mounted name, kept so sizes show before the first rescan.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct ModCache {
    pub mounted: Option<String>,
    pub mods: ModData,
}

impl ModCache {
    /// A missing or unreadable cache is an empty one.
    pub fn load(path: &Utf8Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Toml::read(path).unwrap_or_else(|e| {
            tracing::warn!(%path, error = %e, "mod cache unreadable, starting empty");
            Self::default()
        })
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), SError> {
        Toml::write(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mod_dto::ModDescriptor;
    use tempfile::tempdir;

    #[test]
    fn test_cache_survives_a_restart_without_busy_flags() {
        let tmp = tempdir().unwrap();
        let path = Utf8Path::from_path(tmp.path()).unwrap().join("mod_cache.toml");

        let mut descriptor = ModDescriptor::new("alpha", 0);
        descriptor.size = 2048;
        descriptor.file_count = 3;
        descriptor.busy = true;

        let mut cache = ModCache {
            mounted: Some("alpha".into()),
            mods: ModData::new(),
        };
        cache.mods.insert("alpha".into(), descriptor);
        cache.save(&path).unwrap();

        let loaded = ModCache::load(&path);
        assert_eq!(loaded.mounted.as_deref(), Some("alpha"));
        let alpha = &loaded.mods["alpha"];
        assert_eq!(alpha.size, 2048);
        assert_eq!(alpha.file_count, 3);
        assert!(!alpha.busy);
    }

    #[test]
    fn test_garbage_cache_loads_empty() {
        let tmp = tempdir().unwrap();
        let path = Utf8Path::from_path(tmp.path()).unwrap().join("mod_cache.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert_eq!(ModCache::load(&path), ModCache::default());
    }
}
