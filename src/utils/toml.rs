use crate::models::error::SError;
use camino::Utf8Path;

pub struct Toml;

impl Toml {
    pub fn write<T: serde::Serialize>(path: &Utf8Path, data: &T) -> Result<(), SError> {
        let text = toml::to_string(data)?;
        std::fs::write(path, text).map_err(|e| SError::IOError(e.to_string()))
    }

    pub fn read<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, SError> {
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<T>(&s)?)
    }
}
