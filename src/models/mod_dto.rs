use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name shown for mounted content that cannot be traced back to a store entry.
pub const UNKNOWN_MOD: &str = "<unknown>";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModDescriptor {
    pub name: String,
    /// Display order in the mod list.
    pub index: usize,
    pub size: u64,
    pub file_count: u64,
    // busy is caller-side state only; it never survives a restart
    #[serde(skip)]
    pub busy: bool,
    /// Content sits in the game folder with no backing store entry.
    pub external: bool,
}

impl ModDescriptor {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            ..Default::default()
        }
    }

    pub fn external(name: impl Into<String>, index: usize) -> Self {
        Self {
            external: true,
            ..Self::new(name, index)
        }
    }
}

pub type ModData = BTreeMap<String, ModDescriptor>;
