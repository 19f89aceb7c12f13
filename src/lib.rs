pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod utils;

pub use crate::core::mod_manager::{MountManager, MountReadiness};
pub use crate::core::worker::{TaskHandle, TaskWorker};
pub use crate::models::error::SError;
