pub mod cache;
pub mod cleanup;
pub mod decompression;
pub mod deployment;
pub mod gate;
pub mod ledger;
pub mod linker;
pub mod mod_fs;
pub mod mod_manager;
pub mod scanner;
pub mod worker;
