pub mod error;
pub mod mod_dto;
pub mod paths;
pub mod task_action;
pub mod task_request;
pub mod task_status;
