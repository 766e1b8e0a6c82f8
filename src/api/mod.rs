pub mod enums;
pub mod forms;
pub mod models;
