pub mod commands;
pub mod core;
pub mod errors;
pub mod git;
pub mod github;
