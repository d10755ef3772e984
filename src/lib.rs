pub mod commands;
pub mod config;
pub mod history;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod probe;
pub mod process;
pub mod util;
