//! Glider Watchdog Library
//!
//! Core modules for the glider deployment watchdog.

pub mod admin;
pub mod app;
pub mod errors;
pub mod filesys;
pub mod flags;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
pub mod watch;
pub mod workers;
