#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod blog;
pub mod config;
pub mod cookies;
pub mod data;
pub mod forms;
pub mod toast;
pub mod ui;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
