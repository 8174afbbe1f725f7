//! File metadata + upload queue HTTP API.

pub mod app;
pub mod config;
pub mod context;
pub mod i18n;
pub mod middleware;

pub use app::{App, build_app};
pub use config::Config;
