#![forbid(unsafe_code)]

pub mod agents;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod hints;
pub mod manager;
pub mod platform;
pub mod providers;
pub mod utils;
pub mod version;

pub use error::{InstallError, Result};
pub use manager::Manager;
pub use version::{Version, VersionConstraint, VersionRange};
