//! Agent data model shared by providers and callers.
//!
//! Definitions come from a catalog and are read-only for the engine:
//!
//! ```toml
//! [[agents]]
//! id = "claude-code"
//! name = "Claude Code"
//!
//! [agents.detection]
//! executables = ["claude"]
//! version_cmd = "claude --version"
//!
//! [agents.install_methods.npm]
//! method = "npm"
//! package = "@anthropic-ai/claude-code"
//! command = "npm install -g @anthropic-ai/claude-code"
//! platforms = ["darwin", "linux", "windows"]
//! ```

pub mod catalog;
pub mod definition;
pub mod installation;
pub mod method;

pub use catalog::AgentCatalog;
pub use definition::{AgentDef, Detection, InstallMethodDef};
pub use installation::{InstallResult, Installation};
pub use method::{InstallMethod, MethodFamily};
