use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Invalid version format: {0:?}")]
    InvalidVersionFormat(String),

    #[error("Unsupported install method: {0}")]
    UnsupportedMethod(String),

    #[error("Provider {provider} is not available: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("No command specified for {0}")]
    NoCommandSpecified(String),

    #[error("Command `{command}` failed (exit code {}): {stderr}", display_code(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Command `{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Command `{0}` was cancelled")]
    Cancelled(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Unknown agent: {0}")]
    AgentNotFound(String),

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("No usable install method for {0}")]
    NoAvailableMethod(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Captured stderr of a failed external command, verbatim.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            InstallError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub(crate) fn unavailable(provider: &str, reason: impl Into<String>) -> Self {
        InstallError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, InstallError>;
