//! Turn raw package-manager stderr into an actionable suggestion.
//!
//! Matching is plain substring search over the tool's own output. Manager
//! specific checks run first, then checks that apply to any tool. An empty
//! string means no hint; callers should show nothing extra in that case.

use crate::error::InstallError;

/// Suggest a fix for a failed `operation` run with `manager`.
pub fn format_install_error(manager: &str, operation: &str, stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    let specific = match manager {
        "npm" => npm_hint(stderr, &lower),
        "pip" | "pip3" => pip_hint(&lower),
        "pipx" => pipx_hint(&lower),
        "uv" => uv_hint(&lower),
        "brew" | "brew-cask" => brew_hint(&lower),
        "go" => go_hint(&lower),
        "cargo" => cargo_hint(&lower),
        _ => None,
    };

    match specific.or_else(|| generic_hint(manager, &lower)) {
        Some(hint) => format!("{} {} failed: {}", manager, operation, hint),
        None => String::new(),
    }
}

/// [`format_install_error`] over the stderr carried by `err`, if any.
pub fn hint_for_error(manager: &str, operation: &str, err: &InstallError) -> String {
    err.stderr()
        .map(|stderr| format_install_error(manager, operation, stderr))
        .unwrap_or_default()
}

fn npm_hint(raw: &str, lower: &str) -> Option<String> {
    if raw.contains("EACCES") {
        return Some(
            "Permission denied writing to the global npm directory.\n  \
             Use a user-owned prefix instead of sudo:\n    \
             npm config set prefix ~/.npm-global\n    \
             export PATH=~/.npm-global/bin:$PATH"
                .to_string(),
        );
    }
    if raw.contains("ENOENT") {
        return Some(
            "a file or directory npm needs was not found.\n  \
             Check that Node.js and npm are installed correctly (node --version)."
                .to_string(),
        );
    }
    if raw.contains("ETIMEDOUT")
        || raw.contains("ECONNREFUSED")
        || raw.contains("ENOTFOUND")
        || lower.contains("network")
    {
        return Some(
            "could not reach the npm registry.\n  \
             Check your network connection and proxy settings (npm config get proxy)."
                .to_string(),
        );
    }
    if raw.contains("E404") || raw.contains("404") {
        return Some(
            "package not found in the npm registry.\n  \
             Check the package name, and that you are logged in for private scopes."
                .to_string(),
        );
    }
    None
}

fn pip_hint(lower: &str) -> Option<String> {
    if lower.contains("externally-managed-environment") || lower.contains("permission") {
        return Some(
            "the system Python environment cannot be modified.\n  \
             Install the tool in an isolated environment instead:\n    \
             pipx install <package>\n    \
             uv tool install <package>"
                .to_string(),
        );
    }
    if lower.contains("no matching distribution") {
        return Some(
            "no matching distribution found.\n  \
             Check the package name and that your Python version is supported (python3 --version)."
                .to_string(),
        );
    }
    None
}

fn pipx_hint(lower: &str) -> Option<String> {
    if is_not_found(lower) {
        return Some(
            "pipx is not installed.\n  \
             Install it with: python3 -m pip install --user pipx && python3 -m pipx ensurepath"
                .to_string(),
        );
    }
    if lower.contains("already installed") || lower.contains("already seems to be installed") {
        return Some(
            "the package is already installed.\n  \
             Upgrade it instead: pipx upgrade <package> (or pass --force to reinstall)"
                .to_string(),
        );
    }
    None
}

fn uv_hint(lower: &str) -> Option<String> {
    if is_not_found(lower) {
        return Some(
            "uv is not installed.\n  \
             Install it with: curl -LsSf https://astral.sh/uv/install.sh | sh"
                .to_string(),
        );
    }
    None
}

fn brew_hint(lower: &str) -> Option<String> {
    if lower.contains("no available formula") || lower.contains("no formulae or casks found") {
        return Some(
            "formula not found.\n  \
             It may live in a third-party tap: brew tap <user>/<repo>, then retry."
                .to_string(),
        );
    }
    if lower.contains("permission denied") || lower.contains("not writable") {
        return Some(
            "Homebrew directories are not writable.\n  \
             Fix ownership with: sudo chown -R $(whoami) $(brew --prefix)/*"
                .to_string(),
        );
    }
    if lower.contains("outdated") {
        return Some("Homebrew metadata is outdated.\n  Run: brew update".to_string());
    }
    if lower.contains("already installed") {
        return Some(
            "the package is already installed.\n  \
             Upgrade it instead: brew upgrade <package>"
                .to_string(),
        );
    }
    None
}

fn go_hint(lower: &str) -> Option<String> {
    if lower.contains("module") && (lower.contains("not found") || lower.contains("unknown revision")) {
        return Some(
            "Go module not found.\n  \
             Check the module path and version, and GOPROXY if you use a private module."
                .to_string(),
        );
    }
    if lower.contains("gopath") || lower.contains("gobin") {
        return Some(
            "Go install location is not set up.\n  \
             Set GOBIN (or GOPATH) and add it to PATH: export PATH=$(go env GOPATH)/bin:$PATH"
                .to_string(),
        );
    }
    None
}

fn cargo_hint(lower: &str) -> Option<String> {
    if lower.contains("could not find") && lower.contains("registry") {
        return Some(
            "crate not found on crates.io.\n  \
             Check the crate name: cargo search <name>"
                .to_string(),
        );
    }
    if lower.contains("permission denied") {
        return Some(
            "cannot write to the Cargo install directory.\n  \
             Use a user-owned toolchain from rustup: https://rustup.rs"
                .to_string(),
        );
    }
    None
}

fn generic_hint(manager: &str, lower: &str) -> Option<String> {
    if is_not_found(lower) {
        return Some(format!(
            "command not found.\n  Make sure {} is installed and on your PATH.",
            manager
        ));
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return Some(
            "the operation timed out.\n  \
             Check your network connection, or raise the timeout (--timeout / AGENT_MANAGER_TIMEOUT)."
                .to_string(),
        );
    }
    if lower.contains("ssl") || lower.contains("certificate") {
        return Some(
            "TLS certificate verification failed.\n  \
             Check the system clock and CA certificates, or proxy settings that intercept TLS."
                .to_string(),
        );
    }
    None
}

fn is_not_found(lower: &str) -> bool {
    lower.contains("command not found")
        || lower.contains("not recognized as an internal or external command")
        || lower.contains("no such file or directory")
}
