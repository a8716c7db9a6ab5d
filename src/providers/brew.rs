//! Homebrew formulae and casks.

use super::{detect_version, find_tool, new_result, Provider};
use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation};
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::utils::process::{self, ExecContext};
use crate::version::Version;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A formula or cask reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewPackage {
    /// Bare name, e.g. `goose` for `block/tap/goose`
    pub name: String,
    /// Name as written, possibly tap-qualified
    pub qualified: String,
    pub cask: bool,
}

impl BrewPackage {
    fn cask_flag(&self) -> Option<&'static str> {
        self.cask.then_some("--cask")
    }
}

pub struct BrewProvider {
    platform: Arc<dyn Platform>,
}

impl BrewProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    fn brew(&self) -> Result<PathBuf> {
        if self.platform.id() == "windows" {
            return Err(InstallError::unavailable(
                self.name(),
                "Homebrew is not supported on Windows",
            ));
        }
        find_tool(self.platform.as_ref(), &["brew"])
            .ok_or_else(|| InstallError::unavailable(self.name(), "brew not found in PATH"))
    }

    fn run(&self, ctx: &ExecContext, args: &[&str]) -> Result<process::CommandOutput> {
        process::run_program(ctx, &self.brew()?, args)?.checked()
    }

    /// Resolve the package from the method definition.
    ///
    /// The `brew-cask` method, `--cask` or the legacy `brew cask install`
    /// form all mark the package as a cask.
    pub fn package(method: &InstallMethodDef) -> Result<BrewPackage> {
        let from_command = parse_package(&method.command);
        let cask = method.method == InstallMethod::BrewCask.as_str()
            || from_command.as_ref().is_some_and(|p| p.cask);

        let qualified = if method.package.trim().is_empty() {
            from_command.map(|p| p.qualified).ok_or_else(|| {
                InstallError::NoCommandSpecified(format!(
                    "{} method has no package and none could be read from {:?}",
                    method.method, method.command
                ))
            })?
        } else {
            method.package.trim().to_string()
        };

        Ok(BrewPackage {
            name: last_segment(&qualified).to_string(),
            qualified,
            cask,
        })
    }

    fn with_cask<'a>(package: &'a BrewPackage, mut args: Vec<&'a str>) -> Vec<&'a str> {
        if let Some(flag) = package.cask_flag() {
            args.insert(1, flag);
        }
        args
    }

    fn installed_version(&self, ctx: &ExecContext, package: &BrewPackage) -> Result<Version> {
        let args = Self::with_cask(package, vec!["list", "--versions", package.name.as_str()]);
        let out = self.run(ctx, &args)?;
        parse_list_versions(&out.stdout, &package.name)
            .ok_or_else(|| InstallError::PackageNotFound(package.name.clone()))
    }

    fn installed_or_detected(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        package: &BrewPackage,
    ) -> Result<Version> {
        match self.installed_version(ctx, package) {
            Ok(v) => Ok(v),
            Err(e @ (InstallError::Cancelled(_) | InstallError::Timeout { .. })) => Err(e),
            Err(e) => {
                debug!(package = %package.name, error = %e, "brew list failed, falling back to detection");
                detect_version(ctx, self.platform.as_ref(), agent)
            }
        }
    }
}

impl Provider for BrewProvider {
    fn name(&self) -> &'static str {
        "brew"
    }

    fn method(&self) -> InstallMethod {
        InstallMethod::Brew
    }

    /// Homebrew is never available on Windows, even if a `brew` binary exists.
    fn is_available(&self) -> bool {
        self.platform.id() != "windows" && self.platform.is_executable_in_path("brew")
    }

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult> {
        let package = Self::package(method)?;
        let started = Instant::now();
        info!(agent = %agent.id, package = %package.qualified, cask = package.cask, "brew install");

        let mut args = Self::with_cask(&package, vec!["install", package.qualified.as_str()]);
        if force {
            args.push("--force");
        }
        let out = self.run(ctx, &args)?;

        let version = self.installed_or_detected(ctx, agent, &package)?;
        Ok(new_result(
            self.platform.as_ref(),
            agent,
            method,
            version,
            out.stdout,
            started.elapsed(),
        ))
    }

    fn update(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        agent: &AgentDef,
        method: &InstallMethodDef,
    ) -> Result<InstallResult> {
        let package = Self::package(method)?;
        let started = Instant::now();
        info!(agent = %agent.id, package = %package.qualified, "brew upgrade");

        let args = Self::with_cask(&package, vec!["upgrade", package.qualified.as_str()]);
        let out = self.run(ctx, &args)?;

        let version = self.installed_or_detected(ctx, agent, &package)?;
        let old = installation.installed_version.clone();
        let mut result = new_result(
            self.platform.as_ref(),
            agent,
            method,
            version,
            out.stdout,
            started.elapsed(),
        );
        result.was_updated = result.version.is_newer_than(&old);
        result.from_version = Some(old);
        Ok(result)
    }

    fn uninstall(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        method: &InstallMethodDef,
    ) -> Result<()> {
        let package = Self::package(method)?;
        info!(agent = %installation.agent_id, package = %package.qualified, "brew uninstall");
        let args = Self::with_cask(&package, vec!["uninstall", package.qualified.as_str()]);
        self.run(ctx, &args)?;
        Ok(())
    }

    /// Stable version from `brew info --json=v2`.
    fn latest_version(&self, ctx: &ExecContext, method: &InstallMethodDef) -> Result<Version> {
        let package = Self::package(method)?;
        let args = Self::with_cask(&package, vec!["info", "--json=v2", package.qualified.as_str()]);
        let out = self.run(ctx, &args)?;
        parse_info_json(&out.stdout, package.cask)
            .ok_or_else(|| InstallError::PackageNotFound(package.qualified.clone()))
    }
}

/// Formula or cask named after `install` in a brew command line.
pub fn parse_package(command: &str) -> Option<BrewPackage> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let install_at = tokens.iter().position(|t| *t == "install")?;

    let mut cask = tokens[..install_at].contains(&"cask");
    let mut qualified = None;
    for token in &tokens[install_at + 1..] {
        match *token {
            "--cask" | "--casks" => cask = true,
            "&&" | "||" | "|" | ";" => break,
            t if t.starts_with('-') => {}
            t if qualified.is_none() => qualified = Some(t.to_string()),
            _ => {}
        }
    }

    let qualified = qualified?;
    Some(BrewPackage {
        name: last_segment(&qualified).to_string(),
        qualified,
        cask,
    })
}

fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `brew list --versions` prints `name v1 v2 ...`; the last is the newest.
fn parse_list_versions(output: &str, name: &str) -> Option<Version> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != name {
            return None;
        }
        Version::parse(parts.last()?).ok()
    })
}

fn parse_info_json(json: &str, cask: bool) -> Option<Version> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let version = if cask {
        value.get("casks")?.get(0)?.get("version")?.as_str()?
    } else {
        value
            .get("formulae")?
            .get(0)?
            .get("versions")?
            .get("stable")?
            .as_str()?
    };
    // Casks append a build after a comma, e.g. 1.2.3,abc123
    let version = version.split(',').next().unwrap_or(version);
    Version::parse(version).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::FakePlatform;

    fn method(name: &str, package: &str, command: &str) -> InstallMethodDef {
        InstallMethodDef {
            method: name.to_string(),
            package: package.to_string(),
            command: command.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_formula() {
        let pkg = parse_package("brew install gemini-cli").unwrap();
        assert_eq!(pkg.name, "gemini-cli");
        assert!(!pkg.cask);
    }

    #[test]
    fn test_parse_cask_flag_and_subcommand() {
        let pkg = parse_package("brew install --cask claude-code").unwrap();
        assert_eq!(pkg.name, "claude-code");
        assert!(pkg.cask);

        let legacy = parse_package("brew cask install warp").unwrap();
        assert_eq!(legacy.name, "warp");
        assert!(legacy.cask);
    }

    #[test]
    fn test_parse_tap_qualified() {
        let pkg = parse_package("brew install sst/tap/opencode").unwrap();
        assert_eq!(pkg.name, "opencode");
        assert_eq!(pkg.qualified, "sst/tap/opencode");
    }

    #[test]
    fn test_parse_none() {
        assert!(parse_package("brew update").is_none());
        assert!(parse_package("brew install --cask").is_none());
    }

    #[test]
    fn test_package_from_method() {
        let cask = BrewProvider::package(&method("brew-cask", "claude-code", "")).unwrap();
        assert!(cask.cask);
        assert_eq!(cask.name, "claude-code");

        let from_cmd = BrewProvider::package(&method("brew", "", "brew install block/tap/goose")).unwrap();
        assert_eq!(from_cmd.name, "goose");
        assert!(!from_cmd.cask);

        assert!(matches!(
            BrewProvider::package(&method("brew", "", "")),
            Err(InstallError::NoCommandSpecified(_))
        ));
    }

    #[test]
    fn test_cask_flag_position() {
        let pkg = BrewProvider::package(&method("brew-cask", "warp", "")).unwrap();
        let args = BrewProvider::with_cask(&pkg, vec!["upgrade", "warp"]);
        assert_eq!(args, ["upgrade", "--cask", "warp"]);
    }

    #[test]
    fn test_parse_list_versions() {
        assert_eq!(
            parse_list_versions("codex 0.45.0 0.46.0\n", "codex"),
            Some(Version::must_parse("0.46.0"))
        );
        assert_eq!(parse_list_versions("other 1.0.0\n", "codex"), None);
    }

    #[test]
    fn test_parse_info_json() {
        let formula = r#"{"formulae":[{"name":"codex","versions":{"stable":"0.46.0","head":null}}],"casks":[]}"#;
        assert_eq!(parse_info_json(formula, false), Some(Version::must_parse("0.46.0")));

        let cask = r#"{"formulae":[],"casks":[{"token":"claude-code","version":"1.0.35,abc"}]}"#;
        assert_eq!(parse_info_json(cask, true), Some(Version::must_parse("1.0.35")));
        assert_eq!(parse_info_json(cask, false), None);
    }

    #[test]
    fn test_unavailable_on_windows_even_with_binary() {
        let windows = BrewProvider::new(Arc::new(FakePlatform::new("windows", &["brew"])));
        assert!(!windows.is_available());
        assert!(matches!(windows.brew(), Err(InstallError::ProviderUnavailable { .. })));

        let mac = BrewProvider::new(Arc::new(FakePlatform::new("darwin", &["brew"])));
        assert!(mac.is_available());
        let bare = BrewProvider::new(Arc::new(FakePlatform::new("darwin", &[])));
        assert!(!bare.is_available());
    }

    #[cfg(unix)]
    mod with_stub_brew {
        use super::*;
        use crate::providers::testing::stub_script;
        use std::path::Path;

        /// brew stub that logs its arguments; `list` prints `listing` and
        /// exits with `list_exit`.
        fn provider(dir: &Path, listing: &str, list_exit: i32) -> BrewProvider {
            let body = format!(
                "echo \"$@\" >> {}\n[ \"$1\" = list ] && {{ echo '{}'; exit {}; }}\nexit 0",
                dir.join("calls.log").display(),
                listing,
                list_exit
            );
            let brew = stub_script(dir, "brew", &body);
            BrewProvider::new(Arc::new(
                FakePlatform::new("darwin", &[]).with_executable("brew", brew),
            ))
        }

        fn calls(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("calls.log"))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn agent(version_cmd: &str) -> AgentDef {
            let mut agent = AgentDef {
                id: "goose".to_string(),
                name: "Goose".to_string(),
                description: String::new(),
                install_methods: Default::default(),
                detection: Default::default(),
            };
            agent.detection.version_cmd = version_cmd.to_string();
            agent
        }

        #[test]
        fn test_cask_install_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let result = provider(dir.path(), "goose 1.9.0 1.10.0", 0)
                .install(
                    &ExecContext::background(),
                    &agent(""),
                    &method("brew-cask", "block/tap/goose", ""),
                    true,
                )
                .unwrap();

            assert_eq!(result.version, Version::must_parse("1.10.0"));
            assert_eq!(
                calls(dir.path()),
                [
                    "install --cask block/tap/goose --force",
                    "list --cask --versions goose"
                ]
            );
        }

        #[test]
        fn test_failed_list_falls_back_to_detection() {
            let dir = tempfile::tempdir().unwrap();
            let installation =
                Installation::new("goose", "Goose", "brew", Version::must_parse("1.9.0"));
            let result = provider(dir.path(), "Error: No such keg", 1)
                .update(
                    &ExecContext::background(),
                    &installation,
                    &agent("echo goose version 1.11.2"),
                    &method("brew", "", "brew install block/tap/goose"),
                )
                .unwrap();

            assert_eq!(result.version, Version::must_parse("1.11.2"));
            assert!(result.was_updated);
            assert_eq!(calls(dir.path())[0], "upgrade block/tap/goose");
        }

        #[test]
        fn test_uninstall_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let installation = Installation::new("goose", "Goose", "brew", Version::default());
            provider(dir.path(), "", 0)
                .uninstall(
                    &ExecContext::background(),
                    &installation,
                    &method("brew", "goose", ""),
                )
                .unwrap();

            assert_eq!(calls(dir.path()), ["uninstall goose"]);
        }
    }
}
