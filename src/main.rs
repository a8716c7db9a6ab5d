#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agent_manager::cli::{Cli, Commands};
use agent_manager::commands::{self, helpers::Session};
use agent_manager::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Only commands that touch agents load config and the catalog
    let session = || -> Result<Session> {
        let config = Config::load()?.with_cli_overrides(&cli);
        Ok(Session::new(config)?)
    };

    match &cli.command {
        Commands::Hint {
            manager,
            operation,
            stderr,
        } => commands::hint::execute(manager, operation, stderr.as_deref())?,
        Commands::Compare { a, b } => commands::version::compare(a, b)?,
        Commands::Satisfies {
            version,
            constraint,
        } => {
            if !commands::version::satisfies(version, constraint)? {
                std::process::exit(1);
            }
        }
        Commands::List => commands::list::execute(&session()?)?,
        Commands::Methods { agent } => commands::methods::execute(&session()?, agent)?,
        Commands::Install {
            agent,
            method,
            force,
        } => commands::install::execute(&session()?, agent, method.as_deref(), *force)?,
        Commands::Update { agent, method, .. } => {
            let session = session()?;
            // clap requires either an agent or --all
            let tally = match agent {
                Some(id) => commands::update::execute(&session, id, method.as_deref())?,
                None => commands::update::execute_all(&session, method.as_deref()),
            };
            if tally.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Uninstall { agent, method } => {
            commands::uninstall::execute(&session()?, agent, method.as_deref())?
        }
        Commands::Latest { agent, method } => {
            commands::latest::execute(&session()?, agent, method.as_deref())?
        }
    }

    Ok(())
}

/// Logs go to stderr. `-v` wins over AGENT_MANAGER_LOG, which wins over RUST_LOG.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("agent_manager=debug")
    } else {
        EnvFilter::try_from_env("AGENT_MANAGER_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
