//! # fleetgate
//!
//! Operator CLI for Fleetgate.
//!
//! - `fleetgate keygen`: print a fresh signing key
//! - `fleetgate actions`: print the action manifest
//! - `fleetgate mint`: mint a capability token for a plan file
//! - `fleetgate inspect`: decode a token's claims
//! - `fleetgate run`: capture and run a plan against the demo fleet

mod commands;
mod fleet;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fg_gateway::GatewayConfig;

/// Fleetgate: capability-token authorization for planner-proposed actions.
#[derive(Parser)]
#[command(name = "fleetgate", version, about)]
struct Cli {
    /// Gateway config file (TOML, or YAML by extension). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a base64 signing key.
    Keygen,
    /// Print the registered action manifest as JSON.
    Actions,
    /// Mint a capability token for a plan.
    Mint {
        /// Identity the token is issued to.
        #[arg(long)]
        subject: String,
        /// Plan JSON file: {"goal": "...", "steps": [{"action": ..., "params": {...}}]}.
        #[arg(long)]
        plan: PathBuf,
    },
    /// Decode a token's claims without trusting them.
    Inspect {
        token: String,
    },
    /// Capture a plan and run it against the in-memory demo fleet.
    Run {
        #[arg(long)]
        plan: PathBuf,
        /// Caller identity.
        #[arg(long)]
        user: String,
        /// Caller roles (repeatable).
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Sign with a throwaway key instead of the configured one.
        #[arg(long)]
        ephemeral_key: bool,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("fg_gateway=info".parse()?)
        .add_directive("fg_capability=info".parse()?)
        .add_directive("fg_policy=info".parse()?)
        .add_directive("fleetgate=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    match cli.command {
        Commands::Keygen => commands::keygen::execute(),
        Commands::Actions => commands::actions::execute(),
        Commands::Mint { subject, plan } => commands::mint::execute(&config, &subject, &plan),
        Commands::Inspect { token } => commands::inspect::execute(&config, &token),
        Commands::Run {
            plan,
            user,
            roles,
            ephemeral_key,
        } => commands::run::execute(&config, &plan, &user, roles, ephemeral_key).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_repeated_roles() {
        let cli = Cli::try_parse_from([
            "fleetgate",
            "--log-format",
            "json",
            "run",
            "--plan",
            "plan.json",
            "--user",
            "bob",
            "--role",
            "junior",
            "--role",
            "oncall",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Run { user, roles, .. } => {
                assert_eq!(user, "bob");
                assert_eq!(roles, vec!["junior", "oncall"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn mint_requires_subject() {
        assert!(Cli::try_parse_from(["fleetgate", "mint", "--plan", "p.json"]).is_err());
    }
}
