//! Lambda CLI - GPU instance lifecycle on Lambda Cloud
//!
//! One command per invocation: resolve configuration, make the provider
//! call(s), print the result.

mod cli;
mod commands;
mod config;
mod error;
mod output;
mod provider;

use clap::Parser;
use cli::{Cli, Commands};
use config::{FileProfileStore, Resolver};
use output::ErrorReport;
use provider::{ApiError, LambdaClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env has to be in the environment before clap reads env-backed flags
    let env_loaded = config::load_env();

    let mut cli = Cli::parse();

    // Handle --manifest before anything else
    if cli.manifest {
        output::print_manifest();
        return;
    }

    let filter = if cli.verbose {
        EnvFilter::new("lambda=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = env_loaded {
        tracing::warn!(error = %format!("{e:#}"), "Ignoring .env");
    }

    let out = output::Output::new(cli.agent);

    // If no command provided, show help
    let Some(command) = cli.command.take() else {
        eprintln!("Error: no command provided. Use --help for usage.");
        std::process::exit(1);
    };

    let op = command.op();
    if let Err(e) = run(command, &cli, &out).await {
        out.error(ErrorReport::from_error(&e).with_op(op));
    }
}

fn connect(cli: &Cli) -> Result<LambdaClient, ApiError> {
    LambdaClient::new(cli.base_url.clone(), cli.api_key.clone())
}

async fn run(command: Commands, cli: &Cli, out: &output::Output) -> error::Result<()> {
    match command {
        Commands::ListInstanceTypes {
            available_only,
            region,
        } => {
            commands::catalog::run_list_instance_types(
                &connect(cli)?,
                available_only,
                region.as_deref(),
                out,
            )
            .await
        }
        Commands::ListInstances => commands::instances::run_list_instances(&connect(cli)?, out).await,
        Commands::GetInstance { instance_id } => {
            commands::instances::run_get_instance(&connect(cli)?, &instance_id, out).await
        }
        Commands::ListFilesystems => commands::catalog::run_list_filesystems(&connect(cli)?, out).await,
        Commands::ListSshKeys => commands::catalog::run_list_ssh_keys(&connect(cli)?, out).await,
        Commands::AddSshKey {
            name,
            public_key,
            generate,
        } => {
            commands::catalog::run_add_ssh_key(
                &connect(cli)?,
                &name,
                public_key.as_deref(),
                generate,
                out,
            )
            .await
        }
        Commands::DeleteSshKey { ssh_key_id } => {
            commands::catalog::run_delete_ssh_key(&connect(cli)?, &ssh_key_id, out).await
        }
        Commands::LaunchInstance(args) => {
            // Configuration errors surface before any client or network work
            let resolver = Resolver::new(FileProfileStore::new(vec![cli.profile_dir()]));
            let spec = resolver.resolve(args.config.as_deref(), &args.overrides()?)?;
            commands::lifecycle::run_launch(&connect(cli)?, spec, out).await
        }
        Commands::TerminateInstances { instance_ids } => {
            commands::lifecycle::run_terminate(&connect(cli)?, &instance_ids, out).await
        }
    }
}
