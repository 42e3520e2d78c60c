//! CLI entry point for strata.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use strata_graph::OrientClient;

use strata_migrate::batch;
use strata_migrate::config::{load_config, ServerOverrides, StrataConfig};
use strata_migrate::loader;
use strata_migrate::runner::MigrationRunner;
use strata_migrate::{Diagnostic, Diagnostics};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Declarative schema migrations for OrientDB")]
struct Cli {
    /// Config file prefix (default: strata).
    #[arg(short, long, default_value = "strata", global = true)]
    config: String,

    /// OrientDB host.
    #[arg(long, global = true)]
    odb_host: Option<String>,

    /// OrientDB REST port.
    #[arg(long, global = true)]
    odb_port: Option<u16>,

    /// OrientDB username.
    #[arg(long, global = true)]
    odb_username: Option<String>,

    /// OrientDB password.
    #[arg(long, global = true)]
    odb_password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create databases and schema objects from schema files.
    #[command(name = "db:create", alias = "dbc")]
    Create {
        /// Glob pattern of schema files (.yml, .yaml, .json).
        schema: String,

        /// Apply every document to this database instead of its own.
        #[arg(long = "database")]
        databases: Vec<String>,
    },

    /// Drop databases.
    #[command(name = "db:drop", alias = "dbd")]
    Drop {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run versioned migrations with the external migration tool.
    #[command(name = "migrate", alias = "m")]
    Migrate {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let diagnostics = Diagnostics::new();

    match run(cli, &diagnostics).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics.emit(Diagnostic::failure(e.to_string()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, diagnostics: &Diagnostics) -> anyhow::Result<()> {
    let overrides = ServerOverrides {
        host: cli.odb_host,
        port: cli.odb_port,
        username: cli.odb_username,
        password: cli.odb_password,
    };
    let config = load_config(&cli.config, &overrides)?;

    match cli.command {
        Command::Create { schema, databases } => {
            // Schema files are read before any server interaction.
            let documents = loader::load(&schema)?;
            let client = connect(&config).await?;
            batch::apply(
                &client,
                &documents,
                &databases,
                &config.concurrency,
                diagnostics,
            )
            .await?;
        }
        Command::Drop { names } => {
            let client = connect(&config).await?;
            batch::drop_databases(&client, &names, &config.concurrency, diagnostics).await?;
        }
        Command::Migrate { args } => {
            let runner = MigrationRunner::new(&config.migrate, &config.server);
            let stdout = runner.run(&args).await?;
            println!("{stdout}");
        }
    }

    Ok(())
}

async fn connect(config: &StrataConfig) -> anyhow::Result<OrientClient> {
    Ok(OrientClient::connect(&config.server).await?)
}
