use std::path::PathBuf;

use clap::{Parser, Subcommand};

use infocrumbs::sources::Source;
use infocrumbs::{App, Config, Result};

#[derive(Debug, Parser)]
#[command(name = "infocrumbs", version, about = "Bite-sized content feed and subscription service")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "INFOCRUMBS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API and payment webhook
    Serve {
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Fetch crumbs from the configured sources and store them
    FetchCrumbs {
        /// Only fetch from this source (repeatable)
        #[arg(long = "source", value_name = "ID")]
        sources: Vec<Source>,
    },
    /// Create a user account
    CreateUser { username: String, email: String },
    /// List source ids accepted by fetch-crumbs
    ListSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::ListSources = cli.command {
        for source in Source::ALL {
            println!("{:<22} {}", source.id(), source.default_name());
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let app = App::new(config).await?;

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(app.config.port);
            app.serve(port).await?;
        }
        Command::FetchCrumbs { sources } => {
            println!("Starting crumb fetching process...");
            let report = app.fetch_crumbs(&sources).await;
            for count in &report.per_source {
                println!(
                    "{} crumbs saved from {}.",
                    count.created,
                    count.source.default_name()
                );
            }
            println!("Total crumbs added: {}", report.total);
        }
        Command::CreateUser { username, email } => {
            let user = app.create_user(&username, &email).await?;
            println!("Created user {} with id {}", user.username, user.id);
        }
        Command::ListSources => {}
    }

    Ok(())
}
