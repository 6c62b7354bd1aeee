use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod auth;
pub mod job;
pub mod run;
pub mod serve;

use job::JobId;

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Run the lead workflow once and print the report as JSON
    Run {
        /// The lead's message
        #[arg(long)]
        message: String,

        /// Qualification rule, defaults to LEADFLOW_LEAD_RULE
        #[arg(long)]
        rule: Option<String>,

        /// Sender address used for the CRM contact and the reply draft
        #[arg(long)]
        sender: Option<String>,

        /// Book on an in-memory calendar and log to a simulated CRM
        #[arg(long, action, default_value = "false")]
        dry_run: bool,
    },
    /// Perform the Google OAuth flow and print the refresh token
    Auth {},
    /// Run a periodic job once
    Job {
        #[arg(long, value_enum)]
        id: JobId,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Run {
            message,
            rule,
            sender,
            dry_run,
        }) => {
            run::run(message, rule, sender, dry_run).await?;
        }
        Some(Command::Auth {}) => {
            auth::run().await?;
        }
        Some(Command::Job { id }) => {
            job::run(id).await?;
        }
        None => {}
    }

    Ok(())
}
