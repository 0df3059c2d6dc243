//! CLI module for Vigil
//!
//! Provides commands:
//! - `serve`: Run the server
//! - `submit`: Submit a goal to a running server
//! - `status`: Show a task
//! - `list`: List tasks

use clap::{Parser, Subcommand};

pub mod client;

/// Default server address for client commands
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8700";

/// Vigil orchestration server CLI
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Policy-validated task orchestration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// Submit a goal to a running server
    Submit {
        /// Goal to pursue
        goal: String,
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER, env = "VIGIL_SERVER_URL")]
        server: String,
        /// Planning context as a JSON object
        #[arg(long)]
        context: Option<String>,
    },
    /// Show the status of a task
    Status {
        /// Task identifier
        task_id: String,
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER, env = "VIGIL_SERVER_URL")]
        server: String,
    },
    /// List tasks on a running server
    List {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER, env = "VIGIL_SERVER_URL")]
        server: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Submit {
            goal,
            server,
            context,
        }) => client::submit(&server, &goal, context.as_deref()).await,
        Some(Commands::Status { task_id, server }) => client::status(&server, &task_id).await,
        Some(Commands::List { server }) => client::list(&server).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_arguments() {
        let cli = Cli::try_parse_from([
            "vigil",
            "submit",
            "check disk usage",
            "--server",
            "http://10.0.0.5:8700",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Submit { goal, server, context }) => {
                assert_eq!(goal, "check disk usage");
                assert_eq!(server, "http://10.0.0.5:8700");
                assert!(context.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["vigil"]).unwrap();
        assert!(cli.command.is_none());
    }
}
