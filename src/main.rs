mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod logging;
mod services;
mod workflow;

use clap::{Args, Parser, Subcommand};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::render::{render_employees, render_tickets};
use crate::cmd::serve::{self, ServeArgs};
use crate::cmd::session;
use crate::cmd::ticket::{self, ListCommandArgs};
use crate::config::{AppConfig, DEFAULT_LOG_LEVEL};
use crate::context::AppContext;
use crate::domain::status::Transition;
use crate::domain::ticket::TicketId;
use crate::error::AppResult;

#[derive(Parser)]
#[command(name = "ticketboard", author, version, about = "Ticket board client")]
struct Cli {
    /// Override the configured backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tickets that pass the given filters.
    List(ListArgs),
    /// Print the employees available as assignees.
    Employees,
    /// Set a ticket in progress and print the refreshed board.
    Progress(IdArgs),
    /// Close a ticket and print the refreshed board.
    Close(IdArgs),
    /// Reopen a ticket (administrative).
    Reopen(IdArgs),
    /// Interactive board session on stdin.
    Board,
    /// Run an in-memory development backend.
    Serve(ServeArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Priority to show: high, medium or low.
    #[arg(short, long)]
    priority: Option<String>,
    /// Employee name to filter by.
    #[arg(short, long)]
    assignee: Option<String>,
    /// Case-insensitive text to search for.
    #[arg(short, long)]
    search: Option<String>,
}

#[derive(Args)]
struct IdArgs {
    /// Ticket id.
    id: String,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command, cli.base_url),
        Commands::Serve(args) => {
            logging::init_tracing(DEFAULT_LOG_LEVEL);
            serve::run(args).await
        }
        command => {
            let config = AppConfig::load(cli.base_url)?;
            logging::init_tracing(&config.log_level);
            let context = AppContext::new(config)?;
            run_board_command(&context, command).await
        }
    }
}

async fn run_board_command(context: &AppContext, command: Commands) -> AppResult<()> {
    match command {
        Commands::List(args) => {
            let snapshot = ticket::list(
                context,
                ListCommandArgs {
                    priority: args.priority,
                    assignee: args.assignee,
                    search: args.search,
                },
            )
            .await?;
            warn_if_stale(snapshot.ready);
            println!("{}", render_tickets(&snapshot.visible));
        }
        Commands::Employees => {
            let employees = ticket::employees(context).await?;
            println!("{}", render_employees(&employees));
        }
        Commands::Progress(args) => {
            run_transition(context, Transition::StartProgress, args.id).await?;
        }
        Commands::Close(args) => {
            run_transition(context, Transition::Close, args.id).await?;
        }
        Commands::Reopen(args) => {
            let confirmation = ticket::reopen(context, TicketId::new(args.id)).await?;
            println!("{confirmation}");
        }
        Commands::Board => session::run(context).await?,
        Commands::Serve(_) | Commands::Config(_) => {}
    }
    Ok(())
}

async fn run_transition(context: &AppContext, transition: Transition, id: String) -> AppResult<()> {
    let id = TicketId::new(id);
    let outcome = ticket::transition(context, transition, id.clone()).await?;

    if outcome.updated {
        println!("Ticket {id} set to {}.", transition.target());
    } else {
        eprintln!("Ticket {id} was not updated; the board is unchanged.");
    }
    warn_if_stale(outcome.board.ready);
    println!("{}", render_tickets(&outcome.board.visible));
    Ok(())
}

fn warn_if_stale(ready: bool) {
    if !ready {
        eprintln!("Warning: tickets could not be loaded; showing last known state.");
    }
}
