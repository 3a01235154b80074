use clap::{Args, Parser, Subcommand, ValueEnum};
use jobboard::version::CURRENT_VERSION;
use jobboard::Role;
use std::path::PathBuf;

mod cli;
mod ui;

use cli::CliHandler;

#[derive(Parser)]
#[command(
    name = "jobboard",
    about = "Command line client for the JobBoard API",
    long_about = "JobBoard CLI - signed-in access to the JobBoard REST API

OVERVIEW:
  Sign in once; the session is kept on disk and the access credential is
  refreshed automatically when the API reports it expired.

QUICK START:
  jobboard login --email you@example.com    # Sign in (password is prompted)
  jobboard status                           # Show who is signed in
  jobboard favorites list                   # Your favorite jobs
  jobboard favorites toggle 42              # Add or remove job #42
  jobboard notifications list               # Your notifications
  jobboard request GET /api/jobs/           # Any API call, with the session attached
  jobboard logout                           # Forget the session",
    version = CURRENT_VERSION,
    author = "JobBoard Team",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show session status
    #[command(aliases = &["st"])]
    Status,

    /// Send an API request with the current session
    #[command(aliases = &["req"])]
    Request(RequestArgs),

    /// Manage favorite jobs
    #[command(aliases = &["fav"])]
    Favorites(FavoritesArgs),

    /// Manage notifications
    #[command(aliases = &["notif"])]
    Notifications(NotificationsArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method, e.g. GET or POST
    pub method: String,

    /// API path, e.g. /api/jobs/
    pub path: String,

    /// JSON body
    #[arg(long, conflicts_with_all = ["fields", "files"])]
    pub json: Option<String>,

    /// Multipart text field as name=value (repeatable)
    #[arg(short = 'F', long = "field")]
    pub fields: Vec<String>,

    /// Multipart file as name=path (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Extra header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Refuse to send unless signed in with this role
    #[arg(long, value_enum)]
    pub require_role: Option<RoleArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Candidate,
    Employer,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Candidate => Role::Candidate,
            RoleArg::Employer => Role::Employer,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Args)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

#[derive(Subcommand)]
pub enum FavoritesCommand {
    #[command(aliases = &["ls"])]
    List,
    /// Add the job to favorites, or remove it if already there
    Toggle { job_id: u64 },
}

#[derive(Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Subcommand)]
pub enum NotificationsCommand {
    #[command(aliases = &["ls"])]
    List,
    /// Mark one notification, or all of them, as read
    Read {
        #[arg(required_unless_present = "all")]
        id: Option<u64>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    #[command(aliases = &["rm"])]
    Remove { id: u64 },
    /// Poll and report the unread count until interrupted or signed out
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("jobboard={}", log_level))
        .with_writer(std::io::stderr);
    subscriber.init();

    let handler = match CliHandler::new(cli.config) {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handler.execute(cli.command).await {
        handler.report_error(&e);
        std::process::exit(1);
    }
}
