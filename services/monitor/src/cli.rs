use crate::commands::{run_evaluate, run_facilities, run_poll, EvaluateArgs, PollArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use quake_alert::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "quake-alert",
    about = "Admit seismic feed events and alert facilities inside the shaking radius",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Fetch or read one GeoJSON feed snapshot and print the batch summary
    Poll(PollArgs),
    /// Show which facilities a hypothetical event would reach
    Evaluate(EvaluateArgs),
    /// List the configured facilities and radius tiers
    Facilities,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Poll(args) => run_poll(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Facilities => run_facilities(),
    }
}
