mod cli;
mod commands;
mod infra;
mod poller;
mod routes;
mod server;

use quake_alert::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
