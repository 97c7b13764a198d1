mod admin;
mod cli;
mod infra;
mod render;
mod routes;
mod server;
mod session;
mod student;

use excuse_portal::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
