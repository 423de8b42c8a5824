//! Coursewise CLI — course recommendations and catalog link checks.
//!
//! Chats about a finance training catalog with a language model, and lets
//! admins verify that every course URL still resolves.

mod chat;
mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
