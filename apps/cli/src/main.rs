//! currichef CLI — curriculum content-ingestion chef.
//!
//! Crawls the curriculum site's search index, packages each resource into
//! a standalone document archive, and emits the channel tree handed to
//! the downstream publisher.

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
