//! cex - Command line tool for exploring climate model output.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "cex",
    version,
    about = "Climate data exploration toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: cex_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cex_cmd::run(cli.command).await
}
