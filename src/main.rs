// src/main.rs

use clap::Parser;
use watchmill::cli::CliArgs;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    if let Err(err) = start(args).await {
        eprintln!("watchmill: {err:?}");
        std::process::exit(1);
    }
}

async fn start(args: CliArgs) -> anyhow::Result<()> {
    watchmill::logging::init_logging(args.log_level)?;
    watchmill::run(args).await?;
    Ok(())
}
