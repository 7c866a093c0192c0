mod api;
mod cli;
mod leads;
mod metrics;
mod model;
mod orchestrator;
mod storage;
mod text_summary;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool, silent: bool) {
    let default_filter = if verbose {
        "leadgen_search=debug,info"
    } else if silent {
        "error"
    } else {
        "leadgen_search=warn,warn"
    };
    // RUST_LOG wins over the flags.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    init_tracing(args.verbose, is_silent);

    match cli::run(args).await {
        Ok(()) => {
            // Exit explicitly so a pending Ctrl-C listener or blocking writer cannot hold the process
            std::process::exit(0);
        }
        Err(e) => {
            if is_silent {
                println!("{}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
