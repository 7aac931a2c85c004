use anyhow::{Result, bail};
use clap::Parser;
use heimdall_core::SnapshotStore;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::Cli;

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = cli.load_config()?;

    if cli.reset {
        let store = SnapshotStore::new(&config.storage_dir);
        return cli::commands::reset::execute(&store, cli.folder.as_deref());
    }

    let Some(folder) = cli.folder.clone() else {
        bail!("Please specify a folder to monitor (see --help)");
    };

    debug!("Using configuration: {:?}", config);
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(cli::commands::monitor::execute(&folder, config, cli.watch));

    // An interrupted scan may still be hashing; it will not save, so don't wait for it
    runtime.shutdown_background();
    result
}
