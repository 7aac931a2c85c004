use clap::Parser;
use heimdall_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "heimdall",
    version,
    about = "Heimdall - File Integrity Monitor",
    long_about = "Heimdall records a content hash of every file under a folder and reports what was added, deleted, modified or moved since the last run. Patterns listed in a .heimdallignore file inside the folder are skipped."
)]
pub struct Cli {
    /// Folder to monitor (optional with --reset)
    #[arg(help = "Folder to monitor (optional for --reset)")]
    pub folder: Option<PathBuf>,

    /// Keep monitoring, re-scanning every interval
    #[arg(short, long, help = "Continuous monitoring mode")]
    pub watch: bool,

    /// Seconds between scans in watch mode
    #[arg(short, long, help = "Watch interval in seconds (default: 5)")]
    pub interval: Option<u64>,

    /// Delete the stored baseline (all baselines when no folder is given)
    #[arg(short, long, help = "Reset hash database")]
    pub reset: bool,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Append reports to this file
    #[arg(short, long, help = "Append reports to file")]
    pub output: Option<PathBuf>,

    /// Hash algorithm
    #[arg(short, long, help = "Hash algorithm: sha256 (default), sha1, md5, sha512, blake2b, blake2s")]
    pub algorithm: Option<String>,

    /// Show file sizes in reports
    #[arg(short, long, help = "Show file sizes")]
    pub show_size: bool,

    #[arg(long, help = "Disable desktop notifications")]
    pub no_notifications: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding hash databases (default: ~/.heimdall)
    #[arg(long)]
    pub db_dir: Option<PathBuf>,
}

impl Cli {
    /// Configuration file values with command-line flags applied on top
    pub fn load_config(&self) -> heimdall_core::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(algorithm) = &self.algorithm {
            config.algorithm = algorithm.clone();
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(dir) = &self.db_dir {
            config.storage_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        config.show_size |= self.show_size;
        config.notifications &= !self.no_notifications;
        config.color &= !self.no_color;

        config.validate()?;
        Ok(config)
    }
}
