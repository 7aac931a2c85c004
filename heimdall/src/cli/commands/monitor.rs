//! Single-shot check and interval watch loop

use anyhow::{Context, Result};
use chrono::Local;
use heimdall_core::report::{
    AnsiPalette, DesktopNotifier, NoopNotifier, Notifier, PlainPalette, Reporter, Tone,
    append_report,
};
use heimdall_core::{BaselineState, Config, CycleReport, Monitor, MonitorOptions, SnapshotStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Everything needed to present the result of a cycle
pub struct Presenter {
    console: Reporter,
    file: Reporter,
    notifier: Box<dyn Notifier>,
    output: Option<PathBuf>,
    watch: bool,
}

impl Presenter {
    pub fn from_config(config: &Config, watch: bool) -> Self {
        let console = if config.color {
            Reporter::new(Box::new(AnsiPalette), config.show_size)
        } else {
            Reporter::new(Box::new(PlainPalette), config.show_size)
        };
        let notifier: Box<dyn Notifier> = if config.notifications {
            Box::new(DesktopNotifier::default())
        } else {
            Box::new(NoopNotifier)
        };

        Self {
            console,
            file: Reporter::plain(config.show_size),
            notifier,
            output: config.output.clone(),
            watch,
        }
    }

    fn say(&self, text: &str, tone: Tone) {
        println!("{}", self.console.paint(text, tone));
    }

    /// Print, log to file and notify for one finished cycle
    pub fn present(&self, report: &CycleReport) {
        match &report.baseline {
            BaselineState::FirstRun => {
                let count = report.current.len();
                self.say(&format!("Creating baseline with {} files.", count), Tone::Notice);
            }
            BaselineState::Discarded(reason) => {
                let text = format!("Stored baseline unusable ({}), starting over.", reason);
                self.say(&text, Tone::Deleted);
            }
            BaselineState::AlgorithmChanged { from } => {
                let text = format!("Baseline used {}; compared with it, then re-hashed.", from);
                self.say(&text, Tone::Notice);
            }
            BaselineState::Loaded => {}
        }

        if !report.warnings.is_empty() {
            let text = format!("{} files could not be read this cycle.", report.warnings.len());
            self.say(&text, Tone::Modified);
        }

        let changes = &report.changes;
        if changes.is_empty() {
            let now = Local::now().format("%H:%M:%S");
            if self.watch {
                print!("\rNo changes detected at {}", now);
                let _ = std::io::stdout().flush();
            } else {
                println!("{}", self.console.render(changes));
            }
            return;
        }

        println!("{}", self.console.render(changes));
        self.notifier.notify_changes(changes);

        if let Some(output) = &self.output {
            if let Err(e) = append_report(output, &self.file.render(changes), Local::now()) {
                error!("Error writing to output file {:?}: {}", output, e);
            }
        }

        let now = Local::now().format("%H:%M:%S");
        self.say(&format!("\nDatabase updated at {}", now), Tone::Notice);
    }
}

pub async fn execute(folder: &Path, config: Config, watch: bool) -> Result<()> {
    let options = MonitorOptions {
        root: folder.to_path_buf(),
        algorithm: config.hash_algorithm()?,
        extra_ignore: config.extra_ignore.clone(),
        hash_workers: config.hash_workers,
    };
    let monitor = Arc::new(Monitor::new(options, SnapshotStore::new(&config.storage_dir))?);
    let presenter = Presenter::from_config(&config, watch);

    print_banner(&monitor, &config, watch);

    if watch {
        watch_loop(monitor, &presenter, Duration::from_secs(config.interval_secs)).await
    } else {
        if let Some(result) = run_cycle(&monitor).await? {
            handle_result(&presenter, result)?;
        }
        Ok(())
    }
}

fn print_banner(monitor: &Monitor, config: &Config, watch: bool) {
    println!("Monitoring: {}", monitor.root().display());
    if !monitor.matcher().is_empty() {
        println!("Ignoring: {}", monitor.matcher().rules().join(", "));
    }
    println!("Database: {}", monitor.db_path().display());
    println!("Algorithm: {}", monitor.algorithm());
    if watch {
        println!("Interval: {}s", config.interval_secs);
        println!("Press Ctrl+C to stop.\n");
    }
}

/// Run one cycle on the blocking pool. Returns `None` when interrupted; the
/// cycle is then abandoned with its cancel flag raised so it never saves.
async fn run_cycle(monitor: &Arc<Monitor>) -> Result<Option<heimdall_core::Result<CycleReport>>> {
    let worker = monitor.clone();
    let handle = tokio::task::spawn_blocking(move || worker.run_cycle());

    tokio::select! {
        joined = handle => Ok(Some(joined.context("monitoring cycle panicked")?)),
        _ = tokio::signal::ctrl_c() => {
            monitor.cancel_flag().store(true, Ordering::SeqCst);
            warn!("Interrupted, abandoning the running scan");
            Ok(None)
        }
    }
}

/// Fatal errors propagate; anything else is logged and monitoring continues.
fn handle_result(presenter: &Presenter, result: heimdall_core::Result<CycleReport>) -> Result<()> {
    match result {
        Ok(report) => {
            presenter.present(&report);
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(heimdall_core::HeimdallError::Cancelled) => {
            info!("Cycle cancelled before saving");
            Ok(())
        }
        Err(e) => {
            error!("Monitoring cycle failed: {}", e);
            Ok(())
        }
    }
}

async fn watch_loop(
    monitor: Arc<Monitor>,
    presenter: &Presenter,
    interval: Duration,
) -> Result<()> {
    loop {
        match run_cycle(&monitor).await? {
            Some(result) => handle_result(presenter, result)?,
            None => break,
        }

        debug!("Waiting {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nstopping heimdall. farewell");
    Ok(())
}
