//! Watch command.

use std::io::Write;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::{Settings, WatchConfig};
use crate::monitor::{FileMonitor, named};

/// Apply CLI overrides on top of the configured watch settings.
pub fn resolve_watch_config(
    settings: &Settings,
    dir: Option<PathBuf>,
    pattern: Option<String>,
) -> WatchConfig {
    let mut config = settings.watch.clone();
    if let Some(dir) = dir {
        config.dir = dir;
    }
    if let Some(pattern) = pattern {
        config.pattern = pattern;
    }
    config
}

/// Write one `= name` line per tracked file.
fn print_tracked(files: &[String]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for name in files {
        writeln!(stdout, "= {name}")?;
    }
    stdout.flush()
}

/// Run watch command - print add/remove events until Ctrl-C, then the
/// files still tracked.
pub async fn run_watch(config: &WatchConfig, list: bool) -> anyhow::Result<()> {
    let monitor = FileMonitor::builder()
        .config(config)
        .on_add(named("stdout", |name: &str| {
            writeln!(std::io::stdout().lock(), "+ {name}")?;
            Ok(())
        }))
        .on_remove(named("stdout", |name: &str| {
            writeln!(std::io::stdout().lock(), "- {name}")?;
            Ok(())
        }))
        .build()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let started = monitor.start()?;

    eprintln!(
        "Watching {} for '{}' (Ctrl-C to stop)",
        config.dir.display(),
        config.pattern
    );

    if list {
        print_tracked(&started.tracked())?;
    }

    let report = started.run(cancel).await;

    print_tracked(&report.tracked)?;
    eprintln!("{} files tracked at exit", report.tracked.len());
    Ok(())
}
