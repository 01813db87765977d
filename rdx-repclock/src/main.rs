use anyhow::Result;
use repclock::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a single countdown with a logging sink.
///
/// Usage: `repdev [REPS] [CONFIG.toml]`
#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    // 2. Read arguments and configuration.
    let mut args = std::env::args().skip(1);
    let total_reps: u32 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 3,
    };
    let config_path = args.next().map(PathBuf::from);
    let config = RepClockConfig::load(config_path.as_deref())?;

    // 3. Create the scheduler and watch its progress.
    let scheduler = RepCycleScheduler::new(config, SystemClock, Arc::new(TracingCueSink));
    scheduler
        .on_progress(|p: &Progress| {
            info!("[PROGRESS] {} rep={} running={}", p.display_text, p.current_rep, p.running)
        })
        .await;

    // 4. Pause on Ctrl+C, otherwise let the run finish.
    let handle = scheduler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.pause().await;
        }
    });

    if !scheduler.start(total_reps).await {
        info!("Nothing to do for {} reps.", total_reps);
        return Ok(());
    }
    scheduler.join().await;

    let snapshot = scheduler.snapshot().await;
    info!(
        "Ended {:?} at rep {}/{}.",
        snapshot.phase, snapshot.progress.current_rep, snapshot.total_reps
    );
    Ok(())
}
