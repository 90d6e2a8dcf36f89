use anyhow::Context;
use orphan_sweep_core::CancelToken;
use std::process;
use std::thread;
use tokio::runtime::Builder;
use tracing::{error, warn};

/// Conventional exit status for a process ended by SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// Listen for Ctrl-C on a background thread.
///
/// The first interrupt raises `cancel`: the clean stops between files and an
/// unfinished archive is removed. A second interrupt exits at once.
pub fn watch_ctrl_c(cancel: CancelToken) -> anyhow::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for ctrl+c signal: {}", err);
                    return;
                }
                warn!("Interrupt received, stopping after the current file (Ctrl-C again to abort)");
                cancel.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    process::exit(INTERRUPTED_EXIT);
                }
            });
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}
