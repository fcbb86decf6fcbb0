use anyhow::Context;
use tokio::sync::mpsc;

pub mod codec;
pub mod commands;
pub mod error;
pub mod ipc;
pub mod manager;
pub mod models;
pub mod resources;
pub mod server_log;
pub mod transport;

use commands::logs::{logs_dir, SessionLogger};
use commands::AppState;
use manager::Manager;
use transport::FtpConnector;

/// Serve the command bridge on stdin/stdout until the presentation layer
/// closes its end.
pub fn run() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async {
        let logger = match logs_dir() {
            Some(dir) => SessionLogger::new(&dir).await,
            None => None,
        };

        let (tx, mut events) = mpsc::unbounded_channel();
        let mut state = AppState::new(Manager::new(FtpConnector).with_events(tx));
        state.settings_path = commands::config::settings_path();
        state.log = logger.as_ref().map(SessionLogger::sender);

        let served = ipc::serve(
            &mut state,
            &mut events,
            tokio::io::stdin(),
            tokio::io::stdout(),
        )
        .await;

        state.manager.disconnect().await;
        drop(state);
        if let Some(logger) = logger {
            if let Err(e) = &served {
                logger.log("error", &format!("Command bridge stopped: {e}"));
            }
            logger.finish().await;
        }

        served.context("command bridge failed")
    })
}
