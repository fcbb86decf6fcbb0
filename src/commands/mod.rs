pub mod config;
pub mod logs;
pub mod resources;
pub mod session;

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::manager::Manager;
use crate::transport::Connector;

/// Everything the command handlers share for the lifetime of the process.
pub struct AppState<C: Connector> {
    pub manager: Manager<C>,
    pub settings_path: Option<PathBuf>,
    pub log: Option<mpsc::UnboundedSender<String>>,
}

impl<C: Connector> AppState<C> {
    pub fn new(manager: Manager<C>) -> Self {
        Self {
            manager,
            settings_path: None,
            log: None,
        }
    }

    pub fn log(&self, prefix: &str, line: &str) {
        if let Some(tx) = &self.log {
            logs::send_log(tx, prefix, line);
        }
    }
}
