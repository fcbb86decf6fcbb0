use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rotated session logs kept next to `latest.log`.
const MAX_SESSIONS: usize = 10;

pub fn logs_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("vrising-manager").join("logs"))
}

/// Async session logger that writes timestamped lines to `latest.log`.
///
/// Callers never block on disk I/O: `log()` pushes through a channel and a
/// background task does the writing.
pub struct SessionLogger {
    tx: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
}

impl SessionLogger {
    /// Start a new session log in `logs_dir`.
    ///
    /// - Creates the directory if needed
    /// - Rotates `latest.log` to `session-{timestamp}.log`
    /// - Keeps at most 10 rotated sessions
    pub async fn new(logs_dir: &Path) -> Option<Self> {
        if tokio::fs::create_dir_all(logs_dir).await.is_err() {
            return None;
        }

        let latest = logs_dir.join("latest.log");
        if latest.exists() {
            let rotated = logs_dir.join(format!("session-{}.log", Utc::now().timestamp()));
            let _ = tokio::fs::rename(&latest, &rotated).await;
        }

        cleanup_old_sessions(logs_dir).await;

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&latest)
            .await
            .ok()?;

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(writer_task(file, rx));

        let header = format!(
            "=== V Rising Server Manager session - {} ===\n\n",
            format_timestamp(Utc::now())
        );
        let _ = tx.send(header);

        Some(Self { tx, writer })
    }

    pub fn log(&self, prefix: &str, line: &str) {
        send_log(&self.tx, prefix, line);
    }

    /// Clone the sender so other owners can log without the logger.
    pub fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.tx.clone()
    }

    /// Close the channel and wait for the footer to hit the disk. Every
    /// cloned sender must be dropped first.
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.writer.await;
    }
}

/// Format a log line and send it through a cloned sender.
pub fn send_log(tx: &mpsc::UnboundedSender<String>, prefix: &str, line: &str) {
    let ts = format_timestamp(Utc::now());
    let _ = tx.send(format!("[{ts}] [{prefix}] {line}\n"));
}

async fn writer_task(file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<String>) {
    use tokio::io::AsyncWriteExt;
    let mut writer = tokio::io::BufWriter::new(file);

    while let Some(line) = rx.recv().await {
        let _ = writer.write_all(line.as_bytes()).await;
        let _ = writer.flush().await;
    }

    let footer = format!(
        "\n=== Session ended - {} ===\n",
        format_timestamp(Utc::now())
    );
    let _ = writer.write_all(footer.as_bytes()).await;
    let _ = writer.flush().await;
}

/// ISO 8601 UTC, e.g. "2025-06-15T10:30:00Z".
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

async fn cleanup_old_sessions(logs_dir: &Path) {
    let mut entries = match tokio::fs::read_dir(logs_dir).await {
        Ok(rd) => rd,
        Err(_) => return,
    };

    let mut session_files: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with("session-") && name_str.ends_with(".log") {
            session_files.push(entry.path());
        }
    }

    // Timestamps are embedded, so lexicographic = chronological
    session_files.sort();

    let excess = session_files.len().saturating_sub(MAX_SESSIONS);
    for oldest in &session_files[..excess] {
        let _ = tokio::fs::remove_file(oldest).await;
    }
}
