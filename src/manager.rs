//! Orchestrates one editing session: connect, load every resource of the
//! edition, hand the decoded set to the presentation layer, save it back.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::commands::config::ConnectionSettings;
use crate::error::{ManagerError, Result};
use crate::resources::{Edition, ResourceKind, Resources};
use crate::transport::{Connector, RemoteFiles};

/// Progress reported to whoever drives the session.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum ManagerEvent {
    Connected { host: String, port: u16 },
    Reconnected { host: String, port: u16 },
    Fetched { path: String, bytes: usize },
    Stored { path: String, bytes: usize },
    Failed { action: String, error: String },
}

pub struct Manager<C: Connector> {
    connector: C,
    settings: Option<ConnectionSettings>,
    session: Option<C::Session>,
    resources: Resources,
    events: Option<mpsc::UnboundedSender<ManagerEvent>>,
}

fn emit(events: &Option<mpsc::UnboundedSender<ManagerEvent>>, event: ManagerEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

fn not_connected() -> ManagerError {
    ManagerError::Connection("Not connected. Please connect to the server first.".into())
}

impl<C: Connector> Manager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            settings: None,
            session: None,
            resources: Resources::default(),
            events: None,
        }
    }

    /// Report progress on `tx`, e.g. so the caller can reload after connecting.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn edition(&self) -> Edition {
        self.settings
            .as_ref()
            .map(|s| s.edition)
            .unwrap_or_default()
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Open a new session, replacing any current one. The settings are
    /// remembered for the reconnect before a save.
    pub async fn connect(&mut self, settings: ConnectionSettings) -> Result<()> {
        if let Some(mut old) = self.session.take() {
            old.close().await;
        }

        let session = self
            .connector
            .connect(&settings)
            .await
            .map_err(|e| self.failed("connect", e))?;
        emit(
            &self.events,
            ManagerEvent::Connected {
                host: settings.host.clone(),
                port: settings.port,
            },
        );
        self.session = Some(session);
        self.settings = Some(settings);
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    /// Fetch and decode every resource of the edition. The loaded set is
    /// replaced only when the whole batch succeeds.
    pub async fn load_all(&mut self) -> Result<&Resources> {
        let loaded = self
            .fetch_batch()
            .await
            .map_err(|e| self.failed("load", e))?;
        self.resources = loaded;
        Ok(&self.resources)
    }

    async fn fetch_batch(&mut self) -> Result<Resources> {
        let kinds = self.edition().resources();
        let session = self.session.as_mut().ok_or_else(not_connected)?;

        let mut loaded = Resources::default();
        for &kind in kinds {
            let bytes = session.fetch(kind.path()).await?;
            emit(
                &self.events,
                ManagerEvent::Fetched {
                    path: kind.path().to_string(),
                    bytes: bytes.len(),
                },
            );
            loaded
                .decode(kind, &bytes)
                .map_err(|source| ManagerError::DecodeFile {
                    path: kind.path().to_string(),
                    source,
                })?;
        }
        Ok(loaded)
    }

    /// Upload every loaded editable resource, in edition order. Stops at the
    /// first failure; files stored before it stay stored. Returns the paths
    /// written.
    pub async fn save_all(&mut self) -> Result<Vec<String>> {
        self.store_batch()
            .await
            .map_err(|e| self.failed("save", e))
    }

    async fn store_batch(&mut self) -> Result<Vec<String>> {
        if !self.is_connected() {
            return Err(not_connected());
        }

        let mut payloads: Vec<(ResourceKind, Vec<u8>)> = Vec::new();
        for &kind in self.edition().resources() {
            if let Some(bytes) = self.resources.encode(kind)? {
                payloads.push((kind, bytes));
            }
        }
        if payloads.is_empty() {
            return Err(ManagerError::validation(
                "resources",
                "nothing has been loaded yet",
            ));
        }

        self.ensure_alive().await?;
        let session = self.session.as_mut().ok_or_else(not_connected)?;

        let mut stored = Vec::with_capacity(payloads.len());
        for (kind, bytes) in payloads {
            session.store(kind.path(), &bytes).await?;
            emit(
                &self.events,
                ManagerEvent::Stored {
                    path: kind.path().to_string(),
                    bytes: bytes.len(),
                },
            );
            stored.push(kind.path().to_string());
        }
        Ok(stored)
    }

    /// Probe the session and, if it has dropped, reconnect once with the
    /// remembered settings.
    async fn ensure_alive(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or_else(not_connected)?;
        if session.probe().await.is_ok() {
            return Ok(());
        }

        self.session = None;
        let settings = self.settings.as_ref().ok_or_else(not_connected)?;
        let session = self
            .connector
            .connect(settings)
            .await
            .map_err(|e| self.failed("reconnect", e))?;
        emit(
            &self.events,
            ManagerEvent::Reconnected {
                host: settings.host.clone(),
                port: settings.port,
            },
        );
        self.session = Some(session);
        Ok(())
    }

    /// Report `err` as a failed `action` and hand it back.
    fn failed(&self, action: &str, err: ManagerError) -> ManagerError {
        emit(
            &self.events,
            ManagerEvent::Failed {
                action: action.to_string(),
                error: err.to_string(),
            },
        );
        err
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct ServerState {
        pub files: HashMap<String, Vec<u8>>,
        pub connects: usize,
        pub refuse_connect: bool,
        pub dead_probes: usize,
        pub fail_store_on: Option<String>,
        pub stores: Vec<String>,
    }

    /// In-memory remote with failure injection.
    #[derive(Clone, Default)]
    pub struct MemoryServer(pub Arc<Mutex<ServerState>>);

    impl MemoryServer {
        pub fn with_files(files: &[(&str, &str)]) -> Self {
            let server = MemoryServer::default();
            {
                let mut state = server.0.lock().unwrap();
                for (path, content) in files {
                    state.files.insert(path.to_string(), content.as_bytes().to_vec());
                }
            }
            server
        }

        pub fn file(&self, path: &str) -> Option<String> {
            let state = self.0.lock().unwrap();
            state
                .files
                .get(path)
                .map(|b| String::from_utf8_lossy(b).to_string())
        }
    }

    pub struct MemorySession(MemoryServer);

    impl RemoteFiles for MemorySession {
        async fn fetch(&mut self, path: &str) -> Result<Vec<u8>> {
            let state = (self.0).0.lock().unwrap();
            state.files.get(path).cloned().ok_or_else(|| ManagerError::Transfer {
                path: path.to_string(),
                reason: "550 No such file or directory".into(),
            })
        }

        async fn store(&mut self, path: &str, data: &[u8]) -> Result<()> {
            let mut state = (self.0).0.lock().unwrap();
            if state.fail_store_on.as_deref() == Some(path) {
                return Err(ManagerError::Transfer {
                    path: path.to_string(),
                    reason: "553 Permission denied".into(),
                });
            }
            state.files.insert(path.to_string(), data.to_vec());
            state.stores.push(path.to_string());
            Ok(())
        }

        async fn probe(&mut self) -> Result<()> {
            let mut state = (self.0).0.lock().unwrap();
            if state.dead_probes > 0 {
                state.dead_probes -= 1;
                return Err(ManagerError::Connection("421 Timeout".into()));
            }
            Ok(())
        }
    }

    impl Connector for MemoryServer {
        type Session = MemorySession;

        async fn connect(&self, _settings: &ConnectionSettings) -> Result<MemorySession> {
            let mut state = self.0.lock().unwrap();
            state.connects += 1;
            if state.refuse_connect {
                return Err(ManagerError::Connection("530 Login incorrect".into()));
            }
            Ok(MemorySession(self.clone()))
        }
    }

    pub const REWARDS: &str = "[Rewards]\n# comment\nenabled = true\namount = 15\n";
    pub const PRODUCTS: &str = r#"[{"id": 1, "name": "Blood Essence", "price": 10, "stock": 100, "stack": 5, "currency": 862477668, "isBuff": false}]"#;
    pub const TOKENS: &str = r#"[{"CharacterName": "Alucard", "Tokens": 2000}, {"CharacterName": "Mairwyn", "Tokens": 0}]"#;
    pub const WALLET_LOG: &str = r#"[{"From": "a", "To": "b", "Method": "m", "By": "c", "Type": "t", "Amount": 5}]"#;
    pub const ANNOUNCEMENTS: &str = r#"[{"Name": "restart", "Time": "05:55am", "Message": "Restart soon", "OneTime": false}]"#;

    pub fn shop_server() -> MemoryServer {
        MemoryServer::with_files(&[
            (ResourceKind::RewardsConfig.path(), REWARDS),
            (ResourceKind::Products.path(), PRODUCTS),
            (ResourceKind::WalletTokens.path(), TOKENS),
            (ResourceKind::WalletLog.path(), WALLET_LOG),
            (ResourceKind::Announcements.path(), ANNOUNCEMENTS),
        ])
    }

    fn settings(edition: Edition) -> ConnectionSettings {
        ConnectionSettings {
            host: "203.0.113.7".into(),
            user: "admin".into(),
            password: "secret".into(),
            edition,
            ..ConnectionSettings::default()
        }
    }

    async fn connected(server: &MemoryServer, edition: Edition) -> Manager<MemoryServer> {
        let mut manager = Manager::new(server.clone());
        manager.connect(settings(edition)).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_load_all_shop_edition() {
        let server = shop_server();
        let mut manager = connected(&server, Edition::Shop).await;
        let resources = manager.load_all().await.unwrap();
        assert_eq!(resources.products.as_ref().unwrap()[0].name, "Blood Essence");
        assert_eq!(resources.wallet_tokens.as_ref().unwrap().len(), 2);
        assert_eq!(
            resources.rewards_config.as_ref().unwrap().get("Rewards", "amount"),
            Some("15")
        );
        assert!(resources.bosses.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_set() {
        let server = shop_server();
        let mut manager = connected(&server, Edition::Shop).await;
        manager.load_all().await.unwrap();

        server
            .0
            .lock()
            .unwrap()
            .files
            .remove(ResourceKind::WalletLog.path());
        let err = manager.load_all().await.unwrap_err();
        assert!(matches!(err, ManagerError::Transfer { ref path, .. } if path == ResourceKind::WalletLog.path()));
        assert!(manager.resources().products.is_some());
    }

    #[tokio::test]
    async fn test_decode_failure_names_file() {
        let server = shop_server();
        server.0.lock().unwrap().files.insert(
            ResourceKind::Products.path().to_string(),
            br#"[{"id": 1}]"#.to_vec(),
        );
        let mut manager = connected(&server, Edition::Shop).await;
        let err = manager.load_all().await.unwrap_err().to_string();
        assert!(err.contains("products_list.json"), "{err}");
        assert!(err.contains("record 0: missing field `name`"), "{err}");
    }

    #[tokio::test]
    async fn test_save_all_stores_editable_files_in_order() {
        let server = shop_server();
        let mut manager = connected(&server, Edition::Shop).await;
        manager.load_all().await.unwrap();
        manager
            .resources_mut()
            .set_config_value("Rewards", "amount", "20")
            .unwrap();

        let stored = manager.save_all().await.unwrap();
        assert_eq!(
            stored,
            vec![
                ResourceKind::RewardsConfig.path(),
                ResourceKind::Products.path(),
                ResourceKind::Announcements.path(),
            ]
        );
        assert_eq!(
            server.file(ResourceKind::RewardsConfig.path()).unwrap(),
            "[Rewards]\nenabled = true\namount = 20"
        );
        // Read-only wallet files are untouched
        assert_eq!(server.file(ResourceKind::WalletTokens.path()).unwrap(), TOKENS);
        let products = server.file(ResourceKind::Products.path()).unwrap();
        assert!(products.starts_with("[\n  {\n    \"id\": 1,"), "{products}");
    }

    #[tokio::test]
    async fn test_save_all_stops_at_first_failure() {
        let server = shop_server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = Manager::new(server.clone()).with_events(tx);
        manager.connect(settings(Edition::Shop)).await.unwrap();
        manager.load_all().await.unwrap();
        manager
            .resources_mut()
            .set_config_value("Rewards", "enabled", "false")
            .unwrap();
        server.0.lock().unwrap().fail_store_on = Some(ResourceKind::Products.path().to_string());

        let err = manager.save_all().await.unwrap_err();
        assert!(matches!(err, ManagerError::Transfer { ref path, .. } if path == ResourceKind::Products.path()));

        let state = server.0.lock().unwrap();
        assert_eq!(state.stores, vec![ResourceKind::RewardsConfig.path().to_string()]);
        drop(state);
        // The first file keeps its new content, the third was never written
        assert!(server
            .file(ResourceKind::RewardsConfig.path())
            .unwrap()
            .contains("enabled = false"));
        assert_eq!(server.file(ResourceKind::Announcements.path()).unwrap(), ANNOUNCEMENTS);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let last = events.last().unwrap();
        assert!(
            matches!(last, ManagerEvent::Failed { action, error }
                if action == "save" && error.contains("products_list.json")),
            "{last:?}"
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ManagerEvent::Stored { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_dropped_session_reconnects_once_before_saving() {
        let server = shop_server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = Manager::new(server.clone()).with_events(tx);
        manager.connect(settings(Edition::Shop)).await.unwrap();
        manager.load_all().await.unwrap();

        server.0.lock().unwrap().dead_probes = 1;
        manager.save_all().await.unwrap();

        let state = server.0.lock().unwrap();
        assert_eq!(state.connects, 2);
        assert_eq!(state.stores.len(), 3);
        drop(state);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], ManagerEvent::Connected { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ManagerEvent::Reconnected { host, .. } if host == "203.0.113.7")));
    }

    #[tokio::test]
    async fn test_failed_reconnect_aborts_save() {
        let server = shop_server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = Manager::new(server.clone()).with_events(tx);
        manager.connect(settings(Edition::Shop)).await.unwrap();
        manager.load_all().await.unwrap();

        {
            let mut state = server.0.lock().unwrap();
            state.dead_probes = 1;
            state.refuse_connect = true;
        }
        let err = manager.save_all().await.unwrap_err();
        assert!(matches!(err, ManagerError::Connection(_)));

        let state = server.0.lock().unwrap();
        assert_eq!(state.connects, 2);
        assert!(state.stores.is_empty());
        drop(state);
        assert!(!manager.is_connected());

        let mut failed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ManagerEvent::Failed { action, .. } = event {
                failed.push(action);
            }
        }
        assert_eq!(failed, vec!["reconnect", "save"]);
    }

    #[tokio::test]
    async fn test_failed_connect_and_load_are_reported() {
        let server = shop_server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = Manager::new(server.clone()).with_events(tx);

        server.0.lock().unwrap().refuse_connect = true;
        manager.connect(settings(Edition::Shop)).await.unwrap_err();
        assert_eq!(
            rx.try_recv().unwrap(),
            ManagerEvent::Failed {
                action: "connect".into(),
                error: "Connection error: 530 Login incorrect".into(),
            }
        );

        server.0.lock().unwrap().refuse_connect = false;
        manager.connect(settings(Edition::Shop)).await.unwrap();
        server
            .0
            .lock()
            .unwrap()
            .files
            .remove(ResourceKind::Announcements.path());
        manager.load_all().await.unwrap_err();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], ManagerEvent::Connected { .. }));
        assert!(matches!(
            events.last().unwrap(),
            ManagerEvent::Failed { action, .. } if action == "load"
        ));
    }

    #[tokio::test]
    async fn test_save_requires_connection_and_loaded_data() {
        let server = shop_server();
        let mut manager = Manager::new(server.clone());
        assert!(matches!(
            manager.save_all().await,
            Err(ManagerError::Connection(_))
        ));
        manager.connect(settings(Edition::Shop)).await.unwrap();
        assert!(matches!(
            manager.save_all().await,
            Err(ManagerError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_raids_edition_round_trip() {
        let server = MemoryServer::with_files(&[
            (ResourceKind::RewardsConfig.path(), REWARDS),
            (ResourceKind::Merchants.path(), "[]"),
            (ResourceKind::WalletTokens.path(), TOKENS),
            (ResourceKind::WalletLog.path(), WALLET_LOG),
            (ResourceKind::Announcements.path(), ANNOUNCEMENTS),
            (ResourceKind::Bosses.path(), "[]"),
            (
                ResourceKind::RaidSchedule.path(),
                "[General]\nOverrideMode = Normal\nRaidCheckInterval = 60\n",
            ),
            (
                ResourceKind::RaidGuard.path(),
                "[Config]\nRaidGuard = true\nAlliances = true\nClanBasedAlliances = false\n\
                 PreventFriendlyFire = true\nLimitAssists = false\nMaxAllianceSize = 4\n\
                 MaxAllianceAssists = 2\n",
            ),
            (
                ResourceKind::ServerLog.path(),
                "[Info   :Bloodstone] [Chat] [Global] PlayerOne: hello world\n",
            ),
        ]);
        let mut manager = connected(&server, Edition::Raids).await;
        manager.load_all().await.unwrap();
        assert_eq!(manager.resources().server_log.as_ref().unwrap().len(), 1);

        let mut guard = manager.resources().raid_guard.as_ref().unwrap().settings.clone();
        guard.max_alliance_size = 6;
        manager.resources_mut().set_raid_guard(guard).unwrap();

        let stored = manager.save_all().await.unwrap();
        assert_eq!(stored.len(), 6);
        assert!(!stored.contains(&ResourceKind::ServerLog.path().to_string()));
        assert!(server
            .file(ResourceKind::RaidGuard.path())
            .unwrap()
            .contains("MaxAllianceSize = 6"));
        assert_eq!(server.file(ResourceKind::Merchants.path()).unwrap(), "[]");
    }
}
