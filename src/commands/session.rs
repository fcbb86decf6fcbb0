use serde::Deserialize;

use super::config::{self, ConnectionSettings};
use super::AppState;
use crate::error::Result;
use crate::resources::Resources;
use crate::transport::Connector;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    /// Falls back to the stored settings when absent.
    #[serde(default)]
    pub settings: Option<ConnectionSettings>,
}

pub async fn connect<C: Connector>(state: &mut AppState<C>, args: ConnectArgs) -> Result<()> {
    let settings = args
        .settings
        .unwrap_or_else(|| config::load_settings(state.settings_path.as_deref()));

    state.log(
        "ftp",
        &format!(
            "Connecting to {}:{} as {} ({:?} edition)",
            settings.host, settings.port, settings.user, settings.edition
        ),
    );
    state.manager.connect(settings).await
}

pub async fn disconnect<C: Connector>(state: &mut AppState<C>) -> Result<()> {
    state.manager.disconnect().await;
    state.log("ftp", "Disconnected");
    Ok(())
}

pub async fn load_all<C: Connector>(state: &mut AppState<C>) -> Result<Resources> {
    let edition = state.manager.edition();
    let resources = state.manager.load_all().await?.clone();
    state.log(
        "load",
        &format!("Loaded {} files ({edition:?} edition)", edition.resources().len()),
    );
    Ok(resources)
}

pub async fn save_all<C: Connector>(state: &mut AppState<C>) -> Result<Vec<String>> {
    let stored = state.manager.save_all().await?;
    state.log("save", &format!("All changes saved ({} files)", stored.len()));
    Ok(stored)
}
