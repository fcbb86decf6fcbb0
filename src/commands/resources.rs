use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::codec::ini::{classify_value as classify, ValueKind};
use crate::error::{ManagerError, Result};
use crate::models::wallet::{group_by_bucket, BucketGroup};
use crate::models::{RaidGuardConfig, RaidScheduleConfig};
use crate::resources::{ResourceKind, Resources};
use crate::server_log::{CategoryFilter, LogCategory, LogLine};
use crate::transport::Connector;

pub fn get_resources<C: Connector>(state: &AppState<C>) -> Resources {
    state.manager.resources().clone()
}

#[derive(Debug, Deserialize)]
pub struct ConfigValueArgs {
    pub section: String,
    pub key: String,
    pub value: String,
}

pub fn set_config_value<C: Connector>(state: &mut AppState<C>, args: ConfigValueArgs) -> Result<()> {
    state
        .manager
        .resources_mut()
        .set_config_value(&args.section, &args.key, &args.value)
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRecordsArgs {
    pub kind: ResourceKind,
    pub records: Value,
}

pub fn replace_records<C: Connector>(state: &mut AppState<C>, args: ReplaceRecordsArgs) -> Result<()> {
    state
        .manager
        .resources_mut()
        .replace_records(args.kind, &args.records)
}

#[derive(Debug, Deserialize)]
pub struct RaidScheduleArgs {
    pub settings: RaidScheduleConfig,
}

pub fn set_raid_schedule<C: Connector>(state: &mut AppState<C>, args: RaidScheduleArgs) -> Result<()> {
    state.manager.resources_mut().set_raid_schedule(args.settings)
}

#[derive(Debug, Deserialize)]
pub struct RaidGuardArgs {
    pub settings: RaidGuardConfig,
}

pub fn set_raid_guard<C: Connector>(state: &mut AppState<C>, args: RaidGuardArgs) -> Result<()> {
    state.manager.resources_mut().set_raid_guard(args.settings)
}

pub fn token_buckets<C: Connector>(state: &AppState<C>) -> Result<Vec<BucketGroup>> {
    let tokens = state
        .manager
        .resources()
        .wallet_tokens
        .as_deref()
        .ok_or_else(|| {
            ManagerError::validation(ResourceKind::WalletTokens.path(), "not loaded in this session")
        })?;
    Ok(group_by_bucket(tokens))
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerLogArgs {
    /// All categories when absent.
    #[serde(default)]
    pub categories: Option<Vec<LogCategory>>,
}

/// Filtered view of the parsed server log. The stored lines are not touched.
pub fn filter_server_log<C: Connector>(state: &AppState<C>, args: ServerLogArgs) -> Result<Vec<LogLine>> {
    let lines = state
        .manager
        .resources()
        .server_log
        .as_deref()
        .ok_or_else(|| {
            ManagerError::validation(ResourceKind::ServerLog.path(), "not loaded in this session")
        })?;
    let filter = args
        .categories
        .map(CategoryFilter::only)
        .unwrap_or_default();
    Ok(filter.apply(lines).into_iter().cloned().collect())
}

#[derive(Debug, Deserialize)]
pub struct ClassifyArgs {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Classified {
    pub kind: ValueKind,
}

pub fn classify_value(args: ClassifyArgs) -> Classified {
    Classified {
        kind: classify(&args.value),
    }
}
