//! The remote files the tool manages, and the decoded set held by one
//! editing session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::ini::{self, ConfigDocument};
use crate::codec::records::{decode_records, decode_value, encode_records, validate_records, Record};
use crate::error::{DecodeError, ManagerError, Result};
use crate::models::raid::ConfigView;
use crate::models::{
    Announcement, Boss, CurrencyPerDayStat, Merchant, OnlineTimeStat, Product, RaidGuardConfig,
    RaidScheduleConfig, WalletLogEntry, WalletToken,
};
use crate::server_log::{self, LogLine};

/// Which generation of the tool's resource set a session works with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Edition {
    /// Rewards, shop, wallet and announcements.
    #[default]
    Shop,
    /// Adds bosses and daily reward statistics.
    Bosses,
    /// Merchants instead of the shop, raid scheduling and the server chat log.
    Raids,
}

impl Edition {
    /// Resources in the order a load or save batch visits them.
    pub fn resources(self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Edition::Shop => &[RewardsConfig, Products, WalletTokens, WalletLog, Announcements],
            Edition::Bosses => &[
                RewardsConfig,
                Products,
                WalletTokens,
                WalletLog,
                Announcements,
                Bosses,
                OnlineTime,
                CurrencyPerDay,
            ],
            Edition::Raids => &[
                RewardsConfig,
                Merchants,
                WalletTokens,
                WalletLog,
                Announcements,
                Bosses,
                RaidSchedule,
                RaidGuard,
                ServerLog,
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    RewardsConfig,
    Products,
    Merchants,
    WalletTokens,
    WalletLog,
    Announcements,
    Bosses,
    RaidSchedule,
    RaidGuard,
    ServerLog,
    OnlineTime,
    CurrencyPerDay,
}

impl ResourceKind {
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::RewardsConfig => "/BepInEx/config/BloodyRewards.cfg",
            ResourceKind::Products => "/BepInEx/config/BloodyShop/products_list.json",
            ResourceKind::Merchants => "/BepInEx/config/BloodyMerchant/merchants.json",
            ResourceKind::WalletTokens => "/BepInEx/config/BloodyWallet/tokens.json",
            ResourceKind::WalletLog => "/BepInEx/config/BloodyWallet/log.json",
            ResourceKind::Announcements => "/BepInEx/config/KindredCommands/announcements.json",
            ResourceKind::Bosses => "/BepInEx/config/BloodyBoss/Bosses.json",
            ResourceKind::RaidSchedule => "/BepInEx/config/RaidForge.cfg",
            ResourceKind::RaidGuard => "/BepInEx/config/io.zfolmt.RaidGuard.cfg",
            ResourceKind::ServerLog => "/BepInEx/LogOutput.log",
            ResourceKind::OnlineTime => {
                "/BepInEx/config/BloodyRewards/dayli_time_online_list.json"
            }
            ResourceKind::CurrencyPerDay => {
                "/BepInEx/config/BloodyRewards/user_currencies_per_day.json"
            }
        }
    }

    /// Whether a save batch writes this file back.
    pub fn editable(self) -> bool {
        matches!(
            self,
            ResourceKind::RewardsConfig
                | ResourceKind::Products
                | ResourceKind::Merchants
                | ResourceKind::Announcements
                | ResourceKind::Bosses
                | ResourceKind::RaidSchedule
                | ResourceKind::RaidGuard
        )
    }
}

/// A config file together with its typed view. Edits go through
/// [`IniView::update`] so the document always reflects the view.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IniView<T> {
    pub document: ConfigDocument,
    pub settings: T,
}

impl<T: ConfigView> IniView<T> {
    pub fn read(document: ConfigDocument) -> std::result::Result<Self, DecodeError> {
        let settings = T::read(&document)?;
        Ok(Self { document, settings })
    }

    pub fn update(&mut self, settings: T) -> Result<()> {
        settings.validate()?;
        settings.write(&mut self.document);
        self.settings = settings;
        Ok(())
    }
}

/// Everything decoded by one load batch. A `None` field was not part of
/// the edition that was loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards_config: Option<ConfigDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchants: Option<Vec<Merchant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_tokens: Option<Vec<WalletToken>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_log: Option<Vec<WalletLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcements: Option<Vec<Announcement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bosses: Option<Vec<Boss>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raid_schedule: Option<IniView<RaidScheduleConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raid_guard: Option<IniView<RaidGuardConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_log: Option<Vec<LogLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_time: Option<Vec<OnlineTimeStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_per_day: Option<Vec<CurrencyPerDayStat>>,
}

impl Resources {
    /// Decode the raw contents of `kind` into its slot.
    pub fn decode(&mut self, kind: ResourceKind, bytes: &[u8]) -> std::result::Result<(), DecodeError> {
        match kind {
            ResourceKind::RewardsConfig => self.rewards_config = Some(ini::decode_bytes(bytes)?),
            ResourceKind::Products => self.products = Some(decode_records(bytes)?),
            ResourceKind::Merchants => self.merchants = Some(decode_records(bytes)?),
            ResourceKind::WalletTokens => self.wallet_tokens = Some(decode_records(bytes)?),
            ResourceKind::WalletLog => self.wallet_log = Some(decode_records(bytes)?),
            ResourceKind::Announcements => self.announcements = Some(decode_records(bytes)?),
            ResourceKind::Bosses => self.bosses = Some(decode_records(bytes)?),
            ResourceKind::RaidSchedule => {
                self.raid_schedule = Some(IniView::read(ini::decode_bytes(bytes)?)?)
            }
            ResourceKind::RaidGuard => {
                self.raid_guard = Some(IniView::read(ini::decode_bytes(bytes)?)?)
            }
            ResourceKind::ServerLog => {
                let text = String::from_utf8_lossy(bytes);
                self.server_log = Some(server_log::parse_log(&text));
            }
            ResourceKind::OnlineTime => self.online_time = Some(decode_records(bytes)?),
            ResourceKind::CurrencyPerDay => self.currency_per_day = Some(decode_records(bytes)?),
        }
        Ok(())
    }

    /// Serialize `kind` for upload. `None` when it is read-only or was not
    /// loaded.
    pub fn encode(&self, kind: ResourceKind) -> Result<Option<Vec<u8>>> {
        if !kind.editable() {
            return Ok(None);
        }
        match kind {
            ResourceKind::RewardsConfig => match &self.rewards_config {
                Some(doc) if doc.is_blank() => Err(ManagerError::validation(
                    kind.path(),
                    "config data is empty",
                )),
                Some(doc) => Ok(Some(ini::encode(doc).into_bytes())),
                None => Ok(None),
            },
            ResourceKind::Products => encode_slot(&self.products),
            ResourceKind::Merchants => encode_slot(&self.merchants),
            ResourceKind::Announcements => encode_slot(&self.announcements),
            ResourceKind::Bosses => encode_slot(&self.bosses),
            ResourceKind::RaidSchedule => Ok(self
                .raid_schedule
                .as_ref()
                .map(|view| ini::encode(&view.document).into_bytes())),
            ResourceKind::RaidGuard => Ok(self
                .raid_guard
                .as_ref()
                .map(|view| ini::encode(&view.document).into_bytes())),
            _ => Ok(None),
        }
    }

    /// Edit one entry of the rewards config.
    pub fn set_config_value(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        self.rewards_config
            .as_mut()
            .ok_or_else(|| not_loaded(ResourceKind::RewardsConfig))?
            .update_checked(section, key, value)
    }

    /// Replace an editable record set with the rows handed back by the
    /// presentation layer.
    pub fn replace_records(&mut self, kind: ResourceKind, rows: &Value) -> Result<()> {
        match kind {
            ResourceKind::Products => replace_slot(kind, &mut self.products, rows),
            ResourceKind::Merchants => replace_slot(kind, &mut self.merchants, rows),
            ResourceKind::Announcements => replace_slot(kind, &mut self.announcements, rows),
            ResourceKind::Bosses => replace_slot(kind, &mut self.bosses, rows),
            _ => Err(ManagerError::validation(
                "kind",
                format!("{kind:?} is not an editable record set"),
            )),
        }
    }

    pub fn set_raid_schedule(&mut self, settings: RaidScheduleConfig) -> Result<()> {
        self.raid_schedule
            .as_mut()
            .ok_or_else(|| not_loaded(ResourceKind::RaidSchedule))?
            .update(settings)
    }

    pub fn set_raid_guard(&mut self, settings: RaidGuardConfig) -> Result<()> {
        self.raid_guard
            .as_mut()
            .ok_or_else(|| not_loaded(ResourceKind::RaidGuard))?
            .update(settings)
    }
}

fn not_loaded(kind: ResourceKind) -> ManagerError {
    ManagerError::validation(kind.path(), "not loaded in this session")
}

fn encode_slot<T: Record>(slot: &Option<Vec<T>>) -> Result<Option<Vec<u8>>> {
    slot.as_deref().map(encode_records).transpose()
}

fn replace_slot<T: Record>(kind: ResourceKind, slot: &mut Option<Vec<T>>, rows: &Value) -> Result<()> {
    let current = slot.as_mut().ok_or_else(|| not_loaded(kind))?;
    let records: Vec<T> = decode_value(rows)?;
    validate_records(&records)?;
    *current = records;
    Ok(())
}
