//! Typed views over the RaidForge and RaidGuard `.cfg` files. The views read
//! from and write back into a [`ConfigDocument`], so keys they do not model
//! survive a save untouched.

use serde::{Deserialize, Serialize};

use crate::codec::ini::ConfigDocument;
use crate::codec::records::ensure_range;
use crate::error::{DecodeError, ManagerError, Result};

/// A typed projection of some keys of a config document.
pub trait ConfigView: Sized {
    /// Section that receives keys missing from the loaded file.
    const DEFAULT_SECTION: &'static str;

    fn read(doc: &ConfigDocument) -> std::result::Result<Self, DecodeError>;

    fn write(&self, doc: &mut ConfigDocument);

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn required<'a>(doc: &'a ConfigDocument, key: &str) -> std::result::Result<&'a str, DecodeError> {
    doc.find(key)
        .map(|(_, value)| value)
        .ok_or_else(|| DecodeError::MissingSetting(key.to_string()))
}

fn parse_int(doc: &ConfigDocument, key: &str) -> std::result::Result<i64, DecodeError> {
    let value = required(doc, key)?;
    value.parse().map_err(|_| DecodeError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(doc: &ConfigDocument, key: &str) -> std::result::Result<bool, DecodeError> {
    let value = required(doc, key)?;
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(DecodeError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Set `key` in whichever section already holds it.
fn put(doc: &mut ConfigDocument, default_section: &str, key: &str, value: String) {
    let section = doc
        .find(key)
        .map(|(section, _)| section.to_string())
        .unwrap_or_else(|| default_section.to_string());
    doc.set(&section, key, value);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideMode {
    Normal,
    ForceOn,
    ForceOff,
}

impl OverrideMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OverrideMode::Normal => "Normal",
            OverrideMode::ForceOn => "ForceOn",
            OverrideMode::ForceOff => "ForceOff",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "normal" => Some(OverrideMode::Normal),
            "forceon" => Some(OverrideMode::ForceOn),
            "forceoff" => Some(OverrideMode::ForceOff),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

/// Raid window for one weekday. Times are kept as written in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub weekday: Weekday,
    pub start: String,
    pub end: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidScheduleConfig {
    pub override_mode: OverrideMode,
    pub check_interval_seconds: i64,
    /// Always seven rows, Monday first.
    pub days: Vec<DayWindow>,
}

impl ConfigView for RaidScheduleConfig {
    const DEFAULT_SECTION: &'static str = "Raid Schedule";

    fn read(doc: &ConfigDocument) -> std::result::Result<Self, DecodeError> {
        let mode = required(doc, "OverrideMode")?;
        let override_mode = OverrideMode::parse(mode).ok_or_else(|| DecodeError::InvalidSetting {
            key: "OverrideMode".into(),
            value: mode.to_string(),
        })?;

        let days = Weekday::ALL
            .iter()
            .map(|&weekday| {
                let lookup = |suffix: &str| {
                    doc.find(&format!("{}{suffix}", weekday.name()))
                        .map(|(_, v)| v.to_string())
                        .unwrap_or_default()
                };
                DayWindow {
                    weekday,
                    start: lookup("Start"),
                    end: lookup("End"),
                }
            })
            .collect();

        Ok(Self {
            override_mode,
            check_interval_seconds: parse_int(doc, "RaidCheckInterval")?,
            days,
        })
    }

    fn write(&self, doc: &mut ConfigDocument) {
        let section = Self::DEFAULT_SECTION;
        put(doc, section, "OverrideMode", self.override_mode.as_str().to_string());
        put(doc, section, "RaidCheckInterval", self.check_interval_seconds.to_string());
        for day in &self.days {
            put(doc, section, &format!("{}Start", day.weekday.name()), day.start.clone());
            put(doc, section, &format!("{}End", day.weekday.name()), day.end.clone());
        }
    }

    fn validate(&self) -> Result<()> {
        ensure_range("RaidCheckInterval", self.check_interval_seconds, 1..=i64::MAX)?;
        let in_order = self.days.len() == Weekday::ALL.len()
            && self
                .days
                .iter()
                .zip(Weekday::ALL)
                .all(|(day, weekday)| day.weekday == weekday);
        if !in_order {
            return Err(ManagerError::validation(
                "days",
                "expected exactly one row per weekday, Monday first",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidGuardConfig {
    pub raid_guard_enabled: bool,
    pub alliances_enabled: bool,
    pub clan_based_alliances: bool,
    pub prevent_friendly_fire: bool,
    pub limit_assists: bool,
    pub max_alliance_size: i64,
    pub max_alliance_assists: i64,
}

impl ConfigView for RaidGuardConfig {
    const DEFAULT_SECTION: &'static str = "Config";

    fn read(doc: &ConfigDocument) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            raid_guard_enabled: parse_bool(doc, "RaidGuard")?,
            alliances_enabled: parse_bool(doc, "Alliances")?,
            clan_based_alliances: parse_bool(doc, "ClanBasedAlliances")?,
            prevent_friendly_fire: parse_bool(doc, "PreventFriendlyFire")?,
            limit_assists: parse_bool(doc, "LimitAssists")?,
            max_alliance_size: parse_int(doc, "MaxAllianceSize")?,
            max_alliance_assists: parse_int(doc, "MaxAllianceAssists")?,
        })
    }

    fn write(&self, doc: &mut ConfigDocument) {
        let section = Self::DEFAULT_SECTION;
        let flags = [
            ("RaidGuard", self.raid_guard_enabled),
            ("Alliances", self.alliances_enabled),
            ("ClanBasedAlliances", self.clan_based_alliances),
            ("PreventFriendlyFire", self.prevent_friendly_fire),
            ("LimitAssists", self.limit_assists),
        ];
        for (key, value) in flags {
            put(doc, section, key, value.to_string());
        }
        put(doc, section, "MaxAllianceSize", self.max_alliance_size.to_string());
        put(doc, section, "MaxAllianceAssists", self.max_alliance_assists.to_string());
    }

    fn validate(&self) -> Result<()> {
        ensure_range("MaxAllianceSize", self.max_alliance_size, 0..=i64::MAX)?;
        ensure_range("MaxAllianceAssists", self.max_alliance_assists, 0..=i64::MAX)
    }
}
