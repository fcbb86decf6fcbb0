//! Read-only BloodyRewards statistics.

use serde::Serialize;

use crate::codec::records::{Fields, Record};
use crate::error::DecodeError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OnlineTimeStat {
    #[serde(rename = "CharacterName")]
    pub character_name: String,
    #[serde(rename = "Date")]
    pub date: String,
    /// Minutes spent online on `date`.
    #[serde(rename = "TimeOnline")]
    pub time_online: i64,
}

impl Record for OnlineTimeStat {
    fn from_fields(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            character_name: f.string("CharacterName")?,
            date: f.string("Date")?,
            time_online: f.int("TimeOnline")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrencyPerDayStat {
    #[serde(rename = "CharacterName")]
    pub character_name: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
}

impl Record for CurrencyPerDayStat {
    fn from_fields(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            character_name: f.string("CharacterName")?,
            date: f.string("Date")?,
            amount: f.int("Amount")?,
        })
    }
}
